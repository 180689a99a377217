//! Manual review queue.

mod queue;

pub use queue::{Prioritizer, ReviewQueue, ReviewQueueEntry};
