//! Queue command - rebuild the review queue from saved results.

use std::io;
use std::path::{Path, PathBuf};

use colored::Colorize;
use provcheck::export::{self, ExportFormat};
use provcheck::{PipelineConfig, Prioritizer};

use crate::cli::ExportChoice;

pub fn run(
    file: PathBuf,
    format: ExportChoice,
    output: Option<PathBuf>,
    limit: Option<usize>,
    config: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("Results file not found: {}", file.display()).into());
    }

    let config = PipelineConfig::resolve(config)?;
    let results = export::load_results(&file)?;
    let prioritizer = Prioritizer::new(config.queue.clone(), config.scoring.acceptance_threshold);

    let mut queue = prioritizer.prioritize(results.iter().map(|r| &r.quality_report));
    if let Some(limit) = limit {
        queue.truncate(limit);
    }

    let format = ExportFormat::from(format);
    match &output {
        Some(path) => export::save_queue(&queue, path, format)?,
        None => match format {
            ExportFormat::Csv => export::write_queue_csv(&queue, io::stdout().lock())?,
            ExportFormat::Json => {
                export::write_queue_json(&queue, io::stdout().lock())?;
                println!();
            }
        },
    }

    // Counts go to stderr; the CSV layout has no slot for them.
    eprintln!(
        "{} {} of {} candidates from {} records ({} dropped){}",
        "Queued".green().bold(),
        queue.len().to_string().white().bold(),
        queue.total_candidates,
        results.len(),
        queue.dropped,
        output.map(|p| format!(" to {}", p.display())).unwrap_or_default()
    );

    Ok(())
}
