//! Run command - ingest a provider file and process it through the pipeline.

use std::path::Path;

use colored::Colorize;
use provcheck::export::{self, ExportFormat};
use provcheck::ingest::load_records;
use provcheck::{BatchSummary, Pipeline, PipelineConfig, PriorityLevel, ReviewQueue, SourceSpec};
use tokio_util::sync::CancellationToken;

use crate::cli::RunArgs;

pub fn run(args: RunArgs, config_path: Option<&Path>, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !args.file.exists() {
        return Err(format!("File not found: {}", args.file.display()).into());
    }

    let config = build_config(&args, config_path)?;

    let (records, meta) = load_records(&args.file, &config.ingest)?;
    if !args.json {
        println!(
            "{} {} ({} records, {})",
            "Processing".cyan().bold(),
            meta.file.white(),
            meta.record_count,
            meta.format
        );
        if verbose && !meta.unmapped_columns.is_empty() {
            println!("  Ignored columns: {}", meta.unmapped_columns.join(", "));
        }
    }

    let pipeline = Pipeline::new(config)?;
    if verbose && !args.json {
        let sources = pipeline.source_names();
        if sources.is_empty() {
            println!("  No reference sources configured; enrichment is skipped");
        } else {
            println!("  Sources: {}", sources.join(", "));
        }
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("Interrupted; finishing records in flight...");
            cancel.cancel();
        })?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(pipeline.run_with_cancel(records, &cancel));

    if args.json {
        let output = serde_json::json!({
            "summary": report.summary,
            "queue": {
                "queued": report.queue.len(),
                "dropped": report.queue.dropped,
                "total_candidates": report.queue.total_candidates,
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&report.summary);
        print_queue_counts(&report.queue);
        if !report.queue.is_empty() {
            println!();
            println!("{}", "Top of review queue:".yellow().bold());
            for entry in report.queue.entries.iter().take(5) {
                println!(
                    "  {:>3}. {:12} risk {:.2}  {}",
                    entry.priority_rank,
                    entry.record_id,
                    entry.risk_score,
                    entry.reasons.first().map(String::as_str).unwrap_or("")
                );
            }
        }
    }

    if let Some(path) = &args.output {
        let format = ExportFormat::from_path(path).unwrap_or_default();
        export::save_results(&report.results, path, format)?;
        if !args.json {
            println!("Results written to {}", path.display().to_string().white());
        }
    }

    if let Some(path) = &args.queue_output {
        let format = args
            .format
            .map(ExportFormat::from)
            .or_else(|| ExportFormat::from_path(path))
            .unwrap_or_default();
        export::save_queue(&report.queue, path, format)?;
        if !args.json {
            println!(
                "Review queue written to {} ({} entries, {} dropped)",
                path.display().to_string().white(),
                report.queue.len(),
                report.queue.dropped
            );
        }
    }

    if report.summary.skipped > 0 {
        return Err(format!("Cancelled: {} records were not processed", report.summary.skipped).into());
    }

    Ok(())
}

/// Defaults, then the config file and environment, then command-line flags.
fn build_config(args: &RunArgs, config_path: Option<&Path>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::resolve(config_path)?;

    if let Some(parallelism) = args.parallelism {
        config.batch.parallelism = parallelism;
    }
    if args.delimiter.is_some() {
        config.ingest.delimiter = args.delimiter;
    }
    if let Some(path) = &args.registry {
        config.sources.push(SourceSpec::Registry {
            path: path.clone(),
            name: None,
            confidence: None,
        });
    }
    if let Some(path) = &args.directory {
        config.sources.push(SourceSpec::Directory {
            path: path.clone(),
            name: None,
            confidence: None,
        });
    }
    if args.synthetic {
        config.sources.push(SourceSpec::Synthetic {
            name: None,
            confidence: None,
        });
    }

    config.validate()?;
    Ok(config)
}

fn print_queue_counts(queue: &ReviewQueue) {
    println!();
    println!("{}", "Review queue:".yellow().bold());
    println!("  Candidates: {}", queue.total_candidates);
    println!("  Queued:     {}", queue.len().to_string().white().bold());
    if queue.dropped > 0 {
        println!("  Dropped:    {} (queue size cap)", queue.dropped.to_string().red());
    } else {
        println!("  Dropped:    0");
    }
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("{}", "Summary:".yellow().bold());
    println!("  Records:        {}", summary.total.to_string().white().bold());
    println!("  Auto-validated: {}", summary.auto_validated.to_string().green());
    println!("  Needs review:   {}", summary.needs_review.to_string().yellow());
    println!("  Hard failures:  {}", summary.hard_failures.to_string().red());
    if summary.degraded > 0 {
        println!("  Degraded:       {}", summary.degraded.to_string().magenta());
    }
    if summary.skipped > 0 {
        println!("  Skipped:        {}", summary.skipped.to_string().red());
    }
    println!("  Fields enriched: {}", summary.fields_enriched);
    println!();

    let confidence = summary.average_confidence * 100.0;
    let colored_confidence = if confidence >= 75.0 {
        format!("{:.1}%", confidence).green()
    } else if confidence >= 50.0 {
        format!("{:.1}%", confidence).yellow()
    } else {
        format!("{:.1}%", confidence).red()
    };
    println!("{}", "Scores:".yellow().bold());
    println!("  Completeness: {:.1}%", summary.average_completeness * 100.0);
    println!("  Consistency:  {:.1}%", summary.average_consistency * 100.0);
    println!("  Confidence:   {}", colored_confidence);
    println!();

    println!("{}", "Priority:".yellow().bold());
    for (level, count) in &summary.priority_distribution {
        let label = match level {
            PriorityLevel::High => "High".red(),
            PriorityLevel::Medium => "Medium".yellow(),
            PriorityLevel::Low => "Low".green(),
        };
        println!("  {:8} {}", label, count);
    }

    if !summary.common_reasons.is_empty() {
        println!();
        println!("{}", "Common issues:".yellow().bold());
        for (reason, count) in &summary.common_reasons {
            println!("  {:5} {}", count, reason);
        }
    }

    println!();
    println!(
        "Processed in {} ms ({:.1} records/s)",
        summary.elapsed_ms, summary.throughput_per_sec
    );
}
