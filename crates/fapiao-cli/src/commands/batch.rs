//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use fapiao_core::batch::{BatchReport, is_supported_file};
use fapiao_core::{BatchProcessor, FinalizedInvoices};

use super::load_config;
use super::process::{OutputFormat, format_records};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input directory or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for the batch results
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV of unique valid invoices
    #[arg(long)]
    summary: bool,

    /// Number of files loaded concurrently
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Keep duplicate invoices unmarked
    #[arg(long)]
    no_dedup: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.batch.concurrency = jobs;
    }
    if args.no_dedup {
        config.dedup.enabled = false;
    }

    let files = collect_files(&args.input)?;
    let supported = files.iter().filter(|p| is_supported_file(p)).count();
    if supported == 0 {
        anyhow::bail!(
            "No supported files found in {} ({} skipped)",
            args.input,
            files.len()
        );
    }

    println!(
        "{} Found {} files ({} supported)",
        style("ℹ").blue(),
        files.len(),
        supported
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(supported as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files",
            )?
            .progress_chars("=>-"),
    );

    let processor = BatchProcessor::from_config(&config)?;
    let report = processor
        .process_with_progress(&files, |path| {
            debug!("Loaded {}", path.display());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    let store = processor.store();
    if let Some(ref output_dir) = args.output_dir {
        let output_path = output_dir.join(format!("invoices.{}", args.format.extension()));
        fs::write(&output_path, format_records(&store.snapshot(), args.format)?)?;
        println!(
            "{} Results written to {}",
            style("✓").green(),
            output_path.display()
        );
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &store.finalized())?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_report(&report, start);
    println!(
        "   Total {:.2}, unique {:.2} across {} files",
        store.total_amount(),
        store.unique_total_amount(),
        store.file_count()
    );

    Ok(())
}

/// Files of a directory (sorted), or the matches of a glob pattern.
fn collect_files(input: &str) -> anyhow::Result<Vec<PathBuf>> {
    let path = Path::new(input);
    let mut files: Vec<PathBuf> = if path.is_dir() {
        fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect()
    } else {
        glob(input)?.filter_map(|r| r.ok()).filter(|p| p.is_file()).collect()
    };
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", input);
    }
    Ok(files)
}

fn print_report(report: &BatchReport, start: Instant) {
    println!();
    println!(
        "{} Processed {} of {} files in {:?}",
        style("✓").green(),
        report.processed,
        report.supported,
        start.elapsed()
    );
    println!(
        "   {} recognized, {} duplicates, {} recognition errors",
        style(report.recognized).green(),
        style(report.duplicates).yellow(),
        style(report.recognition_errors).red()
    );
    println!(
        "   {} failed, {} skipped",
        style(report.failed).red(),
        report.skipped
    );

    if !report.failures.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for failure in &report.failures {
            println!("  - {}: {}", failure.path.display(), failure.error);
        }
    }
}

fn write_summary(path: &Path, finalized: &FinalizedInvoices) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["index", "invoice_number", "total_amount", "date", "file_name"])?;

    for (idx, record) in finalized.invoices.iter().enumerate() {
        let fields = &record.fields;
        wtr.write_record([
            (idx + 1).to_string().as_str(),
            or_dash(&fields.invoice_number),
            format!("{:.2}", fields.total_amount).as_str(),
            or_dash(&fields.date),
            record.file_name.as_str(),
        ])?;
    }

    wtr.write_record([
        "",
        "TOTAL",
        format!("{:.2}", finalized.grand_total.round_dp(2)).as_str(),
        "",
        format!("{} invoices", finalized.invoices.len()).as_str(),
    ])?;

    wtr.flush()?;
    Ok(())
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
