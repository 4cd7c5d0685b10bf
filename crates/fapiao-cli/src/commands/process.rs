//! Process command - extract invoices from a single file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use fapiao_core::batch::is_supported_file;
use fapiao_core::{BatchProcessor, FileError, InvoiceRecord};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, JPG or PNG)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_supported_file(&args.input) {
        return Err(FileError::Unsupported(args.input.display().to_string()).into());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message("Recognizing invoices...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let processor = BatchProcessor::from_config(&config)?;
    let report = processor.process(std::slice::from_ref(&args.input)).await;
    pb.finish_and_clear();

    if let Some(failure) = report.failures.first() {
        anyhow::bail!("Failed to process {}: {}", failure.path.display(), failure.error);
    }

    let records = processor.store().snapshot();
    let output = format_records(&records, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

/// One CSV row per record.
#[derive(Serialize)]
struct RecordRow<'a> {
    file_name: &'a str,
    page: String,
    invoice_number: &'a str,
    invoice_code: &'a str,
    date: &'a str,
    seller: &'a str,
    buyer: &'a str,
    amount: String,
    tax_amount: String,
    total_amount: String,
    method: &'a str,
    status: &'a str,
    duplicate: bool,
    error: &'a str,
}

impl<'a> From<&'a InvoiceRecord> for RecordRow<'a> {
    fn from(record: &'a InvoiceRecord) -> Self {
        let fields = &record.fields;
        Self {
            file_name: &record.file_name,
            page: record.page_number.map(|p| p.to_string()).unwrap_or_default(),
            invoice_number: &fields.invoice_number,
            invoice_code: &fields.invoice_code,
            date: &fields.date,
            seller: &fields.seller,
            buyer: &fields.buyer,
            amount: format!("{:.2}", fields.amount),
            tax_amount: format!("{:.2}", fields.tax_amount),
            total_amount: format!("{:.2}", fields.total_amount),
            method: record.recognition_method.map(|m| m.as_str()).unwrap_or(""),
            status: if record.is_recognized() { "success" } else { "error" },
            duplicate: record.is_duplicate,
            error: record.error_message.as_deref().unwrap_or(""),
        }
    }
}

pub fn format_records(records: &[InvoiceRecord], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Csv => format_records_csv(records),
        OutputFormat::Text => Ok(records
            .iter()
            .map(format_record_text)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

fn format_records_csv(records: &[InvoiceRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(RecordRow::from(record))?;
    }
    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_record_text(record: &InvoiceRecord) -> String {
    let fields = &record.fields;
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    let mut output = String::new();

    output.push_str(&format!("{}\n", record.file_name));
    output.push_str(&format!("  Number:  {}\n", or_dash(&fields.invoice_number)));
    output.push_str(&format!("  Code:    {}\n", or_dash(&fields.invoice_code)));
    output.push_str(&format!("  Date:    {}\n", or_dash(&fields.date)));
    output.push_str(&format!("  Seller:  {}\n", or_dash(&fields.seller)));
    output.push_str(&format!("  Buyer:   {}\n", or_dash(&fields.buyer)));
    output.push_str(&format!(
        "  Amount:  {:.2} + tax {:.2} = {:.2}\n",
        fields.amount, fields.tax_amount, fields.total_amount
    ));

    let status = if record.is_duplicate {
        "duplicate".to_string()
    } else if record.is_recognized() {
        match record.recognition_method {
            Some(method) => format!("recognized ({})", method.as_str()),
            None => "recognized".to_string(),
        }
    } else {
        format!("error: {}", record.error_message.as_deref().unwrap_or("unknown"))
    };
    output.push_str(&format!("  Status:  {}\n", status));
    output
}
