//! Process command - extract one record from a single PDF.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;

use invex_core::pdf::Document;
use invex_core::ResultSet;

use super::{build_pipeline, load_config, SchemaSelection};
use crate::output;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    #[command(flatten)]
    schema: SchemaSelection,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pages to read from the document
    #[arg(long)]
    max_pages: Option<u32>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(max_pages) = args.max_pages {
        config.pdf.max_pages = max_pages;
    }
    let api_key = config.validate()?;
    let schema = args.schema.load()?;

    let document = Document::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let pipeline = build_pipeline(&config, schema.clone(), api_key)?;
    let (record, outcome) = pipeline
        .process_with_outcome(&document)
        .await
        .with_context(|| format!("Failed to open {}", document.filename()))?;

    let mut results = ResultSet::new(schema);
    results.push(record);
    results.assign_serials();
    let record = &results.records()[0];

    let mut writer = output::open_output(args.output.as_deref())?;
    serde_json::to_writer_pretty(&mut writer, record)?;
    writeln!(writer)?;
    writer.flush()?;

    if outcome.is_extracted() {
        eprintln!(
            "{} Extracted {}/{} fields from {} in {:?}",
            style("✓").green(),
            record.filled_count(),
            record.len(),
            document.filename(),
            start.elapsed()
        );
    } else {
        eprintln!(
            "{} {}: {}",
            style("⚠").yellow(),
            document.filename(),
            outcome
        );
    }

    Ok(())
}
