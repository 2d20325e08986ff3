//! Batch command: every PDF in a directory into one spreadsheet.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::{glob_with, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use invex_core::pdf::Document;
use invex_core::{ExtractionOutcome, ResultSet};

use super::{build_pipeline, load_config, Pipeline, SchemaSelection};
use crate::output::{self, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Directory containing invoice PDFs
    #[arg(required = true)]
    input_dir: PathBuf,

    #[command(flatten)]
    schema: SchemaSelection,

    /// Output file (default: <schema>_output.<format>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "xlsx")]
    format: OutputFormat,

    /// Pages to read from each document
    #[arg(long)]
    max_pages: Option<u32>,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(max_pages) = args.max_pages {
        config.pdf.max_pages = max_pages;
    }
    let api_key = config.validate()?;
    let schema = args.schema.load()?;

    if !args.input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", args.input_dir.display());
    }

    let files = list_pdfs(&args.input_dir)?;
    if files.is_empty() {
        anyhow::bail!("No PDF files found in {}", args.input_dir.display());
    }

    println!(
        "{} Found {} PDF files, extracting with schema '{}'",
        style("ℹ").blue(),
        files.len(),
        schema.name()
    );

    let file_column = config.output.file_column.clone();
    let output_path = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!("{}_output.{}", schema.name(), args.format.extension()))
    });

    let pipeline = build_pipeline(&config, schema.clone(), api_key)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut results = ResultSet::new(schema);
    let mut outcomes = Vec::with_capacity(files.len());

    for path in &files {
        let filename = file_name(path);
        pb.set_message(filename.clone());

        let (record, outcome) = process_file(&pipeline, path, &filename).await;
        info!("{}: {}", filename, outcome);

        results.push(record);
        outcomes.push(outcome);
        pb.inc(1);
    }

    pb.finish_and_clear();

    results.assign_serials();

    let writer = output::open_output(Some(&output_path))?;
    match args.format {
        OutputFormat::Xlsx => output::write_xlsx(writer, &results, &file_column)?,
        OutputFormat::Csv => output::write_csv(writer, &results, &file_column)?,
        OutputFormat::Json => output::write_json(writer, &results, &outcomes)?,
    }

    print_summary(&files, &outcomes, start);
    println!(
        "{} Results written to {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

/// All `*.pdf` files directly inside `dir`, extension matched
/// case-insensitively, sorted by path.
fn list_pdfs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.pdf", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut files: Vec<PathBuf> = glob_with(&pattern, options)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn process_file(
    pipeline: &Pipeline,
    path: &Path,
    filename: &str,
) -> (invex_core::NormalizedRecord, ExtractionOutcome) {
    let document = match Document::read(path) {
        Ok(document) => document,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return (
                pipeline.degraded_record(filename),
                ExtractionOutcome::DocumentUnreadable(e.to_string()),
            );
        }
    };

    match pipeline.process_with_outcome(&document).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Failed to open {}: {}", filename, e);
            (
                pipeline.degraded_record(filename),
                ExtractionOutcome::DocumentUnreadable(e.to_string()),
            )
        }
    }
}

fn print_summary(files: &[PathBuf], outcomes: &[ExtractionOutcome], start: Instant) {
    let extracted = outcomes.iter().filter(|o| o.is_extracted()).count();
    let degraded = outcomes.len() - extracted;

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} extracted, {} with empty rows",
        style(extracted).green(),
        style(degraded).red()
    );

    if degraded > 0 {
        println!();
        println!("{}", style("Empty rows:").red());
        for (path, outcome) in files.iter().zip(outcomes) {
            if !outcome.is_extracted() {
                println!("  - {}: {}", file_name(path), outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_pdfs_is_sorted_case_insensitive_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.PDF", "c.Pdf", "notes.txt", "scan.pdf.bak"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d.pdf"), b"x").unwrap();

        let names: Vec<String> = list_pdfs(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf", "c.Pdf"]);
    }
}
