//! Writers for batch results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use serde_json::Value;

use invex_core::{ExtractionOutcome, NormalizedRecord, ResultSet};

/// Spreadsheet format for batch output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Excel workbook, one row per document
    Xlsx,
    /// Comma-separated values, one row per document
    Csv,
    /// JSON run report with per-document outcomes
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Write the result set as CSV: schema fields in declared order, then the
/// source file column.
pub fn write_csv<W: Write>(writer: W, results: &ResultSet, file_column: &str) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(results.headers(file_column))?;
    for row in results.rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the result set as a single-sheet workbook with the same columns as
/// the CSV output. Numbers and booleans become typed cells; nulls stay empty.
pub fn write_xlsx<W: Write>(
    mut writer: W,
    results: &ResultSet,
    file_column: &str,
) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();

        for (col, header) in results.headers(file_column).iter().enumerate() {
            sheet.write_string(0, col as u16, header.as_str())?;
        }

        for (idx, record) in results.records().iter().enumerate() {
            let row = idx as u32 + 1;
            let mut col: u16 = 0;
            for (_, value) in record.iter() {
                match value {
                    Value::Null => {}
                    Value::Bool(b) => {
                        sheet.write_boolean(row, col, *b)?;
                    }
                    Value::Number(n) => match n.as_f64() {
                        Some(f) => {
                            sheet.write_number(row, col, f)?;
                        }
                        None => {
                            sheet.write_string(row, col, n.to_string())?;
                        }
                    },
                    Value::String(s) => {
                        sheet.write_string(row, col, s.as_str())?;
                    }
                    other => {
                        sheet.write_string(row, col, other.to_string())?;
                    }
                }
                col += 1;
            }
            if let Some(source) = &record.source_file {
                sheet.write_string(row, col, source.as_str())?;
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Report<'a> {
    schema: &'a str,
    generated_at: String,
    total: usize,
    extracted: usize,
    documents: Vec<ReportEntry<'a>>,
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    record: &'a NormalizedRecord,
    outcome: &'a ExtractionOutcome,
}

/// Write the result set as a JSON report including each document's outcome.
///
/// `outcomes` is parallel to the records of `results`.
pub fn write_json<W: Write>(
    mut writer: W,
    results: &ResultSet,
    outcomes: &[ExtractionOutcome],
) -> anyhow::Result<()> {
    let report = Report {
        schema: results.schema().name(),
        generated_at: Utc::now().to_rfc3339(),
        total: results.len(),
        extracted: outcomes.iter().filter(|o| o.is_extracted()).count(),
        documents: results
            .records()
            .iter()
            .zip(outcomes)
            .map(|(record, outcome)| ReportEntry { record, outcome })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.flush()?;
    Ok(())
}

/// Open `path` for writing, or stdout when no path is given.
pub fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(io::BufWriter::new(File::create(path)?))),
        None => Ok(Box::new(io::stdout().lock())),
    }
}
