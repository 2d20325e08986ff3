//! Subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod process;
pub mod schema;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::{debug, info};

use invex_core::models::config::InvexConfig;
use invex_core::ocr::{backend_from_config, OcrBackend};
use invex_core::{ExtractionPipeline, ExtractionSchema, OpenAiClient};

/// The pipeline as wired by the CLI.
pub type Pipeline = ExtractionPipeline<Box<dyn OcrBackend>, OpenAiClient>;

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// Load the config from `--config`, else the default path, else defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<InvexConfig> {
    match path {
        Some(path) => Ok(InvexConfig::from_file(path)?),
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                debug!("Using config file {}", default_path.display());
                Ok(InvexConfig::from_file(&default_path)?)
            } else {
                Ok(InvexConfig::default())
            }
        }
    }
}

/// Schema chosen on the command line.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct SchemaSelection {
    /// Built-in schema name (see `invex schema list`)
    #[arg(short, long)]
    schema: Option<String>,

    /// Custom schema JSON file
    #[arg(long)]
    schema_file: Option<PathBuf>,
}

impl SchemaSelection {
    pub fn load(&self) -> anyhow::Result<ExtractionSchema> {
        match (&self.schema, &self.schema_file) {
            (_, Some(path)) => ExtractionSchema::from_file(path)
                .with_context(|| format!("Failed to load schema from {}", path.display())),
            (Some(name), None) => Ok(ExtractionSchema::builtin(name)?),
            (None, None) => anyhow::bail!("No schema selected"),
        }
    }
}

/// Build the OCR backend and LLM client and wire them into a pipeline.
///
/// `api_key` comes from [`InvexConfig::validate`], which must run first.
pub fn build_pipeline(
    config: &InvexConfig,
    schema: ExtractionSchema,
    api_key: String,
) -> anyhow::Result<Pipeline> {
    let ocr = backend_from_config(&config.ocr)?;
    let llm = OpenAiClient::from_config(&config.llm, api_key)?;

    info!(
        "Using {} OCR and model {} for schema '{}'",
        ocr.name(),
        config.llm.model,
        schema.name()
    );

    Ok(ExtractionPipeline::new(schema, ocr, llm).with_max_pages(config.pdf.max_pages))
}
