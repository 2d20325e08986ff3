//! Schema command - list, show and export extraction schemas.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use invex_core::models::schema::BUILTIN_SCHEMAS;
use invex_core::ExtractionSchema;

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    command: SchemaCommand,
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// List built-in schemas
    List,

    /// Print a built-in schema as JSON
    Show {
        /// Schema name
        name: String,
    },

    /// Write a built-in schema to a file as a starting point for a custom one
    Export {
        /// Schema name
        name: String,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
}

pub fn run(args: SchemaArgs) -> anyhow::Result<()> {
    match args.command {
        SchemaCommand::List => list_schemas(),
        SchemaCommand::Show { name } => show_schema(&name),
        SchemaCommand::Export { name, output } => export_schema(&name, &output),
    }
}

fn list_schemas() -> anyhow::Result<()> {
    for name in BUILTIN_SCHEMAS {
        let schema = ExtractionSchema::builtin(name)?;
        println!(
            "{:<12} {:>2} fields  {}",
            style(schema.name()).bold(),
            schema.fields().len(),
            schema.description()
        );
    }
    Ok(())
}

fn show_schema(name: &str) -> anyhow::Result<()> {
    let schema = ExtractionSchema::builtin(name)?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn export_schema(name: &str, output: &Path) -> anyhow::Result<()> {
    let schema = ExtractionSchema::builtin(name)?;
    std::fs::write(output, serde_json::to_string_pretty(&schema)?)?;
    println!(
        "{} Wrote schema '{}' to {}",
        style("✓").green(),
        name,
        output.display()
    );
    Ok(())
}
