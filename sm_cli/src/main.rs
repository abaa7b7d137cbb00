use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;

use sm_simfile::{parse_simfile, simfile_to_sm, simfile_to_ssc, Simfile};

#[derive(Debug, Parser)]
#[command(name = "sm_cli")]
#[command(about = "SM/SSC simfile toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a simfile to the other dialect (sm <-> ssc).
    Convert {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply the `make` script from a metadata side file to a simfile.
    Apply {
        simfile: PathBuf,
        /// Metadata file; defaults to __metadata.yaml next to the simfile.
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Simfile-directory metadata side file; only the `make` key matters here.
#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(default)]
    make: Option<serde_yaml::Value>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert { input, output } => convert(&input, output),
        Command::Apply {
            simfile,
            data,
            output,
        } => apply(&simfile, data, output),
    }
}

fn load_simfile(path: &Path) -> anyhow::Result<Simfile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read simfile: {}", path.display()))?;
    parse_simfile(&text)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("failed to parse simfile: {}", path.display()))
}

fn default_output_path(input: &Path, extension: &str) -> PathBuf {
    let mut out = input.to_path_buf();
    out.set_extension(extension);
    out
}

fn convert(input: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let simfile = load_simfile(input)?;

    let to_sm = input.extension().is_some_and(|e| e == "ssc");
    let extension = if to_sm { "sm" } else { "ssc" };
    let text = if to_sm {
        simfile_to_sm(&simfile)
    } else {
        simfile_to_ssc(&simfile)
    }
    .map_err(|e| anyhow::anyhow!(e.to_string()))
    .with_context(|| format!("failed to convert: {}", input.display()))?;

    let out_path = output.unwrap_or_else(|| default_output_path(input, extension));
    fs::write(&out_path, text).with_context(|| format!("failed to write: {}", out_path.display()))?;
    Ok(())
}

fn apply(path: &Path, data: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut simfile = load_simfile(path)?;

    let data_path = data.unwrap_or_else(|| path.with_file_name("__metadata.yaml"));
    let meta_text = fs::read_to_string(&data_path)
        .with_context(|| format!("failed to read metadata: {}", data_path.display()))?;
    let metadata: Metadata = serde_yaml::from_str(&meta_text)
        .with_context(|| format!("failed to parse metadata: {}", data_path.display()))?;

    let Some(document) = metadata.make else {
        log::info!("no make data specified");
        return Ok(());
    };

    let commands = sm_make::parse_commands(&document)
        .map_err(|e| anyhow::anyhow!("failed to parse make data:\n{e}"))?;
    let mut manager = sm_make::Manager::new();
    manager
        .run_many(&commands, &mut simfile)
        .map_err(|e| anyhow::anyhow!("failed to run command:\n{e}"))?;

    let out_path = output.unwrap_or_else(|| path.to_path_buf());
    let text = simfile_to_ssc(&simfile).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    fs::write(&out_path, text)
        .with_context(|| format!("failed to write: {}", out_path.display()))?;
    Ok(())
}
