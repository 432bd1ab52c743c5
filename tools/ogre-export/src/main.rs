//! ogre-export - DCC scene to Ogre asset export tool
//!
//! Reads a JSON scene snapshot and an export.toml, then writes mesh, skeleton
//! and material documents.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ogre_export::{ExportParams, Exporter, JsonSink, NodeId, SceneSnapshot, write_output};

#[derive(Parser)]
#[command(name = "ogre-export")]
#[command(about = "Ogre asset export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene snapshot
    Export {
        /// Scene snapshot (JSON)
        scene: PathBuf,

        /// Path to export.toml (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Resource name (defaults to the scene file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Export only these nodes (by name); all mesh nodes by default
        #[arg(long = "node")]
        nodes: Vec<String>,
    },

    /// Validate an export.toml without exporting
    Check {
        /// Path to export.toml
        #[arg(default_value = "export.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            scene,
            config,
            output,
            name,
            nodes,
        } => {
            let params = match &config {
                Some(path) => ExportParams::load(path)?,
                None => ExportParams::default(),
            };
            params.validate()?;

            let mut snapshot = SceneSnapshot::load(&scene)?;
            let selection = select_nodes(&snapshot, &nodes)?;
            let name = match name {
                Some(name) => name,
                None => scene
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
                    .context("Cannot derive a resource name from the scene path")?,
            };

            tracing::info!("Exporting {:?} -> {:?}", scene, output);
            let result = Exporter::new(&params)
                .export(&mut snapshot, &name, &selection)
                .with_context(|| format!("Export of {:?} failed", scene))?;

            let mut sink = JsonSink::new(&output)?;
            write_output(&mut sink, &name, &result)?;

            if result.report.is_clean() {
                tracing::info!("Done!");
            } else {
                for message in &result.report.errors {
                    tracing::error!("{}", message);
                }
                tracing::warn!(
                    "Done with {} warnings, {} errors, {} skipped clips",
                    result.report.warnings.len(),
                    result.report.errors.len(),
                    result.report.skipped_clips.len()
                );
            }
        }

        Commands::Check { config } => {
            tracing::info!("Checking export config {:?}", config);
            let params = ExportParams::load(&config)?;
            params.validate()?;
            tracing::info!("Export config is valid!");
        }
    }

    Ok(())
}

fn select_nodes(snapshot: &SceneSnapshot, names: &[String]) -> Result<Vec<NodeId>> {
    if names.is_empty() {
        return Ok(snapshot.mesh_nodes());
    }
    let mut nodes = Vec::with_capacity(names.len());
    for name in names {
        match snapshot.find(name) {
            Some(node) => nodes.push(node),
            None => bail!("Node '{}' not found in scene", name),
        }
    }
    Ok(nodes)
}
