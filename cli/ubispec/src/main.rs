//! UbiSpec CLI — validate spec documents and derive artifacts.

mod commands;
mod loader;
mod manifest;

use std::process;

use clap::{Parser, Subcommand};

use manifest::UbispecManifest;

#[derive(Parser)]
#[command(name = "ubispec", version, about = "Behavioral specs for event-sourced domain models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new UbiSpec project
    Init {
        /// Project name
        name: String,
    },
    /// Validate every spec document of the project
    Validate {
        /// Report format (human, json)
        #[arg(long)]
        format: Option<String>,
        /// Treat advisory issues as failures
        #[arg(long)]
        strict: bool,
    },
    /// Derive an artifact from the validated spec set
    Derive {
        /// Artifact kind (decision-table, scenarios, checklist, trace, topology, deps, catalog)
        #[arg(long)]
        artifact: String,
        /// Subject decider (for decision-table, scenarios, checklist, trace)
        #[arg(long)]
        subject: Option<String>,
        /// Subject command (for decision-table, scenarios, trace)
        #[arg(long)]
        command: Option<String>,
        /// Output format (md, json)
        #[arg(long)]
        format: Option<String>,
        /// Include the all-constraints-violated row in tables
        #[arg(long)]
        all_fail_row: bool,
        /// Write output to this path instead of stdout
        #[arg(long)]
        out: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name } => commands::init::run(&name),

        Commands::Validate { format, strict } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::validate::run(&project_dir, manifest.as_ref(), format.as_deref(), strict)
        }

        Commands::Derive {
            artifact,
            subject,
            command,
            format,
            all_fail_row,
            out,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::derive::run(
                &project_dir,
                manifest.as_ref(),
                &artifact,
                subject.as_deref(),
                command.as_deref(),
                format.as_deref(),
                all_fail_row,
                out.as_deref(),
            )
        }
    }
}

fn load_manifest_optional(
    cwd: &std::path::Path,
) -> anyhow::Result<(Option<UbispecManifest>, Option<std::path::PathBuf>)> {
    match UbispecManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
