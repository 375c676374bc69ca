//! Command-line interface for esbn
//!
//! esbn has a single job, so there are no subcommands: the flags describe one
//! build of the project in the current directory.

mod build;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::utils::format_duration;

pub use build::{run_build, BuildOptions};

/// Compile a TypeScript project with esbuild and copy its assets
#[derive(Parser, Debug)]
#[command(name = "esbn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file (defaults to esbn.config.json, then etsc.config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Clean the output directory before building
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub clean: Option<bool>,

    /// Path to the esbuild binary
    #[arg(long, env = "ESBN_ESBUILD")]
    pub esbuild: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Run the build in the current directory
    pub async fn execute(&self) -> Result<()> {
        let start = Instant::now();
        let cwd = std::env::current_dir().context("Failed to read the current directory")?;

        eprintln!("{} Building project...", "→".blue());

        let report = run_build(&BuildOptions::from(self), &cwd).await?;

        eprintln!(
            "{} Built in {} {}",
            "✓".green().bold(),
            format_duration(start.elapsed()),
            format!(
                "({} entry point(s), {} asset(s))",
                report.bundle.entry_points, report.assets_copied
            )
            .dimmed()
        );

        Ok(())
    }
}
