//! Build command implementation

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::assets::FsCopier;
use crate::bundler::EsbuildBundler;
use crate::cli::Cli;
use crate::config::UserConfig;
use crate::executor::{BuildExecutor, BuildReport};
use crate::plan::BuildPlan;
use crate::tsconfig::CompilerConfig;
use crate::utils::non_empty;

/// Build options derived from command arguments
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub config: Option<PathBuf>,
    pub clean: Option<bool>,
    pub esbuild: Option<PathBuf>,
}

impl From<&Cli> for BuildOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            clean: cli.clean,
            esbuild: cli.esbuild.clone(),
        }
    }
}

/// Load configuration, resolve the plan and run it
pub async fn run_build(options: &BuildOptions, cwd: &Path) -> Result<BuildReport> {
    let user = UserConfig::discover(cwd, options.config.as_deref());
    let compiler = CompilerConfig::load(cwd, non_empty(user.ts_config_file.as_deref()))?;

    info!("Loaded {}", compiler.config_file.display());

    let plan = BuildPlan::resolve(&user, &compiler);
    let clean = options.clean.unwrap_or(false);

    let bundler = EsbuildBundler::locate(cwd, options.esbuild.as_deref());
    info!("Using esbuild at {}", bundler.binary().display());
    let executor = BuildExecutor::new(bundler, FsCopier, cwd);

    executor.execute(&plan, clean).await
}
