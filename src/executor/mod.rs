//! Build execution
//!
//! Runs a resolved [`BuildPlan`]: optionally wipes the output directory, then
//! compiles and copies assets concurrently.
//!
//! The two concurrent steps are joined with `try_join!`. When one fails the
//! join returns at once and the other is not cancelled: an esbuild child
//! process keeps running and a blocking copy keeps writing until it finishes.
//! They write disjoint files, so a half-finished sibling never corrupts the
//! other's output.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::assets::{AssetCopier, CopyJob};
use crate::bundler::{BundleReport, Bundler};
use crate::plan::{AssetPlan, BuildPlan};
use crate::utils::{absolutize, relative_path};

/// Result of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub bundle: BundleReport,
    pub assets_copied: usize,
}

/// Runs build plans against a bundler and an asset copier
pub struct BuildExecutor<B, C> {
    bundler: B,
    copier: C,
    cwd: PathBuf,
}

impl<B: Bundler, C: AssetCopier> BuildExecutor<B, C> {
    pub fn new(bundler: B, copier: C, cwd: impl Into<PathBuf>) -> Self {
        Self {
            bundler,
            copier,
            cwd: cwd.into(),
        }
    }

    /// Execute `plan`, wiping the output directory first when `clean` is set
    pub async fn execute(&self, plan: &BuildPlan, clean: bool) -> Result<BuildReport> {
        if clean {
            clean_dir(&absolutize(&self.cwd, &plan.out_dir))?;
        }

        let job = self.copy_job(&plan.assets);
        debug!(
            "Running {} and asset copy into {}",
            self.bundler.name(),
            job.destination().display()
        );

        let (bundle, assets_copied) = tokio::try_join!(
            self.bundler.bundle(&plan.bundler),
            self.copier.copy(&job),
        )?;

        Ok(BuildReport {
            bundle,
            assets_copied,
        })
    }

    /// Turn the asset plan into a copy job rooted at the base directory
    fn copy_job(&self, assets: &AssetPlan) -> CopyJob {
        let base_dir = absolutize(&self.cwd, &assets.base_dir);
        let out_dir = absolutize(&self.cwd, &assets.out_dir);
        let target = relative_path(&base_dir, &out_dir).unwrap_or(out_dir);

        CopyJob {
            base_dir,
            target,
            patterns: assets.patterns.clone(),
        }
    }
}

/// Remove a directory tree; a missing directory is fine
pub fn clean_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            info!("Cleaned {}", dir.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to clean output directory: {}", dir.display()))
        }
    }
}
