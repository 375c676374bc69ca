//! Asset copying
//!
//! Copies non-source files from the asset base directory into the output
//! directory, keeping their layout. Patterns follow the usual glob rules;
//! a leading `!` turns a pattern into an exclusion.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::to_slash;

/// One concrete copy job
#[derive(Debug, Clone, PartialEq)]
pub struct CopyJob {
    /// Directory patterns are matched against
    pub base_dir: PathBuf,
    /// Destination, relative to `base_dir`
    pub target: PathBuf,
    pub patterns: Vec<String>,
}

impl CopyJob {
    /// Absolute destination directory
    pub fn destination(&self) -> PathBuf {
        crate::utils::absolutize(&self.base_dir, &self.target)
    }
}

/// Copies asset files for a build
#[async_trait]
pub trait AssetCopier: Send + Sync {
    /// Copy every matching file, returning how many were copied
    async fn copy(&self, job: &CopyJob) -> Result<usize>;
}

/// Positive and negated patterns compiled into glob sets
#[derive(Debug, Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: GlobSet,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for pattern in patterns {
            let (builder, glob) = match pattern.strip_prefix('!') {
                Some(negated) => (&mut exclude, negated),
                None => (&mut include, pattern.as_str()),
            };
            let glob = GlobBuilder::new(glob)
                .literal_separator(true)
                .build()
                .with_context(|| format!("Invalid asset pattern: {}", pattern))?;
            builder.add(glob);
        }

        Ok(Self {
            include: include.build().context("Failed to compile asset patterns")?,
            exclude: exclude.build().context("Failed to compile asset patterns")?,
        })
    }

    /// Whether a path relative to the base directory should be copied
    pub fn is_match(&self, rel: &Path) -> bool {
        let rel = to_slash(rel);
        self.include.is_match(&rel) && !self.exclude.is_match(&rel)
    }
}

/// Copies files on the local file system
#[derive(Debug, Clone, Default)]
pub struct FsCopier;

impl FsCopier {
    /// Blocking copy, run off the async runtime
    pub fn copy_blocking(job: &CopyJob) -> Result<usize> {
        let patterns = PatternSet::new(&job.patterns)?;

        if !job.base_dir.is_dir() {
            debug!("Asset directory {} does not exist", job.base_dir.display());
            return Ok(0);
        }

        let destination = job.destination();

        // Collect before copying so files written below the base directory
        // are never picked up again.
        let matches: Vec<PathBuf> = WalkDir::new(&job.base_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&job.base_dir)
                    .ok()
                    .map(Path::to_path_buf)
            })
            .filter(|rel| patterns.is_match(rel))
            .collect();

        for rel in &matches {
            let from = job.base_dir.join(rel);
            let to = destination.join(rel);

            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            fs::copy(&from, &to).with_context(|| {
                format!("Failed to copy {} to {}", from.display(), to.display())
            })?;
        }

        Ok(matches.len())
    }
}

#[async_trait]
impl AssetCopier for FsCopier {
    async fn copy(&self, job: &CopyJob) -> Result<usize> {
        let job = job.clone();
        let copied = tokio::task::spawn_blocking(move || Self::copy_blocking(&job))
            .await
            .context("Asset copy task panicked")??;

        info!("Copied {} asset(s)", copied);
        Ok(copied)
    }
}
