//! Compilation step
//!
//! The executor talks to the bundler through the [`Bundler`] trait; the
//! shipped implementation drives the esbuild binary.

mod esbuild;

use anyhow::Result;
use async_trait::async_trait;

use crate::plan::BundlerOptions;

pub use esbuild::{render_args, EsbuildBundler};

/// Outcome of a compilation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleReport {
    /// Number of entry points handed to the bundler
    pub entry_points: usize,
}

/// Compiles the plan's entry points to disk
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundler name for logging
    fn name(&self) -> &str;

    /// Compile every entry point in `options`
    async fn bundle(&self, options: &BundlerOptions) -> Result<BundleReport>;
}
