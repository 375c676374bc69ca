//! Build plan resolution
//!
//! Merges the compiler config, the user config and CLI flags into a single
//! [`BuildPlan`]. Nothing downstream applies defaults: every value the
//! executor reads is decided here.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::config::{EsTarget, UserConfig};
use crate::tsconfig::CompilerConfig;
use crate::utils::{non_empty, to_slash};

/// Output directory used when neither config names one
pub const DEFAULT_OUT_DIR: &str = "dist";

/// Asset base directory used when the user config names none
pub const DEFAULT_ASSET_BASE_DIR: &str = "src";

/// Module format used when the user config names none
pub const DEFAULT_FORMAT: &str = "cjs";

/// Language level used when neither config names one
pub const DEFAULT_TARGET: &str = "es6";

/// Appended to every asset pattern list so compiled sources are never copied
pub const SOURCE_EXCLUSION_PATTERN: &str = "!**/*.{ts,js,tsx,jsx}";

/// How esbuild should emit source maps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMapMode {
    Disabled,
    Enabled,
    Inline,
}

impl SourceMapMode {
    /// Map tsconfig's source map flags onto an esbuild mode
    pub fn from_flags(source_map: bool, inline_sources: bool, inline_source_map: bool) -> Self {
        // inlineSources needs a map to inline into
        if inline_sources && !inline_source_map && !source_map {
            return SourceMapMode::Disabled;
        }

        // tsc rejects the combination; emit nothing rather than pick one
        if source_map && inline_source_map {
            return SourceMapMode::Disabled;
        }

        if inline_source_map {
            return SourceMapMode::Inline;
        }

        if source_map {
            SourceMapMode::Enabled
        } else {
            SourceMapMode::Disabled
        }
    }

    /// Value of esbuild's `sourcemap` option
    pub fn to_value(self) -> Value {
        match self {
            SourceMapMode::Disabled => Value::Bool(false),
            SourceMapMode::Enabled => Value::Bool(true),
            SourceMapMode::Inline => Value::String("inline".to_string()),
        }
    }
}

/// Fully resolved esbuild options
#[derive(Debug, Clone, PartialEq)]
pub struct BundlerOptions {
    pub outdir: String,
    pub entry_points: Vec<String>,
    pub sourcemap: SourceMapMode,
    pub target: EsTarget,
    pub minify: bool,
    pub plugins: Vec<Value>,
    pub tsconfig: PathBuf,
    pub format: String,
    /// Pass-through options, applied over everything above
    pub extra: Map<String, Value>,
}

impl BundlerOptions {
    /// Option map in esbuild's naming, with pass-through options applied last
    pub fn to_option_map(&self) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("outdir".into(), Value::String(self.outdir.clone()));
        options.insert("sourcemap".into(), self.sourcemap.to_value());
        options.insert("target".into(), Value::String(self.target.to_flag_value()));
        options.insert("minify".into(), Value::Bool(self.minify));
        options.insert("tsconfig".into(), Value::String(to_slash(&self.tsconfig)));
        options.insert("format".into(), Value::String(self.format.clone()));

        for (key, value) in &self.extra {
            options.insert(key.clone(), value.clone());
        }

        options
    }
}

/// Fully resolved asset copy job
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPlan {
    pub base_dir: PathBuf,
    pub out_dir: PathBuf,
    pub patterns: Vec<String>,
}

/// Everything the executor needs to run a build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildPlan {
    pub out_dir: PathBuf,
    pub bundler: BundlerOptions,
    pub assets: AssetPlan,
}

impl BuildPlan {
    /// Resolve a plan from the user config and the compiler config
    pub fn resolve(user: &UserConfig, compiler: &CompilerConfig) -> Self {
        let out_dir = non_empty(user.out_dir.as_deref())
            .map(PathBuf::from)
            .or_else(|| compiler.options.out_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));

        let esbuild = user.esbuild.clone().unwrap_or_default();

        let mut entry_points: Vec<String> = compiler
            .file_names
            .iter()
            .map(|f| to_slash(f))
            .collect();
        entry_points.extend(esbuild.entry_points.unwrap_or_default());

        let options = &compiler.options;
        let sourcemap = SourceMapMode::from_flags(
            options.source_map.unwrap_or(false),
            options.inline_sources.unwrap_or(false),
            options.inline_source_map.unwrap_or(false),
        );

        let target = esbuild
            .target
            .filter(|t| !t.is_empty())
            .or_else(|| {
                non_empty(compiler.raw_target()).map(|t| EsTarget::One(t.to_string()))
            })
            .unwrap_or_else(|| EsTarget::One(DEFAULT_TARGET.to_string()));

        let bundler = BundlerOptions {
            outdir: to_slash(&out_dir),
            entry_points,
            sourcemap,
            target,
            minify: esbuild.minify.unwrap_or(false),
            plugins: esbuild.plugins.unwrap_or_default(),
            tsconfig: compiler.config_file.clone(),
            format: esbuild.format.unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            extra: esbuild.extra,
        };

        let assets_config = user.assets.clone().unwrap_or_default();
        let mut patterns = assets_config
            .file_patterns
            .unwrap_or_else(|| vec!["**".to_string()]);
        patterns.push(SOURCE_EXCLUSION_PATTERN.to_string());

        let assets = AssetPlan {
            base_dir: non_empty(assets_config.base_dir.as_deref())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_BASE_DIR)),
            out_dir: non_empty(assets_config.out_dir.as_deref())
                .map(PathBuf::from)
                .unwrap_or_else(|| out_dir.clone()),
            patterns,
        };

        Self {
            out_dir,
            bundler,
            assets,
        }
    }
}
