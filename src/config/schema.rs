//! Configuration schema definitions

use serde::Deserialize;
use serde_json::{Map, Value};

/// User override file contents
///
/// Every field is optional; a missing field defers to `tsconfig.json` or to
/// the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    /// Output directory
    #[serde(default)]
    pub out_dir: Option<String>,

    /// Accepted for compatibility; only `--clean` removes the output directory
    #[serde(default)]
    pub clean: Option<bool>,

    /// Name or path of the compiler config to look up
    #[serde(default)]
    pub ts_config_file: Option<String>,

    /// Options forwarded to esbuild
    #[serde(default)]
    pub esbuild: Option<EsbuildConfig>,

    /// Asset copy settings
    #[serde(default)]
    pub assets: Option<AssetsConfig>,
}

/// esbuild option bag
///
/// The fields the build plan computes defaults for are broken out; anything
/// else lands in `extra` and is forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsbuildConfig {
    #[serde(default)]
    pub entry_points: Option<Vec<String>>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub minify: Option<bool>,

    #[serde(default)]
    pub target: Option<EsTarget>,

    #[serde(default)]
    pub plugins: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// esbuild accepts either one target or a list of them
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EsTarget {
    One(String),
    Many(Vec<String>),
}

impl EsTarget {
    /// Whether the target carries no usable value
    pub fn is_empty(&self) -> bool {
        match self {
            EsTarget::One(t) => t.is_empty(),
            EsTarget::Many(ts) => ts.is_empty(),
        }
    }

    /// Value as passed to esbuild's `--target`
    pub fn to_flag_value(&self) -> String {
        match self {
            EsTarget::One(t) => t.to_lowercase(),
            EsTarget::Many(ts) => ts
                .iter()
                .map(|t| t.to_lowercase())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Asset copy configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsConfig {
    /// Directory assets are copied from
    #[serde(default)]
    pub base_dir: Option<String>,

    /// Directory assets are copied to
    #[serde(default)]
    pub out_dir: Option<String>,

    /// Glob patterns, `!` negates
    #[serde(default)]
    pub file_patterns: Option<Vec<String>>,
}
