//! esbuild process driver

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{BundleReport, Bundler};
use crate::plan::BundlerOptions;

/// Options whose array values become one `--flag:value` per element
const REPEATED_FLAGS: &[&str] = &["external", "inject", "drop", "pure"];

/// Runs the esbuild binary once per build
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    binary: PathBuf,
    cwd: PathBuf,
}

impl EsbuildBundler {
    pub fn new(binary: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            cwd: cwd.into(),
        }
    }

    /// Pick the esbuild binary for a project
    ///
    /// An explicit path wins, then the nearest `node_modules/.bin/esbuild`,
    /// then whatever `esbuild` resolves to on `PATH`.
    pub fn locate(cwd: &Path, explicit: Option<&Path>) -> Self {
        let binary = explicit
            .map(Path::to_path_buf)
            .or_else(|| {
                let name = if cfg!(windows) { "esbuild.cmd" } else { "esbuild" };
                cwd.ancestors()
                    .map(|dir| dir.join("node_modules").join(".bin").join(name))
                    .find(|candidate| candidate.is_file())
            })
            .unwrap_or_else(|| PathBuf::from("esbuild"));

        Self::new(binary, cwd)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl Bundler for EsbuildBundler {
    fn name(&self) -> &str {
        "esbuild"
    }

    async fn bundle(&self, options: &BundlerOptions) -> Result<BundleReport> {
        if options.entry_points.is_empty() {
            warn!("No entry points to compile");
            return Ok(BundleReport::default());
        }

        if !options.plugins.is_empty() {
            warn!(
                "Ignoring {} esbuild plugin(s): plugins cannot be passed to the esbuild binary",
                options.plugins.len()
            );
        }

        let args = render_args(options);
        info!("Compiling {} entry point(s)", options.entry_points.len());
        debug!("{} {}", self.binary.display(), args.join(" "));

        let status = Command::new(&self.binary)
            .args(&args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to run esbuild at {}", self.binary.display()))?;

        if !status.success() {
            bail!("esbuild failed with {}", status);
        }

        Ok(BundleReport {
            entry_points: options.entry_points.len(),
        })
    }
}

/// Build the esbuild command line for a plan
///
/// Starts from a non-bundling, node-targeted CommonJS build; the plan's
/// options are laid over it, so anything the user passes through wins.
pub fn render_args(options: &BundlerOptions) -> Vec<String> {
    let mut merged = Map::new();
    merged.insert("bundle".into(), Value::Bool(false));
    merged.insert("format".into(), Value::String("cjs".into()));
    merged.insert("platform".into(), Value::String("node".into()));
    merged.extend(options.to_option_map());

    let mut args = Vec::new();
    for (key, value) in &merged {
        push_flag(&mut args, key, value);
    }
    args.extend(options.entry_points.iter().cloned());
    args
}

fn push_flag(args: &mut Vec<String>, key: &str, value: &Value) {
    let flag = kebab_case(key);

    match value {
        Value::Null => {}
        // esbuild has no `--sourcemap=false`; leaving it out disables maps
        Value::Bool(false) if key == "sourcemap" => {}
        Value::Bool(true) => args.push(format!("--{flag}")),
        Value::Bool(false) => args.push(format!("--{flag}=false")),
        Value::String(s) => args.push(format!("--{flag}={s}")),
        Value::Number(n) => args.push(format!("--{flag}={n}")),
        Value::Array(items) if REPEATED_FLAGS.contains(&key) => {
            for item in items {
                args.push(format!("--{flag}:{}", scalar(item)));
            }
        }
        Value::Array(items) => {
            let joined = items.iter().map(scalar).collect::<Vec<_>>().join(",");
            args.push(format!("--{flag}={joined}"));
        }
        Value::Object(entries) => {
            for (k, v) in entries {
                args.push(format!("--{flag}:{k}={}", scalar(v)));
            }
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `keepNames` -> `keep-names`
fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
