//! Compiler configuration loading
//!
//! Finds the project's `tsconfig.json`, follows its `extends` chain and
//! resolves the compiler options and source file list the build needs.

mod files;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::utils::absolutize;

pub use files::{FileSpecs, SpecList};

/// Compiler config file name looked up by default
pub const DEFAULT_TSCONFIG: &str = "tsconfig.json";

/// Compiler options holding paths that resolve against the declaring config
const PATH_OPTIONS: &[&str] = &[
    "outDir",
    "rootDir",
    "baseUrl",
    "declarationDir",
    "outFile",
    "tsBuildInfoFile",
];

pub type Result<T> = std::result::Result<T, TsConfigError>;

/// Errors raised while loading a compiler config
#[derive(Debug, Error)]
pub enum TsConfigError {
    #[error("{file_name} not found in the current directory! {}", cwd.display())]
    NotFound { file_name: String, cwd: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("cannot find base config '{spec}' extended by {}", from.display())]
    ExtendsNotFound { spec: String, from: PathBuf },

    #[error("circular 'extends' chain through {}", .0.display())]
    CircularExtends(PathBuf),
}

/// Compiler options after `extends` merging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOptions {
    /// Declared output directory, absolute
    pub out_dir: Option<PathBuf>,
    pub declaration_dir: Option<PathBuf>,
    pub source_map: Option<bool>,
    pub inline_sources: Option<bool>,
    pub inline_source_map: Option<bool>,
    pub allow_js: Option<bool>,
}

impl CompilerOptions {
    fn from_map(raw: &Map<String, Value>) -> Self {
        let flag = |key: &str| raw.get(key).and_then(Value::as_bool);
        let path = |key: &str| raw.get(key).and_then(Value::as_str).map(PathBuf::from);

        Self {
            out_dir: path("outDir"),
            declaration_dir: path("declarationDir"),
            source_map: flag("sourceMap"),
            inline_sources: flag("inlineSources"),
            inline_source_map: flag("inlineSourceMap"),
            allow_js: flag("allowJs"),
        }
    }
}

/// A fully resolved compiler configuration
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Location of the config file that was found
    pub config_file: PathBuf,

    /// Merged compiler options
    pub options: CompilerOptions,

    /// Source files covered by the config, absolute
    pub file_names: Vec<PathBuf>,

    /// Top-level document as written, before `extends` merging
    pub raw: Value,
}

impl CompilerConfig {
    /// Find and load the compiler config for `cwd`
    ///
    /// `file_name` overrides [`DEFAULT_TSCONFIG`]. A missing config is fatal:
    /// the source file list cannot be determined without it.
    pub fn load(cwd: &Path, file_name: Option<&str>) -> Result<Self> {
        let file_name = file_name.unwrap_or(DEFAULT_TSCONFIG);
        let config_file =
            find_config_file(cwd, file_name).ok_or_else(|| TsConfigError::NotFound {
                file_name: file_name.to_string(),
                cwd: cwd.to_path_buf(),
            })?;

        debug!("Using compiler config {}", config_file.display());
        Self::from_file(&config_file, cwd)
    }

    /// Load a specific config file, resolving top-level paths against `base_dir`
    pub fn from_file(config_file: &Path, base_dir: &Path) -> Result<Self> {
        let raw = read_json(config_file)?;
        let mut visiting = HashSet::new();
        let layer = Layer::resolve(config_file, &raw, base_dir, &mut visiting)?;

        let options = CompilerOptions::from_map(&layer.compiler_options);
        let specs = FileSpecs::new(base_dir, layer.files, layer.include, layer.exclude, &options);
        let file_names = specs.expand(options.allow_js.unwrap_or(false));

        debug!("Compiler config covers {} file(s)", file_names.len());

        Ok(Self {
            config_file: config_file.to_path_buf(),
            options,
            file_names,
            raw,
        })
    }

    /// `compilerOptions.target` exactly as the top-level file declares it
    pub fn raw_target(&self) -> Option<&str> {
        self.raw
            .get("compilerOptions")
            .and_then(|opts| opts.get("target"))
            .and_then(Value::as_str)
    }
}

/// Search `cwd` and its ancestors for `file_name`
pub fn find_config_file(cwd: &Path, file_name: &str) -> Option<PathBuf> {
    let name = Path::new(file_name);
    if name.is_absolute() {
        return name.is_file().then(|| name.to_path_buf());
    }

    cwd.ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// One config file merged with everything it extends
#[derive(Debug, Default)]
struct Layer {
    compiler_options: Map<String, Value>,
    files: Option<SpecList>,
    include: Option<SpecList>,
    exclude: Option<SpecList>,
}

impl Layer {
    fn resolve(
        path: &Path,
        raw: &Value,
        base_dir: &Path,
        visiting: &mut HashSet<PathBuf>,
    ) -> Result<Self> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !visiting.insert(key.clone()) {
            return Err(TsConfigError::CircularExtends(path.to_path_buf()));
        }

        let config_dir = path.parent().unwrap_or(base_dir);
        let mut layer = Layer::default();

        for spec in extends_specs(raw) {
            let base_path = resolve_extends(&spec, config_dir).ok_or_else(|| {
                TsConfigError::ExtendsNotFound {
                    spec: spec.clone(),
                    from: path.to_path_buf(),
                }
            })?;
            let base_raw = read_json(&base_path)?;
            let base_own_dir = base_path.parent().unwrap_or(config_dir).to_path_buf();
            let base = Layer::resolve(&base_path, &base_raw, &base_own_dir, visiting)?;
            layer.overlay(base);
        }

        layer.overlay(Layer::own(raw, base_dir));
        visiting.remove(&key);

        Ok(layer)
    }

    /// Settings declared directly in `raw`
    fn own(raw: &Value, base_dir: &Path) -> Self {
        let mut compiler_options = raw
            .get("compilerOptions")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        for key in PATH_OPTIONS {
            let resolved = match compiler_options.get(*key) {
                Some(Value::String(value)) => absolutize(base_dir, Path::new(value)),
                _ => continue,
            };
            compiler_options.insert(
                (*key).to_string(),
                Value::String(resolved.display().to_string()),
            );
        }

        let specs = |key: &str| {
            raw.get(key).and_then(Value::as_array).map(|items| SpecList {
                base: base_dir.to_path_buf(),
                patterns: items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            })
        };

        Self {
            compiler_options,
            files: specs("files"),
            include: specs("include"),
            exclude: specs("exclude"),
        }
    }

    fn overlay(&mut self, other: Layer) {
        self.compiler_options.extend(other.compiler_options);
        if other.files.is_some() {
            self.files = other.files;
        }
        if other.include.is_some() {
            self.include = other.include;
        }
        if other.exclude.is_some() {
            self.exclude = other.exclude;
        }
    }
}

fn extends_specs(raw: &Value) -> Vec<String> {
    match raw.get("extends") {
        Some(Value::String(spec)) => vec![spec.clone()],
        Some(Value::Array(specs)) => specs
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Locate the file an `extends` entry points at
fn resolve_extends(spec: &str, config_dir: &Path) -> Option<PathBuf> {
    let is_path = spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with('/')
        || Path::new(spec).is_absolute();

    if is_path {
        let path = absolutize(config_dir, Path::new(spec));
        return with_json_fallback(path);
    }

    config_dir.ancestors().find_map(|dir| {
        let package = dir.join("node_modules").join(spec);
        if package.is_file() {
            return Some(package);
        }
        let with_ext = PathBuf::from(format!("{}.json", package.display()));
        if with_ext.is_file() {
            return Some(with_ext);
        }
        let nested = package.join(DEFAULT_TSCONFIG);
        nested.is_file().then_some(nested)
    })
}

fn with_json_fallback(path: PathBuf) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path);
    }
    if path.extension().map_or(false, |ext| ext == "json") {
        return None;
    }
    let with_ext = PathBuf::from(format!("{}.json", path.display()));
    with_ext.is_file().then_some(with_ext)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|source| TsConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    json5::from_str(&content).map_err(|e| TsConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| crate::utils::to_slash(f.strip_prefix(root).unwrap()))
            .collect()
    }

    #[test]
    fn test_find_config_walks_upward() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tsconfig.json", "{}");
        fs::create_dir_all(dir.path().join("packages/api/src")).unwrap();

        let found = find_config_file(&dir.path().join("packages/api/src"), DEFAULT_TSCONFIG);
        assert_eq!(found, Some(dir.path().join("tsconfig.json")));
    }

    #[test]
    fn test_load_missing_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = CompilerConfig::load(dir.path(), Some("tsconfig.esbn-missing.json")).unwrap_err();

        assert!(matches!(err, TsConfigError::NotFound { .. }));
        assert!(err.to_string().contains("not found in the current directory!"));
    }

    #[test]
    fn test_load_options_and_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "tsconfig.json",
            r#"{
                // comments are allowed
                "compilerOptions": {
                    "outDir": "./build",
                    "sourceMap": true,
                    "target": "ES2019",
                },
                "include": ["src"]
            }"#,
        );
        write(root, "src/index.ts", "");
        write(root, "src/util/math.ts", "");
        write(root, "src/view.tsx", "");
        write(root, "src/legacy.js", "");
        write(root, "scripts/seed.ts", "");

        let config = CompilerConfig::load(root, None).unwrap();

        assert_eq!(config.options.out_dir, Some(root.join("build")));
        assert_eq!(config.options.source_map, Some(true));
        assert_eq!(config.options.inline_source_map, None);
        assert_eq!(config.raw_target(), Some("ES2019"));
        assert_eq!(
            relative(root, &config.file_names),
            vec!["src/index.ts", "src/view.tsx", "src/util/math.ts"]
        );
    }

    #[test]
    fn test_extends_relative_and_overrides() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "configs/base.json",
            r#"{
                "compilerOptions": { "outDir": "../out", "sourceMap": true, "target": "es2017" },
                "include": ["../src/**/*"]
            }"#,
        );
        write(
            root,
            "tsconfig.json",
            r#"{ "extends": "./configs/base", "compilerOptions": { "inlineSourceMap": true } }"#,
        );
        write(root, "src/main.ts", "");

        let config = CompilerConfig::load(root, None).unwrap();

        assert_eq!(config.options.out_dir, Some(root.join("out")));
        assert_eq!(config.options.source_map, Some(true));
        assert_eq!(config.options.inline_source_map, Some(true));
        // inherited target is not part of the top-level raw document
        assert_eq!(config.raw_target(), None);
        assert_eq!(relative(root, &config.file_names), vec!["src/main.ts"]);
    }

    #[test]
    fn test_extends_package_from_node_modules() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "node_modules/@tsconfig/node18/tsconfig.json",
            r#"{ "compilerOptions": { "target": "es2022", "allowJs": true } }"#,
        );
        write(
            root,
            "tsconfig.json",
            r#"{ "extends": ["@tsconfig/node18"], "include": ["lib"] }"#,
        );
        write(root, "lib/a.js", "");
        write(root, "lib/b.ts", "");

        let config = CompilerConfig::load(root, None).unwrap();

        assert_eq!(config.raw_target(), None);
        assert_eq!(config.options.allow_js, Some(true));
        assert_eq!(relative(root, &config.file_names), vec!["lib/a.js", "lib/b.ts"]);
    }

    #[test]
    fn test_extends_missing_base() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tsconfig.json", r#"{ "extends": "./nope.json" }"#);

        let err = CompilerConfig::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, TsConfigError::ExtendsNotFound { .. }));
    }

    #[test]
    fn test_extends_cycle() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", r#"{ "extends": "./tsconfig.json" }"#);
        write(dir.path(), "tsconfig.json", r#"{ "extends": "./a.json" }"#);

        let err = CompilerConfig::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, TsConfigError::CircularExtends(_)));
    }

    #[test]
    fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tsconfig.json", r#"{ "compilerOptions": "#);

        let err = CompilerConfig::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, TsConfigError::Parse { .. }));
    }
}
