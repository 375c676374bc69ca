//! Source file expansion for `files` / `include` / `exclude`

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;
use walkdir::WalkDir;

use super::CompilerOptions;
use crate::utils::{absolutize, to_slash};

/// Directories wildcard walks never descend into
const IMPLICIT_EXCLUDES: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// A list of file specs together with the directory they are relative to
#[derive(Debug, Clone, PartialEq)]
pub struct SpecList {
    pub base: PathBuf,
    pub patterns: Vec<String>,
}

/// One include or exclude spec, split into a literal root and a glob below it
#[derive(Debug)]
struct Spec {
    root: PathBuf,
    matcher: Option<GlobMatcher>,
}

impl Spec {
    fn new(base: &Path, pattern: &str) -> Option<Self> {
        let mut pattern = pattern.replace('\\', "/");
        if pattern.ends_with("**") {
            pattern.push_str("/*");
        }

        let parts: Vec<&str> = pattern.split('/').collect();
        let Some(wild) = parts.iter().position(|p| has_wildcard(p)) else {
            return Some(Self {
                root: absolutize(base, Path::new(&pattern)),
                matcher: None,
            });
        };

        let prefix = parts[..wild].join("/");
        let rest = parts[wild..].join("/");
        let glob = match GlobBuilder::new(&rest).literal_separator(true).build() {
            Ok(glob) => glob,
            Err(err) => {
                debug!("Ignoring invalid file spec '{}': {}", pattern, err);
                return None;
            }
        };

        Some(Self {
            root: absolutize(base, Path::new(&prefix)),
            matcher: Some(glob.compile_matcher()),
        })
    }

    fn literal(root: PathBuf) -> Self {
        Self { root, matcher: None }
    }

    /// Whether `path` falls under this spec, either directly or through a
    /// matching ancestor directory
    fn covers(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        match &self.matcher {
            None => true,
            Some(matcher) => rel
                .ancestors()
                .filter(|a| !a.as_os_str().is_empty())
                .any(|a| matcher.is_match(to_slash(a))),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        match (&self.matcher, path.strip_prefix(&self.root)) {
            (Some(matcher), Ok(rel)) => matcher.is_match(to_slash(rel)),
            (None, Ok(_)) => true,
            (_, Err(_)) => false,
        }
    }
}

fn has_wildcard(part: &str) -> bool {
    part.contains(['*', '?', '[', '{'])
}

/// Resolved `files` / `include` / `exclude` settings
#[derive(Debug)]
pub struct FileSpecs {
    files: Vec<PathBuf>,
    include: Vec<Spec>,
    exclude: Vec<Spec>,
}

impl FileSpecs {
    pub fn new(
        base_dir: &Path,
        files: Option<SpecList>,
        include: Option<SpecList>,
        exclude: Option<SpecList>,
        options: &CompilerOptions,
    ) -> Self {
        let include = match (&files, include) {
            (_, Some(list)) => list,
            (Some(_), None) => SpecList {
                base: PathBuf::new(),
                patterns: Vec::new(),
            },
            (None, None) => SpecList {
                base: base_dir.to_path_buf(),
                patterns: vec!["**/*".to_string()],
            },
        };

        let include = include
            .patterns
            .iter()
            .filter_map(|p| Spec::new(&include.base, p))
            .collect();

        let exclude = match exclude {
            Some(list) => list
                .patterns
                .iter()
                .filter_map(|p| Spec::new(&list.base, p))
                .collect(),
            None => [&options.out_dir, &options.declaration_dir]
                .into_iter()
                .flatten()
                .map(|dir| Spec::literal(dir.clone()))
                .collect(),
        };

        let files = files
            .map(|list| {
                list.patterns
                    .iter()
                    .map(|p| absolutize(&list.base, Path::new(p)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            files,
            include,
            exclude,
        }
    }

    /// Expand the specs into a concrete, duplicate-free file list
    pub fn expand(&self, allow_js: bool) -> Vec<PathBuf> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut result: Vec<PathBuf> = Vec::new();

        for file in &self.files {
            if seen.insert(file.clone()) {
                result.push(file.clone());
            }
        }

        let mut candidates: Vec<(PathBuf, String, u8)> = Vec::new();
        for spec in &self.include {
            for path in self.walk(spec) {
                let Some((stem, priority)) = classify(&path, allow_js) else {
                    continue;
                };
                if self.exclude.iter().any(|ex| ex.covers(&path)) {
                    continue;
                }
                if seen.insert(path.clone()) {
                    candidates.push((path, stem, priority));
                }
            }
        }

        let mut best: HashMap<&str, u8> = HashMap::new();
        for (_, stem, priority) in &candidates {
            best.entry(stem.as_str())
                .and_modify(|p| *p = (*p).min(*priority))
                .or_insert(*priority);
        }

        result.extend(
            candidates
                .iter()
                .filter(|(_, stem, priority)| best.get(stem.as_str()) == Some(priority))
                .map(|(path, _, _)| path.clone()),
        );

        result
    }

    fn walk(&self, spec: &Spec) -> Vec<PathBuf> {
        if spec.root.is_file() {
            return match spec.matcher {
                None => vec![spec.root.clone()],
                Some(_) => Vec::new(),
            };
        }
        if !spec.root.is_dir() {
            return Vec::new();
        }

        // a directory's own files before its subdirectories, as tsc lists them
        WalkDir::new(&spec.root)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_implicitly_excluded(e.file_name()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| spec.matches(path))
            .collect()
    }
}

fn is_implicitly_excluded(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || IMPLICIT_EXCLUDES.contains(&&*name)
}

/// Split a supported source file into its stem and extension priority
fn classify(path: &Path, allow_js: bool) -> Option<(String, u8)> {
    let name = to_slash(path);
    let (ext, priority) = if name.ends_with(".d.ts") {
        (".d.ts", 2)
    } else if name.ends_with(".ts") {
        (".ts", 0)
    } else if name.ends_with(".tsx") {
        (".tsx", 1)
    } else if allow_js && name.ends_with(".js") {
        (".js", 3)
    } else if allow_js && name.ends_with(".jsx") {
        (".jsx", 4)
    } else {
        return None;
    };

    Some((name[..name.len() - ext.len()].to_string(), priority))
}
