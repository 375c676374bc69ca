//! End-to-end tests for the esbn binary
//!
//! esbuild is replaced by a shell script that records how it was invoked,
//! so these run on unix only.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_ESBUILD: &str = r#"#!/bin/sh
ls "$PWD/dist" > "$PWD/dist-listing.txt" 2>/dev/null
echo "$@" > "$PWD/esbuild-args.txt"
exit 0
"#;

const FAILING_ESBUILD: &str = r#"#!/bin/sh
echo "✘ [ERROR] Expected ';' but found '}'" >&2
exit 1
"#;

struct Project {
    dir: TempDir,
    esbuild: PathBuf,
}

impl Project {
    fn new() -> Self {
        Self::with_esbuild(FAKE_ESBUILD)
    }

    fn with_esbuild(script: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let esbuild = dir.path().join("fake-esbuild.sh");
        fs::write(&esbuild, script).unwrap();
        fs::set_permissions(&esbuild, fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, esbuild }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn esbn(&self) -> Command {
        let mut cmd = Command::cargo_bin("esbn").unwrap();
        cmd.current_dir(self.root())
            .env("ESBN_ESBUILD", &self.esbuild)
            .env_remove("RUST_LOG");
        cmd
    }

    fn esbuild_args(&self) -> Option<String> {
        fs::read_to_string(self.root().join("esbuild-args.txt")).ok()
    }
}

fn typescript_project() -> Project {
    let project = Project::new();
    project.write(
        "tsconfig.json",
        r#"{ "compilerOptions": { "sourceMap": true, "target": "ES2020" }, "include": ["src"] }"#,
    );
    project.write("src/index.ts", "export const x = 1;\n");
    project.write("src/views/home.html", "<h1>home</h1>\n");
    project
}

#[test]
fn builds_with_defaults() {
    let project = typescript_project();

    project
        .esbn()
        .assert()
        .success()
        .stderr(predicate::str::contains("Built in"));

    let args = project.esbuild_args().expect("esbuild was not invoked");
    assert!(args.contains("--outdir=dist"));
    assert!(args.contains("--sourcemap"));
    assert!(args.contains("--target=es2020"));
    assert!(args.contains("--bundle=false"));
    assert!(args.contains("--platform=node"));
    assert!(args.contains("src/index.ts"));

    assert!(project.root().join("dist/views/home.html").is_file());
    assert!(!project.root().join("dist/index.ts").exists());
}

#[test]
fn missing_tsconfig_fails_without_running_esbuild() {
    let project = Project::new();
    project.write("src/index.ts", "export {};\n");

    project
        .esbn()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not found in the current directory!"));

    assert!(project.esbuild_args().is_none());
    assert!(!project.root().join("dist").exists());
}

#[test]
fn malformed_user_config_falls_back_to_defaults() {
    let project = typescript_project();
    project.write("esbn.config.json", "{ outDir: ");

    project
        .esbn()
        .assert()
        .success()
        .stderr(predicate::str::contains("Config file has some errors"));

    let args = project.esbuild_args().expect("esbuild was not invoked");
    assert!(args.contains("--outdir=dist"));
}

#[test]
fn user_config_overrides_out_dir_and_entries() {
    let project = typescript_project();
    project.write(
        "etsc.config.json",
        r#"{
            "outDir": "lib",
            "esbuild": { "entryPoints": ["scripts/seed.ts"], "minify": true, "keepNames": true }
        }"#,
    );

    project.esbn().assert().success();

    let args = project.esbuild_args().expect("esbuild was not invoked");
    assert!(args.contains("--outdir=lib"));
    assert!(args.contains("--minify"));
    assert!(args.contains("--keep-names"));
    assert!(args.trim_end().ends_with("scripts/seed.ts"));
    assert!(project.root().join("lib/views/home.html").is_file());
}

#[test]
fn explicit_config_flag() {
    let project = typescript_project();
    project.write("build/esbn.toml", "outDir = \"out\"\n");

    project
        .esbn()
        .args(["--config", "build/esbn.toml"])
        .assert()
        .success();

    let args = project.esbuild_args().expect("esbuild was not invoked");
    assert!(args.contains("--outdir=out"));
}

#[test]
fn clean_removes_stale_output_before_compiling() {
    let project = typescript_project();
    project.write("dist/stale.js", "old\n");

    project.esbn().args(["--clean", "true"]).assert().success();

    let listing = fs::read_to_string(project.root().join("dist-listing.txt")).unwrap_or_default();
    assert!(!listing.contains("stale.js"));
    assert!(!project.root().join("dist/stale.js").exists());
}

#[test]
fn without_clean_output_is_kept() {
    let project = typescript_project();
    project.write("dist/stale.js", "old\n");

    project.esbn().assert().success();

    assert!(project.root().join("dist/stale.js").exists());
}

#[test]
fn esbuild_failure_fails_the_build() {
    let project = Project::with_esbuild(FAILING_ESBUILD);
    project.write("tsconfig.json", r#"{ "include": ["src"] }"#);
    project.write("src/index.ts", "export const = ;\n");

    project
        .esbn()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("esbuild failed"));
}

#[test]
fn config_clean_field_does_not_remove_output() {
    let project = typescript_project();
    project.write("esbn.config.json", r#"{ "clean": true }"#);
    project.write("dist/stale.js", "old\n");

    project.esbn().assert().success();

    let listing = fs::read_to_string(project.root().join("dist-listing.txt")).unwrap_or_default();
    assert!(listing.contains("stale.js"));
    assert!(project.root().join("dist/stale.js").exists());
}

#[test]
fn script_config_is_reported_and_ignored() {
    let project = typescript_project();
    project.write("esbn.config.js", "module.exports = { outDir: 'lib' };\n");

    project
        .esbn()
        .assert()
        .success()
        .stderr(predicate::str::contains("esbn.config.json"));

    let args = project.esbuild_args().expect("esbuild was not invoked");
    assert!(args.contains("--outdir=dist"));
}
