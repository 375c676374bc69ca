//! esbn library
//!
//! Resolves a TypeScript project's build plan from `tsconfig.json` and an
//! optional user config, then compiles it with esbuild and copies assets.

pub mod assets;
pub mod bundler;
pub mod cli;
pub mod config;
pub mod executor;
pub mod plan;
pub mod tsconfig;
pub mod utils;

pub use cli::Cli;
pub use config::UserConfig;
pub use plan::BuildPlan;
