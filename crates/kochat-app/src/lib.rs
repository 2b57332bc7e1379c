// kochat application: CLI, web UI and terminal front-ends over kochat-core
pub mod app;
pub mod cli;
pub mod telemetry;
pub mod web;

pub use cli::{Cli, Commands};
