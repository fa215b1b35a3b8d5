//! Command-line front for `cqpt-lang`.
mod cli;
pub mod config;

pub use cli::Cli;
pub use config::Config;
