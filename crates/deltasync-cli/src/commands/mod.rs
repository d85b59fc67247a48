//! Subcommands of the `deltasync` binary

pub mod cache;
pub mod config;
