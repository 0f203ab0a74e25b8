//! # synk-cli
//!
//! The `synk` binary.
//!
//! ## Commands
//!
//! - **run**: the sync daemon loop, stopped with Ctrl-C
//! - **once**: a single fetch, reconcile and sync cycle
//! - **members** / **nodes**: inspect the controller's view and the local registry
//! - **fingerprint**: hash a directory the way drift detection does
//! - **config**: show the effective configuration

pub mod cli;
pub mod output;

pub use cli::run;
