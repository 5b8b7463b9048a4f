//! Command Line Interface (CLI) layer for sentimosaic.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for the `mosaic` and `resample`
//! batch kinds. It wires user-provided options to the library API exposed
//! via `sentimosaic::api`.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
