//! Library side of the `recon` command: configuration, logging and the pipeline.

pub mod config;
pub mod logging;
pub mod pipeline;
