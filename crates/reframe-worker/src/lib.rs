//! Batch smart-crop worker.
//!
//! This crate provides:
//! - Environment-driven configuration
//! - Concurrent processing of many videos over one shared detector
//! - Structured per-video logging
//! - Graceful cancellation

pub mod config;
pub mod error;
pub mod logging;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::VideoLogger;
pub use processor::{output_path_for, VideoProcessor};
