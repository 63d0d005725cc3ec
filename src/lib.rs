//! Conference Proceedings Library
//!
//! Assembles a paginated proceedings volume from individually submitted
//! papers. This library provides functionality to:
//! - Read the organizer's list of papers
//! - Plan page ranges so every paper starts on a right-hand page
//! - Render running headers and a table of contents
//! - Stamp headers onto papers and concatenate the whole volume
//! - Scale and crop the volume to trim size
//!
//! # Example
//!
//! ```no_run
//! use proceedings::config::{BuildConfig, RendererKind};
//! use proceedings::pipeline;
//! use std::path::PathBuf;
//!
//! let config = BuildConfig {
//!     directory: PathBuf::from("my-conference"),
//!     renderer: RendererKind::Builtin,
//!     ..Default::default()
//! };
//!
//! let summary = pipeline::run(&config).expect("Failed to build proceedings");
//! println!("{} pages", summary.total_pages);
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod manifest;
pub mod overlay;
pub mod pagination;
pub mod pdf;
pub mod pipeline;
pub mod render;
pub mod template;

// Re-export commonly used items
pub use error::{Error, ErrorKind, Result};
