#![forbid(unsafe_code)]

//! Public entry point for the mediagrab crate.
//!
//! The library classifies Instagram and YouTube URLs, resolves their metadata
//! through yt-dlp and Instagram's web API, and downloads media into a
//! per-process temporary directory. `src/bin/backend.rs` serves it over HTTP.

pub mod api;
pub mod classify;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod formats;
pub mod instagram;
pub mod metadata;
pub mod resolver;
pub mod ytdlp;

pub use error::{Error, Result};
