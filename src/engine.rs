//! Capability traits for the external engines the resolvers depend on.
//!
//! The concrete implementations live in [`crate::ytdlp`] and
//! [`crate::instagram`]. Tests swap in fakes. Implementations must be safe to
//! call from several requests at once; both shipped engines hold no mutable
//! state between calls.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Subset of yt-dlp's `--dump-single-json` payload read by the resolvers.
/// Everything is optional because extractors differ in what they report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub upload_date: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// A single entry of the engine's format list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    pub height: Option<Height>,
    pub vcodec: Option<String>,
    pub ext: Option<String>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
}

/// Height as reported by the engine. Most extractors give pixels, a few
/// report a free-form label instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Height {
    Pixels(u64),
    Label(String),
}

/// Options shared by the filename computation and the actual download so
/// both agree on the artifact path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// yt-dlp `-f` expression.
    pub format: String,
    /// Absolute output template, e.g. `/tmp/mediagrab-x/%(title)s-720p.%(ext)s`.
    pub output_template: String,
    /// Container to merge separate video/audio streams into.
    pub merge_output_format: Option<String>,
}

/// Generic extraction engine: probes URLs for metadata and fetches media.
pub trait ExtractionEngine: Send + Sync {
    /// Metadata-only query; nothing is downloaded.
    fn probe(&self, url: &str) -> Result<ProbeInfo>;

    /// Path the engine will write to when fetching `url` with `options`.
    fn output_path(&self, url: &str, options: &FetchOptions) -> Result<PathBuf>;

    /// Downloads the media and returns the path of the written file.
    fn fetch(&self, url: &str, options: &FetchOptions) -> Result<PathBuf>;
}

/// Post metadata returned by the Instagram lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostInfo {
    pub caption: Option<String>,
    pub display_url: Option<String>,
    pub owner_username: String,
    pub date: Option<DateTime<Utc>>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub is_video: bool,
    pub video_view_count: Option<u64>,
    pub video_duration: Option<f64>,
}

/// Dedicated Instagram post-info engine keyed by shortcode. Fails for
/// private, deleted, or rate-limited posts.
pub trait PostLookup: Send + Sync {
    fn lookup(&self, shortcode: &str) -> Result<PostInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_info_tolerates_sparse_payloads() -> Result<()> {
        let info: ProbeInfo = serde_json::from_str(r#"{"id": "x", "title": "Only a title"}"#)?;
        assert_eq!(info.title.as_deref(), Some("Only a title"));
        assert!(info.formats.is_empty());
        assert!(info.uploader.is_none());
        Ok(())
    }

    #[test]
    fn raw_format_height_accepts_numbers_labels_and_null() -> Result<()> {
        let formats: Vec<RawFormat> = serde_json::from_str(
            r#"[
                {"height": 720, "vcodec": "avc1", "ext": "mp4", "filesize": 1048576},
                {"height": "audio only", "vcodec": "none"},
                {"height": null, "filesize_approx": 2048.5}
            ]"#,
        )?;
        assert_eq!(formats[0].height, Some(Height::Pixels(720)));
        assert_eq!(formats[1].height, Some(Height::Label("audio only".into())));
        assert_eq!(formats[2].height, None);
        assert_eq!(formats[2].filesize_approx, Some(2048.5));
        Ok(())
    }
}
