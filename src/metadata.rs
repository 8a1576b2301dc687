//! Records returned by `/api/video-info`.
//!
//! Every resolver, whatever engine it talks to, ends up producing one
//! [`VideoInfo`]. The struct is built per request, serialized, and dropped;
//! nothing here is cached or persisted.

use serde::Serialize;

/// Longest caption prefix kept when a caption doubles as the title.
pub const TITLE_MAX_CHARS: usize = 100;

/// Title used for Instagram posts without a caption.
pub const INSTAGRAM_PLACEHOLDER_TITLE: &str = "Instagram Post";

/// Upper bound on the number of format options exposed to clients.
pub const MAX_FORMATS: usize = 5;

pub const UNKNOWN_FILESIZE: &str = "Unknown";

/// Platform label attached to every resolved record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    YouTube,
    Other,
}

/// One downloadable variant as shown to the user (e.g. `720p` mp4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatOption {
    pub quality: String,
    pub ext: String,
    pub filesize: String,
}

impl FormatOption {
    pub fn new(
        quality: impl Into<String>,
        ext: impl Into<String>,
        filesize: impl Into<String>,
    ) -> Self {
        Self {
            quality: quality.into(),
            ext: ext.into(),
            filesize: filesize.into(),
        }
    }

    /// Synthetic entry used when an engine lists no usable video formats.
    pub fn best_effort() -> Self {
        Self::new("Best", "mp4", UNKNOWN_FILESIZE)
    }
}

/// Unified metadata for a single post or video.
///
/// Optional counters are omitted from the JSON when the upstream engine did
/// not report them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub url: String,
    pub platform: Platform,
    pub formats: Vec<FormatOption>,
}

/// Turns a free-text caption into a title: captions longer than
/// [`TITLE_MAX_CHARS`] characters are cut and suffixed with `...`, and a
/// missing or empty caption becomes the Instagram placeholder.
pub fn caption_title(caption: Option<&str>) -> String {
    match caption {
        None | Some("") => INSTAGRAM_PLACEHOLDER_TITLE.to_owned(),
        Some(text) if text.chars().count() > TITLE_MAX_CHARS => {
            let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
            title.push_str("...");
            title
        }
        Some(text) => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn long_caption_is_truncated_with_ellipsis() {
        let caption = "a".repeat(150);
        let title = caption_title(Some(&caption));
        assert_eq!(title.chars().count(), 103);
        assert!(title.ends_with("..."));
        assert_eq!(&title[..100], &caption[..100]);
    }

    #[test]
    fn caption_at_the_limit_is_kept_whole() {
        let caption = "b".repeat(TITLE_MAX_CHARS);
        assert_eq!(caption_title(Some(&caption)), caption);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let caption = "é".repeat(120);
        let title = caption_title(Some(&caption));
        assert_eq!(title.chars().count(), 103);
    }

    #[test]
    fn missing_caption_uses_placeholder() {
        assert_eq!(caption_title(None), "Instagram Post");
        assert_eq!(caption_title(Some("")), "Instagram Post");
    }

    #[test]
    fn video_info_serializes_platform_lowercase_and_skips_absent_counters() {
        let info = VideoInfo {
            title: "Clip".into(),
            description: String::new(),
            thumbnail: None,
            author: "someone".into(),
            upload_date: Some("20240101".into()),
            views: Some(10),
            likes: None,
            comments: None,
            duration: Some(61),
            url: "https://youtu.be/abc".into(),
            platform: Platform::YouTube,
            formats: vec![FormatOption::best_effort()],
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["platform"], "youtube");
        assert_eq!(value["views"], 10);
        assert!(value.get("likes").is_none());
        assert!(value.get("thumbnail").is_none());
        assert_eq!(
            value["formats"],
            json!([{ "quality": "Best", "ext": "mp4", "filesize": "Unknown" }])
        );
    }
}
