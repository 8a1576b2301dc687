//! Maps a raw URL string onto the platform that can serve it.

use std::sync::LazyLock;

use regex::Regex;

static INSTAGRAM_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?(instagram\.com|instagr\.am)/(p|reel|tv)/[A-Za-z0-9_-]+")
        .expect("instagram pattern is valid")
});

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(www\.)?(youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)[A-Za-z0-9_-]+",
    )
    .expect("youtube pattern is valid")
});

static SHORTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(p|reel|tv)/([A-Za-z0-9_-]+)").expect("shortcode pattern is valid")
});

/// Result of classifying a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Instagram,
    YouTube,
    Unsupported,
}

/// Matching is anchored at the start of the string, so anything without an
/// `http(s)://` scheme falls through to [`Site::Unsupported`].
pub fn classify(url: &str) -> Site {
    if INSTAGRAM_URL.is_match(url) {
        Site::Instagram
    } else if YOUTUBE_URL.is_match(url) {
        Site::YouTube
    } else {
        Site::Unsupported
    }
}

/// Pulls the post shortcode out of an Instagram URL (`/p/<code>`,
/// `/reel/<code>`, `/tv/<code>`). The search is unanchored.
pub fn instagram_shortcode(url: &str) -> Option<&str> {
    SHORTCODE
        .captures(url)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}
