//! Per-platform metadata resolution.
//!
//! YouTube URLs go straight to the generic extraction engine. Instagram URLs
//! try the dedicated post lookup first and fall back to the generic engine
//! when it fails; only when both fail does the caller see an error.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::classify::{Site, classify, instagram_shortcode};
use crate::engine::{ExtractionEngine, PostInfo, PostLookup, ProbeInfo};
use crate::error::{Error, Result, describe};
use crate::formats::normalize_formats;
use crate::metadata::{FormatOption, Platform, UNKNOWN_FILESIZE, VideoInfo, caption_title};

/// Common capability of the platform resolvers.
pub trait MetadataResolver: Send + Sync {
    fn resolve(&self, url: &str) -> Result<VideoInfo>;
}

/// Labels generic-engine results by looking for `youtube` anywhere in the
/// URL, independent of how the URL was classified.
fn platform_from_url(url: &str) -> Platform {
    if url.contains("youtube") {
        Platform::YouTube
    } else {
        Platform::Other
    }
}

fn seconds(duration: f64) -> u64 {
    duration.max(0.0).round() as u64
}

/// Builds a [`VideoInfo`] from a metadata-only engine probe.
pub fn video_info_from_probe(url: &str, probe: ProbeInfo) -> VideoInfo {
    let formats = normalize_formats(&probe.formats);
    let author = probe
        .uploader
        .or(probe.channel)
        .unwrap_or_else(|| "Unknown".to_owned());

    VideoInfo {
        title: probe.title.unwrap_or_else(|| "Video".to_owned()),
        description: probe.description.unwrap_or_default(),
        thumbnail: probe.thumbnail,
        author,
        upload_date: probe.upload_date,
        views: probe.view_count,
        likes: probe.like_count,
        comments: None,
        duration: probe.duration.map(seconds),
        url: url.to_owned(),
        platform: platform_from_url(url),
        formats,
    }
}

/// Builds a [`VideoInfo`] from an Instagram post lookup.
pub fn video_info_from_post(url: &str, post: PostInfo) -> VideoInfo {
    let ext = if post.is_video { "mp4" } else { "jpg" };
    let (views, duration) = if post.is_video {
        (post.video_view_count, post.video_duration.map(seconds))
    } else {
        (None, None)
    };

    VideoInfo {
        title: caption_title(post.caption.as_deref()),
        description: post.caption.unwrap_or_default(),
        thumbnail: post.display_url,
        author: post.owner_username,
        upload_date: post.date.map(|date| date.format("%Y-%m-%d").to_string()),
        views,
        likes: post.likes,
        comments: post.comments,
        duration,
        url: url.to_owned(),
        platform: Platform::Instagram,
        formats: vec![FormatOption::new("HD", ext, UNKNOWN_FILESIZE)],
    }
}

/// Shared generic path: probe without downloading and normalize the result.
/// Errors read `Failed to extract video info: <cause>`.
fn resolve_generic(engine: &dyn ExtractionEngine, url: &str) -> anyhow::Result<VideoInfo> {
    let probe = engine
        .probe(url)
        .context("Failed to extract video info")?;
    Ok(video_info_from_probe(url, probe))
}

pub struct YouTubeResolver {
    engine: Arc<dyn ExtractionEngine>,
}

impl YouTubeResolver {
    pub fn new(engine: Arc<dyn ExtractionEngine>) -> Self {
        Self { engine }
    }
}

impl MetadataResolver for YouTubeResolver {
    fn resolve(&self, url: &str) -> Result<VideoInfo> {
        resolve_generic(self.engine.as_ref(), url).map_err(|err| {
            warn!(url, "YouTube info error: {}", describe(&err));
            Error::Resolution(format!("Failed to get YouTube video info: {}", describe(&err)))
        })
    }
}

pub struct InstagramResolver {
    posts: Arc<dyn PostLookup>,
    engine: Arc<dyn ExtractionEngine>,
}

impl InstagramResolver {
    pub fn new(posts: Arc<dyn PostLookup>, engine: Arc<dyn ExtractionEngine>) -> Self {
        Self { posts, engine }
    }

    fn failure(message: impl std::fmt::Display) -> Error {
        Error::Resolution(format!("Failed to get Instagram video info: {message}"))
    }
}

impl MetadataResolver for InstagramResolver {
    fn resolve(&self, url: &str) -> Result<VideoInfo> {
        let shortcode =
            instagram_shortcode(url).ok_or_else(|| Self::failure("Invalid Instagram URL"))?;

        let primary = match self.posts.lookup(shortcode) {
            Ok(post) => return Ok(video_info_from_post(url, post)),
            Err(err) => err,
        };
        warn!(
            shortcode,
            "Instagram lookup failed, falling back to yt-dlp: {}",
            describe(&primary)
        );

        resolve_generic(self.engine.as_ref(), url).map_err(|fallback| {
            Self::failure(format!(
                "{}; fallback: {}",
                describe(&primary),
                describe(&fallback)
            ))
        })
    }
}

/// Dispatches URLs to the resolver for their platform.
pub struct Resolvers {
    youtube: YouTubeResolver,
    instagram: InstagramResolver,
}

impl Resolvers {
    pub fn new(engine: Arc<dyn ExtractionEngine>, posts: Arc<dyn PostLookup>) -> Self {
        Self {
            youtube: YouTubeResolver::new(engine.clone()),
            instagram: InstagramResolver::new(posts, engine),
        }
    }

    pub fn resolver_for(&self, site: Site) -> Option<&dyn MetadataResolver> {
        match site {
            Site::Instagram => Some(&self.instagram),
            Site::YouTube => Some(&self.youtube),
            Site::Unsupported => None,
        }
    }

    /// Classifies `url` and resolves it with the matching resolver.
    pub fn video_info(&self, url: &str) -> Result<VideoInfo> {
        if url.is_empty() {
            return Err(Error::missing_url());
        }
        let site = classify(url);
        let resolver = self.resolver_for(site).ok_or_else(Error::unsupported_url)?;
        info!(url, ?site, "resolving video info");
        resolver.resolve(url)
    }
}
