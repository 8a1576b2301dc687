//! Instagram post lookup through the public web GraphQL endpoint.
//!
//! Anonymous requests only: private posts, deleted posts and rate-limited
//! responses all come back as errors, which the Instagram resolver answers by
//! falling back to yt-dlp.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::DateTime;
use serde_json::Value;
use tracing::debug;

use crate::engine::{PostInfo, PostLookup};

const GRAPHQL_ENDPOINT: &str = "https://www.instagram.com/api/graphql";

/// Public app id embedded in Instagram's web client.
const IG_APP_ID: &str = "936619743392459";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct InstagramGraphql {
    agent: ureq::Agent,
    doc_id: String,
}

impl InstagramGraphql {
    pub fn new(doc_id: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            agent,
            doc_id: doc_id.into(),
        }
    }
}

impl PostLookup for InstagramGraphql {
    fn lookup(&self, shortcode: &str) -> Result<PostInfo> {
        let variables = serde_json::json!({ "shortcode": shortcode }).to_string();
        debug!(shortcode, "querying Instagram GraphQL");

        let response = self
            .agent
            .post(GRAPHQL_ENDPOINT)
            .set("X-IG-App-ID", IG_APP_ID)
            .set("X-Requested-With", "XMLHttpRequest")
            .set("Referer", "https://www.instagram.com/")
            .set("Origin", "https://www.instagram.com")
            .send_form(&[("doc_id", self.doc_id.as_str()), ("variables", variables.as_str())]);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(429, _)) => bail!("rate limited by Instagram"),
            Err(ureq::Error::Status(code, _)) => bail!("Instagram GraphQL returned HTTP {code}"),
            Err(err) => return Err(err).context("requesting Instagram GraphQL"),
        };

        let body: Value = response
            .into_json()
            .context("parsing Instagram GraphQL response")?;
        post_from_graphql(&body)
    }
}

fn count(media: &Value, pointers: &[&str]) -> Option<u64> {
    pointers
        .iter()
        .find_map(|pointer| media.pointer(pointer).and_then(Value::as_u64))
}

/// Maps a `shortcode_media` GraphQL payload onto [`PostInfo`].
pub fn post_from_graphql(body: &Value) -> Result<PostInfo> {
    let media = body
        .pointer("/data/xdt_shortcode_media")
        .or_else(|| body.pointer("/data/shortcode_media"))
        .filter(|media| !media.is_null())
        .ok_or_else(|| {
            let message = body.get("message").and_then(Value::as_str).unwrap_or("");
            if message.contains("login_required") || message.contains("checkpoint_required") {
                anyhow!("private post or login required")
            } else {
                anyhow!("post not found or media unavailable")
            }
        })?;

    let owner_username = media
        .pointer("/owner/username")
        .and_then(Value::as_str)
        .context("post has no owner username")?
        .to_owned();

    let caption = media
        .pointer("/edge_media_to_caption/edges/0/node/text")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let is_video = media
        .get("is_video")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let date = media
        .get("taken_at_timestamp")
        .and_then(Value::as_i64)
        .and_then(|ts| DateTime::from_timestamp(ts, 0));

    Ok(PostInfo {
        caption,
        display_url: media
            .get("display_url")
            .and_then(Value::as_str)
            .map(str::to_owned),
        owner_username,
        date,
        likes: count(media, &["/edge_media_preview_like/count", "/edge_liked_by/count"]),
        comments: count(
            media,
            &[
                "/edge_media_to_parent_comment/count",
                "/edge_media_to_comment/count",
            ],
        ),
        is_video,
        video_view_count: media.get("video_view_count").and_then(Value::as_u64),
        video_duration: media.get("video_duration").and_then(Value::as_f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_a_video_post() -> Result<()> {
        let body = json!({
            "data": {
                "xdt_shortcode_media": {
                    "is_video": true,
                    "display_url": "https://cdn.example/thumb.jpg",
                    "owner": { "username": "creator" },
                    "taken_at_timestamp": 1_704_067_200,
                    "edge_media_preview_like": { "count": 42 },
                    "edge_media_to_parent_comment": { "count": 7 },
                    "video_view_count": 1000,
                    "video_duration": 15.5,
                    "edge_media_to_caption": {
                        "edges": [{ "node": { "text": "hello world" } }]
                    }
                }
            }
        });

        let post = post_from_graphql(&body)?;
        assert_eq!(post.owner_username, "creator");
        assert_eq!(post.caption.as_deref(), Some("hello world"));
        assert_eq!(post.likes, Some(42));
        assert_eq!(post.comments, Some(7));
        assert!(post.is_video);
        assert_eq!(post.video_view_count, Some(1000));
        assert_eq!(post.video_duration, Some(15.5));
        assert_eq!(
            post.date.map(|d| d.format("%Y-%m-%d").to_string()).as_deref(),
            Some("2024-01-01")
        );
        Ok(())
    }

    #[test]
    fn maps_a_photo_post_with_legacy_keys() -> Result<()> {
        let body = json!({
            "data": {
                "shortcode_media": {
                    "is_video": false,
                    "display_url": "https://cdn.example/photo.jpg",
                    "owner": { "username": "photographer" },
                    "edge_liked_by": { "count": 3 },
                    "edge_media_to_comment": { "count": 1 },
                    "edge_media_to_caption": { "edges": [] }
                }
            }
        });

        let post = post_from_graphql(&body)?;
        assert!(!post.is_video);
        assert!(post.caption.is_none());
        assert!(post.date.is_none());
        assert_eq!(post.likes, Some(3));
        assert_eq!(post.comments, Some(1));
        Ok(())
    }

    #[test]
    fn missing_media_is_an_error() {
        let private = json!({ "message": "login_required", "status": "fail" });
        let err = post_from_graphql(&private).unwrap_err();
        assert!(err.to_string().contains("login required"));

        let deleted = json!({ "data": { "xdt_shortcode_media": null } });
        let err = post_from_graphql(&deleted).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
