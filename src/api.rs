//! HTTP surface: `/api/video-info`, `/api/download` and `/api/health`.
//!
//! Handlers stay thin. Resolution and downloads block on child processes and
//! HTTP calls, so they run on the blocking pool, one task per request.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use mime_guess::MimeGuess;
use serde::{Deserialize, Serialize};
use tokio::{fs::File, task};
use tokio_util::io::ReaderStream;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use crate::download::{DEFAULT_FORMAT_EXT, DEFAULT_QUALITY, Downloader, verify_artifact};
use crate::error::Error;
use crate::metadata::VideoInfo;
use crate::resolver::Resolvers;

pub const HEALTH_MESSAGE: &str = "Video Downloader API is running";

#[derive(Clone)]
pub struct AppState {
    resolvers: Arc<Resolvers>,
    downloader: Arc<Downloader>,
}

impl AppState {
    pub fn new(resolvers: Resolvers, downloader: Downloader) -> Self {
        Self {
            resolvers: Arc::new(resolvers),
            downloader: Arc::new(downloader),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, headers, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct VideoInfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
}

/// Builds the router with CORS applied. An empty `allowed_origins` list
/// accepts any origin.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/video-info", post(video_info))
        .route("/api/download", post(download))
        .route("/api/health", get(health))
        .with_state(state)
        .layer(cors_layer(allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(origin, "ignoring invalid CORS origin: {err}");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION])
}

fn required_url(url: Option<String>) -> ApiResult<String> {
    url.filter(|url| !url.is_empty())
        .ok_or_else(|| Error::missing_url().into())
}

async fn video_info(
    State(state): State<AppState>,
    payload: Result<Json<VideoInfoRequest>, JsonRejection>,
) -> ApiResult<Json<VideoInfo>> {
    let Json(request) = payload?;
    let url = required_url(request.url)?;

    let resolvers = state.resolvers.clone();
    let info = task::spawn_blocking(move || resolvers.video_info(&url))
        .await
        .map_err(|err| ApiError::internal(format!("task join error: {err}")))?
        .inspect_err(|err| {
            if !err.is_client_error() {
                error!("Error in get_video_info: {err}");
            }
        })?;

    Ok(Json(info))
}

async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let url = required_url(request.url)?;
    let format_ext = request
        .format
        .unwrap_or_else(|| DEFAULT_FORMAT_EXT.to_owned());
    let quality = request
        .quality
        .unwrap_or_else(|| DEFAULT_QUALITY.to_owned());

    let downloader = state.downloader.clone();
    let path = task::spawn_blocking(move || -> Result<PathBuf, Error> {
        let path = downloader.download(&url, &format_ext, &quality)?;
        verify_artifact(&path)?;
        Ok(path)
    })
    .await
    .map_err(|err| ApiError::internal(format!("task join error: {err}")))?
    .inspect_err(|err| error!("Error in download_video: {err}"))?;

    info!(path = %path.display(), "streaming download");
    stream_attachment(path).await
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        message: HEALTH_MESSAGE,
    })
}

/// `Content-Disposition` value with an ASCII fallback and the exact UTF-8
/// name in `filename*`.
fn attachment_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

async fn stream_attachment(path: PathBuf) -> ApiResult<Response> {
    let file = File::open(&path)
        .await
        .map_err(|_| ApiError::from(Error::MissingFile(path.clone())))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_owned());
    let guessed = MimeGuess::from_path(&path).first_or_octet_stream();

    let stream = ReaderStream::new(file);
    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(guessed.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&attachment_disposition(&file_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}
