//! Download orchestration: turns a requested extension/quality into yt-dlp
//! options, asks the engine where the file will land, then fetches it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{info, warn};

use crate::engine::{ExtractionEngine, FetchOptions};
use crate::error::{Error, Result, describe};

pub const DEFAULT_FORMAT_EXT: &str = "mp4";
pub const DEFAULT_QUALITY: &str = "best";

/// Container used whenever separate video and audio streams are merged.
const MERGE_CONTAINER: &str = "mp4";

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

/// First run of digits in a quality marker (`"720p"` → `720`).
fn target_height(quality: &str) -> Option<&str> {
    DIGITS.find(quality).map(|m| m.as_str())
}

/// yt-dlp `-f` expression and optional merge container for a request.
///
/// * `quality` other than `best` with a height: best video at or below that
///   height plus best audio, else the best single stream under the ceiling,
///   merged into mp4.
/// * `quality` other than `best` without digits: plain `best`.
/// * `best`: best stream in the requested container, or unconstrained `best`
///   for mp4.
pub fn format_selector(format_ext: &str, quality: &str) -> (String, Option<String>) {
    if quality != DEFAULT_QUALITY {
        return match target_height(quality) {
            Some(height) => (
                format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]"),
                Some(MERGE_CONTAINER.to_owned()),
            ),
            None => ("best".to_owned(), None),
        };
    }

    if format_ext == DEFAULT_FORMAT_EXT {
        ("best".to_owned(), None)
    } else {
        (format!("best[ext={format_ext}]"), None)
    }
}

/// Makes a client-supplied quality marker safe to embed in an output
/// template: no path separators or control characters, no yt-dlp `%` fields.
fn template_marker(quality: &str) -> String {
    quality
        .chars()
        .flat_map(|c| match c {
            '/' | '\\' => vec!['_'],
            c if c.is_control() => vec!['_'],
            '%' => vec!['%', '%'],
            _ => vec![c],
        })
        .collect()
}

pub struct Downloader {
    engine: Arc<dyn ExtractionEngine>,
    output_dir: PathBuf,
}

impl Downloader {
    pub fn new(engine: Arc<dyn ExtractionEngine>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            output_dir: output_dir.into(),
        }
    }

    pub fn fetch_options(&self, format_ext: &str, quality: &str) -> FetchOptions {
        let (format, merge_output_format) = format_selector(format_ext, quality);
        let file_name = format!("%(title)s-{}.%(ext)s", template_marker(quality));
        FetchOptions {
            format,
            output_template: self.output_dir.join(file_name).to_string_lossy().into_owned(),
            merge_output_format,
        }
    }

    /// Downloads `url` into the output directory and returns the path the
    /// engine computed for it. The engine is queried twice with the same
    /// options: once for the filename, once for the download itself.
    pub fn download(&self, url: &str, format_ext: &str, quality: &str) -> Result<PathBuf> {
        if url.is_empty() {
            return Err(Error::missing_url());
        }

        let options = self.fetch_options(format_ext, quality);
        info!(url, format = %options.format, "starting download");

        let planned = self
            .engine
            .output_path(url, &options)
            .map_err(|err| Error::Download(describe(&err)))?;
        let written = self
            .engine
            .fetch(url, &options)
            .map_err(|err| Error::Download(describe(&err)))?;

        if written != planned {
            warn!(
                planned = %planned.display(),
                written = %written.display(),
                "engine wrote a different file than it announced"
            );
        }

        Ok(planned)
    }
}

/// Fails with [`Error::MissingFile`] unless `path` is a regular file.
pub fn verify_artifact(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingFile(path.to_path_buf()))
    }
}
