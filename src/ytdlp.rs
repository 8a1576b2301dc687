//! [`ExtractionEngine`] backed by the `yt-dlp` executable.
//!
//! Every call spawns a fresh child process, so a single [`YtDlp`] value can
//! be shared by concurrent requests without locking.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::engine::{ExtractionEngine, FetchOptions, ProbeInfo};

pub struct YtDlp {
    program: PathBuf,
    cookies: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookies: None,
        }
    }

    /// Netscape cookies file handed to yt-dlp when it exists at call time.
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Runs `<program> --version`. The backend logs the result at startup
    /// and keeps serving when it fails, since Instagram lookups and the
    /// health check do not need yt-dlp.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .with_context(|| {
                format!("{} is not installed or not in PATH", self.program.display())
            })?;
        if !output.status.success() {
            bail!(
                "{} is installed but returned a failure status",
                self.program.display()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--no-warnings")
            .arg("--no-progress")
            .arg("--no-playlist");

        if let Some(cookies) = &self.cookies
            && cookies.exists()
        {
            command
                .arg("--cookies")
                .arg(cookies.to_string_lossy().to_string());
        }

        command
    }

    fn run(&self, mut command: Command, label: &str, url: &str) -> Result<Output> {
        debug!(?command, "running yt-dlp {label}");
        let output = command
            .output()
            .with_context(|| format!("executing {} for {}", self.program.display(), url))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            match last_line(&stderr) {
                Some(reason) => bail!("{reason}"),
                None => bail!("{label} command failed for {url} (status {})", output.status),
            }
        }

        Ok(output)
    }
}

/// Flags carrying a [`FetchOptions`]; identical for the filename query and
/// the download so both resolve the same path.
fn fetch_args(options: &FetchOptions) -> Vec<String> {
    let mut args = vec![
        "--format".to_owned(),
        options.format.clone(),
        "--output".to_owned(),
        options.output_template.clone(),
    ];
    if let Some(container) = &options.merge_output_format {
        args.push("--merge-output-format".to_owned());
        args.push(container.clone());
    }
    args
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rev().find(|line| !line.is_empty())
}

fn reported_path(output: &Output, label: &str) -> Result<PathBuf> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    last_line(&stdout)
        .map(PathBuf::from)
        .with_context(|| format!("yt-dlp {label} did not report an output path"))
}

impl ExtractionEngine for YtDlp {
    fn probe(&self, url: &str) -> Result<ProbeInfo> {
        let mut command = self.base_command();
        command
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--")
            .arg(url);

        let output = self.run(command, "metadata", url)?;
        serde_json::from_slice(&output.stdout).context("deserializing metadata JSON")
    }

    fn output_path(&self, url: &str, options: &FetchOptions) -> Result<PathBuf> {
        let mut command = self.base_command();
        command
            .args(fetch_args(options))
            .arg("--print")
            .arg("filename")
            .arg("--")
            .arg(url);

        let output = self.run(command, "filename", url)?;
        reported_path(&output, "filename")
    }

    fn fetch(&self, url: &str, options: &FetchOptions) -> Result<PathBuf> {
        let mut command = self.base_command();
        command
            .args(fetch_args(options))
            .arg("--no-simulate")
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--")
            .arg(url);

        let output = self.run(command, "download", url)?;
        reported_path(&output, "download")
    }
}
