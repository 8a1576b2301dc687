use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/mediagrab-env";
pub const DEFAULT_API_PORT: u16 = 5000;
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_YTDLP_PATH: &str = "yt-dlp";
/// GraphQL document id for the public `xdt_shortcode_media` query. Instagram
/// rotates it every few weeks, hence the `INSTAGRAM_DOC_ID` override.
pub const DEFAULT_INSTAGRAM_DOC_ID: &str = "8845758582119845";

/// Raw values as written in the env-style config file.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub api_host: Option<String>,
    pub api_port: Option<u16>,
    pub temp_root: Option<PathBuf>,
    pub ytdlp_path: Option<String>,
    pub cookies_file: Option<PathBuf>,
    pub instagram_doc_id: Option<String>,
    pub allowed_origins: Vec<String>,
}

/// Fully resolved settings the backend starts with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Parent of the per-process temporary directory. `None` means the
    /// system temp dir.
    pub temp_root: Option<PathBuf>,
    pub ytdlp_path: String,
    pub cookies_file: Option<PathBuf>,
    pub instagram_doc_id: String,
    /// Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    fn from_env_config(cfg: EnvConfig) -> Self {
        Self {
            api_host: cfg
                .api_host
                .unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            api_port: cfg.api_port.unwrap_or(DEFAULT_API_PORT),
            temp_root: cfg.temp_root,
            ytdlp_path: cfg
                .ytdlp_path
                .unwrap_or_else(|| DEFAULT_YTDLP_PATH.to_string()),
            cookies_file: cfg.cookies_file,
            instagram_doc_id: cfg
                .instagram_doc_id
                .unwrap_or_else(|| DEFAULT_INSTAGRAM_DOC_ID.to_string()),
            allowed_origins: cfg.allowed_origins,
        }
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "API_HOST" => cfg.api_host = Some(value.to_string()),
                "API_PORT" => {
                    let port: u16 = value
                        .parse()
                        .with_context(|| format!("Parsing API_PORT from {}", path.display()))?;
                    cfg.api_port = Some(port);
                }
                "TEMP_ROOT" => cfg.temp_root = Some(PathBuf::from(value)),
                "YTDLP_PATH" => cfg.ytdlp_path = Some(value.to_string()),
                "COOKIES_FILE" => cfg.cookies_file = Some(PathBuf::from(value)),
                "INSTAGRAM_DOC_ID" => cfg.instagram_doc_id = Some(value.to_string()),
                "ALLOWED_ORIGINS" => {
                    cfg.allowed_origins = value
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(ToString::to_string)
                        .collect();
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

/// Loads the config file, falling back to defaults when it does not exist.
pub fn load_server_config_from(path: impl AsRef<Path>) -> Result<ServerConfig> {
    let cfg = read_env_config(path.as_ref())?.unwrap_or_default();
    Ok(ServerConfig::from_env_config(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn read_env_config_extracts_port() {
        let cfg = make_config("API_HOST=\"127.0.0.1\"\nAPI_PORT=\"4242\"\n");
        let parsed = read_env_config(cfg.path()).unwrap().unwrap();
        assert_eq!(parsed.api_port, Some(4242));
        assert_eq!(parsed.api_host.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn read_env_config_rejects_bad_port() {
        let cfg = make_config("API_PORT=\"eighty\"\n");
        assert!(read_env_config(cfg.path()).is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let runtime = load_server_config_from(dir.path().join("absent")).unwrap();
        assert_eq!(runtime.api_port, DEFAULT_API_PORT);
        assert_eq!(runtime.api_host, DEFAULT_API_HOST);
        assert_eq!(runtime.ytdlp_path, DEFAULT_YTDLP_PATH);
        assert_eq!(runtime.instagram_doc_id, DEFAULT_INSTAGRAM_DOC_ID);
        assert!(runtime.temp_root.is_none());
        assert!(runtime.allowed_origins.is_empty());
    }

    #[test]
    fn load_server_config_reads_every_key() {
        let cfg = make_config(
            "# comment\nTEMP_ROOT=\"/var/tmp/grab\"\nYTDLP_PATH=/opt/yt-dlp\n\
             COOKIES_FILE=\"/etc/cookies.txt\"\nINSTAGRAM_DOC_ID=123\n\
             ALLOWED_ORIGINS=\"https://a.example, https://b.example,\"\nUNKNOWN=1\n",
        );
        let runtime = load_server_config_from(cfg.path()).unwrap();
        assert_eq!(runtime.temp_root, Some(PathBuf::from("/var/tmp/grab")));
        assert_eq!(runtime.ytdlp_path, "/opt/yt-dlp");
        assert_eq!(runtime.cookies_file, Some(PathBuf::from("/etc/cookies.txt")));
        assert_eq!(runtime.instagram_doc_id, "123");
        assert_eq!(
            runtime.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(runtime.api_port, DEFAULT_API_PORT);
    }
}
