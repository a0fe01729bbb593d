//! Optional config file loading. Search order: ./seek-scrape.toml, then
//! $XDG_CONFIG_HOME/seek-scrape/config.toml (or ~/.config/seek-scrape/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; command-line flags win over present keys.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// First chapter to crawl from.
    pub first_chapter_url: Option<String>,
    /// EPUB path when -o is not set. Relative to CWD.
    pub output: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Number of HTTP attempts for transient failures (default 3).
    pub retry_count: Option<u32>,
    /// Delay in seconds before each retry, e.g. [1, 2, 4].
    pub retry_backoff_secs: Option<Vec<u64>>,
}

fn candidate_paths() -> Result<Vec<PathBuf>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("seek-scrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("seek-scrape").join("config.toml"));
    }
    Ok(paths)
}

/// Load the first config file found in the standard locations.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    load_config_from(&candidate_paths()?)
}

/// Load the first existing file among `paths`.
pub fn load_config_from(paths: &[PathBuf]) -> Result<Option<Config>, String> {
    for path in paths {
        if path.exists() {
            return read_config(path).map(Some);
        }
    }
    Ok(None)
}

fn read_config(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    let config: Config =
        toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
