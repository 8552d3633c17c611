use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::errors::{FeederError, FeederResult};
use crate::services::DEFAULT_INTERVAL;
use crate::sources::FetchSettings;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Seen-links file location relative to the home directory
const DEFAULT_SEEN_FILE: &str = ".config/transmission/seen-torrents.conf";

#[derive(Debug, Clone)]
pub struct Config {
    pub feeds: Vec<String>,
    pub seen_file: PathBuf,
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub notify_command: Option<String>,
    pub enclosures_only: bool,
}

impl Config {
    pub fn from_env() -> FeederResult<Self> {
        Self::from_env_with(None)
    }

    /// Like `from_env`, with a seen-file path that takes precedence over
    /// `FEEDER_SEEN_FILE` and the `$HOME` default.
    pub fn from_env_with(seen_file: Option<PathBuf>) -> FeederResult<Self> {
        load_dotenv();
        Self::from_vars_with(|name| std::env::var(name).ok(), seen_file)
    }

    /// Build a config from a variable lookup, e.g. the process environment.
    pub fn from_vars<V>(var: V) -> FeederResult<Self>
    where
        V: Fn(&str) -> Option<String>,
    {
        Self::from_vars_with(var, None)
    }

    pub fn from_vars_with<V>(var: V, seen_file: Option<PathBuf>) -> FeederResult<Self>
    where
        V: Fn(&str) -> Option<String>,
    {
        let mut feeds = var("FEEDER_FEEDS")
            .map(|value| split_feed_list(&value))
            .unwrap_or_default();

        if let Some(path) = var("FEEDER_FEEDS_FILE") {
            feeds.extend(read_feeds_file(Path::new(&path))?);
        }

        for feed in &feeds {
            validate_feed_url(feed)?;
        }

        let seen_file = resolve_seen_file(&var, seen_file)?;

        let interval = match var("FEEDER_INTERVAL_SECS") {
            Some(value) => parse_secs("FEEDER_INTERVAL_SECS", &value)?,
            None => DEFAULT_INTERVAL,
        };

        let fetch_timeout = match var("FEEDER_FETCH_TIMEOUT_SECS") {
            Some(value) => parse_secs("FEEDER_FETCH_TIMEOUT_SECS", &value)?,
            None => DEFAULT_FETCH_TIMEOUT,
        };

        let notify_command = var("FEEDER_NOTIFY_COMMAND").filter(|c| !c.trim().is_empty());

        let enclosures_only = match var("FEEDER_ENCLOSURES_ONLY") {
            Some(value) => parse_bool("FEEDER_ENCLOSURES_ONLY", &value)?,
            None => false,
        };

        Ok(Self {
            feeds,
            seen_file,
            interval,
            fetch_timeout,
            notify_command,
            enclosures_only,
        })
    }

    /// Only the seen-file location, without touching feed settings.
    pub fn seen_file_from_env(seen_file: Option<PathBuf>) -> FeederResult<PathBuf> {
        load_dotenv();
        resolve_seen_file(&|name: &str| std::env::var(name).ok(), seen_file)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: self.fetch_timeout,
            enclosures_only: self.enclosures_only,
        }
    }
}

/// Get the directory where the executable is located
fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
}

fn load_dotenv() {
    // Try to load .env from executable's directory first
    if let Some(dir) = exe_dir() {
        let env_path = dir.join(".env");
        if env_path.exists() {
            dotenvy::from_path(&env_path).ok();
        }
    }
    // Fall back to current directory
    dotenvy::dotenv().ok();
}

/// Override first, then `FEEDER_SEEN_FILE`, then the default under `$HOME`.
fn resolve_seen_file<V>(var: &V, seen_file: Option<PathBuf>) -> FeederResult<PathBuf>
where
    V: Fn(&str) -> Option<String>,
{
    if let Some(path) = seen_file.or_else(|| var("FEEDER_SEEN_FILE").map(PathBuf::from)) {
        return Ok(path);
    }

    let home = var("HOME")
        .filter(|h| !h.is_empty())
        .ok_or_else(|| FeederError::MissingEnvVar("HOME".to_string()))?;
    Ok(Path::new(&home).join(DEFAULT_SEEN_FILE))
}

/// Check that a feed is an http(s)/file URL or a local path.
///
/// Paths are not required to exist yet; a missing file fails its fetch each
/// cycle like any other unreachable feed.
pub fn validate_feed_url(feed: &str) -> FeederResult<()> {
    match Url::parse(feed) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => Ok(()),
        Ok(url) => Err(FeederError::InvalidUrl(format!(
            "{} (unsupported scheme {})",
            feed,
            url.scheme()
        ))),
        Err(_) if !feed.trim().is_empty() => Ok(()),
        Err(e) => Err(FeederError::InvalidUrl(format!("{}: {}", feed, e))),
    }
}

fn split_feed_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One feed per line; blank lines and `#` comments are skipped.
fn read_feeds_file(path: &Path) -> FeederResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        FeederError::Config(format!("cannot read feeds file {}: {}", path.display(), e))
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn parse_secs(name: &str, value: &str) -> FeederResult<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(FeederError::Config(format!(
            "{} must be a positive number of seconds, got '{}'",
            name, value
        ))),
    }
}

fn parse_bool(name: &str, value: &str) -> FeederResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(FeederError::Config(format!(
            "{} must be true or false, got '{}'",
            name, value
        ))),
    }
}
