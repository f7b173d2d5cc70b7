use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::memory::default_memory_path;

pub const DEFAULT_MAX_AGE_HOURS: f64 = 2.5;
pub const DEFAULT_MIN_WORD_COUNT: usize = 50;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// How the age filter treats an item whose `pubDate` is missing or unparsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndatedPolicy {
    /// Keep the item, as if it were just published.
    #[default]
    Fresh,
    /// Drop the item, as if it were older than the age threshold.
    Stale,
    /// Drop the item as malformed.
    Reject,
}

impl FromStr for UndatedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fresh" => Ok(UndatedPolicy::Fresh),
            "stale" => Ok(UndatedPolicy::Stale),
            "reject" => Ok(UndatedPolicy::Reject),
            other => anyhow::bail!(
                "Unknown undated item policy: {}. Use 'fresh', 'stale' or 'reject'",
                other
            ),
        }
    }
}

/// Thresholds applied by the article selector
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRules {
    pub max_age: chrono::Duration,
    pub min_word_count: usize,
    pub undated: UndatedPolicy,
    pub sort_by_date: bool,
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            max_age: max_age_from_hours(DEFAULT_MAX_AGE_HOURS)
                .unwrap_or_else(|_| chrono::Duration::minutes(150)),
            min_word_count: DEFAULT_MIN_WORD_COUNT,
            undated: UndatedPolicy::default(),
            sort_by_date: false,
        }
    }
}

/// Yandex Cloud credentials gating narration. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechCredentials {
    pub api_key: Option<String>,
    pub folder_id: Option<String>,
}

impl SpeechCredentials {
    pub fn new(api_key: Option<String>, folder_id: Option<String>) -> Self {
        Self {
            api_key: non_blank(api_key),
            folder_id: non_blank(folder_id),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.api_key.is_some() && self.folder_id.is_some()
    }
}

/// Where the feed document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    Http(String),
    /// A `file://` URL, for replaying a saved feed.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed: FeedLocation,
    pub memory_file: PathBuf,
    pub output_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub selection: SelectionRules,
    pub speech: SpeechCredentials,
}

impl Config {
    /// Read the environment (after loading `.env`); values returned by
    /// `overrides` take precedence.
    pub fn from_env<F>(overrides: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| overrides(key).or_else(|| env::var(key).ok()))
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let feed_url = non_blank(lookup("RSS_URL")).context(
            "RSS_URL not found.\n\n\
            To fix this, create ~/.config/news-shorts/.env with:\n  \
            RSS_URL=https://example.com/rss.xml\n  \
            YC_API_KEY=your_key_here\n  \
            YC_FOLDER_ID=your_folder_here",
        )?;
        let feed = parse_feed_location(&feed_url)?;

        let memory_file = non_blank(lookup("MEMORY_FILE"))
            .map(PathBuf::from)
            .unwrap_or_else(default_memory_path);

        let output_dir = non_blank(lookup("OUTPUT_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let fetch_timeout_secs: u64 = parse_or(&lookup, "RSS_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?;

        let max_age_hours: f64 = parse_or(&lookup, "MAX_RSS_AGE_HOURS", DEFAULT_MAX_AGE_HOURS)?;
        let min_word_count = parse_or(&lookup, "MIN_ARTICLE_WORD_COUNT", DEFAULT_MIN_WORD_COUNT)?;
        let undated = parse_or(&lookup, "UNDATED_ITEMS", UndatedPolicy::default())?;
        let sort_by_date = match non_blank(lookup("SORT_FEED_BY_DATE")) {
            Some(value) => parse_flag(&value).context("Invalid value for SORT_FEED_BY_DATE")?,
            None => false,
        };

        let selection = SelectionRules {
            max_age: max_age_from_hours(max_age_hours).context("Invalid MAX_RSS_AGE_HOURS")?,
            min_word_count,
            undated,
            sort_by_date,
        };

        let speech = SpeechCredentials::new(lookup("YC_API_KEY"), lookup("YC_FOLDER_ID"));

        Ok(Self {
            feed,
            memory_file,
            output_dir,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            selection,
            speech,
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/news-shorts/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("news-shorts").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

/// Convert a threshold in (possibly fractional) hours to a duration.
pub fn max_age_from_hours(hours: f64) -> Result<chrono::Duration> {
    if !hours.is_finite() || hours < 0.0 {
        anyhow::bail!("age threshold must be a non-negative number of hours, got {}", hours);
    }
    let millis = (hours * 3_600_000.0).round() as i64;
    Ok(chrono::Duration::milliseconds(millis))
}

fn parse_feed_location(feed_url: &str) -> Result<FeedLocation> {
    let parsed = url::Url::parse(feed_url)
        .with_context(|| format!("RSS_URL is not a valid URL: {}", feed_url))?;

    match parsed.scheme() {
        "http" | "https" => Ok(FeedLocation::Http(parsed.to_string())),
        "file" => parsed
            .to_file_path()
            .map(FeedLocation::File)
            .map_err(|_| anyhow::anyhow!("RSS_URL is not a usable file path: {}", feed_url)),
        scheme => anyhow::bail!("Unsupported RSS_URL scheme: {}", scheme),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank(lookup(key)) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {:?} ({})", key, raw, e)),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected true or false, got {}", other),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
