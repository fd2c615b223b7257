//! Pipeline configuration.

use chrono_tz::Tz;
use tracing::info;

use crate::defaults;
use crate::error::{Error, Result};
use crate::scoring::default_keywords;

/// Settings for the detection stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// IANA timezone every timestamp is expressed in.
    pub timezone: Tz,
    /// Minimum confidence score for acceptance.
    pub score_threshold: u8,
    /// Hour assigned to dates without a time.
    pub default_hour: u32,
    /// Display-length limit for event titles.
    pub title_max_chars: usize,
    /// Leading body characters scanned for keywords.
    pub body_scan_chars: usize,
    /// Event keywords (lowercase).
    pub keywords: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timezone: defaults::TIMEZONE,
            score_threshold: defaults::SCORE_THRESHOLD,
            default_hour: defaults::DEFAULT_HOUR,
            title_max_chars: defaults::TITLE_MAX_CHARS,
            body_scan_chars: defaults::BODY_SCAN_CHARS,
            keywords: default_keywords(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MAILCAL_TIMEZONE` / `TIMEZONE` | `Asia/Kolkata` | IANA timezone |
    /// | `MAILCAL_SCORE_THRESHOLD` | `2` | Acceptance threshold (0-6) |
    /// | `MAILCAL_DEFAULT_HOUR` | `9` | Hour for date-only matches |
    /// | `MAILCAL_TITLE_MAX_CHARS` | `120` | Title display limit |
    /// | `MAILCAL_BODY_SCAN_CHARS` | `300` | Body prefix scanned for keywords |
    /// | `MAILCAL_KEYWORDS` | built-in | Comma-separated keyword list |
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(name) = env_string("MAILCAL_TIMEZONE").or_else(|| env_string("TIMEZONE")) {
            config.timezone = parse_timezone(&name)?;
        }
        if let Some(v) = env_parse::<u8>("MAILCAL_SCORE_THRESHOLD")? {
            config.score_threshold = v;
        }
        if let Some(v) = env_parse::<u32>("MAILCAL_DEFAULT_HOUR")? {
            config.default_hour = v;
        }
        if let Some(v) = env_parse::<usize>("MAILCAL_TITLE_MAX_CHARS")? {
            config.title_max_chars = v;
        }
        if let Some(v) = env_parse::<usize>("MAILCAL_BODY_SCAN_CHARS")? {
            config.body_scan_chars = v;
        }
        if let Some(list) = env_string("MAILCAL_KEYWORDS") {
            config.keywords = parse_keywords(&list);
        }

        config.validate()?;
        info!(
            timezone = config.timezone.name(),
            score_threshold = config.score_threshold,
            keyword_count = config.keywords.len(),
            "Pipeline configuration loaded"
        );
        Ok(config)
    }

    /// Reject settings the stages cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.score_threshold > defaults::MAX_SCORE {
            return Err(Error::Config(format!(
                "score threshold {} exceeds maximum score {}",
                self.score_threshold,
                defaults::MAX_SCORE
            )));
        }
        if self.default_hour > 23 {
            return Err(Error::Config(format!(
                "default hour {} is not a valid hour",
                self.default_hour
            )));
        }
        if self.title_max_chars == 0 {
            return Err(Error::Config("title limit must be positive".into()));
        }
        if self.keywords.is_empty() {
            return Err(Error::Config("keyword list is empty".into()));
        }
        Ok(())
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }

    pub fn with_score_threshold(mut self, threshold: u8) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_default_hour(mut self, hour: u32) -> Self {
        self.default_hour = hour;
        self
    }

    pub fn with_title_max_chars(mut self, max: usize) -> Self {
        self.title_max_chars = max;
        self
    }

    pub fn with_body_scan_chars(mut self, chars: usize) -> Self {
        self.body_scan_chars = chars;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| Error::Config(format!("unknown timezone '{}': {}", name, e)))
}

/// Split a comma-separated keyword list, lowercasing and dropping blanks.
pub fn parse_keywords(list: &str) -> Vec<String> {
    list.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Non-empty environment variable.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parsed environment variable; a present but malformed value is an error.
pub fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(None),
    }
}
