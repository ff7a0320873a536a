//! Runtime configuration read from the environment (and `.env`).

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::gemini::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL};
use crate::youtube::DEFAULT_YOUTUBE_API_BASE;

#[derive(Debug, Clone)]
pub struct Config {
    pub youtube_api_key: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub youtube_api_base: String,
    pub gemini_api_base: String,
    pub bind_addr: String,
    pub export_dir: String,
    /// Unique export file per run instead of one shared file.
    pub export_per_run: bool,
    pub default_max_comments: usize,
    /// Optional cap on requested counts. Unset means any positive count is accepted.
    pub max_comments_limit: Option<usize>,
}

const DEFAULT_MAX_COMMENTS: usize = 100;

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube_api_key: String::new(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            youtube_api_base: DEFAULT_YOUTUBE_API_BASE.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            export_dir: "static/exports".to_string(),
            export_per_run: true,
            default_max_comments: DEFAULT_MAX_COMMENTS,
            max_comments_limit: None,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match non_empty(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}

/// Positive count or `None`. Zero and garbage are ignored with a warning.
fn positive_count(key: &str) -> Option<usize> {
    let raw = non_empty(key)?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!("Ignoring {}={:?}, expected a positive whole number", key, raw);
            None
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let youtube_api_key = non_empty("YOUTUBE_API_KEY").unwrap_or_default();
        if youtube_api_key.is_empty() {
            warn!("YOUTUBE_API_KEY is not set; comment fetches will be rejected by the API");
        }

        let config = Config {
            youtube_api_key,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            youtube_api_base: non_empty("YOUTUBE_API_BASE").unwrap_or(defaults.youtube_api_base),
            gemini_api_base: non_empty("GEMINI_API_BASE").unwrap_or(defaults.gemini_api_base),
            bind_addr: non_empty("BIND_ADDR").unwrap_or(defaults.bind_addr),
            export_dir: non_empty("EXPORT_DIR").unwrap_or(defaults.export_dir),
            export_per_run: parsed_or("EXPORT_PER_RUN", defaults.export_per_run),
            default_max_comments: parsed_or("DEFAULT_MAX_COMMENTS", defaults.default_max_comments),
            max_comments_limit: positive_count("MAX_COMMENTS_LIMIT"),
        };
        config.with_consistent_counts()
    }

    /// Keeps the form default positive and within the cap.
    fn with_consistent_counts(mut self) -> Self {
        let fits = |n: usize| self.max_comments_limit.map_or(true, |limit| n <= limit);
        if self.default_max_comments == 0 || !fits(self.default_max_comments) {
            let replacement = match self.max_comments_limit {
                Some(limit) => DEFAULT_MAX_COMMENTS.min(limit),
                None => DEFAULT_MAX_COMMENTS,
            };
            warn!(
                "DEFAULT_MAX_COMMENTS={} is out of range, using {}",
                self.default_max_comments, replacement
            );
            self.default_max_comments = replacement;
        }
        self
    }
}
