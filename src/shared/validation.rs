//! Validation utilities module
//!
//! Parsing and normalization helpers for gateway settings values.

use std::sync::LazyLock;

use regex::Regex;

/// Fallback provisional-order lifetime when the configured value is unusable
pub const DEFAULT_TEMP_ORDER_TIMEOUT_SECS: u64 = 24 * 3600;

/// Upper bound on the provisional-order lifetime
pub const MAX_TEMP_ORDER_TIMEOUT_SECS: u64 = 365 * 24 * 3600;

static HOURS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*h(?:ours?)?").expect("valid regex"));
static MINUTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*m(?:inutes?)?").expect("valid regex"));
static SECONDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*s(?:econds?)?").expect("valid regex"));
static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").expect("valid regex"));

/// Validation utilities for the application
pub struct ValidationUtils;

impl ValidationUtils {
    /// Parse a human-readable duration ("1h 5m 3s", "3 hours", "2 minutes 1 second") into seconds.
    ///
    /// Only the first occurrence of each unit counts. Unparseable input yields 0.
    pub fn parse_time_to_seconds(input: &str) -> u64 {
        let text = input.trim().to_lowercase();
        let capture = |re: &Regex| -> u64 {
            re.captures(&text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .unwrap_or(0)
        };

        capture(&HOURS)
            .saturating_mul(3600)
            .saturating_add(capture(&MINUTES).saturating_mul(60))
            .saturating_add(capture(&SECONDS))
    }

    /// Provisional-order lifetime in seconds, falling back to 24 hours and capped at a year
    pub fn temp_order_timeout_seconds(input: &str) -> u64 {
        match Self::parse_time_to_seconds(input) {
            0 => DEFAULT_TEMP_ORDER_TIMEOUT_SECS,
            secs => secs.min(MAX_TEMP_ORDER_TIMEOUT_SECS),
        }
    }

    /// Strip the scheme and trailing slashes from a storefront path
    pub fn normalize_storefront_path(path: &str) -> String {
        SCHEME.replace(path.trim(), "").trim_end_matches('/').to_string()
    }

    /// Make an image URL protocol-relative
    pub fn protocol_relative_url(url: &str) -> String {
        url.replace("https://", "//").replace("http://", "//")
    }
}
