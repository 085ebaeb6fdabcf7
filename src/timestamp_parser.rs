use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses the `dataUpdatedAt` values the portal reports
pub struct TimestampParser;

impl TimestampParser {
    /// Parse an upstream timestamp into UTC.
    /// Accepts RFC 3339 (with `Z` or an offset), compact `+0200` offsets and naive
    /// timestamps, which are taken as UTC.
    pub fn parse(timestamp_str: &str) -> Result<DateTime<Utc>> {
        let trimmed = timestamp_str.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }

        anyhow::bail!("Failed to parse timestamp: {}", timestamp_str)
    }

    /// Parse, falling back to `fallback` when the value is missing or malformed
    pub fn parse_or(timestamp_str: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
        timestamp_str
            .and_then(|raw| Self::parse(raw).ok())
            .unwrap_or(fallback)
    }
}
