use crate::error::{Result, SlipwayError};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a humane duration string: `500ms`, `5s`, `2m`, `1h`, and compound
/// forms like `1m30s`. A bare number is seconds.
pub fn parse(raw: &str) -> Result<Duration> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(SlipwayError::InvalidDuration(raw.to_string()));
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut num = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            num.push(c);
            continue;
        }
        if num.is_empty() {
            return Err(SlipwayError::InvalidDuration(raw.to_string()));
        }
        let value: u64 = num
            .parse()
            .map_err(|_| SlipwayError::InvalidDuration(raw.to_string()))?;
        num.clear();
        let segment = match c {
            'h' => Duration::from_secs(value * 3600),
            's' => Duration::from_secs(value),
            'm' => {
                if chars.peek() == Some(&'s') {
                    chars.next();
                    Duration::from_millis(value)
                } else {
                    Duration::from_secs(value * 60)
                }
            }
            _ => return Err(SlipwayError::InvalidDuration(raw.to_string())),
        };
        total += segment;
    }
    // Trailing digits without a unit (e.g. "1m30") are rejected.
    if !num.is_empty() {
        return Err(SlipwayError::InvalidDuration(raw.to_string()));
    }
    Ok(total)
}

/// Render a duration in the shortest single-unit form that is exact.
pub fn format(d: &Duration) -> String {
    let ms = d.as_millis();
    if ms == 0 {
        return "0s".to_string();
    }
    if ms % 1000 != 0 {
        return format!("{ms}ms");
    }
    let secs = d.as_secs();
    if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

// ---------------------------------------------------------------------------
// Serde helpers (use via #[serde(with = "...")])
// ---------------------------------------------------------------------------

pub mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        d: &Duration,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
