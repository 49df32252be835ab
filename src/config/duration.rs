//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "300s", "300" into a `Duration`.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let (num_str, unit_secs) = if let Some(num_str) = s.strip_suffix('h') {
        (num_str, 3600)
    } else if let Some(num_str) = s.strip_suffix('m') {
        (num_str, 60)
    } else if let Some(num_str) = s.strip_suffix('s') {
        (num_str, 1)
    } else {
        (s, 1)
    };

    let value: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration value: {s}"))?;
    let secs = value
        .checked_mul(unit_secs)
        .with_context(|| format!("Duration out of range: {s}"))?;

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_seconds() {
        assert_eq!(parse_duration("300").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration(" 45 ").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_duration("300s").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("m").is_err());
    }
}
