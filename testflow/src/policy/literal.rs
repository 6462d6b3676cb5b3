//! Parsing of duration literals such as `"10s"` or `"24h"`.

use crate::errors::DurationParseError;
use std::time::Duration;

/// Parses a time bound literal.
///
/// Accepts the `humantime` forms (`500ms`, `10s`, `5m`, `24h`, `1h30m`).
/// Zero durations are rejected because a bound must be positive.
///
/// # Errors
///
/// Returns [`DurationParseError::Invalid`] for text `humantime` rejects and
/// an error for a zero duration.
pub fn parse_bound(literal: &str) -> Result<Duration, DurationParseError> {
    let trimmed = literal.trim();
    let bound = humantime::parse_duration(trimmed).map_err(|e| DurationParseError::Invalid {
        literal: literal.to_string(),
        reason: e.to_string(),
    })?;

    if bound.is_zero() {
        return Err(DurationParseError::NotPositive(literal.to_string()));
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_bounds() {
        assert_eq!(parse_bound("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_bound("24h").unwrap(), Duration::from_secs(24 * 3600));
        assert_eq!(parse_bound("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_bound(" 2m ").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_compound_bound() {
        assert_eq!(parse_bound("1h30m").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_bound("ten seconds"),
            Err(DurationParseError::Invalid { .. })
        ));
        assert!(parse_bound("").is_err());
    }

    #[test]
    fn test_parse_rejects_zero() {
        assert!(matches!(
            parse_bound("0s"),
            Err(DurationParseError::NotPositive(_))
        ));
    }
}
