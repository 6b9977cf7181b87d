//! Interval duration format used in config files and chat commands.
//!
//! Accepts compound unit-suffixed segments: `"45s"`, `"10m"`, `"1h30m"`,
//! `"2d"`. Formatting produces the canonical compact form, so `"90m"` and
//! `"1h30m"` both format back as `"1h30m"`.

use std::time::Duration;

use crate::error::{PricewatchError, Result};

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * 60;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Parse an interval string like `"10m"`, `"1h30m"` or `"2d"`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(PricewatchError::InvalidInterval("empty string".into()));
    }

    let mut total_secs: u64 = 0;
    let mut digits = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        if digits.is_empty() {
            return Err(PricewatchError::InvalidInterval(format!(
                "'{input}': unit '{c}' has no value"
            )));
        }

        let value: u64 = digits.parse().map_err(|_| {
            PricewatchError::InvalidInterval(format!("'{input}': value out of range"))
        })?;
        digits.clear();

        let multiplier = match c {
            's' => 1,
            'm' => SECS_PER_MINUTE,
            'h' => SECS_PER_HOUR,
            'd' => SECS_PER_DAY,
            other => {
                return Err(PricewatchError::InvalidInterval(format!(
                    "'{input}': unknown unit '{other}'"
                )));
            }
        };

        total_secs = total_secs.saturating_add(value.saturating_mul(multiplier));
    }

    if !digits.is_empty() {
        return Err(PricewatchError::InvalidInterval(format!(
            "'{input}': trailing value without a unit"
        )));
    }

    if total_secs == 0 {
        return Err(PricewatchError::InvalidInterval(format!(
            "'{input}': interval must be positive"
        )));
    }

    Ok(Duration::from_secs(total_secs))
}

/// Format a duration in the canonical compact form (`"1h30m"`, `"2d"`, `"0s"`).
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if secs == 0 {
        return "0s".into();
    }

    let days = secs / SECS_PER_DAY;
    secs %= SECS_PER_DAY;
    let hours = secs / SECS_PER_HOUR;
    secs %= SECS_PER_HOUR;
    let minutes = secs / SECS_PER_MINUTE;
    secs %= SECS_PER_MINUTE;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days}d"));
    }
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if secs > 0 {
        out.push_str(&format!("{secs}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::from_secs(90 * 60)
        );
        assert_eq!(
            parse_duration("1d12h").unwrap(),
            Duration::from_secs(36 * 3600)
        );
    }

    #[test]
    fn test_equivalent_spellings_format_identically() {
        let a = parse_duration("90m").unwrap();
        let b = parse_duration("1h30m").unwrap();
        assert_eq!(a, b);
        assert_eq!(format_duration(a), "1h30m");
        assert_eq!(format_duration(b), "1h30m");
    }

    #[test]
    fn test_round_trip_is_stable() {
        for s in ["45s", "10m", "1h30m", "2d", "1d2h3m4s"] {
            let d = parse_duration(s).unwrap();
            let formatted = format_duration(d);
            assert_eq!(parse_duration(&formatted).unwrap(), d);
        }
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("0m").is_err());
    }

    #[test]
    fn test_format_zero() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
