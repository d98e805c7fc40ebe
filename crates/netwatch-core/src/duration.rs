//! Duration strings in Go `time.Duration` syntax: `500ms`, `30s`, `15m`,
//! `1h30m`, `1.5m`.
//!
//! A duration is a sequence of `<number[.fraction]><unit>` terms with units
//! `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare number is read as
//! seconds.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration string like "5s", "500ms", "1h30m", "1.5m".
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    if s.is_empty() {
        return Err(invalid());
    }

    if s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return term_nanos(s, NANOS_PER_SEC)
            .and_then(to_duration)
            .ok_or_else(invalid);
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let split = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(split);
        let split = tail.find(is_number).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(split);

        let nanos = unit_nanos(unit)
            .and_then(|scale| term_nanos(number, scale))
            .ok_or_else(invalid)?;
        total = total.checked_add(nanos).ok_or_else(invalid)?;
        rest = tail;
    }

    to_duration(total).ok_or_else(invalid)
}

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3600 * NANOS_PER_SEC,
        _ => return None,
    })
}

/// `number` (digits with an optional fraction) times `scale` nanoseconds.
fn term_nanos(number: &str, scale: u128) -> Option<u128> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().ok()?
    };

    // Digits past nanosecond precision of an hour cannot matter.
    let mut numerator: u128 = 0;
    let mut denominator: u128 = 1;
    for b in frac.bytes().take(18) {
        numerator = numerator * 10 + u128::from(b - b'0');
        denominator *= 10;
    }

    whole
        .checked_mul(scale)?
        .checked_add(numerator * scale / denominator)
}

fn to_duration(nanos: u128) -> Option<Duration> {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    let subsec = u32::try_from(nanos % NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, subsec))
}

/// Render a duration in the largest unit that represents it exactly.
pub fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() % 1_000_000 != 0 {
        return format!("{d:?}");
    }
    let millis = d.as_millis();
    let secs = d.as_secs();
    if d.subsec_millis() != 0 || secs == 0 {
        format!("{millis}ms")
    } else if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn parse_plain_number_as_seconds() {
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration(" 5m ").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_duration("soon"),
            Err(ConfigError::InvalidDuration(_))
        ));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("5 s").is_err());
        assert!(parse_duration("1h30").is_err());
        assert!(parse_duration("1.5.2m").is_err());
        assert!(parse_duration(".m").is_err());
        assert!(parse_duration("3d").is_err());
    }

    #[test]
    fn parse_compound_terms() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2m30s").unwrap(), Duration::from_secs(150));
        assert_eq!(
            parse_duration("1m500ms").unwrap(),
            Duration::from_millis(60_500)
        );
        assert_eq!(parse_duration("1s250us").unwrap(), Duration::from_micros(1_000_250));
    }

    #[test]
    fn parse_fractional_terms() {
        assert_eq!(parse_duration("1.5m").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("0.5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration(".25h").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("2.5").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_duration("1.5h15m").unwrap(), Duration::from_secs(6300));
    }

    #[test]
    fn parse_rejects_overflow() {
        assert!(parse_duration(&format!("{}h", u64::MAX)).is_err());
    }

    #[test]
    fn format_picks_largest_exact_unit() {
        assert_eq!(format_duration(Duration::from_secs(900)), "15m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::ZERO), "0ms");
    }
}
