//! Display formatting for addresses, amounts, durations and dates.

use chrono::{DateTime, Utc};

const MIST_PER_SUI: u64 = 1_000_000_000;

const MINUTE_MS: f64 = 60_000.0;
const HOUR_MS: f64 = 3_600_000.0;
const DAY_MS: f64 = 86_400_000.0;

/// Abbreviates an address to `0x1234...abcd`.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Formats a MIST amount in SUI with at most two decimals and digit grouping.
///
/// Examples:
/// - `1_500_000_000` → `"1.5"`
/// - `1_234_000_000_000` → `"1,234"`
pub fn mist_to_sui(mist: u64) -> String {
    // hundredths of a SUI, rounded half up
    let cents = (u128::from(mist) * 100 + u128::from(MIST_PER_SUI) / 2) / u128::from(MIST_PER_SUI);
    let whole = group_thousands(cents / 100);
    match cents % 100 {
        0 => whole,
        frac if frac % 10 == 0 => format!("{}.{}", whole, frac / 10),
        frac => format!("{}.{:02}", whole, frac),
    }
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Human duration of a subscription period, e.g. `"1 month"`, `"2 weeks"`.
pub fn format_duration(ms: u64) -> String {
    let ms = ms as f64;
    let days = ms / DAY_MS;

    let (count, unit) = if days >= 365.0 {
        ((days / 365.0).round(), "year")
    } else if days >= 30.0 {
        ((days / 30.0).round(), "month")
    } else if days >= 7.0 {
        ((days / 7.0).round(), "week")
    } else if days >= 1.0 {
        (days.round(), "day")
    } else if ms >= HOUR_MS {
        ((ms / HOUR_MS).round(), "hour")
    } else {
        return format!("{} min", (ms / MINUTE_MS).round() as u64);
    };

    let count = count as u64;
    if count > 1 {
        format!("{} {}s", count, unit)
    } else {
        format!("{} {}", count, unit)
    }
}

/// Calendar date of a millisecond timestamp, e.g. `"March 5, 2025"`.
pub fn format_date(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|date| date.format("%B %-d, %Y").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_abbreviated() {
        assert_eq!(
            short_address("0x1234567890abcdef1234567890abcdef"),
            "0x1234...cdef"
        );
        assert_eq!(short_address("0x12"), "0x12");
        assert_eq!(short_address(""), "");
    }

    #[test]
    fn mist_amounts() {
        assert_eq!(mist_to_sui(0), "0");
        assert_eq!(mist_to_sui(1_000_000_000), "1");
        assert_eq!(mist_to_sui(1_500_000_000), "1.5");
        assert_eq!(mist_to_sui(1_234_567_890), "1.23");
        assert_eq!(mist_to_sui(5_000_000), "0.01");
        assert_eq!(mist_to_sui(1_234_000_000_000), "1,234");
    }

    #[test]
    fn durations() {
        const DAY: u64 = 86_400_000;
        assert_eq!(format_duration(30 * DAY), "1 month");
        assert_eq!(format_duration(14 * DAY), "2 weeks");
        assert_eq!(format_duration(365 * DAY), "1 year");
        assert_eq!(format_duration(DAY), "1 day");
        assert_eq!(format_duration(3 * 3_600_000), "3 hours");
        assert_eq!(format_duration(90_000), "2 min");
    }

    #[test]
    fn dates() {
        assert_eq!(format_date(1_741_132_800_000), "March 5, 2025");
    }
}
