use chrono::{DateTime, Utc};

/// Formats a value to `digits` significant digits, fixed notation. Matches
/// the display convention used across the panels: `to_precision(1.23, 4)` is
/// "1.230", `to_precision(0.000034, 3)` is "0.0000340".
pub fn to_precision(value: f64, digits: u32) -> String {
    let digits = digits.max(1);
    if value == 0.0 || !value.is_finite() {
        return format!("{:.*}", (digits - 1) as usize, 0.0);
    }
    let exponent = value.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
    format!("{:.*}", decimals, value)
}

/// "+5.00%" / "-3.21%".
pub fn signed_pct(change: f64) -> String {
    if change >= 0.0 {
        format!("+{:.2}%", change)
    } else {
        format!("{:.2}%", change)
    }
}

/// Compact large numbers: 1.23K / 4.56M / 7.89B.
pub fn compact_number(value: f64) -> String {
    if value >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{}", value)
    }
}

/// "abcdef...wxyz" shortening for addresses and transaction hashes.
pub fn short_address(address: &str, head: usize, tail: usize) -> String {
    if address.len() <= head + tail {
        return address.to_string();
    }
    format!(
        "{}...{}",
        &address[..head],
        &address[address.len() - tail..]
    )
}

fn elapsed_seconds(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_seconds().max(0)
}

/// Compact age used in the new-pairs column: "42s", "3m", "2h", "5d".
pub fn age_short_at(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = elapsed_seconds(then, now);
    if seconds < 5 {
        return "just now".to_string();
    }
    let (value, unit) = split_units(seconds);
    format!("{}{}", value, unit)
}

pub fn age_short(then: DateTime<Utc>) -> String {
    age_short_at(then, Utc::now())
}

/// "3h ago" style used by the detail view.
pub fn time_ago_at(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = elapsed_seconds(then, now);
    if seconds < 5 {
        return "just now".to_string();
    }
    let (value, unit) = split_units(seconds);
    format!("{}{} ago", value, unit)
}

pub fn time_ago(then: DateTime<Utc>) -> String {
    time_ago_at(then, Utc::now())
}

fn split_units(seconds: i64) -> (i64, &'static str) {
    if seconds >= 31_536_000 {
        (seconds / 31_536_000, "y")
    } else if seconds >= 2_592_000 {
        (seconds / 2_592_000, "mo")
    } else if seconds >= 86_400 {
        (seconds / 86_400, "d")
    } else if seconds >= 3_600 {
        (seconds / 3_600, "h")
    } else if seconds >= 60 {
        (seconds / 60, "m")
    } else {
        (seconds, "s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn to_precision_matches_panel_rendering() {
        assert_eq!(to_precision(1.23, 4), "1.230");
        assert_eq!(to_precision(172.48, 4), "172.5");
        assert_eq!(to_precision(0.000034, 3), "0.0000340");
        assert_eq!(to_precision(0.0, 4), "0.000");
    }

    #[test]
    fn signed_pct_carries_explicit_plus() {
        assert_eq!(signed_pct(5.0), "+5.00%");
        assert_eq!(signed_pct(-3.214), "-3.21%");
        assert_eq!(signed_pct(0.0), "+0.00%");
    }

    #[test]
    fn compact_number_scales_units() {
        assert_eq!(compact_number(1_234_000_000.0), "1.23B");
        assert_eq!(compact_number(4_560_000.0), "4.56M");
        assert_eq!(compact_number(7_890.0), "7.89K");
        assert_eq!(compact_number(42.0), "42");
    }

    #[test]
    fn short_address_keeps_tiny_inputs() {
        assert_eq!(short_address("abc", 6, 4), "abc");
        assert_eq!(
            short_address("So11111111111111111111111111111111111111112", 6, 4),
            "So1111...1112"
        );
    }

    #[test]
    fn ages_round_down_to_largest_unit() {
        let now = Utc::now();
        assert_eq!(age_short_at(now - Duration::seconds(2), now), "just now");
        assert_eq!(age_short_at(now - Duration::seconds(42), now), "42s");
        assert_eq!(age_short_at(now - Duration::hours(7), now), "7h");
        assert_eq!(time_ago_at(now - Duration::minutes(90), now), "1h ago");
        assert_eq!(time_ago_at(now - Duration::days(3), now), "3d ago");
    }
}
