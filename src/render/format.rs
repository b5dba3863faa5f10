//! Unit formatting. Every function here is total over its input type.

use chrono::{DateTime, FixedOffset, Utc};

/// Largest percentage shown; anything above is displayed as this.
const MAX_DISPLAY_PERCENT: f64 = 999.9;

const FILLED: char = '\u{2588}';
const EMPTY: char = '\u{2591}';

/// Thousands-separated integer (e.g. 1234567 -> "1,234,567").
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Dollar amount with two decimals (e.g. "$3.45").
pub fn format_cost(cost: f64) -> String {
    format!("${:.2}", cost)
}

fn display_percent(ratio: f64) -> f64 {
    if ratio.is_nan() {
        return 0.0;
    }
    (ratio * 100.0).clamp(0.0, MAX_DISPLAY_PERCENT)
}

/// `value` as a percentage of `total` with one decimal. A non-positive
/// total reads as "0.0%".
pub fn format_percent(value: f64, total: f64) -> String {
    if total <= 0.0 {
        return "0.0%".to_string();
    }
    format_ratio(value / total)
}

/// A ratio as a one-decimal percentage (0.697 -> "69.7%").
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.1}%", display_percent(ratio))
}

/// A ratio as a whole percentage, for the compact title.
pub fn format_ratio_whole(ratio: f64) -> String {
    format!("{:.0}%", display_percent(ratio))
}

/// Minutes as "<1m", "42m" or "2h 5m".
pub fn format_minutes(minutes: f64) -> String {
    if minutes.is_nan() || minutes < 1.0 {
        return "<1m".to_string();
    }
    let whole = minutes as u64;
    if whole < 60 {
        return format!("{}m", whole);
    }
    format!("{}h {}m", whole / 60, whole % 60)
}

/// Fixed-width bar. The ratio is clamped to [0, 1] first; the filled count
/// rounds down.
pub fn bar_graph(ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let filled = ((ratio * width as f64).floor() as usize).min(width);
    let mut out = String::with_capacity(width * 3);
    out.extend(std::iter::repeat(FILLED).take(filled));
    out.extend(std::iter::repeat(EMPTY).take(width - filled));
    out
}

/// 12-hour wall-clock time in the given offset (e.g. "3:07 PM").
pub fn format_clock(time: DateTime<Utc>, offset: FixedOffset) -> String {
    time.with_timezone(&offset).format("%-I:%M %p").to_string()
}

/// Cut `s` to `max` characters, marking the cut with an ellipsis.
pub fn truncate_label(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('\u{2026}');
    out
}

/// Cut a message to at most `max` characters, without an ellipsis.
pub fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(bar: &str) -> usize {
        bar.chars().filter(|c| *c == FILLED).count()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(13248), "13,248");
        assert_eq!(format_number(220000), "220,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(3.45), "$3.45");
        assert_eq!(format_cost(18.0), "$18.00");
        assert_eq!(format_cost(0.0), "$0.00");
        assert_eq!(format_cost(0.142857), "$0.14");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(13248.0, 19000.0), "69.7%");
        assert_eq!(format_percent(3.45, 18.0), "19.2%");
        assert_eq!(format_percent(5.0, 0.0), "0.0%");
        assert_eq!(format_percent(5.0, -2.0), "0.0%");
        assert_eq!(format_percent(19000.0, 19000.0), "100.0%");
    }

    #[test]
    fn test_format_ratio_clamps_for_display() {
        assert_eq!(format_ratio(-0.5), "0.0%");
        assert_eq!(format_ratio(1.25), "125.0%");
        assert_eq!(format_ratio(50.0), "999.9%");
        assert_eq!(format_ratio(f64::NAN), "0.0%");
        assert_eq!(format_ratio_whole(0.697), "70%");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(0.0), "<1m");
        assert_eq!(format_minutes(0.99), "<1m");
        assert_eq!(format_minutes(-4.0), "<1m");
        assert_eq!(format_minutes(1.0), "1m");
        assert_eq!(format_minutes(59.9), "59m");
        assert_eq!(format_minutes(60.0), "1h 0m");
        assert_eq!(format_minutes(134.5), "2h 14m");
    }

    #[test]
    fn test_bar_graph_endpoints() {
        assert_eq!(bar_graph(0.0, 10), "\u{2591}".repeat(10));
        assert_eq!(bar_graph(1.0, 10), "\u{2588}".repeat(10));
        assert_eq!(bar_graph(0.55, 10).chars().count(), 10);
        assert_eq!(filled(&bar_graph(0.55, 10)), 5);
    }

    #[test]
    fn test_bar_graph_clamps() {
        assert_eq!(bar_graph(-1.0, 16), bar_graph(0.0, 16));
        assert_eq!(bar_graph(7.5, 16), bar_graph(1.0, 16));
        assert_eq!(bar_graph(f64::NAN, 4), bar_graph(0.0, 4));
    }

    #[test]
    fn test_bar_graph_monotonic() {
        let mut last = 0;
        for i in 0..=200 {
            let n = filled(&bar_graph(i as f64 / 200.0, 16));
            assert!(n >= last);
            last = n;
        }
        assert_eq!(last, 16);
    }

    #[test]
    fn test_format_clock() {
        let t = DateTime::parse_from_rfc3339("2026-03-01T14:07:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_clock(t, FixedOffset::east_opt(0).unwrap()), "2:07 PM");
        assert_eq!(
            format_clock(t, FixedOffset::west_opt(5 * 3600).unwrap()),
            "9:07 AM"
        );
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("claude-opus-4", 22), "claude-opus-4");
        assert_eq!(
            truncate_label("claude-3-5-sonnet-20241022", 22),
            "claude-3-5-sonnet-2024\u{2026}"
        );
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("abcdef", 3), "abc");
        assert_eq!(clip("ab", 3), "ab");
    }
}
