

/// Number of decimal digits kept in relevance figures.
pub const SCORE_DECIMALS: i32 = 5;


#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}


#[inline]
pub fn safe_truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Round a relevance figure to [`SCORE_DECIMALS`] decimal digits.
#[inline]
pub fn round_score(value: f64) -> f64 {
    let factor = 10f64.powi(SCORE_DECIMALS);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_multibyte() {
        assert_eq!(safe_truncate("Привет мир", 6), "Привет");
        assert_eq!(safe_truncate("hi", 10), "hi");
    }

    #[test]
    fn test_safe_truncate_ellipsis() {
        assert_eq!(safe_truncate_ellipsis("catch fish in Maine", 5), "catch...");
        assert_eq!(safe_truncate_ellipsis("trout", 10), "trout");
    }

    #[test]
    fn test_round_score_keeps_five_digits() {
        assert_eq!(round_score(0.879_123_456), 0.87912);
        assert_eq!(round_score(0.123_455_9), 0.12346);
        assert_eq!(round_score(0.0), 0.0);
        assert_eq!(format!("{:.5}", round_score(0.5)), "0.50000");
    }
}
