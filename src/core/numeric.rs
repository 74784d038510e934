/// Turns a raw rate token such as `" 34.7600 "` or `"1,234.50*"` into a float.
///
/// Everything but ASCII digits and `.` is dropped, then the longest leading
/// decimal is parsed, so `"1.2.3"` reads as `1.2`. Tokens with nothing
/// parsable left yield `0.0`.
pub fn clean_rate(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let leading = match cleaned.match_indices('.').nth(1) {
        Some((second_dot, _)) => &cleaned[..second_dot],
        None => cleaned.as_str(),
    };

    leading.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_rate() {
        assert_eq!(clean_rate("34.76"), 34.76);
        assert_eq!(clean_rate("  33.8900\n"), 33.89);
        assert_eq!(clean_rate("1,234.50"), 1234.5);
        assert_eq!(clean_rate("THB 0.2230"), 0.223);
        assert_eq!(clean_rate("1.2.3"), 1.2);
        assert_eq!(clean_rate(".5"), 0.5);
    }

    #[test]
    fn test_clean_rate_without_digits() {
        assert_eq!(clean_rate(""), 0.0);
        assert_eq!(clean_rate("-"), 0.0);
        assert_eq!(clean_rate("N/A"), 0.0);
        assert_eq!(clean_rate("."), 0.0);
    }

    #[test]
    fn test_clean_rate_drops_sign() {
        assert_eq!(clean_rate("-12.5"), 12.5);
    }
}
