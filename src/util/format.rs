//! Number formatting utilities.

/// Format a percentage, no decimals.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.0}%")
}

/// Format a composite score to three decimals.
#[must_use]
pub fn format_score(value: f64) -> String {
    format!("{value:.3}")
}

/// Format a block height with thousands separators.
#[must_use]
pub fn format_height(value: u64) -> String {
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

/// Shorten a block hash to `0x1234…abcd`.
#[must_use]
pub fn short_hash(hash: &str) -> String {
    if hash.len() <= 14 || !hash.is_char_boundary(6) || !hash.is_char_boundary(hash.len() - 4) {
        return hash.to_string();
    }
    format!("{}…{}", &hash[..6], &hash[hash.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_separators() {
        assert_eq!(format_height(0), "0");
        assert_eq!(format_height(999), "999");
        assert_eq!(format_height(19_000_123), "19,000,123");
    }

    #[test]
    fn hash_shortening() {
        assert_eq!(short_hash("0xabc"), "0xabc");
        assert_eq!(
            short_hash("0x88e96d4537bea4d9c05d12549907b32561d3bf31f45aae734cdc119f13406cb6"),
            "0x88e9…6cb6"
        );
    }

    #[test]
    fn percent_and_score() {
        assert_eq!(format_percent(66.6), "67%");
        assert_eq!(format_score(0.81234), "0.812");
    }
}
