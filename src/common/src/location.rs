//! Test port locations.

/// Normalise a port location to `//chassis/card/port`.
///
/// Surrounding slashes are stripped before the `//` prefix is added, so
/// `10.1.1.1/1/1`, `/10.1.1.1/1/1/` and `//10.1.1.1/1/1` all map to the
/// same value. Empty input stays empty.
pub fn normalize_port_location(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("//{trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_prefix() {
        assert_eq!(normalize_port_location("10.1.1.1/1/1"), "//10.1.1.1/1/1");
    }

    #[test]
    fn test_is_idempotent() {
        let once = normalize_port_location("/10.109.123.254/1/1/");
        assert_eq!(once, "//10.109.123.254/1/1");
        assert_eq!(normalize_port_location(&once), once);
    }

    #[test]
    fn test_empty_stays_empty() {
        assert_eq!(normalize_port_location(""), "");
        assert_eq!(normalize_port_location("///"), "");
    }
}
