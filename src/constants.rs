/// Countries the trend engine can answer for, with display names.
pub const SUPPORTED_COUNTRIES: [(&str, &str); 3] =
    [("MX", "México"), ("CR", "Costa Rica"), ("ES", "España")];

/// Allowed values for `window_days` in a trend query.
pub const WINDOW_CHOICES: [i32; 4] = [7, 30, 90, 365];

/// Upper bound on `window_days + baseline_days` (five years of daily data).
pub const MAX_TOTAL_DAYS: i32 = 1825;

/// Cache key schema version. Bump when the cached payload shape changes.
pub const CACHE_VERSION: &str = "v4";

#[must_use]
pub fn is_supported_country(code: &str) -> bool {
    SUPPORTED_COUNTRIES.iter().any(|(c, _)| *c == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_countries() {
        assert!(is_supported_country("MX"));
        assert!(is_supported_country("CR"));
        assert!(is_supported_country("ES"));
        assert!(!is_supported_country("US"));
        assert!(!is_supported_country("mx"));
    }
}
