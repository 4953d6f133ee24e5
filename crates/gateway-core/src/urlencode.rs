//! Minimal percent-encoding for query parameters and redirect URIs —
//! shared by the OAuth redirect builder and the tool query-string
//! builders. No full URL crate needed for the handful of values these
//! callers encode.

/// Percent-encode `value`, leaving unreserved characters (`A-Za-z0-9`,
/// `-_.~`) untouched and escaping everything else as `%XX`.
#[must_use]
pub fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreserved_characters_pass_through() {
        assert_eq!(urlencode("retry-backoff_1.0~x"), "retry-backoff_1.0~x");
    }

    #[test]
    fn reserved_characters_are_percent_encoded() {
        assert_eq!(urlencode("a b/c"), "a%20b%2Fc");
    }
}
