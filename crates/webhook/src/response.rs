//! Response shaping and audit redaction.

/// Truncate `s` to at most `max_bytes`, respecting UTF-8 boundaries.
pub fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Redact `Authorization` (and cookie) header values before a request is
/// written into an Execution Record's request snapshot.
pub fn redact_sensitive_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            if k.eq_ignore_ascii_case("authorization") || k.eq_ignore_ascii_case("cookie") {
                (k.clone(), "<redacted>".to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

pub fn request_snapshot(method: &str, url: &str, headers: &[(String, String)], body: Option<&str>, limit: usize) -> String {
    let redacted = redact_sensitive_headers(headers);
    let header_text: String = redacted
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("; ");
    let snapshot = format!(
        "{method} {url}\n{header_text}\n{}",
        body.unwrap_or_default()
    );
    truncate_bytes(&snapshot, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_authorization_header() {
        let headers = vec![("Authorization".to_string(), "Bearer secret".to_string())];
        let redacted = redact_sensitive_headers(&headers);
        assert_eq!(redacted[0].1, "<redacted>");
    }

    #[test]
    fn truncate_respects_utf8_boundaries() {
        let s = "héllo world";
        let truncated = truncate_bytes(s, 3);
        assert!(std::str::from_utf8(truncated.as_bytes()).is_ok());
    }
}
