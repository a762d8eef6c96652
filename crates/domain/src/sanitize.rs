//! Error sanitization.
//!
//! Every error string that can reach the caller or be persisted in an
//! Execution Record passes through [`sanitize_error`] first: filesystem
//! paths, database connection strings, and raw stack frames are removed,
//! then the result is truncated to 500 characters.

const MAX_ERROR_CHARS: usize = 500;

/// Strip information that would leak process internals into a
/// caller-visible or persisted error string.
pub fn sanitize_error(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        if is_stack_frame(line) {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&redact_paths_and_connection_strings(line));
    }
    truncate_chars(out.trim(), MAX_ERROR_CHARS)
}

fn is_stack_frame(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("at ")
        || trimmed.starts_with("0:")
        || trimmed.starts_with("stack backtrace:")
        || trimmed.contains(".rs:")
            && (trimmed.contains("::") || trimmed.starts_with(char::is_numeric))
}

fn redact_paths_and_connection_strings(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    for word in line.split_whitespace() {
        if is_connection_string(word) {
            result.push_str("<redacted>");
        } else if is_filesystem_path(word) {
            result.push_str("<path>");
        } else {
            result.push_str(word);
        }
        result.push(' ');
    }
    result.trim_end().to_string()
}

fn is_connection_string(word: &str) -> bool {
    const SCHEMES: &[&str] = &[
        "postgres://", "postgresql://", "mysql://", "mongodb://", "mongodb+srv://", "redis://",
        "amqp://",
    ];
    SCHEMES.iter().any(|s| word.starts_with(s))
}

fn is_filesystem_path(word: &str) -> bool {
    let stripped = word.trim_matches(|c: char| matches!(c, '"' | '\'' | ',' | ';' | ':'));
    (stripped.starts_with('/') && stripped.len() > 1 && !stripped.starts_with("//"))
        || (stripped.len() > 2
            && stripped.as_bytes()[1] == b':'
            && (stripped.as_bytes()[2] == b'\\' || stripped.as_bytes()[2] == b'/'))
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_postgres_connection_string() {
        let out = sanitize_error("failed to connect: postgres://user:pw@host:5432/db");
        assert!(!out.contains("user:pw"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn redacts_unix_path() {
        let out = sanitize_error("open failed: /var/lib/secrets/tenant.key not found");
        assert!(!out.contains("/var/lib/secrets"));
    }

    #[test]
    fn drops_stack_frame_lines() {
        let raw = "panic at lib.rs:42\n   at sandbox::run (sandbox.rs:12)\n0: backtrace frame";
        let out = sanitize_error(raw);
        assert!(!out.contains("backtrace frame"));
    }

    #[test]
    fn truncates_to_500_chars() {
        let raw = "e".repeat(10_000);
        let out = sanitize_error(&raw);
        assert_eq!(out.chars().count(), 500);
    }

    #[test]
    fn passes_through_plain_messages() {
        let out = sanitize_error("snippet exceeds 50KiB limit");
        assert_eq!(out, "snippet exceeds 50KiB limit");
    }
}
