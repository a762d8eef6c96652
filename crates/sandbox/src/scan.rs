//! Secret-reference scanning.
//!
//! The Secret Resolver is invoked only for secrets whose names textually
//! appear in the source, scanned for `secrets.NAME`, `secrets['NAME']`, or
//! `secrets["NAME"]`. This is a purely textual pre-pass over the snippet
//! source, run before the sandbox worker is even spawned, so a secret that
//! the user never references is never decrypted — limiting blast radius if
//! a sandbox escape were ever to occur.

use std::collections::HashSet;

use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"secrets(?:\.([A-Za-z_$][\w$]*)|\[\s*['"]([^'"]+)['"]\s*\])"#)
            .expect("static regex is valid")
    })
}

/// Return the set of secret names referenced in `source`, deduplicated.
/// Case is preserved; callers compare against stored secret names exactly
/// (secret names are themselves validated to be all-uppercase at creation
/// time, so a reference using the wrong case simply resolves nothing).
pub fn referenced_secret_names(source: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    for cap in pattern().captures_iter(source) {
        if let Some(dot) = cap.get(1) {
            names.insert(dot.as_str().to_string());
        } else if let Some(bracket) = cap.get(2) {
            names.insert(bracket.as_str().to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_dotted_reference() {
        let names = referenced_secret_names("const k = secrets.API_KEY;");
        assert!(names.contains("API_KEY"));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn finds_bracketed_references_with_either_quote() {
        let names = referenced_secret_names(r#"secrets['A'] + secrets["B"]"#);
        assert!(names.contains("A"));
        assert!(names.contains("B"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn ignores_unreferenced_secrets() {
        let names = referenced_secret_names("output.x = inputs.a;");
        assert!(names.is_empty());
    }

    #[test]
    fn deduplicates_repeated_references() {
        let names = referenced_secret_names("secrets.TOKEN; if (secrets.TOKEN) {}");
        assert_eq!(names.len(), 1);
    }
}
