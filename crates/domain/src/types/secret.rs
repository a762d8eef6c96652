use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored, name-addressable encrypted string, scoped to a tenant.
///
/// Plaintext is never a field on this struct, never logged, never
/// persisted outside the ciphertext/iv/tag triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub secret_id: String,
    pub tenant_id: String,
    pub name: String,
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
    pub usage_count: u64,
    pub last_used: Option<DateTime<Utc>>,
}

pub const MAX_SECRET_NAME_CHARS: usize = 128;

/// Secret names must match `^[A-Z][A-Z0-9_]*$`.
pub fn is_valid_secret_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_SECRET_NAME_CHARS {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
