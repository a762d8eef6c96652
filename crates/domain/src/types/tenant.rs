use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TenantCaps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
}

/// An installation of the integration for one customer account
/// ("portal" in the upstream terminology).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub tenant_id: String,
    pub status: TenantStatus,
    /// Encrypted OAuth tokens; plaintext never touches this struct.
    pub oauth_tokens_ciphertext: Vec<u8>,
    pub oauth_tokens_iv: Vec<u8>,
    pub oauth_tokens_tag: Vec<u8>,
    pub caps: TenantCaps,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        matches!(self.status, TenantStatus::Active)
    }
}
