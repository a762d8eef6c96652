//! Secret Resolver: decrypts only the secrets a snippet's
//! source textually references, never the tenant's full secret set.

use serde_json::{json, Map, Value};

use ax_crypto::Ciphertext;
use ax_sandbox::referenced_secret_names;
use ax_store::SecretStore;

/// Returns the `secrets` object to hand to the sandbox job plus the
/// names actually decrypted, for the caller's single bulk usage update.
pub async fn resolve_secrets(
    store: &dyn SecretStore,
    encryption_key: &[u8; 32],
    tenant_id: &str,
    source: &str,
) -> (Value, Vec<String>) {
    let referenced = referenced_secret_names(source);
    if referenced.is_empty() {
        return (Value::Object(Map::new()), Vec::new());
    }

    let available = store.list(tenant_id).await;
    let mut resolved = Map::new();
    let mut used = Vec::new();

    for secret in available {
        if !referenced.contains(&secret.name) {
            continue;
        }
        let ciphertext = Ciphertext {
            ciphertext: secret.ciphertext,
            iv: secret.iv,
            tag: secret.tag,
        };
        match ax_crypto::decrypt(encryption_key, &ciphertext) {
            Ok(plaintext) => {
                let text = String::from_utf8_lossy(&plaintext).into_owned();
                resolved.insert(secret.name.clone(), json!(text));
                used.push(secret.name);
            }
            Err(e) => {
                tracing::error!(tenant_id = %tenant_id, secret = %secret.name, error = %e, "secret decryption failed");
            }
        }
    }

    (Value::Object(resolved), used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    use ax_domain::types::{Secret, TenantCaps};
    use ax_store::error::Result as StoreResult;

    struct FakeSecretStore {
        secrets: Mutex<Vec<Secret>>,
    }

    #[async_trait]
    impl SecretStore for FakeSecretStore {
        async fn list(&self, _tenant_id: &str) -> Vec<Secret> {
            self.secrets.lock().unwrap().clone()
        }

        async fn bulk_increment_usage(&self, _tenant_id: &str, _names: &[String], _now: DateTime<Utc>) -> StoreResult<()> {
            Ok(())
        }

        async fn create(&self, _tenant_id: &str, _name: String, _ciphertext: Ciphertext, _caps: &TenantCaps) -> StoreResult<Secret> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn resolves_only_referenced_secrets() {
        let key = [7u8; 32];
        let api_key = ax_crypto::encrypt(&key, b"shh").unwrap();
        let unused = ax_crypto::encrypt(&key, b"nope").unwrap();

        let store = FakeSecretStore {
            secrets: Mutex::new(vec![
                Secret {
                    secret_id: "s1".into(),
                    tenant_id: "t1".into(),
                    name: "API_KEY".into(),
                    ciphertext: api_key.ciphertext,
                    iv: api_key.iv,
                    tag: api_key.tag,
                    usage_count: 0,
                    last_used: None,
                },
                Secret {
                    secret_id: "s2".into(),
                    tenant_id: "t1".into(),
                    name: "UNUSED".into(),
                    ciphertext: unused.ciphertext,
                    iv: unused.iv,
                    tag: unused.tag,
                    usage_count: 0,
                    last_used: None,
                },
            ]),
        };

        let source = "exports = function(input, secrets) { return secrets.API_KEY; }";
        let (value, used) = resolve_secrets(&store, &key, "t1", source).await;
        assert_eq!(used, vec!["API_KEY".to_string()]);
        assert_eq!(value["API_KEY"], json!("shh"));
        assert!(value.get("UNUSED").is_none());
    }

    #[tokio::test]
    async fn returns_empty_when_no_secret_referenced() {
        let store = FakeSecretStore { secrets: Mutex::new(Vec::new()) };
        let (value, used) = resolve_secrets(&store, &[0u8; 32], "t1", "exports = () => 1;").await;
        assert!(used.is_empty());
        assert_eq!(value, Value::Object(Map::new()));
    }
}
