use async_trait::async_trait;
use fuschia_config::CredentialMap;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential {0:?} not found")]
    NotFound(String),
    #[error("failed to resolve credential {credential_id:?}: {message}")]
    ResolutionFailed { credential_id: String, message: String },
}

/// Resolves opaque credential ids (referenced from node config as
/// `credential_id` / `*_credential_id` keys) into the field values a
/// template can substitute. Injected, never looked up via a global.
#[async_trait]
pub trait CredentialManager: Send + Sync {
    async fn resolve(&self, credential_id: &str) -> Result<Value, CredentialError>;
}

/// Resolves nothing. Used where a workflow has no credential-bearing nodes.
pub struct NoCredentials;

#[async_trait]
impl CredentialManager for NoCredentials {
    async fn resolve(&self, credential_id: &str) -> Result<Value, CredentialError> {
        Err(CredentialError::NotFound(credential_id.to_string()))
    }
}

/// Finds every credential id referenced by a node's config: any string or
/// number value under a key named exactly `credential_id` or ending in
/// `_credential_id`.
pub fn find_credential_refs(config: &Value) -> Vec<String> {
    let mut refs = Vec::new();
    collect(config, &mut refs);
    refs
}

fn collect(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                if key == "credential_id" || key.ends_with("_credential_id") {
                    if let Some(id) = as_id_string(v) {
                        refs.push(id);
                    }
                }
                collect(v, refs);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, refs);
            }
        }
        _ => {}
    }
}

fn as_id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolves every referenced credential id via `manager` and assembles the
/// `CredentialMap` that `resolve_node_config` templates against.
pub async fn build_credential_map(
    config: &Value,
    manager: &dyn CredentialManager,
) -> Result<CredentialMap, CredentialError> {
    let mut map = CredentialMap::new();
    for credential_id in find_credential_refs(config) {
        let fields = manager.resolve(&credential_id).await?;
        map.insert(credential_id, fields);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_direct_and_suffixed_keys() {
        let config = json!({
            "credential_id": "abc",
            "auth": {"slack_credential_id": "xyz"},
            "other": "value",
        });
        let mut refs = find_credential_refs(&config);
        refs.sort();
        assert_eq!(refs, vec!["abc".to_string(), "xyz".to_string()]);
    }
}
