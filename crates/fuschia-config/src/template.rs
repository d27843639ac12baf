use std::collections::HashMap;

use serde_json::Value;

use crate::error::TemplateError;

/// Workflow-level variable bag: the declared `variables` map, plus whatever
/// the scheduler layers in at runtime (`trigger_data`, the `_nodes.*`
/// per-node output namespace).
pub type Variables = HashMap<String, Value>;

/// Resolved credential fields, keyed by credential id (as a string, since
/// JSON object keys must be strings).
pub type CredentialMap = HashMap<String, Value>;

/// Renders every `{{dotted.path}}` string leaf in `config` against
/// `variables` and `credentials`. Pure function: no `Environment` is kept
/// around, no state survives the call. Non-string leaves and leaves with no
/// `{{` pass through unchanged.
pub fn resolve_node_config(
    config: &Value,
    variables: &Variables,
    credentials: &CredentialMap,
) -> Result<Value, TemplateError> {
    let mut context = serde_json::Map::new();
    for (key, value) in variables {
        context.insert(key.clone(), value.clone());
    }
    context.insert(
        "credentials".to_string(),
        Value::Object(credentials.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
    );
    let context = Value::Object(context);

    resolve_value(config, &context, "$")
}

fn resolve_value(value: &Value, context: &Value, path: &str) -> Result<Value, TemplateError> {
    match value {
        Value::String(s) => resolve_string(s, context, path),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child_path = format!("{path}.{key}");
                out.insert(key.clone(), resolve_value(v, context, &child_path)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                let child_path = format!("{path}[{idx}]");
                out.push(resolve_value(item, context, &child_path)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(s: &str, context: &Value, path: &str) -> Result<Value, TemplateError> {
    if !s.contains("{{") {
        return Ok(Value::String(s.to_string()));
    }
    let env = minijinja::Environment::new();
    let rendered = env
        .render_str(s, context)
        .map_err(|source| TemplateError::Render {
            path: path.to_string(),
            source,
        })?;
    Ok(Value::String(rendered))
}
