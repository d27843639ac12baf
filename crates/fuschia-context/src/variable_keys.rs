use std::collections::HashMap;

/// Stable `_nodes.*` namespace key for every node in a workflow, computed
/// once when the workflow is built rather than per node completion. Two
/// nodes whose sanitized names collide get an append-only numeric suffix
/// assigned in node-definition order, so the mapping never depends on which
/// of the two finishes first — racing completions would otherwise be able
/// to produce a different suffix assignment from one run to the next.
#[derive(Debug, Clone, Default)]
pub struct VariableKeys {
    keys: HashMap<String, String>,
}

impl VariableKeys {
    /// `nodes` must be iterated in workflow-definition order (not hash-map
    /// order) for the suffixing to be deterministic.
    pub fn build<'a>(nodes: impl Iterator<Item = (&'a str, &'a str)>) -> Self {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut keys = HashMap::new();

        for (node_id, name) in nodes {
            let sanitized = sanitize(name);
            let count = seen.entry(sanitized.clone()).or_insert(0);
            let key = if *count == 0 {
                sanitized.clone()
            } else {
                format!("{sanitized}_{count}")
            };
            *count += 1;
            keys.insert(node_id.to_string(), key);
        }

        Self { keys }
    }

    pub fn get(&self, node_id: &str) -> Option<&str> {
        self.keys.get(node_id).map(|s| s.as_str())
    }
}

fn sanitize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
