use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Shared state threaded through graph steps.
///
/// Keys are strings; values are JSON for maximum flexibility. Steps see a
/// snapshot and return a [`StepUpdate`]; the engine merges updates by
/// plain per-field overwrite, so later steps see earlier updates. A step
/// reading a missing field should treat it as empty rather than fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    data: HashMap<String, serde_json::Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from initial data.
    pub fn from_map(data: HashMap<String, serde_json::Value>) -> Self {
        Self { data }
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Get a value as a list, empty if absent or not a list.
    pub fn get_list(&self, key: &str) -> &[serde_json::Value] {
        self.data
            .get(key)
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Set a string value.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data
            .insert(key.into(), serde_json::Value::String(value.into()));
    }

    /// Apply a step's field overwrites. Fields not mentioned are untouched.
    pub fn apply(&mut self, update: &StepUpdate) {
        for (k, v) in &update.fields {
            self.data.insert(k.clone(), v.clone());
        }
    }

    /// The underlying data map.
    pub fn data(&self) -> &HashMap<String, serde_json::Value> {
        &self.data
    }
}

/// Partial result of one step: explicit field overwrites plus trace lines.
///
/// The trace is a first-class accumulator, not a context field: the engine
/// appends each step's lines onto the run trace itself, so no step can
/// lose the log by overwriting a conventional field.
#[derive(Debug, Clone, Default)]
pub struct StepUpdate {
    pub(crate) fields: HashMap<String, serde_json::Value>,
    pub(crate) trace: Vec<String>,
}

impl StepUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a context field.
    pub fn set(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Overwrite a context field with a string.
    pub fn set_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.into(), serde_json::Value::String(value.into()));
        self
    }

    /// Append a line to the run trace.
    pub fn trace(mut self, line: impl Into<String>) -> Self {
        self.trace.push(line.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.trace.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut ctx = Context::new();
        ctx.set_str("name", "Alice");
        ctx.set("count", serde_json::json!(42));

        assert_eq!(ctx.get_str("name"), Some("Alice"));
        assert_eq!(ctx.get("count"), Some(&serde_json::json!(42)));
        assert_eq!(ctx.get("missing"), None);
        assert!(ctx.get_list("missing").is_empty());
    }

    #[test]
    fn test_apply_overwrites_only_mentioned_fields() {
        let mut ctx = Context::new();
        ctx.set_str("kept", "original");
        ctx.set_str("replaced", "original");

        let update = StepUpdate::new().set_str("replaced", "new");
        ctx.apply(&update);

        assert_eq!(ctx.get_str("kept"), Some("original"));
        assert_eq!(ctx.get_str("replaced"), Some("new"));
    }

    #[test]
    fn test_from_map() {
        let mut map = HashMap::new();
        map.insert("priority".into(), serde_json::json!("minimize_travel"));
        let ctx = Context::from_map(map);
        assert_eq!(ctx.get_str("priority"), Some("minimize_travel"));
    }

    #[test]
    fn test_update_collects_trace_lines() {
        let update = StepUpdate::new()
            .set_str("parsed", "yes")
            .trace("parsing request")
            .trace("parsed 4 constraints");
        assert_eq!(update.trace.len(), 2);
        assert_eq!(update.fields.len(), 1);
        assert!(!update.is_empty());
    }
}
