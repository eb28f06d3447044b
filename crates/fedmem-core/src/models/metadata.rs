//! Tagged-tree metadata, per Design Notes §9: keep it as a JSON value at the
//! wire boundary and parse module-specific views out of it on demand.

use serde_json::{Map, Value};

/// Free-form, module-typed metadata. Always carries a `type` tag and a
/// `categories` list (spec §3 invariant b); everything else is per-module.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub Value);

impl Default for Metadata {
    fn default() -> Self {
        Metadata(Value::Object(Map::new()))
    }
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_mut(&mut self) -> &mut Map<String, Value> {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        self.0.as_object_mut().expect("just ensured object")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|m| m.get(key))
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.object_mut().insert(key.to_string(), value);
    }

    /// Insert `value` under `key` only if `key` is absent. Used to apply
    /// auto-computed fields without overwriting caller-supplied ones
    /// (spec §4.1: "the caller's metadata always wins").
    pub fn fill_if_absent(&mut self, key: &str, value: Value) {
        let map = self.object_mut();
        map.entry(key.to_string()).or_insert(value);
    }

    /// Removes `key` if present. Used to drop stale auto-computed fields
    /// before recomputing them from new content.
    pub fn remove(&mut self, key: &str) {
        self.object_mut().remove(key);
    }

    pub fn type_tag(&self) -> Option<&str> {
        self.get("type").and_then(|v| v.as_str())
    }

    pub fn categories(&self) -> Vec<String> {
        self.get("categories")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn string_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Evaluate a simple equality/containment predicate against a dotted
    /// metadata path, used by `searchByMetadata` filters (spec §4.1).
    pub fn matches_path(&self, path: &str, expected: &Value) -> bool {
        let mut current = &self.0;
        for segment in path.split('.') {
            match current.as_object().and_then(|m| m.get(segment)) {
                Some(v) => current = v,
                None => return false,
            }
        }
        if let Some(arr) = current.as_array() {
            return arr.contains(expected);
        }
        current == expected
    }

    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    pub fn from_json_str(s: &str) -> Self {
        Metadata(serde_json::from_str(s).unwrap_or(Value::Object(Map::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fill_if_absent_does_not_overwrite() {
        let mut m = Metadata::new();
        m.set("category", json!("caller-chosen"));
        m.fill_if_absent("category", json!("auto-chosen"));
        assert_eq!(m.get("category"), Some(&json!("caller-chosen")));
    }

    #[test]
    fn fill_if_absent_fills_when_missing() {
        let mut m = Metadata::new();
        m.fill_if_absent("category", json!("auto-chosen"));
        assert_eq!(m.get("category"), Some(&json!("auto-chosen")));
    }

    #[test]
    fn matches_path_supports_nested_and_list_containment() {
        let mut m = Metadata::new();
        m.set("type", json!("project"));
        m.set("categories", json!(["work", "urgent"]));
        assert!(m.matches_path("type", &json!("project")));
        assert!(m.matches_path("categories", &json!("urgent")));
        assert!(!m.matches_path("categories", &json!("absent")));
        assert!(!m.matches_path("missing.path", &json!("x")));
    }

    #[test]
    fn round_trips_through_json_string() {
        let mut m = Metadata::new();
        m.set("type", json!("technical"));
        let s = m.to_json_string();
        let back = Metadata::from_json_str(&s);
        assert_eq!(m, back);
    }
}
