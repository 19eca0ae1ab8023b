//! Opaque per-instance payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Application-defined JSON blob attached to an instance.
///
/// The inventory never interprets it except when a combine rule
/// inherits part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomData(String);

impl CustomData {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve a dot-separated path such as `"ammo.loaded"` or `"slots.0"`.
    ///
    /// Returns `None` if the payload is not JSON or the path is missing.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let root: Value = serde_json::from_str(&self.0).ok()?;
        let mut current = &root;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Payload inherited from `source`: the value at `key` if it resolves,
    /// otherwise the whole source payload.
    pub fn inherit(source: &CustomData, key: Option<&str>) -> CustomData {
        if let Some(value) = key.and_then(|k| source.lookup(k)) {
            return CustomData(value.to_string());
        }
        source.clone()
    }
}

impl From<&str> for CustomData {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CustomData {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup() {
        let data = CustomData::new(r#"{"ammo":{"loaded":6,"clips":[2,3]}}"#);

        assert_eq!(data.lookup("ammo.loaded"), Some(json!(6)));
        assert_eq!(data.lookup("ammo.clips.1"), Some(json!(3)));
        assert_eq!(data.lookup("ammo.missing"), None);
        assert_eq!(data.lookup("ammo.loaded.deeper"), None);
    }

    #[test]
    fn test_lookup_not_json() {
        assert_eq!(CustomData::new("battery=40").lookup("battery"), None);
        assert_eq!(CustomData::empty().lookup("x"), None);
    }

    #[test]
    fn test_inherit() {
        let source = CustomData::new(r#"{"battery":{"level":40}}"#);

        assert_eq!(
            CustomData::inherit(&source, Some("battery")).as_str(),
            r#"{"level":40}"#
        );
        // Unresolved path copies the source wholesale
        assert_eq!(CustomData::inherit(&source, Some("charge")), source);
        assert_eq!(CustomData::inherit(&source, None), source);
    }
}
