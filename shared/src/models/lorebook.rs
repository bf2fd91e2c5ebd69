use super::lenient::{lenient_order, null_as_default, null_as_true};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterBook {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<LorebookEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CharacterBook {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LorebookEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub keys: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub enabled: bool,
    /// Assigned past the current maximum when an entry is added; never renumbered.
    #[serde(default, deserialize_with = "lenient_order")]
    pub insertion_order: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LorebookEntry {
    pub fn new(keys: Vec<String>, content: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            keys,
            content: content.into(),
            comment: comment.into(),
            enabled: true,
            insertion_order: 0,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loose_entries_deserialize() {
        let entry: LorebookEntry = serde_json::from_value(json!({
            "keys": null,
            "content": "Fog.",
            "comment": null,
            "enabled": null,
            "insertion_order": 10.0,
            "position": "before_char"
        }))
        .unwrap();
        assert!(entry.keys.is_empty());
        assert!(entry.comment.is_empty());
        assert!(entry.enabled);
        assert_eq!(entry.insertion_order, 10);
        assert_eq!(entry.extra["position"], "before_char");

        let entry: LorebookEntry =
            serde_json::from_value(json!({ "content": "x", "insertion_order": "7" })).unwrap();
        assert_eq!(entry.insertion_order, 7);
    }

    #[test]
    fn non_numeric_order_is_rejected() {
        let result: Result<LorebookEntry, _> =
            serde_json::from_value(json!({ "content": "x", "insertion_order": [1] }));
        assert!(result.is_err());
    }
}
