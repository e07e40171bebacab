//! The set of confirmed mentions embedded in the raw text.
//!
//! Mentions carry no offsets: a mention is "live" for as long as its `value`
//! occurs somewhere in the raw text. Every edit is followed by [`MentionRegistry::reconcile`],
//! which silently evicts mentions whose text has disappeared. Eviction is final;
//! retyping the same text does not bring a mention back.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;


/// A confirmed reference to an external entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// The display text, exactly as it appears in the raw text.
    pub value: String,
    /// The entity category, e.g. `user` or `contact`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Mention {
    pub fn new(value: impl Into<String>, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: kind.into(),
            id: id.into(),
            avatar: None,
            icon: None,
        }
    }

    pub fn key(&self) -> MentionKey {
        MentionKey::new(&self.kind, &self.id)
    }
}

/// The identity of a mention: its `(type, id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MentionKey {
    pub kind: String,
    pub id: String,
}

impl MentionKey {
    pub fn new(kind: &str, id: &str) -> Self {
        Self { kind: kind.to_string(), id: id.to_string() }
    }
}

/// Lookups commonly hand back numeric ids; accept both `"5"` and `5`.
pub(crate) fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Str(String),
        Int(i64),
        Uint(u64),
        Float(f64),
    }
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Str(s) => s,
        RawId::Int(i) => i.to_string(),
        RawId::Uint(u) => u.to_string(),
        RawId::Float(f) => f.to_string(),
    })
}


/// Confirmed mentions in insertion order.
#[derive(Debug, Default, Clone)]
pub struct MentionRegistry {
    mentions: IndexMap<MentionKey, Mention>,
}

impl MentionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a confirmed mention.
    ///
    /// Re-confirming an entity that is already registered updates its data but
    /// keeps its original position. Returns true if the entity was new.
    pub fn insert(&mut self, mention: Mention) -> bool {
        self.mentions.insert(mention.key(), mention).is_none()
    }

    pub fn contains(&self, kind: &str, id: &str) -> bool {
        self.mentions.contains_key(&MentionKey::new(kind, id))
    }

    /// Evicts every mention whose value no longer occurs in `raw_text`.
    ///
    /// Returns the evicted mentions. Never adds anything.
    pub fn reconcile(&mut self, raw_text: &str) -> Vec<Mention> {
        let mut evicted = Vec::new();
        self.mentions.retain(|_, mention| {
            let present = !mention.value.is_empty() && raw_text.contains(mention.value.as_str());
            if !present {
                evicted.push(mention.clone());
            }
            present
        });
        for mention in &evicted {
            debug!("Evicted mention {}:{} ({:?}); its text is no longer present", mention.kind, mention.id, mention.value);
        }
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mention> {
        self.mentions.values()
    }

    pub fn to_vec(&self) -> Vec<Mention> {
        self.mentions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    pub fn clear(&mut self) {
        self.mentions.clear();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> Mention {
        Mention::new("Bob Jones", "user", "5")
    }

    #[test]
    fn test_reconcile_evicts_removed_text() {
        let mut registry = MentionRegistry::new();
        registry.insert(bob());
        registry.insert(Mention::new("Ann", "user", "6"));

        let evicted = registry.reconcile("hi Bob Jon and Ann");
        assert_eq!(evicted, vec![bob()]);
        assert!(!registry.contains("user", "5"));
        assert!(registry.contains("user", "6"));

        // Retyping the text does not resurrect the mention.
        assert!(registry.reconcile("hi Bob Jones and Ann").is_empty());
        assert!(!registry.contains("user", "5"));
    }

    #[test]
    fn test_insert_keeps_order_and_identity() {
        let mut registry = MentionRegistry::new();
        assert!(registry.insert(bob()));
        assert!(registry.insert(Mention::new("Ann", "user", "6")));
        // Same (type, id) with a different value replaces in place.
        assert!(!registry.insert(Mention::new("Bobby", "user", "5")));
        let values: Vec<_> = registry.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["Bobby", "Ann"]);
        // Same id under a different type is a different entity.
        assert!(registry.insert(Mention::new("Team 5", "group", "5")));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_empty_value_is_never_live() {
        let mut registry = MentionRegistry::new();
        registry.insert(Mention::new("", "user", "1"));
        assert_eq!(registry.reconcile("anything").len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_deserialize_numeric_id() {
        let mention: Mention = serde_json::from_str(r#"{"value": "Bob", "type": "user", "id": 5}"#).unwrap();
        assert_eq!(mention.id, "5");
        assert_eq!(mention.key(), MentionKey::new("user", "5"));
        let mention: Mention = serde_json::from_str(r#"{"value": "Bob", "type": "user", "id": "abc", "avatar": "a.png"}"#).unwrap();
        assert_eq!(mention.id, "abc");
        assert_eq!(mention.avatar.as_deref(), Some("a.png"));
    }
}
