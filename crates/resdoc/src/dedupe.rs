//! Deduplication of included resource objects.
//!
//! A record reachable through several relationship paths is marshaled once per
//! path, and each sighting may have expanded a different subset of its own
//! relationships. Sightings are merged member by member so the final included
//! list does not depend on traversal order.

use crate::{RelationshipData, RelationshipEntry, ResourceObject};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{trace, warn};

/// A keyed collection of document members.
pub trait Members {
    /// Member value type.
    type Member: PartialEq;

    /// Mutable access to the member named `key`.
    fn member_mut(&mut self, key: &str) -> Option<&mut Self::Member>;

    /// Insert a member.
    fn insert_member(&mut self, key: String, value: Self::Member);
}

impl Members for Map<String, Value> {
    type Member = Value;

    fn member_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.get_mut(key)
    }

    fn insert_member(&mut self, key: String, value: Value) {
        self.insert(key, value);
    }
}

impl<V: PartialEq> Members for BTreeMap<String, V> {
    type Member = V;

    fn member_mut(&mut self, key: &str) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn insert_member(&mut self, key: String, value: V) {
        self.insert(key, value);
    }
}

/// Merge `incoming` members into `existing`.
///
/// A member missing from `existing` is always taken. A zero incoming value
/// never replaces a recorded one. A non-zero incoming value replaces a zero
/// one, and replaces a different non-zero one too; the keys of such conflicts
/// are returned.
pub fn shallow_merge<M: Members>(
    existing: &mut M,
    incoming: impl IntoIterator<Item = (String, M::Member)>,
    is_zero: fn(&M::Member) -> bool,
) -> Vec<String> {
    let mut conflicts = Vec::new();
    for (key, value) in incoming {
        match existing.member_mut(&key) {
            None => existing.insert_member(key, value),
            Some(current) => {
                if is_zero(&value) || *current == value {
                    continue;
                }
                if !is_zero(current) {
                    conflicts.push(key);
                }
                *current = value;
            }
        }
    }
    conflicts
}

/// Whether an attribute value carries no information.
pub fn is_attribute_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Whether a relationship entry carries no linkage.
pub fn is_relationship_zero(entry: &RelationshipEntry) -> bool {
    match &entry.data {
        None => true,
        Some(RelationshipData::Many(refs)) => refs.is_empty(),
        Some(RelationshipData::One(_)) => false,
    }
}

/// Collapse resource objects sharing `(kind, id)` into one merged object.
///
/// Objects with an empty id are dropped. The output keeps the order in which
/// each key was first seen.
pub fn dedupe_included(docs: Vec<ResourceObject>) -> Vec<ResourceObject> {
    let mut out: Vec<ResourceObject> = Vec::with_capacity(docs.len());
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for doc in docs {
        if doc.id.is_empty() {
            trace!(kind = %doc.kind, "dropping included resource without id");
            continue;
        }
        let key = (doc.kind.clone(), doc.id.clone());
        let Some(&slot) = index.get(&key) else {
            index.insert(key, out.len());
            out.push(doc);
            continue;
        };

        let existing = &mut out[slot];
        let mut conflicts = shallow_merge(&mut existing.attributes, doc.attributes, is_attribute_zero);
        conflicts.extend(shallow_merge(
            &mut existing.relationships,
            doc.relationships,
            is_relationship_zero,
        ));
        if !conflicts.is_empty() {
            warn!(
                kind = %existing.kind,
                id = %existing.id,
                members = ?conflicts,
                "included resource seen with conflicting values; keeping the last"
            );
        }
    }

    out
}
