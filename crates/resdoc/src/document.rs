//! Wire types of a resource document.
//!
//! ```text
//! {
//!   "data": { "type": "articles", "id": "1",
//!             "attributes": {...},
//!             "relationships": { "author": { "data": { "type": "people", "id": "9" } } } },
//!   "included": [ { "type": "people", "id": "9", ... } ],
//!   "meta": {...}
//! }
//! ```

use crate::{value_type_name, Path, ResdocError, ResdocResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A top-level resource document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    /// Primary data.
    pub data: Option<PrimaryData>,
    /// Related resource objects.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    /// Free-form top-level metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Document {
    /// A document whose primary data is one resource object.
    pub fn one(data: ResourceObject, included: Vec<ResourceObject>) -> Self {
        Self {
            data: Some(PrimaryData::One(data)),
            included,
            meta: None,
        }
    }

    /// A document whose primary data is a list of resource objects.
    pub fn many(data: Vec<ResourceObject>, included: Vec<ResourceObject>) -> Self {
        Self {
            data: Some(PrimaryData::Many(data)),
            included,
            meta: None,
        }
    }

    /// Attach top-level metadata.
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Parse a document, classifying malformed `data` as a shape error rather
    /// than a codec error.
    pub fn from_slice(bytes: &[u8]) -> ResdocResult<Self> {
        let raw: Value = serde_json::from_slice(bytes)?;
        Self::from_value(raw)
    }

    /// Build a document from an already decoded JSON value.
    ///
    /// `null` for `included`, `attributes`, `relationships` or a linkage's
    /// `data` reads as absent. Any other malformed member is reported with its
    /// location, e.g. `missing resource type at $.data.relationships.author.data`.
    pub fn from_value(raw: Value) -> ResdocResult<Self> {
        document(raw).map_err(|e| ResdocError::invalid_document(e.to_string()))
    }

    /// Serialize to JSON bytes.
    pub fn to_vec(&self) -> ResdocResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Primary data: a single resource object or a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    /// Single resource object.
    One(ResourceObject),
    /// List of resource objects.
    Many(Vec<ResourceObject>),
}

/// One record in wire form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceObject {
    /// Resource kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Identifier; empty when the record has none.
    pub id: String,
    /// Attribute members.
    pub attributes: Map<String, Value>,
    /// Relationship members.
    pub relationships: BTreeMap<String, RelationshipEntry>,
}

impl ResourceObject {
    /// The `(kind, id)` reference to this object.
    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.kind.clone(), self.id.clone())
    }
}

/// A `relationships` member.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationshipEntry {
    /// Linkage; `None` renders as `null`.
    pub data: Option<RelationshipData>,
}

/// Relationship linkage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// To-many linkage.
    Many(Vec<ResourceRef>),
    /// To-one linkage.
    One(ResourceRef),
}

/// A `{type, id}` reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceRef {
    /// Resource kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Identifier.
    pub id: String,
}

impl ResourceRef {
    /// Create a reference.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// A malformed member and where it was found.
#[derive(Debug)]
struct ShapeError {
    at: Path,
    message: String,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.at)
    }
}

type Shaped<T> = Result<T, ShapeError>;

fn shape_error(at: &Path, message: impl Into<String>) -> ShapeError {
    ShapeError {
        at: at.clone(),
        message: message.into(),
    }
}

fn object(value: Value, at: &Path) -> Shaped<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(shape_error(
            at,
            format!("expected an object, found {}", value_type_name(&other)),
        )),
    }
}

fn list<T>(value: Value, at: &Path, item: fn(Value, &Path) -> Shaped<T>) -> Shaped<Vec<T>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| item(v, &at.child(i)))
            .collect(),
        other => Err(shape_error(
            at,
            format!("expected an array, found {}", value_type_name(&other)),
        )),
    }
}

/// Remove `key`, reading `null` as absent.
fn member(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    map.remove(key).filter(|v| !v.is_null())
}

fn kind(map: &mut Map<String, Value>, at: &Path) -> Shaped<String> {
    match member(map, "type") {
        Some(Value::String(kind)) => Ok(kind),
        Some(other) => Err(shape_error(
            &at.child("type"),
            format!("resource type must be a string, found {}", value_type_name(&other)),
        )),
        None => Err(shape_error(at, "missing resource type")),
    }
}

/// String or number; absent reads as empty.
fn id(map: &mut Map<String, Value>, at: &Path) -> Shaped<String> {
    match member(map, "id") {
        None => Ok(String::new()),
        Some(Value::String(id)) => Ok(id),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(shape_error(
            &at.child("id"),
            format!("id must be a string or a number, found {}", value_type_name(&other)),
        )),
    }
}

fn resource_ref(value: Value, at: &Path) -> Shaped<ResourceRef> {
    let mut map = object(value, at)?;
    Ok(ResourceRef {
        kind: kind(&mut map, at)?,
        id: id(&mut map, at)?,
    })
}

fn relationship_entry(value: Value, at: &Path) -> Shaped<RelationshipEntry> {
    let mut map = object(value, at)?;
    let at = at.child("data");
    let data = match member(&mut map, "data") {
        None => None,
        Some(many @ Value::Array(_)) => Some(RelationshipData::Many(list(many, &at, resource_ref)?)),
        Some(one) => Some(RelationshipData::One(resource_ref(one, &at)?)),
    };
    Ok(RelationshipEntry { data })
}

fn resource_object(value: Value, at: &Path) -> Shaped<ResourceObject> {
    let mut map = object(value, at)?;
    let kind = kind(&mut map, at)?;
    let id = id(&mut map, at)?;
    let attributes = match member(&mut map, "attributes") {
        Some(attrs) => object(attrs, &at.child("attributes"))?,
        None => Map::new(),
    };
    let mut relationships = BTreeMap::new();
    if let Some(rels) = member(&mut map, "relationships") {
        let at = at.child("relationships");
        for (name, entry) in object(rels, &at)? {
            let entry = relationship_entry(entry, &at.child(name.as_str()))?;
            relationships.insert(name, entry);
        }
    }
    Ok(ResourceObject {
        kind,
        id,
        attributes,
        relationships,
    })
}

fn document(value: Value) -> Shaped<Document> {
    let root = Path::root();
    let mut top = object(value, &root)?;
    let at = root.child("data");
    let data = match member(&mut top, "data") {
        None => None,
        Some(many @ Value::Array(_)) => Some(PrimaryData::Many(list(many, &at, resource_object)?)),
        Some(one @ Value::Object(_)) => Some(PrimaryData::One(resource_object(one, &at)?)),
        Some(other) => {
            return Err(shape_error(
                &at,
                format!("data must be an object or an array, found {}", value_type_name(&other)),
            ))
        }
    };
    let included = match member(&mut top, "included") {
        Some(included) => list(included, &root.child("included"), resource_object)?,
        None => Vec::new(),
    };
    let meta = match member(&mut top, "meta") {
        Some(meta) => Some(object(meta, &root.child("meta"))?),
        None => None,
    };
    Ok(Document {
        data,
        included,
        meta,
    })
}

macro_rules! deserialize_via {
    ($($ty:ty => $parse:expr),+ $(,)?) => {$(
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = Value::deserialize(deserializer)?;
                $parse(value).map_err(serde::de::Error::custom)
            }
        }
    )+};
}

deserialize_via! {
    Document => document,
    ResourceObject => |v| resource_object(v, &Path::root()),
    RelationshipEntry => |v| relationship_entry(v, &Path::root()),
    ResourceRef => |v| resource_ref(v, &Path::root()),
}
