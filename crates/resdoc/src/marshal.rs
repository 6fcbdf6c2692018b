//! Record graphs to resource documents.

use crate::attributes::project;
use crate::dedupe::dedupe_included;
use crate::field::{read_id, Access, Record};
use crate::relationship::Handle;
use crate::{Document, RelationshipEntry, ResdocError, ResdocResult, ResourceObject, ResourceRef};
use serde_json::{Map, Value};
use std::any::TypeId;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

/// State of one top-level marshal call.
///
/// `visited` holds the identity (type and address) of every related record
/// already entered; a record seen again contributes only its reference, which
/// breaks cycles. `included` accumulates every related resource object.
#[derive(Debug, Default)]
pub struct Marshaler {
    visited: HashSet<(TypeId, usize)>,
    included: Vec<ResourceObject>,
}

impl Marshaler {
    /// Create an empty marshaler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the resource object of `record`, descending into its relationships.
    pub fn marshal_node<T: Record>(&mut self, record: &T) -> ResdocResult<ResourceObject> {
        let (kind, id) = read_id(record)?;
        let attributes = project(record)?;

        let mut relationships = BTreeMap::new();
        for field in T::fields() {
            let Access::Relation { marshal, .. } = field.access else {
                continue;
            };
            let name = field.meta.name;
            if relationships.contains_key(name) {
                return Err(ResdocError::DuplicateRelationName {
                    name: name.to_owned(),
                });
            }
            let data = marshal(record, self)?;
            relationships.insert(name.to_owned(), RelationshipEntry { data });
        }

        Ok(ResourceObject {
            kind: kind.to_owned(),
            id,
            attributes,
            relationships,
        })
    }

    /// Reference the record behind `handle`, marshaling it into the included
    /// list on first sight.
    pub fn reference<H: Handle>(&mut self, handle: &H) -> ResdocResult<ResourceRef> {
        handle.with_target(|target| self.visit(target))
    }

    fn visit<T: Record>(&mut self, target: &T) -> ResdocResult<ResourceRef> {
        let (kind, id) = read_id(target)?;
        let identity = (TypeId::of::<T>(), target as *const T as usize);
        if !self.visited.insert(identity) {
            trace!(kind, id = %id, "related record already visited; emitting reference only");
            return Ok(ResourceRef::new(kind, id));
        }
        let doc = self.marshal_node(target)?;
        self.included.push(doc);
        Ok(ResourceRef::new(kind, id))
    }

    /// Start a new independent graph traversal, keeping the included list.
    pub fn reset_visited(&mut self) {
        self.visited.clear();
    }

    /// Finish the call: the deduplicated included list.
    pub fn into_included(self) -> Vec<ResourceObject> {
        dedupe_included(self.included)
    }
}

/// Marshal one record into a document.
pub fn marshal_one<H: Handle>(record: &H) -> ResdocResult<Document> {
    let mut m = Marshaler::new();
    let data = record.with_target(|target| m.marshal_node(target))?;
    let sightings = m.included.len();
    let included = m.into_included();
    debug!(
        kind = %data.kind,
        id = %data.id,
        sightings,
        included = included.len(),
        "marshaled resource"
    );
    Ok(Document::one(data, included))
}

/// Marshal a list of records into one document.
///
/// Every record is traversed independently; the included list is shared and
/// deduplicated once at the end.
pub fn marshal_many<H: Handle>(records: &[H]) -> ResdocResult<Document> {
    let mut m = Marshaler::new();
    let mut data = Vec::with_capacity(records.len());
    for record in records {
        m.reset_visited();
        data.push(record.with_target(|target| m.marshal_node(target))?);
    }
    let sightings = m.included.len();
    let included = m.into_included();
    debug!(
        resources = data.len(),
        sightings,
        included = included.len(),
        "marshaled resource list"
    );
    Ok(Document::many(data, included))
}

/// Marshal one record to JSON bytes.
pub fn to_vec_one<H: Handle>(record: &H) -> ResdocResult<Vec<u8>> {
    marshal_one(record)?.to_vec()
}

/// Marshal a list of records to JSON bytes.
pub fn to_vec_many<H: Handle>(records: &[H]) -> ResdocResult<Vec<u8>> {
    marshal_many(records)?.to_vec()
}

/// Marshal one record to a JSON string.
pub fn to_string_one<H: Handle>(record: &H) -> ResdocResult<String> {
    Ok(serde_json::to_string(&marshal_one(record)?)?)
}

/// Marshal a list of records to a JSON string.
pub fn to_string_many<H: Handle>(records: &[H]) -> ResdocResult<String> {
    Ok(serde_json::to_string(&marshal_many(records)?)?)
}

/// Add a top-level `meta` object to an already marshaled document.
pub fn mix_in_meta(source: &[u8], meta: Map<String, Value>) -> ResdocResult<Vec<u8>> {
    let mut raw: Map<String, Value> = serde_json::from_slice(source)?;
    raw.insert("meta".to_owned(), Value::Object(meta));
    Ok(serde_json::to_vec(&raw)?)
}
