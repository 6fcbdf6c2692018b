//! Resource documents to records.

use crate::attributes::apply;
use crate::field::{kind_of, write_id, Access, Record};
use crate::relationship::Handle;
use crate::{path, Document, PrimaryData, ResdocError, ResdocResult, ResourceObject, ResourceRef};
use tracing::{debug, trace};

/// Resolves relationship references against the included list of a document.
///
/// The stack holds the `(kind, id)` of every resource currently being
/// expanded. A reference back into the stack resolves to an identifier-only
/// record, so cyclic included graphs terminate.
#[derive(Debug)]
pub struct Resolver<'a> {
    included: &'a [ResourceObject],
    stack: Vec<(String, String)>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over `included`.
    pub fn new(included: &'a [ResourceObject]) -> Self {
        Self {
            included,
            stack: Vec::new(),
        }
    }

    fn find(&self, reference: &ResourceRef) -> Option<&'a ResourceObject> {
        self.included
            .iter()
            .find(|doc| doc.kind == reference.kind && doc.id == reference.id)
    }

    /// Build the record a reference points to.
    ///
    /// The included object is used when present; otherwise the record carries
    /// just the identifier.
    pub fn resolve<T: Record>(&mut self, reference: &ResourceRef) -> ResdocResult<T> {
        let mut record = T::default();
        let key = (reference.kind.clone(), reference.id.clone());

        let expanding = self.stack.contains(&key);
        match self.find(reference) {
            Some(doc) if !expanding => {
                trace!(kind = %reference.kind, id = %reference.id, "expanding included resource");
                self.populate(doc, &mut record)?;
            }
            _ => {
                trace!(
                    kind = %reference.kind,
                    id = %reference.id,
                    expanding,
                    "resolving bare reference"
                );
                check_kind::<T>(&reference.kind)?;
                write_id(&mut record, &reference.id)?;
            }
        }
        Ok(record)
    }

    /// Fill `record` from a resource object: identifier, attributes present
    /// in the object, and relationships present in the object.
    pub fn populate<T: Record>(&mut self, doc: &ResourceObject, record: &mut T) -> ResdocResult<()> {
        check_kind::<T>(&doc.kind)?;
        write_id(record, &doc.id)?;
        apply(record, &doc.attributes)?;

        self.stack.push((doc.kind.clone(), doc.id.clone()));
        let result = self.populate_relationships(doc, record);
        self.stack.pop();
        result
    }

    fn populate_relationships<T: Record>(
        &mut self,
        doc: &ResourceObject,
        record: &mut T,
    ) -> ResdocResult<()> {
        for field in T::fields() {
            let Access::Relation { unmarshal, .. } = field.access else {
                continue;
            };
            if let Some(entry) = doc.relationships.get(field.meta.name) {
                unmarshal(record, entry.data.as_ref(), self)
                    .map_err(|e| e.with_prefix(&path!(field.meta.name)))?;
            }
        }
        Ok(())
    }
}

fn check_kind<T: Record>(found: &str) -> ResdocResult<()> {
    let expected = kind_of::<T>()?;
    if found != expected {
        return Err(ResdocError::KindMismatch {
            expected,
            found: found.to_owned(),
        });
    }
    Ok(())
}

fn single(doc: &Document) -> ResdocResult<&ResourceObject> {
    match &doc.data {
        None => Err(ResdocError::MissingData),
        Some(PrimaryData::One(obj)) => Ok(obj),
        Some(PrimaryData::Many(_)) => Err(ResdocError::invalid_document(
            "expected a single resource object, found a list",
        )),
    }
}

fn list(doc: &Document) -> ResdocResult<&[ResourceObject]> {
    match &doc.data {
        None => Err(ResdocError::MissingData),
        Some(PrimaryData::Many(objs)) => Ok(objs),
        Some(PrimaryData::One(_)) => Err(ResdocError::invalid_document(
            "expected a list of resource objects, found a single object",
        )),
    }
}

/// Fill `target` from a parsed single-resource document.
pub fn decode_document_one<T: Record>(doc: &Document, target: &mut T) -> ResdocResult<()> {
    let obj = single(doc)?;
    Resolver::new(&doc.included).populate(obj, target)?;
    debug!(
        kind = %obj.kind,
        id = %obj.id,
        included = doc.included.len(),
        "unmarshaled resource"
    );
    Ok(())
}

fn build<T: Record>(doc: &Document, obj: &ResourceObject) -> ResdocResult<T> {
    let mut record = T::default();
    Resolver::new(&doc.included).populate(obj, &mut record)?;
    Ok(record)
}

/// Append one record per resource object of a parsed list document.
pub fn decode_document_many<H: Handle>(doc: &Document, targets: &mut Vec<H>) -> ResdocResult<()> {
    let objs = list(doc)?;
    targets.reserve(objs.len());
    for obj in objs {
        targets.push(H::from_target(build(doc, obj)?));
    }
    debug!(
        resources = objs.len(),
        included = doc.included.len(),
        "unmarshaled resource list"
    );
    Ok(())
}

/// Build a fresh record from a parsed single-resource document.
pub fn decode_document_one_as<T: Record>(doc: &Document) -> ResdocResult<T> {
    let mut record = T::default();
    decode_document_one(doc, &mut record)?;
    Ok(record)
}

/// Build fresh records from a parsed list document.
pub fn decode_document_many_as<T: Record>(doc: &Document) -> ResdocResult<Vec<T>> {
    let objs = list(doc)?;
    let records = objs
        .iter()
        .map(|obj| build(doc, obj))
        .collect::<ResdocResult<Vec<T>>>()?;
    debug!(
        resources = records.len(),
        included = doc.included.len(),
        "unmarshaled resource list"
    );
    Ok(records)
}

/// Fill `target` from a single-resource JSON document.
pub fn unmarshal_one<T: Record>(data: &[u8], target: &mut T) -> ResdocResult<()> {
    decode_document_one(&Document::from_slice(data)?, target)
}

/// Append the records of a list JSON document to `targets`.
pub fn unmarshal_many<H: Handle>(data: &[u8], targets: &mut Vec<H>) -> ResdocResult<()> {
    decode_document_many(&Document::from_slice(data)?, targets)
}

/// Build a fresh record from a single-resource JSON document.
pub fn unmarshal_one_as<T: Record>(data: &[u8]) -> ResdocResult<T> {
    decode_document_one_as(&Document::from_slice(data)?)
}

/// Build fresh records from a list JSON document.
pub fn unmarshal_many_as<T: Record>(data: &[u8]) -> ResdocResult<Vec<T>> {
    decode_document_many_as(&Document::from_slice(data)?)
}
