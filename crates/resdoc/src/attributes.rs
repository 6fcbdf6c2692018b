//! Attribute projection: a record's attribute-role fields to and from a JSON
//! object.
//!
//! Nested records stored as attributes go through the same functions, so a
//! nested struct honours the same naming, suppression and `omit_empty` rules
//! as a top-level one.

use crate::field::{Access, Record};
use crate::{path, ResdocError, ResdocResult};
use serde_json::{Map, Value};

/// Build the `attributes` object of `record`.
pub fn project<T: Record>(record: &T) -> ResdocResult<Map<String, Value>> {
    let mut attrs = Map::new();
    for field in T::fields() {
        let Access::Attribute {
            encode, is_empty, ..
        } = field.access
        else {
            continue;
        };
        if field.meta.omit_empty && is_empty(record) {
            continue;
        }
        let value = encode(record).map_err(|e| e.with_prefix(&path!(field.meta.name)))?;
        attrs.insert(field.meta.name.to_owned(), value);
    }
    Ok(attrs)
}

/// Decode the members of `attrs` into the matching attribute fields of `record`.
///
/// Fields without a member keep their current value; unknown members are ignored.
pub fn apply<T: Record>(record: &mut T, attrs: &Map<String, Value>) -> ResdocResult<()> {
    for field in T::fields() {
        let Access::Attribute { decode, .. } = field.access else {
            continue;
        };
        if let Some(value) = attrs.get(field.meta.name) {
            decode(record, value).map_err(|e| e.with_prefix(&path!(field.meta.name)))?;
        }
    }
    Ok(())
}

/// Encode a record stored as an attribute value.
pub fn encode_record<T: Record>(record: &T) -> ResdocResult<Value> {
    project(record).map(Value::Object)
}

/// Decode a record stored as an attribute value; `null` yields the default.
pub fn decode_record<T: Record>(value: &Value) -> ResdocResult<T> {
    let mut record = T::default();
    match value {
        Value::Null => {}
        Value::Object(attrs) => apply(&mut record, attrs)?,
        other => return Err(ResdocError::type_mismatch("object", other)),
    }
    Ok(record)
}
