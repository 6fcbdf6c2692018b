//! Per-type field tables.
//!
//! `#[derive(Record)]` produces one [`Field`] per struct field: the resolved
//! metadata (role, public name, omission flag, codec) plus monomorphic accessors
//! for that role. Every other module walks these tables instead of inspecting
//! values at runtime.

use crate::marshal::Marshaler;
use crate::patch::{PatchKind, PatchTarget, TypedValue};
use crate::unmarshal::Resolver;
use crate::{Path, RelationshipData, ResdocError, ResdocResult};
use serde_json::Value;

/// What a field contributes to a resource document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The identifier field. Its public name is the resource kind.
    Primary,
    /// A member of the `attributes` object.
    Attribute,
    /// A member of the `relationships` object.
    Relation,
    /// Not mapped at all.
    Ignored,
}

/// How a field type converts to and from a generic JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Primitive, collection or struct-like conversion.
    Plain,
    /// The type renders to and parses from a single string.
    Text,
    /// The type owns its whole JSON representation.
    Document,
}

/// Resolved metadata of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    /// Rust identifier of the field.
    pub ident: &'static str,
    /// Public name: attribute or relationship name, or the kind for the primary.
    pub name: &'static str,
    /// Role of the field.
    pub role: Role,
    /// Skip the attribute when the value is empty.
    pub omit_empty: bool,
    /// Codec of the field type.
    pub codec: Codec,
}

/// Accessors for one field, specialised by role.
pub enum Access<T> {
    /// Identifier read and write.
    Primary {
        /// Render the identifier.
        read: fn(&T) -> ResdocResult<String>,
        /// Parse and store the identifier.
        write: fn(&mut T, &str) -> ResdocResult<()>,
    },
    /// Attribute conversion.
    Attribute {
        /// Encode the field value.
        encode: fn(&T) -> ResdocResult<Value>,
        /// Whether the field value is the empty value of its type.
        is_empty: fn(&T) -> bool,
        /// Decode into the field.
        decode: fn(&mut T, &Value) -> ResdocResult<()>,
        /// Resolve a patch addressed at or below this field.
        patch: fn(PatchTarget<'_>) -> ResdocResult<TypedValue>,
    },
    /// Relationship traversal.
    Relation {
        /// Marshal the related record(s), returning the relationship data.
        marshal: fn(&T, &mut Marshaler) -> ResdocResult<Option<RelationshipData>>,
        /// Rebuild the related record(s) from relationship data.
        unmarshal: fn(&mut T, Option<&RelationshipData>, &mut Resolver<'_>) -> ResdocResult<()>,
        /// Resolve a patch addressed at this relationship.
        patch: fn(PatchKind, &Value, &Path) -> ResdocResult<TypedValue>,
    },
    /// No accessors.
    Ignored,
}

/// One entry of a record's field table.
pub struct Field<T> {
    /// Resolved metadata.
    pub meta: FieldMeta,
    /// Role-specific accessors.
    pub access: Access<T>,
}

impl<T> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("meta", &self.meta).finish()
    }
}

/// A type that maps onto a resource object.
///
/// Implemented by `#[derive(Record)]`; the field table is the only thing the
/// engine needs to know about a type.
pub trait Record: Default + 'static {
    /// The field table, in declaration order.
    fn fields() -> Vec<Field<Self>>;
}

/// Metadata of every field of `T`.
pub fn descriptors<T: Record>() -> Vec<FieldMeta> {
    T::fields().into_iter().map(|f| f.meta).collect()
}

/// The primary field of `T`.
pub fn primary<T: Record>() -> ResdocResult<Field<T>> {
    T::fields()
        .into_iter()
        .find(|f| f.meta.role == Role::Primary)
        .ok_or(ResdocError::NoPrimaryField {
            record: std::any::type_name::<T>(),
        })
}

/// The resource kind of `T`.
pub fn kind_of<T: Record>() -> ResdocResult<&'static str> {
    primary::<T>().map(|f| f.meta.name)
}

/// Render the identifier of `record`.
pub(crate) fn read_id<T: Record>(record: &T) -> ResdocResult<(&'static str, String)> {
    let field = primary::<T>()?;
    match field.access {
        Access::Primary { read, .. } => Ok((field.meta.name, read(record)?)),
        _ => Err(ResdocError::NoPrimaryField {
            record: std::any::type_name::<T>(),
        }),
    }
}

/// Store `id` into the primary field of `record`.
///
/// An empty id leaves the field at its default.
pub(crate) fn write_id<T: Record>(record: &mut T, id: &str) -> ResdocResult<()> {
    let field = primary::<T>()?;
    match field.access {
        Access::Primary { write, .. } => {
            if id.is_empty() {
                return Ok(());
            }
            write(record, id)
        }
        _ => Err(ResdocError::NoPrimaryField {
            record: std::any::type_name::<T>(),
        }),
    }
}
