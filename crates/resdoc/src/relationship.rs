//! Relationship fields: how a related record is held, and with what cardinality.
//!
//! [`Handle`] abstracts over the container a related record lives in (the
//! record itself, `Box`, `Rc`, `Arc`, `RefCell`). [`Relationship`] is
//! implemented by the field types: a handle (to-one), `Option` of a handle
//! (nullable to-one) and `Vec` of handles (to-many).
//!
//! Cyclic graphs are built with `Rc<RefCell<_>>`; the marshaler keys its visited
//! set by the address of the record behind the handle.

use crate::field::{write_id, Record};
use crate::marshal::Marshaler;
use crate::patch::{PatchKind, TypedValue};
use crate::unmarshal::Resolver;
use crate::{
    kind_of, value_type_name, Path, RelationshipData, ResdocError, ResdocResult, ResourceRef,
};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Access to one related record.
pub trait Handle: Sized + 'static {
    /// The record behind the handle.
    type Target: Record;

    /// Run `f` with a shared borrow of the record.
    fn with_target<R>(&self, f: impl FnOnce(&Self::Target) -> ResdocResult<R>) -> ResdocResult<R>;

    /// Wrap a freshly built record.
    fn from_target(target: Self::Target) -> Self;
}

impl<P: Handle> Handle for Box<P> {
    type Target = P::Target;

    fn with_target<R>(&self, f: impl FnOnce(&Self::Target) -> ResdocResult<R>) -> ResdocResult<R> {
        (**self).with_target(f)
    }

    fn from_target(target: Self::Target) -> Self {
        Box::new(P::from_target(target))
    }
}

impl<P: Handle> Handle for Rc<P> {
    type Target = P::Target;

    fn with_target<R>(&self, f: impl FnOnce(&Self::Target) -> ResdocResult<R>) -> ResdocResult<R> {
        (**self).with_target(f)
    }

    fn from_target(target: Self::Target) -> Self {
        Rc::new(P::from_target(target))
    }
}

impl<P: Handle> Handle for Arc<P> {
    type Target = P::Target;

    fn with_target<R>(&self, f: impl FnOnce(&Self::Target) -> ResdocResult<R>) -> ResdocResult<R> {
        (**self).with_target(f)
    }

    fn from_target(target: Self::Target) -> Self {
        Arc::new(P::from_target(target))
    }
}

impl<P: Handle> Handle for RefCell<P> {
    type Target = P::Target;

    fn with_target<R>(&self, f: impl FnOnce(&Self::Target) -> ResdocResult<R>) -> ResdocResult<R> {
        let inner = self.try_borrow().map_err(|_| ResdocError::Borrowed {
            kind: std::any::type_name::<P::Target>(),
        })?;
        inner.with_target(f)
    }

    fn from_target(target: Self::Target) -> Self {
        RefCell::new(P::from_target(target))
    }
}

/// A relationship field type.
pub trait Relationship: Sized + 'static {
    /// Marshal the related record(s) and return the relationship data.
    fn marshal_relation(&self, m: &mut Marshaler) -> ResdocResult<Option<RelationshipData>>;

    /// Rebuild the field from relationship data.
    fn unmarshal_relation(
        &mut self,
        data: Option<&RelationshipData>,
        resolver: &mut Resolver<'_>,
    ) -> ResdocResult<()>;

    /// Decode a patch value addressed at this relationship.
    fn resolve_patch(kind: PatchKind, value: &Value, path: &Path) -> ResdocResult<TypedValue>;
}

/// Read an identifier out of a patch value.
fn patch_id(value: &Value, path: &Path) -> ResdocResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ResdocError::TypeMismatch {
            path: path.clone(),
            expected: "string",
            found: value_type_name(other),
        }),
    }
}

/// Build a handle whose record carries only `id`.
fn bare_handle<H: Handle>(value: &Value, path: &Path) -> ResdocResult<(H, Value)> {
    let id = patch_id(value, path)?;
    let mut target = H::Target::default();
    write_id(&mut target, &id)?;
    let kind = kind_of::<H::Target>()?;
    let json = serde_json::to_value(ResourceRef::new(kind, id))?;
    Ok((H::from_target(target), json))
}

fn expect_one<'d>(data: &'d RelationshipData) -> ResdocResult<&'d ResourceRef> {
    match data {
        RelationshipData::One(r) => Ok(r),
        RelationshipData::Many(_) => Err(ResdocError::invalid_document(
            "expected a single resource reference, found a list",
        )),
    }
}

/// Marshal a to-one relationship held by `handle`.
pub fn marshal_to_one<H: Handle>(
    handle: &H,
    m: &mut Marshaler,
) -> ResdocResult<Option<RelationshipData>> {
    m.reference(handle).map(|r| Some(RelationshipData::One(r)))
}

/// Rebuild a to-one relationship held by value.
///
/// Null data leaves the field untouched: a by-value relationship has no empty
/// state other than its default.
pub fn unmarshal_to_one<H: Handle>(
    handle: &mut H,
    data: Option<&RelationshipData>,
    resolver: &mut Resolver<'_>,
) -> ResdocResult<()> {
    if let Some(data) = data {
        let target = resolver.resolve::<H::Target>(expect_one(data)?)?;
        *handle = H::from_target(target);
    }
    Ok(())
}

/// Decode a patch addressed at a to-one relationship of handle type `H`.
pub fn patch_to_one<H: Handle>(
    kind: PatchKind,
    value: &Value,
    path: &Path,
) -> ResdocResult<TypedValue> {
    if kind == PatchKind::Add {
        return Err(ResdocError::NotASlice { path: path.clone() });
    }
    let (handle, json) = bare_handle::<H>(value, path)?;
    Ok(TypedValue::with_json(handle, json))
}

macro_rules! impl_to_one {
    ($($wrapper:ident),*) => {$(
        impl<P: Handle> Relationship for $wrapper<P> {
            fn marshal_relation(&self, m: &mut Marshaler) -> ResdocResult<Option<RelationshipData>> {
                marshal_to_one(self, m)
            }

            fn unmarshal_relation(
                &mut self,
                data: Option<&RelationshipData>,
                resolver: &mut Resolver<'_>,
            ) -> ResdocResult<()> {
                unmarshal_to_one(self, data, resolver)
            }

            fn resolve_patch(kind: PatchKind, value: &Value, path: &Path) -> ResdocResult<TypedValue> {
                patch_to_one::<Self>(kind, value, path)
            }
        }
    )*};
}

impl_to_one!(Box, Rc, Arc, RefCell);

impl<P: Handle> Relationship for Option<P> {
    fn marshal_relation(&self, m: &mut Marshaler) -> ResdocResult<Option<RelationshipData>> {
        match self {
            Some(handle) => marshal_to_one(handle, m),
            None => Ok(None),
        }
    }

    fn unmarshal_relation(
        &mut self,
        data: Option<&RelationshipData>,
        resolver: &mut Resolver<'_>,
    ) -> ResdocResult<()> {
        *self = match data {
            Some(data) => Some(P::from_target(
                resolver.resolve::<P::Target>(expect_one(data)?)?,
            )),
            None => None,
        };
        Ok(())
    }

    fn resolve_patch(kind: PatchKind, value: &Value, path: &Path) -> ResdocResult<TypedValue> {
        if kind == PatchKind::Add {
            return Err(ResdocError::NotASlice { path: path.clone() });
        }
        if value.is_null() {
            return Ok(TypedValue::with_json(None::<P>, Value::Null));
        }
        let (handle, json) = bare_handle::<P>(value, path)?;
        Ok(TypedValue::with_json(Some(handle), json))
    }
}

impl<P: Handle> Relationship for Vec<P> {
    fn marshal_relation(&self, m: &mut Marshaler) -> ResdocResult<Option<RelationshipData>> {
        let refs = self
            .iter()
            .map(|handle| m.reference(handle))
            .collect::<ResdocResult<Vec<_>>>()?;
        Ok(Some(RelationshipData::Many(refs)))
    }

    fn unmarshal_relation(
        &mut self,
        data: Option<&RelationshipData>,
        resolver: &mut Resolver<'_>,
    ) -> ResdocResult<()> {
        *self = match data {
            None => Vec::new(),
            Some(RelationshipData::Many(refs)) => refs
                .iter()
                .map(|r| resolver.resolve::<P::Target>(r).map(P::from_target))
                .collect::<ResdocResult<_>>()?,
            Some(RelationshipData::One(_)) => {
                return Err(ResdocError::invalid_document(
                    "expected a list of resource references, found a single reference",
                ))
            }
        };
        Ok(())
    }

    fn resolve_patch(kind: PatchKind, value: &Value, path: &Path) -> ResdocResult<TypedValue> {
        if kind == PatchKind::Add {
            let (handle, json) = bare_handle::<P>(value, path)?;
            return Ok(TypedValue::with_json(handle, json));
        }
        let Value::Array(items) = value else {
            return Err(ResdocError::SliceValueRequired { path: path.clone() });
        };
        let mut handles = Vec::with_capacity(items.len());
        let mut json = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let (handle, item_json) = bare_handle::<P>(item, &path.child(i))?;
            handles.push(handle);
            json.push(item_json);
        }
        Ok(TypedValue::with_json(handles, Value::Array(json)))
    }
}
