//! Path-addressed partial updates.
//!
//! A patch list is parsed once and each `replace`, `test` or `add` operation is
//! resolved against the record type: its path is walked through the field
//! tables and the raw JSON value is decoded into the exact type of the addressed
//! slot. The resolved value replaces the raw one in the operation; applying it
//! to application state is left to the caller.
//!
//! ```text
//! /title            -> String                    (replace)
//! /address/city     -> String                    (replace, nested attribute)
//! /tags             -> String                    (add, one element)
//! /author           -> Option<Box<Author>>       (replace, id only)
//! ```

use crate::cast::AttrValue;
use crate::field::{Access, Record};
use crate::{Path, ResdocError, ResdocResult, Seg};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use tracing::{debug, trace};

/// The patch operations that are resolved against a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    /// Replace the addressed slot.
    Replace,
    /// Compare the addressed slot.
    Test,
    /// Append one element to the addressed sequence.
    Add,
}

impl PatchKind {
    /// Parse an `op` string. Operations without typed resolution yield `None`.
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "replace" => Some(PatchKind::Replace),
            "test" => Some(PatchKind::Test),
            "add" => Some(PatchKind::Add),
            _ => None,
        }
    }
}

/// A value decoded into the concrete type of a patched slot.
pub struct TypedValue {
    value: Box<dyn Any>,
    type_name: &'static str,
    json: Value,
}

impl TypedValue {
    /// Wrap an attribute value, rendering its JSON form with the cast engine.
    pub fn of<T: AttrValue>(value: T) -> ResdocResult<Self> {
        let json = value.encode()?;
        Ok(Self::with_json(value, json))
    }

    /// Wrap any value together with an explicit JSON form.
    pub fn with_json<T: Any>(value: T, json: Value) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
            json,
        }
    }

    /// Borrow the value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// Take the value if it has type `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let Self {
            value,
            type_name,
            json,
        } = self;
        match value.downcast::<T>() {
            Ok(v) => Ok(*v),
            Err(value) => Err(Self {
                value,
                type_name,
                json,
            }),
        }
    }

    /// JSON rendering of the value.
    pub fn as_json(&self) -> &Value {
        &self.json
    }

    /// Rust type name of the value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedValue")
            .field("type", &self.type_name)
            .field("json", &self.json)
            .finish()
    }
}

/// The `value` of a patch operation: raw as parsed, or typed once resolved.
#[derive(Debug)]
pub enum PatchValue {
    /// As received.
    Raw(Value),
    /// Decoded into the slot type.
    Typed(TypedValue),
}

impl PatchValue {
    /// JSON form of the value.
    pub fn as_json(&self) -> &Value {
        match self {
            PatchValue::Raw(v) => v,
            PatchValue::Typed(t) => t.as_json(),
        }
    }

    /// The resolved value, if any.
    pub fn typed(&self) -> Option<&TypedValue> {
        match self {
            PatchValue::Typed(t) => Some(t),
            PatchValue::Raw(_) => None,
        }
    }

    /// Borrow the resolved value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.typed().and_then(TypedValue::downcast_ref)
    }
}

impl Default for PatchValue {
    fn default() -> Self {
        PatchValue::Raw(Value::Null)
    }
}

impl From<Value> for PatchValue {
    fn from(v: Value) -> Self {
        PatchValue::Raw(v)
    }
}

impl Serialize for PatchValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PatchValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(PatchValue::Raw)
    }
}

/// One operation of a patch list.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PatchOp {
    /// Operation name.
    pub op: String,
    /// Slash-delimited path into the record.
    pub path: String,
    /// Operation value.
    #[serde(default)]
    pub value: PatchValue,
}

impl PatchOp {
    /// Create an operation with a raw value.
    pub fn new(op: impl Into<String>, path: impl Into<String>, value: Value) -> Self {
        Self {
            op: op.into(),
            path: path.into(),
            value: PatchValue::Raw(value),
        }
    }

    /// Create a `replace` operation.
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self::new("replace", path, value)
    }

    /// Create an `add` operation.
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self::new("add", path, value)
    }

    /// Create a `test` operation.
    pub fn test(path: impl Into<String>, value: Value) -> Self {
        Self::new("test", path, value)
    }
}

/// The part of a patch still to be resolved below some slot.
///
/// `path` is the resolved prefix (used in errors), `rest` the segments that
/// remain below it.
#[derive(Debug, Clone)]
pub struct PatchTarget<'a> {
    /// Operation kind.
    pub kind: PatchKind,
    /// Raw operation value.
    pub value: &'a Value,
    /// Path resolved so far.
    pub path: Path,
    rest: &'a [String],
}

impl<'a> PatchTarget<'a> {
    /// Start resolving `rest` from the root of a record.
    pub fn new(kind: PatchKind, rest: &'a [String], value: &'a Value) -> Self {
        Self {
            kind,
            value,
            path: Path::root(),
            rest,
        }
    }

    /// The next segment, or `None` at the addressed slot.
    pub fn head(&self) -> Option<&'a str> {
        self.rest.first().map(String::as_str)
    }

    /// Whether the addressed slot has been reached.
    pub fn is_terminal(&self) -> bool {
        self.rest.is_empty()
    }

    /// Consume the next segment, recording it as `seg` in the resolved path.
    pub fn descend(&self, seg: impl Into<Seg>) -> PatchTarget<'a> {
        PatchTarget {
            kind: self.kind,
            value: self.value,
            path: self.path.child(seg),
            rest: self.rest.get(1..).unwrap_or_default(),
        }
    }

    /// Retarget an `add` at the element type of the addressed sequence.
    pub fn element(self) -> Self {
        Self {
            kind: PatchKind::Replace,
            ..self
        }
    }

    /// `PathNotFound` for the next segment.
    pub fn not_found(&self) -> ResdocError {
        let path = match self.head() {
            Some(head) => self.path.child(head),
            None => self.path.clone(),
        };
        ResdocError::path_not_found(path)
    }
}

/// Resolve a patch at a slot of leaf type `T`.
pub fn resolve_leaf<T: AttrValue>(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
    if !target.is_terminal() {
        return Err(target.not_found());
    }
    match target.kind {
        PatchKind::Add => Err(ResdocError::NotASlice { path: target.path }),
        PatchKind::Replace | PatchKind::Test => T::decode(target.value)
            .and_then(TypedValue::of)
            .map_err(|e| e.with_prefix(&target.path)),
    }
}

/// Resolve a patch at a slot holding record `T`.
///
/// The next segment names an attribute (searched first) or, as the final
/// segment only, a relationship. The primary field is never patchable.
pub fn resolve_record<T: Record + AttrValue>(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
    let Some(head) = target.head() else {
        return resolve_leaf::<T>(target);
    };
    let fields = T::fields();

    for field in &fields {
        if let Access::Attribute { patch, .. } = field.access {
            if field.meta.name == head {
                return patch(target.descend(head));
            }
        }
    }

    for field in &fields {
        if let Access::Relation { patch, .. } = field.access {
            if field.meta.name == head {
                let inner = target.descend(head);
                if !inner.is_terminal() {
                    return Err(inner.not_found());
                }
                return patch(inner.kind, inner.value, &inner.path);
            }
        }
    }

    Err(target.not_found())
}

/// Split a `/`-delimited patch path into unescaped segments (`~1` is `/`,
/// `~0` is `~`). A leading `/` is optional.
fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Resolve every operation of `patches` against record type `T`.
///
/// Operations other than `replace`, `test` and `add` pass through untouched.
pub fn resolve_patches<T: Record + AttrValue>(patches: Vec<PatchOp>) -> ResdocResult<Vec<PatchOp>> {
    let total = patches.len();
    let mut resolved = 0usize;
    let mut out = Vec::with_capacity(total);

    for mut patch in patches {
        if patch.op.is_empty() {
            return Err(ResdocError::EmptyOp);
        }
        let Some(kind) = PatchKind::parse(&patch.op) else {
            trace!(op = %patch.op, path = %patch.path, "patch operation passed through");
            out.push(patch);
            continue;
        };
        if patch.path.is_empty() {
            return Err(ResdocError::EmptyPath);
        }

        let segments = pointer_segments(&patch.path);
        let typed = resolve_record::<T>(PatchTarget::new(kind, &segments, patch.value.as_json()))?;
        trace!(op = %patch.op, path = %patch.path, ty = typed.type_name(), "patch value resolved");
        patch.value = PatchValue::Typed(typed);
        resolved += 1;
        out.push(patch);
    }

    debug!(
        record = std::any::type_name::<T>(),
        total, resolved, "resolved patch operations"
    );
    Ok(out)
}

/// Parse a JSON patch list and resolve it against record type `T`.
pub fn unmarshal_patches<T: Record + AttrValue>(data: &[u8]) -> ResdocResult<Vec<PatchOp>> {
    let patches: Vec<PatchOp> = serde_json::from_slice(data)?;
    resolve_patches::<T>(patches)
}
