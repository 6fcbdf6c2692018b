//! Conversion between generic JSON values and concrete field types.
//!
//! Three traits carry the conversions:
//!
//! - [`AttrValue`]: attribute values (scalars, collections, timestamps, nested
//!   records and opt-in codec types)
//! - [`Identifier`]: values that can sit in a primary field
//! - [`MapKey`]: values that can key a map attribute
//!
//! Custom scalars opt in with [`text_value!`](crate::text_value) (value ⇄ string)
//! or [`document_value!`](crate::document_value) (value ⇄ JSON tree through serde).

use crate::patch::{self, PatchKind, PatchTarget, TypedValue};
use crate::{Codec, ResdocError, ResdocResult, Seg};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;

/// A type that can be stored as an attribute value.
pub trait AttrValue: Sized + 'static {
    /// Codec class of the type.
    const CODEC: Codec = Codec::Plain;

    /// Encode into a generic JSON value.
    fn encode(&self) -> ResdocResult<Value>;

    /// Decode from a generic JSON value.
    fn decode(value: &Value) -> ResdocResult<Self>;

    /// Whether this is the empty value of the type (for `omit_empty`).
    fn is_empty_value(&self) -> bool {
        false
    }

    /// Resolve a patch addressed at, or below, a slot of this type.
    ///
    /// Leaf types accept `replace`/`test` on the slot itself and reject `add`
    /// with [`ResdocError::NotASlice`].
    fn resolve_patch(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
        patch::resolve_leaf::<Self>(target)
    }
}

/// A type that can be the primary identifier of a record.
pub trait Identifier: Sized + 'static {
    /// Codec class of the type.
    const CODEC: Codec = Codec::Plain;

    /// Render as an identifier string.
    fn to_id(&self) -> ResdocResult<String>;

    /// Parse from an identifier string of a resource of `kind`.
    fn from_id(kind: &str, id: &str) -> ResdocResult<Self>;
}

/// A type that can key a map attribute.
pub trait MapKey: Sized + 'static {
    /// Render as an object key.
    fn to_key(&self) -> String;

    /// Parse from an object key.
    fn from_key(key: &str) -> ResdocResult<Self>;
}

// ============================================================================
// Scalars
// ============================================================================

impl AttrValue for bool {
    fn encode(&self) -> ResdocResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        value
            .as_bool()
            .ok_or_else(|| ResdocError::type_mismatch("boolean", value))
    }

    fn is_empty_value(&self) -> bool {
        !*self
    }
}

fn integral(value: &Value) -> ResdocResult<i128> {
    let Value::Number(n) = value else {
        return Err(ResdocError::type_mismatch("number", value));
    };
    if let Some(i) = n.as_i64() {
        return Ok(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(i128::from(u));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i128),
        _ => Err(ResdocError::invalid_value(format!("{n} is not an integer"))),
    }
}

macro_rules! impl_integer {
    ($($t:ty),* $(,)?) => {$(
        impl AttrValue for $t {
            fn encode(&self) -> ResdocResult<Value> {
                Ok(Value::from(*self))
            }

            fn decode(value: &Value) -> ResdocResult<Self> {
                let n = integral(value)?;
                <$t>::try_from(n).map_err(|_| {
                    ResdocError::invalid_value(format!(
                        "{n} is out of range for {}",
                        stringify!($t)
                    ))
                })
            }

            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        }

        impl Identifier for $t {
            fn to_id(&self) -> ResdocResult<String> {
                Ok(self.to_string())
            }

            fn from_id(kind: &str, id: &str) -> ResdocResult<Self> {
                id.parse()
                    .map_err(|e| ResdocError::invalid_id(kind, format!("{id:?}: {e}")))
            }
        }

        impl MapKey for $t {
            fn to_key(&self) -> String {
                self.to_string()
            }

            fn from_key(key: &str) -> ResdocResult<Self> {
                key.parse().map_err(|e| {
                    ResdocError::invalid_value(format!("map key {key:?}: {e}"))
                })
            }
        }
    )*};
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

fn finite(f: f64) -> ResdocResult<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ResdocError::invalid_value(format!("{f} cannot be represented in JSON")))
}

impl AttrValue for f64 {
    fn encode(&self) -> ResdocResult<Value> {
        finite(*self)
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        value
            .as_f64()
            .ok_or_else(|| ResdocError::type_mismatch("number", value))
    }

    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl AttrValue for f32 {
    fn encode(&self) -> ResdocResult<Value> {
        finite(f64::from(*self))
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        let wide = f64::decode(value)?;
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return Err(ResdocError::invalid_value(format!(
                "{wide} is out of range for f32"
            )));
        }
        Ok(narrow)
    }

    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

macro_rules! impl_float_id {
    ($($t:ty),*) => {$(
        impl Identifier for $t {
            fn to_id(&self) -> ResdocResult<String> {
                if !self.is_finite() {
                    return Err(ResdocError::invalid_id("", format!("{self} is not finite")));
                }
                Ok(self.to_string())
            }

            fn from_id(kind: &str, id: &str) -> ResdocResult<Self> {
                id.parse()
                    .map_err(|e| ResdocError::invalid_id(kind, format!("{id:?}: {e}")))
            }
        }
    )*};
}

impl_float_id!(f32, f64);

impl AttrValue for String {
    fn encode(&self) -> ResdocResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ResdocError::type_mismatch("string", value))
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Identifier for String {
    fn to_id(&self) -> ResdocResult<String> {
        Ok(self.clone())
    }

    fn from_id(_kind: &str, id: &str) -> ResdocResult<Self> {
        Ok(id.to_owned())
    }
}

impl MapKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> ResdocResult<Self> {
        Ok(key.to_owned())
    }
}

impl AttrValue for char {
    fn encode(&self) -> ResdocResult<Value> {
        Ok(Value::String(self.to_string()))
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        let s = String::decode(value)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ResdocError::invalid_value(format!(
                "expected a single character, found {s:?}"
            ))),
        }
    }

    fn is_empty_value(&self) -> bool {
        *self == '\0'
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// RFC-3339 with `Z` suffix; sub-second digits only when present.
impl AttrValue for DateTime<Utc> {
    fn encode(&self) -> ResdocResult<Value> {
        Ok(Value::String(self.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        match value {
            Value::Null => Ok(DateTime::<Utc>::default()),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| ResdocError::invalid_value(format!("{s:?} is not RFC-3339: {e}"))),
            other => Err(ResdocError::type_mismatch("string", other)),
        }
    }

    fn is_empty_value(&self) -> bool {
        *self == DateTime::<Utc>::default()
    }
}

// ============================================================================
// Wrappers
// ============================================================================

impl<T: AttrValue> AttrValue for Option<T> {
    const CODEC: Codec = T::CODEC;

    fn encode(&self) -> ResdocResult<Value> {
        match self {
            Some(v) => v.encode(),
            None => Ok(Value::Null),
        }
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::decode(v).map(Some),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_none()
    }

    fn resolve_patch(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
        if target.is_terminal() && target.kind != PatchKind::Add {
            return patch::resolve_leaf::<Self>(target);
        }
        T::resolve_patch(target)
    }
}

impl<T: AttrValue> AttrValue for Box<T> {
    const CODEC: Codec = T::CODEC;

    fn encode(&self) -> ResdocResult<Value> {
        (**self).encode()
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        T::decode(value).map(Box::new)
    }

    fn resolve_patch(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
        if target.is_terminal() && target.kind != PatchKind::Add {
            return patch::resolve_leaf::<Self>(target);
        }
        T::resolve_patch(target)
    }
}

impl<I: Identifier> Identifier for Option<I> {
    const CODEC: Codec = I::CODEC;

    fn to_id(&self) -> ResdocResult<String> {
        match self {
            Some(id) => id.to_id(),
            None => Ok(String::new()),
        }
    }

    fn from_id(kind: &str, id: &str) -> ResdocResult<Self> {
        if id.is_empty() {
            return Ok(None);
        }
        I::from_id(kind, id).map(Some)
    }
}

impl<I: Identifier> Identifier for Box<I> {
    const CODEC: Codec = I::CODEC;

    fn to_id(&self) -> ResdocResult<String> {
        (**self).to_id()
    }

    fn from_id(kind: &str, id: &str) -> ResdocResult<Self> {
        I::from_id(kind, id).map(Box::new)
    }
}

// ============================================================================
// Collections
// ============================================================================

impl<T: AttrValue> AttrValue for Vec<T> {
    fn encode(&self) -> ResdocResult<Value> {
        self.iter()
            .enumerate()
            .map(|(i, v)| v.encode().map_err(|e| e.with_prefix(&crate::path!(i))))
            .collect::<ResdocResult<Vec<_>>>()
            .map(Value::Array)
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| T::decode(v).map_err(|e| e.with_prefix(&crate::path!(i))))
                .collect(),
            other => Err(ResdocError::type_mismatch("array", other)),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }

    fn resolve_patch(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
        let Some(head) = target.head() else {
            return match target.kind {
                PatchKind::Add => patch::resolve_leaf::<T>(target.element()),
                PatchKind::Replace | PatchKind::Test => patch::resolve_leaf::<Self>(target),
            };
        };
        let seg = if head == "-" {
            Seg::End
        } else {
            match head.parse::<usize>() {
                Ok(i) => Seg::Index(i),
                Err(_) => return Err(target.not_found()),
            }
        };
        let inner = target.descend(seg);
        if inner.is_terminal() && inner.kind == PatchKind::Add {
            return patch::resolve_leaf::<T>(inner.element());
        }
        T::resolve_patch(inner)
    }
}

fn decode_entries<K, V, C>(value: &Value) -> ResdocResult<C>
where
    K: MapKey,
    V: AttrValue,
    C: FromIterator<(K, V)>,
{
    match value {
        Value::Null => Ok(std::iter::empty().collect()),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let at = crate::path!(k.as_str());
                let key = K::from_key(k).map_err(|e| e.with_prefix(&at))?;
                let val = V::decode(v).map_err(|e| e.with_prefix(&at))?;
                Ok((key, val))
            })
            .collect(),
        other => Err(ResdocError::type_mismatch("object", other)),
    }
}

fn encode_entries<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> ResdocResult<Value>
where
    K: MapKey,
    V: AttrValue,
{
    let mut out = Map::new();
    for (k, v) in entries {
        let key = k.to_key();
        let val = v
            .encode()
            .map_err(|e| e.with_prefix(&crate::path!(key.as_str())))?;
        out.insert(key, val);
    }
    Ok(Value::Object(out))
}

fn resolve_entry<M, K, V>(target: PatchTarget<'_>) -> ResdocResult<TypedValue>
where
    M: AttrValue,
    K: MapKey,
    V: AttrValue,
{
    let Some(head) = target.head() else {
        return patch::resolve_leaf::<M>(target);
    };
    K::from_key(head).map_err(|e| e.with_prefix(&target.path))?;
    V::resolve_patch(target.descend(head))
}

impl<K: MapKey + Ord, V: AttrValue> AttrValue for BTreeMap<K, V> {
    fn encode(&self) -> ResdocResult<Value> {
        encode_entries(self.iter())
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        decode_entries(value)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }

    fn resolve_patch(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
        resolve_entry::<Self, K, V>(target)
    }
}

impl<K: MapKey + Hash + Eq, V: AttrValue> AttrValue for HashMap<K, V> {
    fn encode(&self) -> ResdocResult<Value> {
        encode_entries(self.iter())
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        decode_entries(value)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }

    fn resolve_patch(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
        resolve_entry::<Self, K, V>(target)
    }
}

// ============================================================================
// Dynamic JSON
// ============================================================================

impl AttrValue for Value {
    const CODEC: Codec = Codec::Document;

    fn encode(&self) -> ResdocResult<Value> {
        Ok(self.clone())
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        Ok(value.clone())
    }

    fn is_empty_value(&self) -> bool {
        self.is_null()
    }

    /// Any slot inside a dynamic value is itself dynamic.
    fn resolve_patch(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
        TypedValue::of(target.value.clone())
    }
}

impl AttrValue for Map<String, Value> {
    const CODEC: Codec = Codec::Document;

    fn encode(&self) -> ResdocResult<Value> {
        Ok(Value::Object(self.clone()))
    }

    fn decode(value: &Value) -> ResdocResult<Self> {
        match value {
            Value::Null => Ok(Map::new()),
            Value::Object(map) => Ok(map.clone()),
            other => Err(ResdocError::type_mismatch("object", other)),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }

    fn resolve_patch(target: PatchTarget<'_>) -> ResdocResult<TypedValue> {
        if target.is_terminal() {
            return patch::resolve_leaf::<Self>(target);
        }
        TypedValue::of(target.value.clone())
    }
}

// ============================================================================
// Codec helpers used by `text_value!` and `document_value!`
// ============================================================================

/// Decode a text-codec value from a JSON string.
pub fn decode_text<T>(value: &Value) -> ResdocResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let s = value
        .as_str()
        .ok_or_else(|| ResdocError::type_mismatch("string", value))?;
    s.parse()
        .map_err(|e| ResdocError::invalid_value(format!("{s:?}: {e}")))
}

/// Parse a text-codec identifier.
pub fn parse_text_id<T>(kind: &str, id: &str) -> ResdocResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    id.parse()
        .map_err(|e| ResdocError::invalid_id(kind, format!("{id:?}: {e}")))
}

/// Parse a text-codec map key.
pub fn parse_text_key<T>(key: &str) -> ResdocResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    key.parse()
        .map_err(|e| ResdocError::invalid_value(format!("map key {key:?}: {e}")))
}

/// Encode a document-codec value through serde.
pub fn encode_document<T: Serialize>(value: &T) -> ResdocResult<Value> {
    serde_json::to_value(value).map_err(|e| ResdocError::invalid_value(e.to_string()))
}

/// Decode a document-codec value through serde.
pub fn decode_document<T: DeserializeOwned>(value: &Value) -> ResdocResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| ResdocError::invalid_value(e.to_string()))
}

/// Implement the text codec for types with `Display` and `FromStr`.
///
/// The type becomes usable as an attribute (rendered as a JSON string), as a
/// primary identifier and as a map key.
///
/// ```
/// use std::fmt;
/// use std::str::FromStr;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
/// struct Sku(u32);
///
/// impl fmt::Display for Sku {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "SKU-{}", self.0)
///     }
/// }
///
/// impl FromStr for Sku {
///     type Err = String;
///     fn from_str(s: &str) -> Result<Self, String> {
///         s.strip_prefix("SKU-")
///             .and_then(|n| n.parse().ok())
///             .map(Sku)
///             .ok_or_else(|| format!("bad sku {s}"))
///     }
/// }
///
/// resdoc::text_value!(Sku);
///
/// use resdoc::AttrValue;
/// assert_eq!(Sku(7).encode().unwrap(), serde_json::json!("SKU-7"));
/// ```
#[macro_export]
macro_rules! text_value {
    ($($t:ty),+ $(,)?) => {$(
        impl $crate::AttrValue for $t {
            const CODEC: $crate::Codec = $crate::Codec::Text;

            fn encode(&self) -> $crate::ResdocResult<$crate::Value> {
                Ok($crate::Value::String(::std::string::ToString::to_string(self)))
            }

            fn decode(value: &$crate::Value) -> $crate::ResdocResult<Self> {
                $crate::cast::decode_text(value)
            }

            fn is_empty_value(&self) -> bool {
                ::std::string::ToString::to_string(self).is_empty()
            }
        }

        impl $crate::Identifier for $t {
            const CODEC: $crate::Codec = $crate::Codec::Text;

            fn to_id(&self) -> $crate::ResdocResult<::std::string::String> {
                Ok(::std::string::ToString::to_string(self))
            }

            fn from_id(kind: &str, id: &str) -> $crate::ResdocResult<Self> {
                $crate::cast::parse_text_id(kind, id)
            }
        }

        impl $crate::MapKey for $t {
            fn to_key(&self) -> ::std::string::String {
                ::std::string::ToString::to_string(self)
            }

            fn from_key(key: &str) -> $crate::ResdocResult<Self> {
                $crate::cast::parse_text_key(key)
            }
        }
    )+};
}

/// Implement the document codec for types with serde `Serialize` and
/// `DeserializeOwned`.
///
/// The type owns its entire JSON representation; the engine never looks
/// inside it.
#[macro_export]
macro_rules! document_value {
    ($($t:ty),+ $(,)?) => {$(
        impl $crate::AttrValue for $t {
            const CODEC: $crate::Codec = $crate::Codec::Document;

            fn encode(&self) -> $crate::ResdocResult<$crate::Value> {
                $crate::cast::encode_document(self)
            }

            fn decode(value: &$crate::Value) -> $crate::ResdocResult<Self> {
                $crate::cast::decode_document(value)
            }

            fn is_empty_value(&self) -> bool {
                matches!($crate::cast::encode_document(self), Ok($crate::Value::Null))
            }
        }
    )+};
}
