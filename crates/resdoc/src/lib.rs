//! Typed records to and from JSON resource documents.
//!
//! `resdoc` maps application structs onto resource documents (a primary
//! resource object plus a side list of related objects) and back, and resolves
//! path-addressed patch lists against the record types.
//!
//! # Core Concepts
//!
//! - **Record**: a struct with `#[derive(Record)]`; one field is the primary
//!   identifier and names the resource kind
//! - **Attributes**: fields encoded into the `attributes` object through the
//!   cast engine ([`AttrValue`])
//! - **Relationships**: fields holding other records ([`Relationship`],
//!   [`Handle`]); marshaled as references with the related objects collected in
//!   `included`
//! - **Patches**: [`PatchOp`] lists whose values are decoded into the type of
//!   the field they address
//!
//! # Quick Start
//!
//! ```
//! use resdoc::Record;
//!
//! #[derive(Debug, Default, Record)]
//! struct Author {
//!     #[resdoc(primary = "people")]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! #[derive(Debug, Default, Record)]
//! struct Article {
//!     #[resdoc(primary = "articles")]
//!     pub id: String,
//!     pub title: String,
//!     #[resdoc(relation)]
//!     pub author: Option<Box<Author>>,
//! }
//!
//! let article = Article {
//!     id: "1".into(),
//!     title: "Hello".into(),
//!     author: Some(Box::new(Author { id: "9".into(), name: "Ann".into() })),
//! };
//!
//! let bytes = resdoc::to_vec_one(&article).unwrap();
//! let back: Article = resdoc::unmarshal_one_as(&bytes).unwrap();
//! assert_eq!(back.author.unwrap().name, "Ann");
//! ```
//!
//! # Field configuration
//!
//! ```text
//! #[resdoc(primary = "kind")]     identifier field, names the resource kind
//! #[resdoc(attr = "name")]        attribute with an explicit name
//! #[resdoc(omit_empty)]           skip the attribute when empty
//! #[resdoc(relation = "name")]    relationship
//! #[resdoc(skip)]                 not mapped
//! #[serde(rename/skip/skip_serializing_if)]   honoured when no resdoc role is given
//! ```
//!
//! Public fields without configuration are attributes named in lower camel
//! case; private fields without configuration are not mapped.

extern crate self as resdoc;

pub mod attributes;
pub mod cast;
pub mod dedupe;
mod document;
mod error;
mod error_object;
mod field;
pub mod marshal;
pub mod patch;
mod path;
pub mod relationship;
pub mod unmarshal;

pub use cast::{AttrValue, Identifier, MapKey};
pub use document::{
    Document, PrimaryData, RelationshipData, RelationshipEntry, ResourceObject, ResourceRef,
};
pub use error::{value_type_name, ResdocError, ResdocResult};
pub use error_object::{marshal_errors, ErrorObject, ErrorsPayload};
pub use field::{descriptors, kind_of, primary, Access, Codec, Field, FieldMeta, Record, Role};
pub use marshal::{
    marshal_many, marshal_one, mix_in_meta, to_string_many, to_string_one, to_vec_many,
    to_vec_one, Marshaler,
};
pub use patch::{
    resolve_patches, unmarshal_patches, PatchKind, PatchOp, PatchTarget, PatchValue, TypedValue,
};
pub use path::{Path, Seg};
pub use relationship::{Handle, Relationship};
pub use unmarshal::{
    decode_document_many, decode_document_many_as, decode_document_one, decode_document_one_as,
    unmarshal_many, unmarshal_many_as, unmarshal_one, unmarshal_one_as, Resolver,
};

// Re-export derive macro when feature is enabled
#[cfg(feature = "derive")]
pub use resdoc_derive::Record;

pub use serde_json::Value;
