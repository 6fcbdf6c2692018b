//! Derive macro for the resdoc `Record` trait.
//!
//! This crate provides the `#[derive(Record)]` macro that generates:
//! - `impl Record for {Name}`: the field table (role, public name, codec and
//!   accessors per field)
//! - `impl AttrValue for {Name}`: use as a nested attribute value
//! - `impl Handle` and `impl Relationship for {Name}`: use as a to-one
//!   relationship held by value
//!
//! # Usage
//!
//! ```ignore
//! use resdoc::Record;
//!
//! #[derive(Default, Record)]
//! struct Article {
//!     #[resdoc(primary = "articles")]
//!     pub id: String,
//!     pub title: String,
//!     #[resdoc(relation)]
//!     pub author: Option<Box<Person>>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod parse;

/// Derive the `Record` trait for a struct with named fields.
///
/// # Attributes
///
/// ## Field Attributes
///
/// - `#[resdoc(primary = "kind")]`: Identifier field; the value names the resource kind.
///   At most one per record.
/// - `#[resdoc(attr)]` / `#[resdoc(attr = "name")]`: Attribute, optionally renamed.
///   Makes private fields visible.
/// - `#[resdoc(omit_empty)]`: Leave the attribute out when its value is empty.
/// - `#[resdoc(relation)]` / `#[resdoc(relation = "name")]`: Relationship. The field
///   type must implement `Relationship` (a record, `Box`/`Rc`/`Arc`/`RefCell` of one,
///   `Option` of those, or `Vec` of those).
/// - `#[resdoc(skip)]`, `#[resdoc(attr = "-")]`, `#[resdoc(relation = "-")]`: Not mapped.
///
/// Without a `resdoc` role, `#[serde(rename = "...")]`, `#[serde(skip)]`,
/// `#[serde(skip_serializing)]` and `#[serde(skip_serializing_if = "...")]` are
/// honoured. Remaining public fields become attributes named in lower camel
/// case; remaining private fields are not mapped.
///
/// The struct must implement `Default`.
#[proc_macro_derive(Record, attributes(resdoc))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match codegen::expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
