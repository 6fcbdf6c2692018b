//! Code generation for the Record derive macro.

mod record;

use crate::parse::{FieldPlan, FieldRole, RecordInput};
use darling::FromDeriveInput;
use proc_macro2::TokenStream;
use std::collections::HashMap;
use syn::DeriveInput;

/// Main entry point for code generation.
pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let parsed = RecordInput::from_derive_input(input)
        .map_err(|e| syn::Error::new_spanned(input, e.to_string()))?;

    let mut plans: Vec<FieldPlan> = Vec::new();
    let mut primary_seen = false;
    let mut attr_names: HashMap<String, &syn::Ident> = HashMap::new();

    for field in parsed.fields() {
        if field.has_conflicting_roles() {
            return Err(syn::Error::new_spanned(
                field.ident(),
                "#[resdoc(primary)], #[resdoc(attr)] and #[resdoc(relation)] are mutually exclusive",
            ));
        }

        let plan = field.plan()?;
        match plan.role {
            FieldRole::Primary => {
                if plan.name.is_empty() {
                    return Err(syn::Error::new_spanned(
                        field.ident(),
                        "#[resdoc(primary = \"...\")] needs a non-empty resource kind",
                    ));
                }
                if primary_seen {
                    return Err(syn::Error::new_spanned(
                        field.ident(),
                        "a record can only have one #[resdoc(primary)] field",
                    ));
                }
                primary_seen = true;
            }
            FieldRole::Attribute => {
                if let Some(previous) = attr_names.insert(plan.name.clone(), field.ident()) {
                    return Err(syn::Error::new_spanned(
                        field.ident(),
                        format!(
                            "attribute name `{}` is already used by field `{}`",
                            plan.name, previous
                        ),
                    ));
                }
            }
            // Duplicate relationship names are reported when the record is marshaled.
            FieldRole::Relation | FieldRole::Ignored => {}
        }
        plans.push(plan);
    }

    record::generate(&parsed, &plans)
}
