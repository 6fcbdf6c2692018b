//! Record code generation.
//!
//! Emits the field table (`impl Record`) and the impls that let the type be
//! used as a nested attribute (`AttrValue`) and as a to-one relationship held
//! by value (`Handle`, `Relationship`).

use crate::parse::{FieldInput, FieldPlan, FieldRole, RecordInput};
use proc_macro2::TokenStream;
use quote::quote;

/// Generate every impl for the record.
pub fn generate(input: &RecordInput, plans: &[FieldPlan]) -> syn::Result<TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let entries: Vec<TokenStream> = input
        .fields()
        .into_iter()
        .zip(plans)
        .map(|(field, plan)| generate_entry(field, plan))
        .collect();

    Ok(quote! {
        impl #impl_generics ::resdoc::Record for #struct_name #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::resdoc::Field<Self>> {
                ::std::vec![#(#entries),*]
            }
        }

        impl #impl_generics ::resdoc::AttrValue for #struct_name #ty_generics #where_clause {
            fn encode(&self) -> ::resdoc::ResdocResult<::resdoc::Value> {
                ::resdoc::attributes::encode_record(self)
            }

            fn decode(value: &::resdoc::Value) -> ::resdoc::ResdocResult<Self> {
                ::resdoc::attributes::decode_record(value)
            }

            fn resolve_patch(
                target: ::resdoc::PatchTarget<'_>,
            ) -> ::resdoc::ResdocResult<::resdoc::TypedValue> {
                ::resdoc::patch::resolve_record::<Self>(target)
            }
        }

        impl #impl_generics ::resdoc::Handle for #struct_name #ty_generics #where_clause {
            type Target = Self;

            fn with_target<__R>(
                &self,
                f: impl ::std::ops::FnOnce(&Self) -> ::resdoc::ResdocResult<__R>,
            ) -> ::resdoc::ResdocResult<__R> {
                f(self)
            }

            fn from_target(target: Self) -> Self {
                target
            }
        }

        impl #impl_generics ::resdoc::Relationship for #struct_name #ty_generics #where_clause {
            fn marshal_relation(
                &self,
                m: &mut ::resdoc::Marshaler,
            ) -> ::resdoc::ResdocResult<::std::option::Option<::resdoc::RelationshipData>> {
                ::resdoc::relationship::marshal_to_one(self, m)
            }

            fn unmarshal_relation(
                &mut self,
                data: ::std::option::Option<&::resdoc::RelationshipData>,
                resolver: &mut ::resdoc::Resolver<'_>,
            ) -> ::resdoc::ResdocResult<()> {
                ::resdoc::relationship::unmarshal_to_one(self, data, resolver)
            }

            fn resolve_patch(
                kind: ::resdoc::PatchKind,
                value: &::resdoc::Value,
                path: &::resdoc::Path,
            ) -> ::resdoc::ResdocResult<::resdoc::TypedValue> {
                ::resdoc::relationship::patch_to_one::<Self>(kind, value, path)
            }
        }
    })
}

/// Generate one `Field` entry.
fn generate_entry(field: &FieldInput, plan: &FieldPlan) -> TokenStream {
    let ident = field.ident();
    let ident_str = ident.to_string();
    let ty = &field.ty;
    let name = &plan.name;
    let omit_empty = plan.omit_empty;

    let (role, codec, access) = match plan.role {
        FieldRole::Primary => (
            quote!(::resdoc::Role::Primary),
            quote!(<#ty as ::resdoc::Identifier>::CODEC),
            quote! {
                ::resdoc::Access::Primary {
                    read: |record: &Self| ::resdoc::Identifier::to_id(&record.#ident),
                    write: |record: &mut Self, id: &str| {
                        record.#ident = <#ty as ::resdoc::Identifier>::from_id(#name, id)?;
                        ::std::result::Result::Ok(())
                    },
                }
            },
        ),
        FieldRole::Attribute => (
            quote!(::resdoc::Role::Attribute),
            quote!(<#ty as ::resdoc::AttrValue>::CODEC),
            quote! {
                ::resdoc::Access::Attribute {
                    encode: |record: &Self| ::resdoc::AttrValue::encode(&record.#ident),
                    is_empty: |record: &Self| ::resdoc::AttrValue::is_empty_value(&record.#ident),
                    decode: |record: &mut Self, value: &::resdoc::Value| {
                        record.#ident = <#ty as ::resdoc::AttrValue>::decode(value)?;
                        ::std::result::Result::Ok(())
                    },
                    patch: <#ty as ::resdoc::AttrValue>::resolve_patch,
                }
            },
        ),
        FieldRole::Relation => (
            quote!(::resdoc::Role::Relation),
            quote!(::resdoc::Codec::Plain),
            quote! {
                ::resdoc::Access::Relation {
                    marshal: |record: &Self, m: &mut ::resdoc::Marshaler| {
                        ::resdoc::Relationship::marshal_relation(&record.#ident, m)
                    },
                    unmarshal: |record: &mut Self,
                                data: ::std::option::Option<&::resdoc::RelationshipData>,
                                resolver: &mut ::resdoc::Resolver<'_>| {
                        ::resdoc::Relationship::unmarshal_relation(&mut record.#ident, data, resolver)
                    },
                    patch: <#ty as ::resdoc::Relationship>::resolve_patch,
                }
            },
        ),
        FieldRole::Ignored => (
            quote!(::resdoc::Role::Ignored),
            quote!(::resdoc::Codec::Plain),
            quote!(::resdoc::Access::Ignored),
        ),
    };

    quote! {
        ::resdoc::Field {
            meta: ::resdoc::FieldMeta {
                ident: #ident_str,
                name: #name,
                role: #role,
                omit_empty: #omit_empty,
                codec: #codec,
            },
            access: #access,
        }
    }
}
