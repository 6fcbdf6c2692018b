//! Parsing logic for the Record derive macro.

use darling::util::Override;
use darling::{ast, FromDeriveInput, FromField};
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Generics, Ident, LitStr, Token, Type, Visibility};

/// Parsed struct-level options.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(resdoc), supports(struct_named))]
pub struct RecordInput {
    /// The struct identifier.
    pub ident: Ident,

    /// Generic parameters.
    pub generics: Generics,

    /// Struct data (fields).
    pub data: ast::Data<(), FieldInput>,
}

impl RecordInput {
    /// Get the fields as a vector.
    pub fn fields(&self) -> Vec<&FieldInput> {
        self.data
            .as_ref()
            .take_struct()
            .map(|s| s.fields.to_vec())
            .unwrap_or_default()
    }
}

/// Parsed field-level options.
#[derive(Debug, FromField)]
#[darling(attributes(resdoc), forward_attrs(serde))]
pub struct FieldInput {
    /// Field identifier.
    pub ident: Option<Ident>,

    /// Field visibility.
    pub vis: Visibility,

    /// Field type.
    pub ty: Type,

    /// Forwarded `#[serde(...)]` attributes.
    pub attrs: Vec<Attribute>,

    /// Primary identifier field; the value is the resource kind.
    #[darling(default)]
    pub primary: Option<String>,

    /// Attribute field, optionally renamed (`"-"` suppresses).
    #[darling(default)]
    pub attr: Option<Override<String>>,

    /// Relationship field, optionally renamed (`"-"` suppresses).
    #[darling(default)]
    pub relation: Option<Override<String>>,

    /// Skip the attribute when its value is empty.
    #[darling(default)]
    pub omit_empty: bool,

    /// Do not map this field.
    #[darling(default)]
    pub skip: bool,
}

/// The role a field resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRole {
    Primary,
    Attribute,
    Relation,
    Ignored,
}

/// Resolved mapping of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    pub role: FieldRole,
    /// Public name, or the kind for the primary field.
    pub name: String,
    pub omit_empty: bool,
}

/// What the forwarded serde attributes say about a field.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SerdeHints {
    pub rename: Option<String>,
    pub skip: bool,
    pub omit_empty: bool,
}

impl SerdeHints {
    /// Collect hints from `#[serde(...)]` attributes, ignoring everything else.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut hints = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if meta.input.peek(Token![=]) {
                        hints.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                    } else {
                        meta.parse_nested_meta(|inner| {
                            if inner.path.is_ident("serialize") {
                                hints.rename = Some(inner.value()?.parse::<LitStr>()?.value());
                                Ok(())
                            } else {
                                skip_meta(&inner)
                            }
                        })?;
                    }
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    hints.skip = true;
                } else if meta.path.is_ident("skip_serializing_if") {
                    meta.value()?.parse::<LitStr>()?;
                    hints.omit_empty = true;
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(hints)
    }
}

/// Consume the value of a serde option this macro does not interpret.
fn skip_meta(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<proc_macro2::TokenStream>()?;
    }
    Ok(())
}

impl FieldInput {
    /// Get the field identifier.
    pub fn ident(&self) -> &Ident {
        self.ident.as_ref().expect("named field required")
    }

    /// Name used when nothing more specific is configured.
    pub fn default_name(&self) -> String {
        lower_camel(&self.ident().to_string())
    }

    /// Whether more than one of `primary`, `attr` and `relation` is set.
    pub fn has_conflicting_roles(&self) -> bool {
        let roles = [
            self.primary.is_some(),
            self.attr.is_some(),
            self.relation.is_some(),
        ];
        roles.iter().filter(|set| **set).count() > 1
    }

    /// Resolve the field's role and public name.
    ///
    /// Most specific first: `#[resdoc(...)]`, then `#[serde(...)]`, then the
    /// default (public fields are attributes, private fields are ignored).
    pub fn plan(&self) -> syn::Result<FieldPlan> {
        let serde = SerdeHints::from_attrs(&self.attrs)?;
        let omit_empty = self.omit_empty || serde.omit_empty;
        let inherited = serde.rename.clone().unwrap_or_else(|| self.default_name());
        let ignored = FieldPlan {
            role: FieldRole::Ignored,
            name: inherited.clone(),
            omit_empty: false,
        };

        if self.skip {
            return Ok(ignored);
        }
        if let Some(kind) = &self.primary {
            return Ok(FieldPlan {
                role: FieldRole::Primary,
                name: kind.clone(),
                omit_empty: false,
            });
        }

        let (role, named) = match (&self.attr, &self.relation) {
            (Some(attr), _) => (FieldRole::Attribute, attr),
            (None, Some(relation)) => (FieldRole::Relation, relation),
            (None, None) => {
                if serde.skip || !matches!(self.vis, Visibility::Public(_)) {
                    return Ok(ignored);
                }
                return Ok(FieldPlan {
                    role: FieldRole::Attribute,
                    name: inherited,
                    omit_empty,
                });
            }
        };

        match named {
            Override::Explicit(name) if name == "-" => Ok(ignored),
            Override::Explicit(name) => Ok(FieldPlan {
                role,
                name: name.clone(),
                omit_empty,
            }),
            Override::Inherit if serde.skip => Ok(ignored),
            Override::Inherit => Ok(FieldPlan {
                role,
                name: inherited,
                omit_empty,
            }),
        }
    }
}

/// `created_at` -> `createdAt`; raw identifiers lose their `r#`.
pub fn lower_camel(ident: &str) -> String {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    let mut out = String::with_capacity(ident.len());
    for (i, part) in ident.split('_').filter(|p| !p.is_empty()).enumerate() {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use darling::FromDeriveInput;
    use syn::parse_quote;

    fn plans(input: syn::DeriveInput) -> Vec<FieldPlan> {
        let parsed = RecordInput::from_derive_input(&input).unwrap();
        parsed.fields().iter().map(|f| f.plan().unwrap()).collect()
    }

    #[test]
    fn test_lower_camel() {
        assert_eq!(lower_camel("created_at"), "createdAt");
        assert_eq!(lower_camel("name"), "name");
        assert_eq!(lower_camel("r#type"), "type");
        assert_eq!(lower_camel("_private_thing"), "privateThing");
        assert_eq!(lower_camel("ID"), "iD");
    }

    #[test]
    fn test_parse_basic_struct() {
        let input: syn::DeriveInput = parse_quote! {
            struct Article {
                #[resdoc(primary = "articles")]
                id: String,
                pub title: String,
                pub created_at: u64,
                internal: u32,
            }
        };

        let p = plans(input);
        assert_eq!(p[0].role, FieldRole::Primary);
        assert_eq!(p[0].name, "articles");
        assert_eq!(p[1].role, FieldRole::Attribute);
        assert_eq!(p[2].name, "createdAt");
        assert_eq!(p[3].role, FieldRole::Ignored);
    }

    #[test]
    fn test_resdoc_attributes() {
        let input: syn::DeriveInput = parse_quote! {
            struct Article {
                #[resdoc(attr = "headline", omit_empty)]
                title: String,
                #[resdoc(attr)]
                word_count: u32,
                #[resdoc(relation = "writer")]
                pub author: Option<Box<Person>>,
                #[resdoc(relation)]
                pub comments: Vec<Comment>,
                #[resdoc(attr = "-")]
                pub hidden: u8,
                #[resdoc(relation = "-")]
                pub also_hidden: Option<Box<Person>>,
                #[resdoc(skip)]
                pub skipped: u8,
            }
        };

        let p = plans(input);
        assert_eq!(
            p[0],
            FieldPlan {
                role: FieldRole::Attribute,
                name: "headline".into(),
                omit_empty: true
            }
        );
        assert_eq!(p[1].name, "wordCount");
        assert_eq!(p[2].role, FieldRole::Relation);
        assert_eq!(p[2].name, "writer");
        assert_eq!(p[3].name, "comments");
        assert_eq!(p[4].role, FieldRole::Ignored);
        assert_eq!(p[5].role, FieldRole::Ignored);
        assert_eq!(p[6].role, FieldRole::Ignored);
    }

    #[test]
    fn test_serde_fallback() {
        let input: syn::DeriveInput = parse_quote! {
            struct Article {
                #[serde(rename = "Title", default)]
                pub title: String,
                #[serde(skip_serializing_if = "Option::is_none")]
                pub subtitle: Option<String>,
                #[serde(skip)]
                pub cache: u32,
                #[serde(rename(serialize = "out", deserialize = "in"), with = "x")]
                pub both: u32,
                #[resdoc(attr = "explicit")]
                #[serde(rename = "ignored")]
                pub precedence: u32,
            }
        };

        let p = plans(input);
        assert_eq!(p[0].name, "Title");
        assert!(p[1].omit_empty);
        assert_eq!(p[2].role, FieldRole::Ignored);
        assert_eq!(p[3].name, "out");
        assert_eq!(p[4].name, "explicit");
    }

    #[test]
    fn test_conflicting_roles_detected() {
        let input: syn::DeriveInput = parse_quote! {
            struct Bad {
                #[resdoc(primary = "bad", attr)]
                id: String,
            }
        };
        let parsed = RecordInput::from_derive_input(&input).unwrap();
        assert!(parsed.fields()[0].has_conflicting_roles());
    }
}
