//! Macros for cinch host types.

use proc_macro::TokenStream;
use syn::parse::Parser;
use syn::{parse_macro_input, Attribute, DeriveInput, Expr, Lit, Meta};

mod bind;

/// Derives `cinch::Bind` for a struct with named fields.
///
/// Field attributes, all under `#[bind(...)]`:
/// - `constraint = "..."`: a constraint over sibling fields
/// - `optional`: the field may be absent; a zero value is encoded as unset
/// - `rename = "..."`: the label used in constraints
/// - `skip`: the field is not bound and is reset to `Default::default()`
///   by `zero()`
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bind::expand_derive(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn get_attribute<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attrs.iter().find(|attr| attr.path().is_ident(name))
}

fn parse_nested(attr: &Attribute) -> syn::Result<Vec<Meta>> {
    let Meta::List(meta_list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            attr,
            "expected #[bind(...)] with arguments",
        ));
    };
    let parser = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated;
    Ok(parser.parse2(meta_list.tokens.clone())?.into_iter().collect())
}

/// Returns true for a bare `key` or `key = true`.
fn parse_attribute_flag(nested: &[Meta], key: &str) -> syn::Result<bool> {
    for meta in nested {
        match meta {
            Meta::Path(path) if path.is_ident(key) => return Ok(true),
            Meta::NameValue(nv) if nv.path.is_ident(key) => {
                if let Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Bool(lit_bool) = &expr_lit.lit {
                        return Ok(lit_bool.value());
                    }
                }
                return Err(syn::Error::new_spanned(
                    &nv.value,
                    format!("`{}` expects a boolean", key),
                ));
            }
            _ => {}
        }
    }
    Ok(false)
}

fn parse_attribute_string(nested: &[Meta], key: &str) -> syn::Result<Option<String>> {
    for meta in nested {
        if let Meta::NameValue(nv) = meta {
            if nv.path.is_ident(key) {
                if let Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Str(lit_str) = &expr_lit.lit {
                        return Ok(Some(lit_str.value()));
                    }
                }
                return Err(syn::Error::new_spanned(
                    &nv.value,
                    format!("`{}` expects a string literal", key),
                ));
            }
        }
    }
    Ok(None)
}

fn check_known_keys(nested: &[Meta], known: &[&str]) -> syn::Result<()> {
    for meta in nested {
        let path = meta.path();
        if !known.iter().any(|key| path.is_ident(key)) {
            return Err(syn::Error::new_spanned(
                path,
                format!("unknown bind attribute; expected one of: {}", known.join(", ")),
            ));
        }
    }
    Ok(())
}
