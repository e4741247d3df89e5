// #[derive(Bind)] implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_quote, Data, DeriveInput, Error, Fields, GenericParam, Ident, Type};

use crate::{
    check_known_keys, get_attribute, parse_attribute_flag, parse_attribute_string, parse_nested,
};

const BIND_KEYS: &[&str] = &["constraint", "optional", "rename", "skip"];

struct BoundField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    label: String,
    constraint: Option<String>,
    optional: bool,
    skip: bool,
}

pub fn expand_derive(input: DeriveInput) -> Result<TokenStream, Error> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    &input,
                    "#[derive(Bind)] requires named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input,
                "#[derive(Bind)] only works on structs",
            ))
        }
    };

    let mut bound = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            return Err(Error::new_spanned(field, "expected a named field"));
        };
        let (constraint, optional, rename, skip) = match get_attribute(&field.attrs, "bind") {
            Some(attr) => {
                let nested = parse_nested(attr)?;
                check_known_keys(&nested, BIND_KEYS)?;
                (
                    parse_attribute_string(&nested, "constraint")?,
                    parse_attribute_flag(&nested, "optional")?,
                    parse_attribute_string(&nested, "rename")?,
                    parse_attribute_flag(&nested, "skip")?,
                )
            }
            None => (None, false, None, false),
        };
        if skip && (constraint.is_some() || optional || rename.is_some()) {
            return Err(Error::new_spanned(
                field,
                "a skipped field cannot carry other bind attributes",
            ));
        }
        let label = rename.unwrap_or_else(|| ident.unraw().to_string());
        if !skip && bound.iter().any(|f: &BoundField| !f.skip && f.label == label) {
            return Err(Error::new_spanned(
                field,
                format!("duplicate field label `{}`", label),
            ));
        }
        bound.push(BoundField {
            ident,
            ty: &field.ty,
            label,
            constraint,
            optional,
            skip,
        });
    }

    let mut generics = input.generics.clone();
    for param in &mut generics.params {
        if let GenericParam::Type(type_param) = param {
            type_param.bounds.push(parse_quote!(::cinch::Bind));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let type_name = name.to_string();
    let active: Vec<&BoundField> = bound.iter().filter(|f| !f.skip).collect();

    let host_fields = active.iter().map(|f| {
        let label = &f.label;
        let ty = f.ty;
        let optional = f.optional;
        let constraint = f
            .constraint
            .as_ref()
            .map(|c| quote! { .with_constraint(#c) });
        quote! {
            ::cinch::HostField::new(#label, <#ty as ::cinch::Bind>::host_type)
                #constraint
                .with_optional(#optional)
        }
    });

    let zero_fields = bound.iter().map(|f| {
        let ident = f.ident;
        let ty = f.ty;
        if f.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! { #ident: <#ty as ::cinch::Bind>::zero() }
        }
    });

    let is_zero = active.iter().map(|f| {
        let ident = f.ident;
        quote! { && ::cinch::Bind::is_zero(&self.#ident) }
    });

    let encode_fields = active.iter().map(|f| {
        let ident = f.ident;
        let label = &f.label;
        let optional = f.optional;
        quote! { encoder.field(#label, &self.#ident, #optional)?; }
    });

    let decode_fields = active.iter().map(|f| {
        let ident = f.ident;
        let label = &f.label;
        quote! { decoder.field(#label, &mut self.#ident)?; }
    });

    let expanded = quote! {
        impl #impl_generics ::cinch::Bind for #name #ty_generics #where_clause {
            fn host_type() -> ::cinch::HostType {
                ::cinch::HostType::Struct(::cinch::StructType::new::<Self>(
                    #type_name,
                    || ::std::vec![#(#host_fields),*],
                ))
            }

            fn zero() -> Self {
                Self { #(#zero_fields),* }
            }

            fn is_zero(&self) -> bool {
                true #(#is_zero)*
            }

            #[allow(unused_mut)]
            fn encode(
                &self,
            ) -> ::core::result::Result<::core::option::Option<::cinch::Value>, ::cinch::EncodeError> {
                let mut encoder = ::cinch::StructEncoder::new();
                #(#encode_fields)*
                ::core::result::Result::Ok(::core::option::Option::Some(encoder.finish()))
            }

            #[allow(unused_variables)]
            fn decode(
                &mut self,
                value: &::cinch::Value,
            ) -> ::core::result::Result<(), ::cinch::DecodeError> {
                let decoder = ::cinch::StructDecoder::new(value)?;
                #(#decode_fields)*
                ::core::result::Result::Ok(())
            }
        }
    };

    Ok(expanded)
}
