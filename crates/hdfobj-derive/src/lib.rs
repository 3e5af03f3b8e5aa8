//! Proc macro for mapping structs to hdfobj records.
//!
//! Provides `#[derive(Record)]`, which implements `hdfobj::Record` for a
//! struct whose fields are all primitive numeric types.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Index, Member};

/// Derive `hdfobj::Record` for a struct of numeric fields.
///
/// The generated implementation describes the struct as a flattened
/// aggregate: one atomic element per field, in declaration order, with each
/// field's byte offset inside the struct. The descriptor is built on first
/// use and cached.
///
/// # Supported field types
/// - `i8`, `i16`, `i32`, `i64`
/// - `u8`, `u16`, `u32`, `u64`
/// - `f32`, `f64`
///
/// Any other field type, including nested structs and arrays, is rejected
/// at compile time because it does not implement `hdfobj::Element`.
#[proc_macro_derive(Record)]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match impl_record(&input) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn impl_record(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record can only be derived for structs",
            ));
        }
    };
    if fields.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Record needs at least one field",
        ));
    }

    let mut field_descriptors = Vec::new();
    let mut flatten_stmts = Vec::new();
    let mut unflatten_exprs = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let ty = &field.ty;
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(Index {
                index: index as u32,
                span: Span::call_site(),
            }),
        };
        let field_name = match &field.ident {
            Some(ident) => ident.to_string(),
            None => index.to_string(),
        };

        field_descriptors.push(quote! {
            ::hdfobj::FieldDescriptor::new(
                #field_name,
                <#ty as ::hdfobj::Element>::KIND,
                ::core::mem::offset_of!(#name, #member),
            )
        });
        flatten_stmts.push(quote! {
            out.push(::hdfobj::Element::into_value(self.#member));
        });
        unflatten_exprs.push(quote! {
            <#ty as ::hdfobj::Element>::from_value(values[#index])?
        });
    }

    let arity = fields.len();
    let construct = match fields {
        Fields::Named(_) => {
            let members = fields.iter().filter_map(|f| f.ident.as_ref());
            quote! { Self { #(#members: #unflatten_exprs),* } }
        }
        Fields::Unnamed(_) => quote! { Self(#(#unflatten_exprs),*) },
        Fields::Unit => unreachable!("unit structs have no fields"),
    };

    let expanded = quote! {
        impl ::hdfobj::Record for #name {
            fn descriptor() -> ::hdfobj::Result<::hdfobj::TypeDescriptor> {
                static DESCRIPTOR: ::std::sync::OnceLock<::hdfobj::TypeDescriptor> =
                    ::std::sync::OnceLock::new();
                if let ::core::option::Option::Some(cached) = DESCRIPTOR.get() {
                    return ::core::result::Result::Ok(cached.clone());
                }
                let built = ::hdfobj::TypeDescriptor::aggregate(
                    ::std::vec![#(#field_descriptors),*],
                    ::core::mem::size_of::<#name>(),
                )?;
                ::core::result::Result::Ok(DESCRIPTOR.get_or_init(|| built).clone())
            }

            fn flatten(&self, out: &mut ::std::vec::Vec<::hdfobj::Value>) {
                #(#flatten_stmts)*
            }

            fn unflatten(values: &[::hdfobj::Value]) -> ::hdfobj::Result<Self> {
                if values.len() != #arity {
                    return ::core::result::Result::Err(::hdfobj::Error::ShapeMismatch {
                        expected: #arity as u64,
                        actual: values.len() as u64,
                    });
                }
                ::core::result::Result::Ok(#construct)
            }
        }
    };

    Ok(expanded)
}
