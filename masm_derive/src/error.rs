//! `#[derive(Error)]` expansion.
//!
//! ```ignore
//! use masm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum AsmError {
//!     #[error("unknown mnemonic `{0}`")]
//!     Unknown(String),
//!
//!     #[error("line {line}: {message}")]
//!     Malformed { line: usize, message: String },
//!
//!     #[error("program is empty")]
//!     Empty,
//! }
//! ```
//!
//! Tuple fields are referenced by position (`{0}`, `{1:?}`), named fields by
//! name. Every variant needs its own `#[error]` attribute.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let ident = &variant.ident;
                    let message = message_of(&variant.attrs, variant.span(), &ident.to_string())?;
                    let (pattern, write) = render(&variant.fields, &message, false);
                    Ok(quote! { Self::#ident #pattern => #write, })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = message_of(&input.attrs, input.span(), &name.to_string())?;
            let (_, write) = render(&data.fields, &message, true);
            write
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "#[derive(Error)] is not supported on unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds the destructuring pattern and the `write!` call for a set of fields.
///
/// Only fields named by a placeholder are bound. With `on_self` the fields
/// are read through `self` instead of a pattern.
fn render(fields: &Fields, message: &LitStr, on_self: bool) -> (TokenStream2, TokenStream2) {
    let format = positional_to_named(&message.value());
    let used = placeholders(&format);

    match fields {
        Fields::Unit => (quote! {}, quote! { write!(f, #message) }),
        Fields::Named(named) => {
            let idents: Vec<_> = named
                .named
                .iter()
                .filter_map(|f| f.ident.as_ref())
                .filter(|id| used.contains(&id.to_string()))
                .collect();
            let args = idents.iter().map(|id| {
                if on_self {
                    quote! { #id = &self.#id }
                } else {
                    quote! { #id = #id }
                }
            });
            let write = quote! { write!(f, #message, #(#args),*) };
            (quote! { { #(#idents,)* .. } }, write)
        }
        Fields::Unnamed(unnamed) => {
            let binds: Vec<_> = (0..unnamed.unnamed.len())
                .map(|i| format_ident!("_{}", i))
                .collect();
            let pattern = binds.iter().map(|id| {
                if used.contains(&id.to_string()) {
                    quote! { #id }
                } else {
                    quote! { _ }
                }
            });
            let args = binds
                .iter()
                .enumerate()
                .filter(|(_, id)| used.contains(&id.to_string()))
                .map(|(i, id)| {
                    if on_self {
                        let index = syn::Index::from(i);
                        quote! { #id = &self.#index }
                    } else {
                        quote! { #id = #id }
                    }
                });
            let format = LitStr::new(&format, message.span());
            let write = quote! { write!(f, #format, #(#args),*) };
            (quote! { ( #(#pattern),* ) }, write)
        }
    }
}

/// Names referenced by `{name}` or `{name:spec}` placeholders.
fn placeholders(format: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = format;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        if after.starts_with('{') {
            rest = &after[1..];
            continue;
        }
        let Some(close) = after.find('}') else { break };
        let name = after[..close].split(':').next().unwrap_or_default().trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[close + 1..];
    }
    names
}

/// Finds the `#[error("...")]` literal among `attrs`.
fn message_of(attrs: &[Attribute], span: proc_macro2::Span, target: &str) -> syn::Result<LitStr> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new(
                span,
                format!("`{target}` is missing an #[error(\"...\")] message"),
            )
        })?;

    attr.parse_args::<LitStr>().map_err(|_| {
        syn::Error::new_spanned(
            &attr.meta,
            "expected a string literal, e.g. #[error(\"stack underflow in {instruction}\")]",
        )
    })
}

/// Rewrites `{0}` / `{1:?}` placeholders to `{_0}` / `{_1:?}`, leaving
/// escaped braces and named placeholders alone.
fn positional_to_named(format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 4);
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '{' if chars.peek() == Some(&'{') => {
                out.push('{');
                chars.next();
            }
            '{' if chars.peek().is_some_and(|d| d.is_ascii_digit()) => out.push('_'),
            _ => {}
        }
    }
    out
}
