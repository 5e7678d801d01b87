//! Derive macro for the `typepack` codec traits.

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod expand;
mod parser;

/// Derives the `typepack` codec surface for a struct or enum.
///
/// Generates a `<Name>FormatOptions` struct mirroring the item — a layout
/// (or repr) selector plus one options field per struct field or payload
/// variant — and implementations of `Format`, `Encode`, and `Decode`.
///
/// Supported shapes:
///
/// - structs with named fields, including empty and unit structs;
/// - fieldless enums (encoded as an integer discriminant or the variant
///   name, by options);
/// - enums mixing unit and single-field newtype variants (encoded as a
///   one-entry map keyed by variant name, or untagged, by options).
///
/// Tuple structs, struct variants, unions, and items with more than one
/// lifetime parameter are rejected.
#[proc_macro_derive(Pack)]
pub fn derive_pack(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand::expand(&input)
        .unwrap_or_else(|errors| {
            errors
                .iter()
                .map(syn::Error::to_compile_error)
                .collect()
        })
        .into()
}
