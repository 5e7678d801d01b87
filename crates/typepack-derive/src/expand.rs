//! Code generation: the options struct and the `Format`/`Encode`/`Decode`
//! impls for a parsed container.

use std::collections::HashSet;

use proc_macro2::{Span, TokenStream, TokenTree};
use quote::{format_ident, quote, ToTokens};
use syn::{DeriveInput, GenericParam, Lifetime};

use crate::parser::{self, ContainerData, Field, UnitVariant, Variant};

pub fn expand(input: &DeriveInput) -> Result<TokenStream, Vec<syn::Error>> {
    let container = parser::parse(input)?;
    let scaffold = Scaffold::new(input);
    let tokens = match &container.data {
        ContainerData::Struct { fields, unit } => expand_struct(&scaffold, fields, *unit),
        ContainerData::FieldlessEnum(variants) => expand_fieldless_enum(&scaffold, variants),
        ContainerData::DataEnum(variants) => expand_data_enum(&scaffold, variants),
    };
    Ok(tokens)
}

/// Everything shared by the three container shapes: idents, generics, and
/// bound construction.
struct Scaffold<'a> {
    ident: &'a syn::Ident,
    vis: &'a syn::Visibility,
    generics: &'a syn::Generics,
    options_ident: syn::Ident,
    /// Arena lifetime of the `Decode` impl: the container's own lifetime
    /// when it has one, a fresh `'arena` otherwise.
    decode_lt: Lifetime,
    has_own_lifetime: bool,
    param_names: HashSet<String>,
}

impl<'a> Scaffold<'a> {
    fn new(input: &'a DeriveInput) -> Self {
        let own_lifetime = input.generics.params.iter().find_map(|param| match param {
            GenericParam::Lifetime(lt) => Some(lt.lifetime.clone()),
            _ => None,
        });
        let has_own_lifetime = own_lifetime.is_some();
        let decode_lt =
            own_lifetime.unwrap_or_else(|| Lifetime::new("'arena", Span::call_site()));

        let mut param_names = HashSet::new();
        for param in &input.generics.params {
            match param {
                GenericParam::Type(p) => {
                    param_names.insert(p.ident.to_string());
                }
                GenericParam::Lifetime(p) => {
                    param_names.insert(p.lifetime.ident.to_string());
                }
                GenericParam::Const(_) => {}
            }
        }

        Self {
            ident: &input.ident,
            vis: &input.vis,
            generics: &input.generics,
            options_ident: format_ident!("{}FormatOptions", input.ident),
            decode_lt,
            has_own_lifetime,
            param_names,
        }
    }

    fn mentions_generics(&self, ty: &syn::Type) -> bool {
        fn scan(stream: TokenStream, names: &HashSet<String>) -> bool {
            for token in stream {
                match token {
                    TokenTree::Ident(ident) => {
                        if names.contains(&ident.to_string()) {
                            return true;
                        }
                    }
                    TokenTree::Group(group) => {
                        if scan(group.stream(), names) {
                            return true;
                        }
                    }
                    _ => {}
                }
            }
            false
        }
        !self.param_names.is_empty() && scan(ty.to_token_stream(), &self.param_names)
    }

    /// Builds a where clause: the container's own predicates plus
    /// `#ty: #bound` for every listed type that involves a generic
    /// parameter.
    fn where_clause(&self, tys: &[&syn::Type], bound: &TokenStream) -> TokenStream {
        let mut predicates: Vec<TokenStream> = Vec::new();
        if let Some(clause) = &self.generics.where_clause {
            for predicate in &clause.predicates {
                predicates.push(quote!(#predicate));
            }
        }
        let mut seen = HashSet::new();
        for ty in tys {
            if self.mentions_generics(ty) && seen.insert(ty.to_token_stream().to_string()) {
                predicates.push(quote!(#ty: #bound));
            }
        }
        if predicates.is_empty() {
            quote!()
        } else {
            quote!(where #(#predicates),*)
        }
    }

    /// Impl generics for the `Decode` impl: the container's generics, with a
    /// fresh arena lifetime prepended when the container declares none.
    fn decode_generics(&self) -> syn::Generics {
        let mut generics = self.generics.clone();
        if !self.has_own_lifetime {
            let lt = &self.decode_lt;
            generics
                .params
                .insert(0, syn::parse_quote!(#lt));
        }
        generics
    }

    /// `PhantomData` field declaration and initializer for the options
    /// struct, when the container has generic parameters.
    fn marker(&self) -> (TokenStream, TokenStream) {
        if self.generics.params.is_empty() {
            return (quote!(), quote!());
        }
        let elems = self.generics.params.iter().filter_map(|param| match param {
            GenericParam::Lifetime(p) => {
                let lt = &p.lifetime;
                Some(quote!(&#lt ()))
            }
            GenericParam::Type(p) => {
                let ident = &p.ident;
                Some(quote!(#ident))
            }
            GenericParam::Const(_) => None,
        });
        (
            quote! {
                #[doc(hidden)]
                pub __marker: ::core::marker::PhantomData<(#(#elems,)*)>,
            },
            quote! {
                __marker: ::core::marker::PhantomData,
            },
        )
    }
}

fn map_header_len(entries: usize) -> usize {
    if entries <= 0x0f {
        1
    } else if entries <= 0xffff {
        3
    } else {
        5
    }
}

fn str_header_len(len: usize) -> usize {
    if len <= 0x1f {
        1
    } else if len <= 0xff {
        2
    } else if len <= 0xffff {
        3
    } else {
        5
    }
}

fn name_overhead(name: &str) -> usize {
    str_header_len(name.len()) + name.len()
}

fn int_encoded_len(value: i64) -> usize {
    if value >= 0 {
        if value <= 0x7f {
            1
        } else if value <= 0xff {
            2
        } else if value <= 0xffff {
            3
        } else if value <= 0xffff_ffff {
            5
        } else {
            9
        }
    } else if value >= -32 {
        1
    } else if value >= i8::MIN as i64 {
        2
    } else if value >= i16::MIN as i64 {
        3
    } else if value >= i32::MIN as i64 {
        5
    } else {
        9
    }
}

fn byte_str(name: &str) -> syn::LitByteStr {
    syn::LitByteStr::new(name.as_bytes(), Span::call_site())
}

fn expand_struct(s: &Scaffold<'_>, fields: &[Field<'_>], unit: bool) -> TokenStream {
    let ident = s.ident;
    let vis = s.vis;
    let options_ident = &s.options_ident;
    let generics = s.generics;
    let (impl_generics, ty_generics, _) = generics.split_for_impl();
    let decode_generics = s.decode_generics();
    let (de_impl_generics, _, _) = decode_generics.split_for_impl();
    let lt = &s.decode_lt;

    let tys: Vec<&syn::Type> = fields.iter().map(|f| f.ty).collect();
    let format_where = s.where_clause(&tys, &quote!(::typepack::Format));
    let encode_where = s.where_clause(&tys, &quote!(::typepack::Encode));
    let decode_where = s.where_clause(&tys, &quote!(::typepack::Decode<#lt>));

    let ids: Vec<&syn::Ident> = fields.iter().map(|f| f.ident).collect();
    let ids = &ids;
    let tys = &tys;
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    let names = &names;
    let name_lits: Vec<syn::LitByteStr> = fields.iter().map(|f| byte_str(&f.name)).collect();
    let name_lits = &name_lits;
    let slots: Vec<syn::Ident> = fields
        .iter()
        .map(|f| format_ident!("__field_{}", f.name))
        .collect();
    let slots = &slots;

    let count = fields.len();
    let count_u32 = count as u32;
    let map_hdr = map_header_len(count);
    let arr_hdr = map_header_len(count);
    let name_ohs: Vec<usize> = fields.iter().map(|f| name_overhead(&f.name)).collect();
    let name_ohs = &name_ohs;
    let max_name = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);

    let options_doc = format!("Format options for [`{ident}`].");
    let (marker_decl, marker_init) = s.marker();

    let variable_length = quote!(false #( || <#tys as ::typepack::Format>::VARIABLE_LENGTH)*);
    let requires_arena = quote!(false #( || <#tys as ::typepack::Format>::REQUIRES_ARENA)*);

    let (map_size, array_size) = if fields.is_empty() {
        (quote!(0), quote!(0))
    } else {
        (
            quote! {
                #map_hdr #( .saturating_add(#name_ohs)
                    .saturating_add(<#tys as ::typepack::Format>::largest_encoded_size(&options.#ids)) )*
            },
            quote! {
                #arr_hdr #( .saturating_add(<#tys as ::typepack::Format>::largest_encoded_size(&options.#ids)) )*
            },
        )
    };

    let encode_body = if fields.is_empty() {
        quote! {
            let _ = (w, options);
            Ok(())
        }
    } else {
        quote! {
            match options.layout {
                ::typepack::StructLayout::Map => {
                    ::typepack::write_map_header(w, #count_u32)?;
                    #(
                        ::typepack::write_name(w, #names)?;
                        ::typepack::Encode::encode(&self.#ids, w, &options.#ids)?;
                    )*
                }
                ::typepack::StructLayout::Array => {
                    ::typepack::write_array_header(w, #count_u32)?;
                    #(
                        ::typepack::Encode::encode(&self.#ids, w, &options.#ids)?;
                    )*
                }
            }
            Ok(())
        }
    };

    let self_ctor = if unit { quote!(Self) } else { quote!(Self {}) };
    let decode_body = if fields.is_empty() {
        quote! {
            let _ = (r, cx, options);
            Ok(#self_ctor)
        }
    } else {
        quote! {
            match options.layout {
                ::typepack::StructLayout::Map => {
                    let __count = ::typepack::read_map_header(r)?;
                    if __count != #count {
                        return Err(::typepack::DecodeError::Invalid);
                    }
                    #( let mut #slots: ::core::option::Option<#tys> = ::core::option::Option::None; )*
                    for _ in 0..#count {
                        let __name = ::typepack::read_name(r, #max_name)?;
                        #(
                            if __name == #name_lits {
                                if #slots.is_some() {
                                    return Err(::typepack::DecodeError::Invalid);
                                }
                                #slots = ::core::option::Option::Some(
                                    <#tys as ::typepack::Decode<#lt>>::decode(r, cx, &options.#ids)?,
                                );
                            } else
                        )*
                        {
                            return Err(::typepack::DecodeError::Invalid);
                        }
                    }
                    Ok(Self {
                        #( #ids: #slots.ok_or(::typepack::DecodeError::Invalid)?, )*
                    })
                }
                ::typepack::StructLayout::Array => {
                    let __count = ::typepack::read_array_header(r)?;
                    if __count != #count {
                        return Err(::typepack::DecodeError::Invalid);
                    }
                    #( let #slots = <#tys as ::typepack::Decode<#lt>>::decode(r, cx, &options.#ids)?; )*
                    Ok(Self {
                        #( #ids: #slots, )*
                    })
                }
            }
        }
    };

    quote! {
        #[doc = #options_doc]
        #vis struct #options_ident #generics #format_where {
            /// Map or array layout; see [`typepack::StructLayout`].
            pub layout: ::typepack::StructLayout,
            #( pub #ids: <#tys as ::typepack::Format>::Options, )*
            #marker_decl
        }

        #[automatically_derived]
        impl #impl_generics ::core::default::Default for #options_ident #ty_generics #format_where {
            fn default() -> Self {
                Self {
                    layout: ::core::default::Default::default(),
                    #( #ids: ::core::default::Default::default(), )*
                    #marker_init
                }
            }
        }

        #[automatically_derived]
        impl #impl_generics ::typepack::Format for #ident #ty_generics #format_where {
            type Options = #options_ident #ty_generics;
            const VARIABLE_LENGTH: bool = #variable_length;
            const REQUIRES_ARENA: bool = #requires_arena;

            fn largest_encoded_size(options: &Self::Options) -> usize {
                match options.layout {
                    ::typepack::StructLayout::Map => #map_size,
                    ::typepack::StructLayout::Array => #array_size,
                }
            }
        }

        #[automatically_derived]
        impl #impl_generics ::typepack::Encode for #ident #ty_generics #encode_where {
            fn encode(
                &self,
                w: &mut ::typepack::Writer<'_>,
                options: &Self::Options,
            ) -> ::core::result::Result<(), ::typepack::EncodeError> {
                #encode_body
            }
        }

        #[automatically_derived]
        impl #de_impl_generics ::typepack::Decode<#lt> for #ident #ty_generics #decode_where {
            fn decode(
                r: &mut ::typepack::Reader<'_>,
                cx: &::typepack::DecodeCx<#lt>,
                options: &Self::Options,
            ) -> ::core::result::Result<Self, ::typepack::DecodeError> {
                #decode_body
            }
        }
    }
}

fn expand_fieldless_enum(s: &Scaffold<'_>, variants: &[UnitVariant<'_>]) -> TokenStream {
    let ident = s.ident;
    let vis = s.vis;
    let options_ident = &s.options_ident;
    let generics = s.generics;
    let (impl_generics, ty_generics, _) = generics.split_for_impl();
    let decode_generics = s.decode_generics();
    let (de_impl_generics, _, _) = decode_generics.split_for_impl();
    let lt = &s.decode_lt;

    let empty_where = s.where_clause(&[], &quote!(::typepack::Format));

    let vids: Vec<&syn::Ident> = variants.iter().map(|v| v.ident).collect();
    let vids = &vids;
    let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
    let names = &names;
    let name_lits: Vec<syn::LitByteStr> = variants.iter().map(|v| byte_str(&v.name)).collect();
    let name_lits = &name_lits;
    let discs: Vec<i64> = variants.iter().map(|v| v.discriminant).collect();
    let discs = &discs;

    let max_int = variants
        .iter()
        .map(|v| int_encoded_len(v.discriminant))
        .max()
        .unwrap_or(0);
    let max_str = variants
        .iter()
        .map(|v| name_overhead(&v.name))
        .max()
        .unwrap_or(0);
    let max_name = variants.iter().map(|v| v.name.len()).max().unwrap_or(0);

    let options_doc = format!("Format options for [`{ident}`].");
    let (marker_decl, marker_init) = s.marker();

    let encode_body = if variants.is_empty() {
        quote! {
            let _ = (w, options);
            match *self {}
        }
    } else {
        quote! {
            match options.repr {
                ::typepack::EnumRepr::Int => {
                    let value: i64 = match self {
                        #( Self::#vids => #discs, )*
                    };
                    ::typepack::write_int(w, value)
                }
                ::typepack::EnumRepr::Str => {
                    let name: &str = match self {
                        #( Self::#vids => #names, )*
                    };
                    ::typepack::write_name(w, name)
                }
            }
        }
    };

    let decode_body = if variants.is_empty() {
        quote! {
            let _ = (r, options);
            Err(::typepack::DecodeError::Invalid)
        }
    } else {
        quote! {
            match options.repr {
                ::typepack::EnumRepr::Int => {
                    let value = match i64::try_from(::typepack::read_int(r)?) {
                        Ok(value) => value,
                        Err(_) => return Err(::typepack::DecodeError::Invalid),
                    };
                    match value {
                        #( #discs => Ok(Self::#vids), )*
                        _ => Err(::typepack::DecodeError::Invalid),
                    }
                }
                ::typepack::EnumRepr::Str => {
                    let name = ::typepack::read_name(r, #max_name)?;
                    #(
                        if name == #name_lits {
                            return Ok(Self::#vids);
                        }
                    )*
                    Err(::typepack::DecodeError::Invalid)
                }
            }
        }
    };

    quote! {
        #[doc = #options_doc]
        #vis struct #options_ident #generics #empty_where {
            /// Integer discriminant or variant name; see
            /// [`typepack::EnumRepr`].
            pub repr: ::typepack::EnumRepr,
            #marker_decl
        }

        #[automatically_derived]
        impl #impl_generics ::core::default::Default for #options_ident #ty_generics #empty_where {
            fn default() -> Self {
                Self {
                    repr: ::core::default::Default::default(),
                    #marker_init
                }
            }
        }

        #[automatically_derived]
        impl #impl_generics ::typepack::Format for #ident #ty_generics #empty_where {
            type Options = #options_ident #ty_generics;
            const VARIABLE_LENGTH: bool = false;
            const REQUIRES_ARENA: bool = false;

            fn largest_encoded_size(options: &Self::Options) -> usize {
                match options.repr {
                    ::typepack::EnumRepr::Int => #max_int,
                    ::typepack::EnumRepr::Str => #max_str,
                }
            }
        }

        #[automatically_derived]
        impl #impl_generics ::typepack::Encode for #ident #ty_generics #empty_where {
            fn encode(
                &self,
                w: &mut ::typepack::Writer<'_>,
                options: &Self::Options,
            ) -> ::core::result::Result<(), ::typepack::EncodeError> {
                #encode_body
            }
        }

        #[automatically_derived]
        impl #de_impl_generics ::typepack::Decode<#lt> for #ident #ty_generics #empty_where {
            fn decode(
                r: &mut ::typepack::Reader<'_>,
                _cx: &::typepack::DecodeCx<#lt>,
                options: &Self::Options,
            ) -> ::core::result::Result<Self, ::typepack::DecodeError> {
                #decode_body
            }
        }
    }
}

fn expand_data_enum(s: &Scaffold<'_>, variants: &[Variant<'_>]) -> TokenStream {
    let ident = s.ident;
    let vis = s.vis;
    let options_ident = &s.options_ident;
    let generics = s.generics;
    let (impl_generics, ty_generics, _) = generics.split_for_impl();
    let decode_generics = s.decode_generics();
    let (de_impl_generics, _, _) = decode_generics.split_for_impl();
    let lt = &s.decode_lt;

    let payload_tys: Vec<&syn::Type> = variants.iter().filter_map(|v| v.payload).collect();
    let format_where = s.where_clause(&payload_tys, &quote!(::typepack::Format));
    let encode_where = s.where_clause(&payload_tys, &quote!(::typepack::Encode));
    let decode_where = s.where_clause(&payload_tys, &quote!(::typepack::Decode<#lt>));
    let payload_tys = &payload_tys;

    let newtype_fields: Vec<&syn::Ident> = variants
        .iter()
        .filter(|v| v.payload.is_some())
        .map(|v| &v.options_field)
        .collect();
    let newtype_fields = &newtype_fields;

    let max_name = variants.iter().map(|v| v.name.len()).max().unwrap_or(0);
    let options_doc = format!("Format options for [`{ident}`].");
    let (marker_decl, marker_init) = s.marker();

    let variable_length =
        quote!(false #( || <#payload_tys as ::typepack::Format>::VARIABLE_LENGTH)*);
    let requires_arena =
        quote!(false #( || <#payload_tys as ::typepack::Format>::REQUIRES_ARENA)*);

    let mut map_sizes = Vec::new();
    let mut untagged_sizes = Vec::new();
    let mut map_encode_arms = Vec::new();
    let mut untagged_encode_arms = Vec::new();
    let mut map_decode_arms = Vec::new();
    let mut untagged_decode_steps = Vec::new();

    for variant in variants {
        let vid = variant.ident;
        let vname = variant.name.as_str();
        let nlit = byte_str(&variant.name);
        let oh = name_overhead(&variant.name);
        match variant.payload {
            Some(ty) => {
                let field = &variant.options_field;
                map_sizes.push(quote! {
                    #oh.saturating_add(
                        <#ty as ::typepack::Format>::largest_encoded_size(&options.#field),
                    )
                });
                untagged_sizes.push(quote! {
                    <#ty as ::typepack::Format>::largest_encoded_size(&options.#field)
                });
                map_encode_arms.push(quote! {
                    Self::#vid(__payload) => {
                        ::typepack::write_name(w, #vname)?;
                        ::typepack::Encode::encode(__payload, w, &options.#field)?;
                    }
                });
                untagged_encode_arms.push(quote! {
                    Self::#vid(__payload) => {
                        ::typepack::Encode::encode(__payload, w, &options.#field)?;
                    }
                });
                map_decode_arms.push(quote! {
                    if __name == #nlit {
                        return Ok(Self::#vid(
                            <#ty as ::typepack::Decode<#lt>>::decode(r, cx, &options.#field)?,
                        ));
                    }
                });
                untagged_decode_steps.push(quote! {
                    match <#ty as ::typepack::Decode<#lt>>::decode(r, cx, &options.#field) {
                        Ok(__payload) => return Ok(Self::#vid(__payload)),
                        Err(::typepack::DecodeError::Invalid) => r.seek(__mark),
                        Err(e) => return Err(e),
                    }
                });
            }
            None => {
                map_sizes.push(quote!(#oh.saturating_add(1)));
                untagged_sizes.push(quote!(1usize));
                map_encode_arms.push(quote! {
                    Self::#vid => {
                        ::typepack::write_name(w, #vname)?;
                        ::typepack::write_nil(w)?;
                    }
                });
                untagged_encode_arms.push(quote! {
                    Self::#vid => {
                        ::typepack::write_nil(w)?;
                    }
                });
                map_decode_arms.push(quote! {
                    if __name == #nlit {
                        ::typepack::read_nil(r)?;
                        return Ok(Self::#vid);
                    }
                });
                untagged_decode_steps.push(quote! {
                    match ::typepack::read_nil(r) {
                        Ok(()) => return Ok(Self::#vid),
                        Err(::typepack::DecodeError::Invalid) => r.seek(__mark),
                        Err(e) => return Err(e),
                    }
                });
            }
        }
    }

    quote! {
        #[doc = #options_doc]
        #vis struct #options_ident #generics #format_where {
            /// Tagged map or untagged payload; see [`typepack::EnumLayout`].
            pub layout: ::typepack::EnumLayout,
            #( pub #newtype_fields: <#payload_tys as ::typepack::Format>::Options, )*
            #marker_decl
        }

        #[automatically_derived]
        impl #impl_generics ::core::default::Default for #options_ident #ty_generics #format_where {
            fn default() -> Self {
                Self {
                    layout: ::core::default::Default::default(),
                    #( #newtype_fields: ::core::default::Default::default(), )*
                    #marker_init
                }
            }
        }

        #[automatically_derived]
        impl #impl_generics ::typepack::Format for #ident #ty_generics #format_where {
            type Options = #options_ident #ty_generics;
            const VARIABLE_LENGTH: bool = #variable_length;
            const REQUIRES_ARENA: bool = #requires_arena;

            fn largest_encoded_size(options: &Self::Options) -> usize {
                match options.layout {
                    ::typepack::EnumLayout::Map => {
                        let mut __size = 0usize;
                        #(
                            let __candidate = #map_sizes;
                            if __candidate > __size {
                                __size = __candidate;
                            }
                        )*
                        1usize.saturating_add(__size)
                    }
                    ::typepack::EnumLayout::Untagged => {
                        let mut __size = 0usize;
                        #(
                            let __candidate = #untagged_sizes;
                            if __candidate > __size {
                                __size = __candidate;
                            }
                        )*
                        __size
                    }
                }
            }
        }

        #[automatically_derived]
        impl #impl_generics ::typepack::Encode for #ident #ty_generics #encode_where {
            fn encode(
                &self,
                w: &mut ::typepack::Writer<'_>,
                options: &Self::Options,
            ) -> ::core::result::Result<(), ::typepack::EncodeError> {
                match options.layout {
                    ::typepack::EnumLayout::Map => {
                        ::typepack::write_map_header(w, 1u32)?;
                        match self {
                            #(#map_encode_arms)*
                        }
                    }
                    ::typepack::EnumLayout::Untagged => {
                        match self {
                            #(#untagged_encode_arms)*
                        }
                    }
                }
                Ok(())
            }
        }

        #[automatically_derived]
        impl #de_impl_generics ::typepack::Decode<#lt> for #ident #ty_generics #decode_where {
            fn decode(
                r: &mut ::typepack::Reader<'_>,
                cx: &::typepack::DecodeCx<#lt>,
                options: &Self::Options,
            ) -> ::core::result::Result<Self, ::typepack::DecodeError> {
                match options.layout {
                    ::typepack::EnumLayout::Map => {
                        let __count = ::typepack::read_map_header(r)?;
                        if __count != 1 {
                            return Err(::typepack::DecodeError::Invalid);
                        }
                        let __name = ::typepack::read_name(r, #max_name)?;
                        #(#map_decode_arms)*
                        Err(::typepack::DecodeError::Invalid)
                    }
                    ::typepack::EnumLayout::Untagged => {
                        let __mark = r.pos();
                        #(#untagged_decode_steps)*
                        Err(::typepack::DecodeError::Invalid)
                    }
                }
            }
        }
    }
}
