//! AST model for `#[derive(Pack)]`: classifies the input item and collects
//! the facts code generation needs.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Expr, ExprLit, ExprUnary, Fields, GenericParam, Lit, UnOp};

pub struct Container<'a> {
    pub data: ContainerData<'a>,
}

pub enum ContainerData<'a> {
    /// Named-field struct; `unit` distinguishes `struct S;` from
    /// `struct S {}` for construction syntax.
    Struct { fields: Vec<Field<'a>>, unit: bool },
    /// Enum whose variants all carry no payload.
    FieldlessEnum(Vec<UnitVariant<'a>>),
    /// Enum with at least one newtype payload variant.
    DataEnum(Vec<Variant<'a>>),
}

pub struct Field<'a> {
    pub ident: &'a syn::Ident,
    /// Wire name: the field identifier, raw prefix stripped.
    pub name: String,
    pub ty: &'a syn::Type,
}

pub struct UnitVariant<'a> {
    pub ident: &'a syn::Ident,
    pub name: String,
    pub discriminant: i64,
}

pub struct Variant<'a> {
    pub ident: &'a syn::Ident,
    /// Wire name: the variant identifier, raw prefix stripped.
    pub name: String,
    /// Name of this variant's field in the generated options struct.
    pub options_field: syn::Ident,
    /// Payload type; `None` for unit variants, which carry `nil`.
    pub payload: Option<&'a syn::Type>,
}

pub fn parse(input: &DeriveInput) -> Result<Container<'_>, Vec<syn::Error>> {
    let mut errors = Vec::new();

    check_generics(input, &mut errors);

    let data = match &input.data {
        Data::Struct(data) => parse_struct(&data.fields, &mut errors),
        Data::Enum(data) => parse_enum(data, &mut errors),
        Data::Union(data) => {
            errors.push(syn::Error::new(
                data.union_token.span(),
                "#[derive(Pack)] does not support unions",
            ));
            None
        }
    };

    match data {
        Some(data) if errors.is_empty() => Ok(Container { data }),
        _ => Err(errors),
    }
}

fn check_generics(input: &DeriveInput, errors: &mut Vec<syn::Error>) {
    let lifetimes = input
        .generics
        .params
        .iter()
        .filter(|param| matches!(param, GenericParam::Lifetime(_)))
        .count();
    if lifetimes > 1 {
        errors.push(syn::Error::new(
            input.generics.span(),
            "#[derive(Pack)] supports at most one lifetime parameter",
        ));
    }
    for param in &input.generics.params {
        if let GenericParam::Const(param) = param {
            errors.push(syn::Error::new(
                param.span(),
                "#[derive(Pack)] does not support const parameters",
            ));
        }
    }
}

fn parse_struct<'a>(
    fields: &'a Fields,
    errors: &mut Vec<syn::Error>,
) -> Option<ContainerData<'a>> {
    match fields {
        Fields::Named(named) => {
            let mut out = Vec::with_capacity(named.named.len());
            for field in &named.named {
                let ident = field.ident.as_ref()?;
                let name = unraw(ident);
                if name == "layout" {
                    errors.push(syn::Error::new(
                        ident.span(),
                        "field name `layout` collides with the generated options field",
                    ));
                }
                out.push(Field {
                    ident,
                    name,
                    ty: &field.ty,
                });
            }
            Some(ContainerData::Struct {
                fields: out,
                unit: false,
            })
        }
        Fields::Unit => Some(ContainerData::Struct {
            fields: Vec::new(),
            unit: true,
        }),
        Fields::Unnamed(unnamed) => {
            errors.push(syn::Error::new(
                unnamed.span(),
                "#[derive(Pack)] does not support tuple structs; name the fields",
            ));
            None
        }
    }
}

fn parse_enum<'a>(
    data: &'a syn::DataEnum,
    errors: &mut Vec<syn::Error>,
) -> Option<ContainerData<'a>> {
    let fieldless = data
        .variants
        .iter()
        .all(|variant| matches!(variant.fields, Fields::Unit));

    if fieldless {
        let mut out = Vec::with_capacity(data.variants.len());
        let mut next = 0i64;
        for variant in &data.variants {
            let discriminant = match &variant.discriminant {
                Some((_, expr)) => match int_literal(expr) {
                    Ok(value) => value,
                    Err(err) => {
                        errors.push(err);
                        next
                    }
                },
                None => next,
            };
            next = discriminant.wrapping_add(1);
            out.push(UnitVariant {
                ident: &variant.ident,
                name: unraw(&variant.ident),
                discriminant,
            });
        }
        return Some(ContainerData::FieldlessEnum(out));
    }

    let mut out = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if variant.discriminant.is_some() {
            errors.push(syn::Error::new(
                variant.ident.span(),
                "explicit discriminants are only supported on fieldless enums",
            ));
        }
        let payload = match &variant.fields {
            Fields::Unit => None,
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                Some(&unnamed.unnamed[0].ty)
            }
            other => {
                errors.push(syn::Error::new(
                    other.span(),
                    "variants must be units or single-field newtypes; wrap the fields in a struct",
                ));
                None
            }
        };
        let name = unraw(&variant.ident);
        let options_field = options_field_ident(&name, variant.ident.span());
        if options_field == "layout" {
            errors.push(syn::Error::new(
                variant.ident.span(),
                "variant name `Layout` collides with the generated options field",
            ));
        }
        out.push(Variant {
            ident: &variant.ident,
            name,
            options_field,
            payload,
        });
    }

    let mut seen = std::collections::HashSet::new();
    for variant in &out {
        if !seen.insert(variant.options_field.to_string()) {
            errors.push(syn::Error::new(
                variant.ident.span(),
                "variant names collide after snake_case conversion",
            ));
        }
    }

    Some(ContainerData::DataEnum(out))
}

fn int_literal(expr: &Expr) -> Result<i64, syn::Error> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(int), ..
        }) => int.base10_parse(),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => match &**expr {
            Expr::Lit(ExprLit {
                lit: Lit::Int(int), ..
            }) => Ok(-int.base10_parse::<i64>()?),
            _ => Err(syn::Error::new(
                expr.span(),
                "discriminant must be an integer literal",
            )),
        },
        _ => Err(syn::Error::new(
            expr.span(),
            "discriminant must be an integer literal",
        )),
    }
}

pub fn unraw(ident: &syn::Ident) -> String {
    ident.to_string().trim_start_matches("r#").to_owned()
}

fn options_field_ident(name: &str, span: Span) -> syn::Ident {
    let snake = to_snake_case(name);
    syn::parse_str::<syn::Ident>(&snake)
        .unwrap_or_else(|_| syn::Ident::new_raw(&snake, span))
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
