//! Derive macros generating XDR `PackTo` / `UnpackFrom` implementations.
//!
//! The generated code refers to the `xdr` module by a relative path, so the
//! deriving module must have `use crate::xdr;` in scope.
use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use syn::spanned::Spanned;

#[macro_use]
extern crate quote;
extern crate syn;

#[proc_macro_derive(PackTo, attributes(xdr))]
pub fn derive_pack_to(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    let gen = impl_pack_to(&ast);
    gen.into()
}

#[proc_macro_derive(UnpackFrom, attributes(xdr))]
pub fn derive_unpack_from(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    let gen = impl_unpack_from(&ast);
    gen.into()
}

/// Collects the named fields of a struct, treating a unit struct as having
/// no fields.  Tuple structs are reported as errors.
fn named_fields(
    ds: &syn::DataStruct,
    derive: &str,
    errors: &mut Vec<syn::Error>,
) -> Option<Vec<syn::Field>> {
    match &ds.fields {
        syn::Fields::Named(fields) => Some(fields.named.iter().cloned().collect()),
        syn::Fields::Unnamed(_) => {
            errors.push(syn::Error::new(
                ds.struct_token.span(),
                format!("`#[derive({})]` is not currently supported on tuple structs", derive),
            ));
            None
        }
        syn::Fields::Unit => Some(Vec::new()),
    }
}

/// One variant of an XDR union/enum after discriminant resolution.
struct Variant<'a> {
    ident: &'a syn::Ident,
    discriminant: TokenStream,
    inner: Option<&'a syn::Type>,
    span: Span,
}

/// Resolves the discriminant of every variant.  Discriminants come from an
/// `#[xdr(N)]` attribute, an explicit `= N`, or count up from the previous
/// variant (starting at zero).
fn enum_variants<'a>(
    de: &'a syn::DataEnum,
    derive: &str,
    errors: &mut Vec<syn::Error>,
) -> Vec<Variant<'a>> {
    let mut variants = Vec::new();
    let mut discriminant = quote!(0);
    let mut has_discriminants = false;

    for variant in de.variants.iter() {
        let n_from_attr = discriminant_from_attr(errors, &variant.attrs);
        let n_from_discriminant = match &variant.discriminant {
            None => None,
            Some((_, expr)) => {
                has_discriminants = true;
                Some(expr.to_token_stream())
            }
        };

        if n_from_attr.is_some() && has_discriminants {
            errors.push(syn::Error::new(
                de.enum_token.span(),
                format!(
                    "`#[derive({})]` cannot mix custom discriminant and attribute based discriminant",
                    derive
                ),
            ));

            continue;
        }

        if let Some(n) = n_from_attr.or(n_from_discriminant) {
            discriminant = n;
        }

        let inner = match &variant.fields {
            syn::Fields::Unit => None,
            syn::Fields::Unnamed(unnamed) => {
                if unnamed.unnamed.len() != 1 {
                    errors.push(syn::Error::new(
                        unnamed.paren_token.span,
                        format!(
                            "`#[derive({})]` enum variant cannot contain more than one field",
                            derive
                        ),
                    ));

                    continue;
                }
                unnamed.unnamed.first().map(|field| &field.ty)
            }
            syn::Fields::Named(named) => {
                errors.push(syn::Error::new(
                    named.brace_token.span,
                    format!("`#[derive({})]` is not supported on struct-like variants", derive),
                ));

                continue;
            }
        };

        variants.push(Variant {
            ident: &variant.ident,
            discriminant: discriminant.clone(),
            inner,
            span: variant.span(),
        });

        discriminant = quote!((#discriminant)+1);
    }

    if variants.is_empty() {
        errors.push(syn::Error::new(
            de.brace_token.span,
            format!("`#[derive({})]` cannot derive for empty enum", derive),
        ));
    }

    variants
}

/// Transform the input into a token stream containing any generated implementations,
/// as well as all errors that occurred.
fn impl_pack_to(input: &syn::DeriveInput) -> TokenStream {
    let mut errors: Vec<syn::Error> = Vec::new();

    let mut output_tokens = match &input.data {
        syn::Data::Struct(ds) => impl_pack_to_struct(&input.ident, ds, &mut errors),
        syn::Data::Enum(de) => impl_pack_to_enum(&input.ident, de, &mut errors),
        syn::Data::Union(_) => {
            errors.push(syn::Error::new(
                input.span(),
                "`#[derive(PackTo)]` cannot be applied to unions",
            ));
            TokenStream::new()
        }
    };

    // Emit errors
    output_tokens.extend(errors.iter().map(|err| err.to_compile_error()));

    output_tokens
}

fn impl_pack_to_struct(
    name: &syn::Ident,
    ds: &syn::DataStruct,
    errors: &mut Vec<syn::Error>,
) -> TokenStream {
    let fields = match named_fields(ds, "PackTo", errors) {
        Some(fields) => fields,
        None => return TokenStream::new(),
    };

    let idents: Vec<_> = fields.iter().filter_map(|f| f.ident.as_ref()).collect();
    let types: Vec<_> = fields.iter().map(|f| f.ty.to_token_stream()).collect();

    let span = Span::call_site();
    quote_spanned! { span =>
                     #[automatically_derived]
                     impl<B: xdr::Packer> xdr::PackTo<B> for #name {
                         fn pack_to(&self, buf: &mut B) {
                             #(
                                 <#types as xdr::PackTo<B>>::pack_to(&self.#idents, buf);
                             )*
                         }
                     }
    }
}

fn impl_pack_to_enum(
    name: &syn::Ident,
    de: &syn::DataEnum,
    errors: &mut Vec<syn::Error>,
) -> TokenStream {
    let variants = enum_variants(de, "PackTo", errors);
    if variants.is_empty() {
        return TokenStream::new();
    }

    let arms: Vec<_> = variants
        .iter()
        .map(|variant| {
            let span = variant.span;
            let var_name = variant.ident;
            let discriminant = &variant.discriminant;
            match variant.inner {
                None => quote_spanned! { span => #name::#var_name => {
                    buf.pack_uint(#discriminant);
                }, },
                Some(inner_ty) => quote_spanned! { span => #name::#var_name(inner) => {
                    buf.pack_uint(#discriminant);
                    <#inner_ty as xdr::PackTo<B>>::pack_to(inner, buf);
                }, },
            }
        })
        .collect();

    let span = de.brace_token.span;
    quote_spanned! { span =>
                     #[automatically_derived]
                     impl<B: xdr::Packer> xdr::PackTo<B> for #name {
                         fn pack_to(&self, buf: &mut B) {
                             match self {
                             #(
                                 #arms
                             )*
                             }
                         }
                     }
    }
}

fn discriminant_from_attr(
    errors: &mut Vec<syn::Error>,
    attrs: &Vec<syn::Attribute>,
) -> Option<TokenStream> {
    for attr in attrs {
        let segments = &attr.path.segments;
        if segments.len() != 1 || segments[0].ident != "xdr" {
            continue;
        }
        return match attr.parse_args::<syn::Expr>() {
            Ok(expr) => Some(expr.to_token_stream()),
            Err(e) => {
                errors.push(e);
                None
            }
        };
    }

    None
}

/// Transform the input into a token stream containing any generated implementations,
/// as well as all errors that occurred.
fn impl_unpack_from(input: &syn::DeriveInput) -> TokenStream {
    let mut errors: Vec<syn::Error> = Vec::new();

    let mut output_tokens = match &input.data {
        syn::Data::Struct(ds) => impl_unpack_from_struct(&input.ident, ds, &mut errors),
        syn::Data::Enum(de) => impl_unpack_from_enum(&input.ident, de, &mut errors),
        syn::Data::Union(_) => {
            errors.push(syn::Error::new(
                input.span(),
                "`#[derive(UnpackFrom)]` cannot be applied to unions",
            ));
            TokenStream::new()
        }
    };

    // Emit errors
    output_tokens.extend(errors.iter().map(|err| err.to_compile_error()));

    output_tokens
}

fn impl_unpack_from_struct(
    name: &syn::Ident,
    ds: &syn::DataStruct,
    errors: &mut Vec<syn::Error>,
) -> TokenStream {
    let fields = match named_fields(ds, "UnpackFrom", errors) {
        Some(fields) => fields,
        None => return TokenStream::new(),
    };

    let idents: Vec<_> = fields.iter().filter_map(|f| f.ident.as_ref()).collect();
    let types: Vec<_> = fields.iter().map(|f| f.ty.to_token_stream()).collect();

    let span = Span::call_site();
    quote_spanned! { span =>
                     #[automatically_derived]
                     impl<B: xdr::Unpacker> xdr::UnpackFrom<B> for #name {
                         fn unpack_from(buf: &mut B) -> xdr::Result<Self> {
                             Ok(#name {
                                 #(
                                     #idents : <#types as xdr::UnpackFrom<B>>::unpack_from(buf)?,
                                 )*
                             })
                         }
                     }
    }
}

fn impl_unpack_from_enum(
    name: &syn::Ident,
    de: &syn::DataEnum,
    errors: &mut Vec<syn::Error>,
) -> TokenStream {
    let variants = enum_variants(de, "UnpackFrom", errors);
    if variants.is_empty() {
        return TokenStream::new();
    }

    let mut consts = Vec::new();
    let mut arms = Vec::new();
    for (const_num, variant) in variants.iter().enumerate() {
        let span = variant.span;
        let var_name = variant.ident;
        let discriminant = &variant.discriminant;
        let varname = format_ident!("_CONST{}", const_num);
        consts.push(quote_spanned! { span => const #varname : u32 = #discriminant; });
        arms.push(match variant.inner {
            None => quote_spanned! { span => #varname => Ok(#name::#var_name), },
            Some(inner_ty) => quote_spanned! { span =>
                #varname => Ok(#name::#var_name(<#inner_ty as xdr::UnpackFrom<B>>::unpack_from(buf)?)),
            },
        });
    }

    let type_name = name.to_string();
    let span = de.brace_token.span;
    quote_spanned! { span =>
                     #[automatically_derived]
                     impl<B: xdr::Unpacker> xdr::UnpackFrom<B> for #name {
                         fn unpack_from(buf: &mut B) -> xdr::Result<Self> {
                             #( #consts )*
                             let n = buf.unpack_uint()?;
                             match n {
                             #(
                                 #arms
                             )*
                             _ => Err(xdr::unknown_variant(#type_name, n)),
                             }
                         }
                     }
    }
}
