use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, FieldsNamed, GenericArgument, Ident, PathArguments, Type};

/// Per-variant wiring extracted from the enum definition.
struct ErrorVariant<'a> {
    ident: &'a Ident,
    source: Option<(&'a Ident, &'a Type)>,
    has_context: bool,
}

pub fn expand_derive(input: DeriveInput) -> TokenStream {
    let name = &input.ident;
    let ext_trait = format_ident!("{name}Ext");

    let Data::Enum(data) = &input.data else {
        return quote! { compile_error!("sgrid_error can only be applied to enums"); };
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        let Fields::Named(fields) = &variant.fields else {
            return syn::Error::new_spanned(
                variant,
                "sgrid_error requires named fields for source/context handling",
            )
            .to_compile_error();
        };

        let has_context = match context_field(fields) {
            Ok(found) => found,
            Err(err) => return err,
        };
        let source = source_field(fields);

        if source.is_some() && !has_context {
            return syn::Error::new_spanned(
                &variant.ident,
                "sgrid_error requires `context: Option<Cow<'static, str>>` for variants with a source",
            )
            .to_compile_error();
        }

        variants.push(ErrorVariant { ident: &variant.ident, source, has_context });
    }

    let derives = missing_derives(&input);
    let ext_impl = expand_ext_trait(name, &ext_trait, &variants);
    let from_impls = variants.iter().filter_map(|v| expand_from_impl(name, &ext_trait, v));
    let internal_impls = expand_internal_impls(name, &variants);

    quote! {
        #[allow(non_shorthand_field_patterns)]
        #derives
        #input

        #ext_impl
        #(#from_impls)*
        #internal_impls

        #[allow(dead_code)]
        fn format_context(context: &Option<std::borrow::Cow<'static, str>>) -> std::borrow::Cow<'static, str> {
            context.as_ref().map_or(std::borrow::Cow::Borrowed(""), |c| std::borrow::Cow::Owned(format!(" ({c})")))
        }
    }
}

/// Injects `Debug` and `thiserror::Error` unless the user already derived them.
fn missing_derives(input: &DeriveInput) -> TokenStream {
    let mut have_debug = false;
    let mut have_error = false;

    for attr in &input.attrs {
        if !attr.path().is_ident("derive") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            match meta.path.segments.last().map(|seg| seg.ident.to_string()).as_deref() {
                Some("Debug") => have_debug = true,
                Some("Error") => have_error = true,
                _ => {},
            }
            Ok(())
        });
    }

    let mut tokens = Vec::new();
    if !have_debug {
        tokens.push(quote! { Debug });
    }
    if !have_error {
        tokens.push(quote! { ::thiserror::Error });
    }
    if tokens.is_empty() { quote! {} } else { quote! { #[derive(#(#tokens),*)] } }
}

fn expand_ext_trait(name: &Ident, ext_trait: &Ident, variants: &[ErrorVariant<'_>]) -> TokenStream {
    let arms = variants.iter().filter(|v| v.has_context).map(|v| {
        let ident = v.ident;
        quote! { #name::#ident { context: c, .. } => *c = Some(context.into()), }
    });

    quote! {
        pub trait #ext_trait<T> {
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
        }

        #[automatically_derived]
        impl<T> #ext_trait<T> for Result<T, #name> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                self.map_err(|mut e| {
                    match &mut e {
                        #( #arms )*
                        _ => {}
                    }
                    e
                })
            }
        }
    }
}

fn expand_from_impl(
    name: &Ident,
    ext_trait: &Ident,
    variant: &ErrorVariant<'_>,
) -> Option<TokenStream> {
    if variant.ident == "Internal" {
        return None;
    }
    let (field, ty) = variant.source?;
    let v_ident = variant.ident;

    Some(quote! {
        #[automatically_derived]
        impl From<#ty> for #name {
            #[inline]
            fn from(#field: #ty) -> Self { Self::#v_ident { #field, context: None } }
        }

        impl<T> #ext_trait<T> for std::result::Result<T, #ty> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> std::result::Result<T, #name> {
                self.map_err(|#field| #name::#v_ident { #field, context: Some(context.into()) })
            }
        }
    })
}

fn expand_internal_impls(name: &Ident, variants: &[ErrorVariant<'_>]) -> TokenStream {
    if !variants.iter().any(|v| v.ident == "Internal") {
        return quote!();
    }

    quote! {
        impl From<&'static str> for #name {
            #[inline]
            fn from(s: &'static str) -> Self { Self::Internal { message: std::borrow::Cow::Borrowed(s), context: None } }
        }
        impl From<String> for #name {
            #[inline]
            fn from(s: String) -> Self { Self::Internal { message: std::borrow::Cow::Owned(s), context: None } }
        }
    }
}

/// Finds the `context` field and validates its type, returning whether it exists.
fn context_field(fields: &FieldsNamed) -> Result<bool, TokenStream> {
    for field in &fields.named {
        if field.ident.as_ref().is_none_or(|ident| ident != "context") {
            continue;
        }
        if !is_context_type(&field.ty) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "context field must be Option<Cow<'static, str>>",
            )
            .to_compile_error());
        }
        return Ok(true);
    }
    Ok(false)
}

/// Finds a wrapped upstream error: a field named `source` or marked `#[source]`/`#[from]`.
fn source_field(fields: &FieldsNamed) -> Option<(&Ident, &Type)> {
    fields
        .named
        .iter()
        .find(|field| {
            field.ident.as_ref().is_some_and(|ident| ident == "source")
                || field.attrs.iter().any(|attr| {
                    attr.path().is_ident("source") || attr.path().is_ident("from")
                })
        })
        .and_then(|field| field.ident.as_ref().map(|ident| (ident, &field.ty)))
}

/// Structural check for `Option<Cow<'static, str>>`.
fn is_context_type(ty: &Type) -> bool {
    let Some(option) = last_segment(ty, "Option") else {
        return false;
    };
    let Some(GenericArgument::Type(inner)) = first_generic(option) else {
        return false;
    };
    let Some(cow) = last_segment(inner, "Cow") else {
        return false;
    };
    let PathArguments::AngleBracketed(args) = cow else {
        return false;
    };
    let mut args = args.args.iter();
    let Some(GenericArgument::Lifetime(lt)) = args.next() else {
        return false;
    };
    if lt.ident != "static" {
        return false;
    }
    matches!(
        args.next(),
        Some(GenericArgument::Type(Type::Path(p)))
            if p.path.segments.last().is_some_and(|seg| seg.ident == "str")
    )
}

fn last_segment<'a>(ty: &'a Type, name: &str) -> Option<&'a PathArguments> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    (segment.ident == name).then_some(&segment.arguments)
}

fn first_generic(arguments: &PathArguments) -> Option<&GenericArgument> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    args.args.first()
}
