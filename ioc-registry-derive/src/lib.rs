//! Derive macros for ioc-registry
//!
//! - `#[derive(Construct)]` - Build a struct by resolving its fields from a `Container`
//! - `#[derive(Service)]` - The same, plus registration options for `provide::<T>()`
//!
//! # Example
//!
//! ```rust,ignore
//! use ioc_registry::{AsyncLazy, Container, Construct, Lazy, Service, ServiceProvider};
//! use std::sync::Arc;
//!
//! #[derive(Service)]
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Service)]
//! #[service(lifetime = "transient", name = "primary")]
//! struct UserService {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject(optional)]
//!     cache: Option<Arc<Cache>>,
//!     #[inject(lazy)]
//!     mailer: Lazy<Mailer>,
//!     #[inject(lazy)]
//!     audit: AsyncLazy<AuditLog>,
//!     // Fields without #[inject] use Default
//!     request_count: u64,
//! }
//!
//! let container = Container::new();
//! container.provide::<Database>().provide::<UserService>();
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Type, parse_macro_input};

/// Derive `ioc_registry::Construct`.
///
/// # Field attributes
///
/// - `#[inject]` - Resolve an `Arc<T>` field under the token named after `T`
/// - `#[inject(name = "..")]` - Resolve a named variant
/// - `#[inject(token = "..")]` - Resolve under an explicit token descriptor
/// - `#[inject(optional)]` - `Option<Arc<T>>`; missing or ambiguous becomes `None`
/// - `#[inject(lazy)]` - `Lazy<T>` or `Inject<T>`, resolved on first access;
///   `AsyncLazy<T>` for registrations that need `.get().await`
///
/// Fields without `#[inject]` use `Default::default()`.
///
/// # Container attribute
///
/// - `#[service(token = "..")]` - Register and resolve under this descriptor
///   instead of the type name
#[proc_macro_derive(Construct, attributes(inject, service))]
pub fn derive_construct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_construct(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive `ioc_registry::Service` (and `Construct`).
///
/// Accepts every attribute `#[derive(Construct)]` does, plus:
///
/// - `#[service(lifetime = "singleton" | "scoped" | "transient")]` - default singleton
/// - `#[service(name = "..")]` - register as a named variant
///
/// ```rust,ignore
/// #[derive(Service)]
/// #[service(lifetime = "scoped", token = "IRequestLog")]
/// struct RequestLog {
///     #[inject(name = "audit")]
///     sink: Arc<Sink>,
/// }
/// ```
#[proc_macro_derive(Service, attributes(inject, service))]
pub fn derive_service(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_service(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// =============================================================================
// Attribute parsing
// =============================================================================

/// Options from the `#[service(...)]` container attribute
#[derive(Default)]
struct ServiceAttr {
    lifetime: Option<LitStr>,
    name: Option<LitStr>,
    token: Option<LitStr>,
}

fn parse_service_attr(attrs: &[Attribute]) -> syn::Result<ServiceAttr> {
    let mut out = ServiceAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("service")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("lifetime") {
                out.lifetime = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("name") {
                out.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("token") {
                out.token = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("expected `lifetime`, `name` or `token`"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Options from a field's `#[inject(...)]` attribute
#[derive(Default)]
struct InjectAttr {
    name: Option<LitStr>,
    token: Option<LitStr>,
    optional: bool,
    lazy: bool,
}

fn parse_inject_attr(attrs: &[Attribute]) -> syn::Result<Option<InjectAttr>> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("inject")) else {
        return Ok(None);
    };

    let mut out = InjectAttr::default();
    if attr.meta.require_path_only().is_ok() {
        return Ok(Some(out));
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("optional") {
            out.optional = true;
        } else if meta.path.is_ident("lazy") {
            out.lazy = true;
        } else if meta.path.is_ident("name") {
            out.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("token") {
            out.token = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("expected `name`, `token`, `optional` or `lazy`"));
        }
        Ok(())
    })?;

    if out.optional && out.lazy {
        return Err(syn::Error::new_spanned(
            attr,
            "`optional` and `lazy` cannot be combined",
        ));
    }
    Ok(Some(out))
}

// =============================================================================
// Type helpers
// =============================================================================

/// Extract `T` from `Wrapper<T>` where the last path segment is one of `wrappers`
fn generic_inner<'a>(ty: &'a Type, wrappers: &[&str]) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if !wrappers.iter().any(|w| segment.ident == w) {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn arc_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, &["Arc"])
}

fn option_arc_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, &["Option"]).and_then(arc_inner)
}

// =============================================================================
// Expansion
// =============================================================================

fn field_init(field: &syn::Field) -> syn::Result<TokenStream2> {
    let field_name = field.ident.as_ref();
    let field_type = &field.ty;

    let Some(inject) = parse_inject_attr(&field.attrs)? else {
        return Ok(quote! { #field_name: ::std::default::Default::default() });
    };

    let (inner, wrong_type) = if inject.lazy {
        (
            generic_inner(field_type, &["Lazy", "Inject", "AsyncLazy"]),
            "fields marked #[inject(lazy)] must have type Lazy<T>, Inject<T> or AsyncLazy<T>",
        )
    } else if inject.optional {
        (
            option_arc_inner(field_type),
            "fields marked #[inject(optional)] must have type Option<Arc<T>>",
        )
    } else {
        (
            arc_inner(field_type),
            "fields marked #[inject] must have type Arc<T>",
        )
    };
    let inner = inner.ok_or_else(|| syn::Error::new_spanned(field_type, wrong_type))?;

    let token = match &inject.token {
        Some(lit) => quote! { ::ioc_registry::token::<#inner>(#lit) },
        None => quote! { ::ioc_registry::Token::<#inner>::of_type() },
    };
    let name = match &inject.name {
        Some(lit) => quote! { ::std::option::Option::Some(#lit) },
        None => quote! { ::std::option::Option::None },
    };

    let value = if inject.lazy && generic_inner(field_type, &["AsyncLazy"]).is_some() {
        match &inject.name {
            Some(lit) => quote! { container.resolve_lazy_async_named(&#token, #lit)? },
            None => quote! { container.resolve_lazy_async(&#token)? },
        }
    } else if inject.lazy {
        let resolve_lazy = match &inject.name {
            Some(lit) => quote! { container.resolve_lazy_named(&#token, #lit) },
            None => quote! { container.resolve_lazy(&#token) },
        };
        quote! { ::std::convert::From::from(#resolve_lazy?) }
    } else if inject.optional {
        quote! {
            match container.resolve_with(&#token, #name) {
                ::std::result::Result::Ok(value) => ::std::option::Option::Some(value),
                ::std::result::Result::Err(e) if e.is_missing() => ::std::option::Option::None,
                ::std::result::Result::Err(e) => return ::std::result::Result::Err(e),
            }
        }
    } else {
        quote! { container.resolve_with(&#token, #name)? }
    };

    Ok(quote! { #field_name: #value })
}

fn expand_construct(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => {
                return Ok(construct_impl(input, quote! { Self }));
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Construct can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Construct can only be derived for structs",
            ));
        }
    };

    let inits = fields.iter().map(field_init).collect::<syn::Result<Vec<_>>>()?;
    Ok(construct_impl(input, quote! { Self { #(#inits),* } }))
}

fn construct_impl(input: &DeriveInput, body: TokenStream2) -> TokenStream2 {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let token_fn = match parse_service_attr(&input.attrs) {
        Ok(ServiceAttr {
            token: Some(lit), ..
        }) => quote! {
            fn token() -> ::ioc_registry::Token<Self> {
                ::ioc_registry::token(#lit)
            }
        },
        Ok(_) => quote! {},
        Err(e) => e.into_compile_error(),
    };

    quote! {
        impl #impl_generics ::ioc_registry::Construct for #name #ty_generics #where_clause {
            #token_fn

            fn construct(
                container: &::ioc_registry::Container,
            ) -> ::ioc_registry::Result<Self> {
                let _ = container;
                ::std::result::Result::Ok(#body)
            }
        }
    }
}

fn expand_service(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let attr = parse_service_attr(&input.attrs)?;

    let lifetime = match attr.lifetime.as_ref().map(LitStr::value).as_deref() {
        None | Some("singleton") => quote! { ::ioc_registry::Lifetime::Singleton },
        Some("scoped") => quote! { ::ioc_registry::Lifetime::Scoped },
        Some("transient") => quote! { ::ioc_registry::Lifetime::Transient },
        Some(_) => {
            return Err(syn::Error::new_spanned(
                attr.lifetime,
                "lifetime must be \"singleton\", \"scoped\" or \"transient\"",
            ));
        }
    };
    let variant = match &attr.name {
        Some(lit) => quote! { ::std::option::Option::Some(#lit) },
        None => quote! { ::std::option::Option::None },
    };

    let construct = expand_construct(input)?;

    Ok(quote! {
        #construct

        impl #impl_generics ::ioc_registry::Service for #name #ty_generics #where_clause {
            const LIFETIME: ::ioc_registry::Lifetime = #lifetime;
            const NAME: ::std::option::Option<&'static str> = #variant;
        }
    })
}
