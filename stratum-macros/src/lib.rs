//! Procedural macros for Stratum.
//!
//! Use them through the `stratum` crate, which re-exports them.

use darling::ast::{Data, Fields, Style};
use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Generics, Ident, Path, Type, parse_macro_input, parse_quote};

#[derive(FromDeriveInput)]
#[darling(attributes(injectable), supports(struct_any))]
struct InjectableInput {
    ident: Ident,
    generics: Generics,
    data: Data<(), InjectableField>,
    /// Path to the crate exporting `Injectable`, `Constructor` and friends.
    #[darling(rename = "crate", default)]
    krate: Option<Path>,
}

#[derive(FromField)]
#[darling(attributes(injectable))]
struct InjectableField {
    ident: Option<Ident>,
    ty: Type,
    /// Fill the field with `Default::default()` instead of resolving it.
    #[darling(default)]
    default: bool,
}

/// Derives `Injectable` with one constructor that resolves every field by
/// its type.
///
/// ```rust,ignore
/// #[derive(Injectable)]
/// struct OrderService {
///     db: Arc<Database>,
///     logger: Arc<dyn Logger>,
///     #[injectable(default)]
///     retries: u32,
/// }
/// ```
///
/// Attributes:
/// - `#[injectable(default)]` on a field: use `Default::default()`
/// - `#[injectable(crate = "path")]` on the struct: where the container
///   types live, `::stratum` by default
#[proc_macro_derive(Injectable, attributes(injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let parsed = match InjectableInput::from_derive_input(&input) {
        Ok(parsed) => parsed,
        Err(err) => return err.write_errors().into(),
    };

    expand(parsed).into()
}

fn expand(input: InjectableInput) -> TokenStream2 {
    let krate = input.krate.unwrap_or_else(|| parse_quote!(::stratum));
    let ident = input.ident;

    let fields = match input.data {
        Data::Struct(fields) => fields,
        Data::Enum(_) => {
            return syn::Error::new(ident.span(), "Injectable can only be derived for structs")
                .to_compile_error();
        }
    };

    let resolved: Vec<&Type> = fields
        .iter()
        .filter(|field| !field.default)
        .map(|field| &field.ty)
        .collect();

    let mut generics = input.generics;
    {
        let where_clause = generics.make_where_clause();
        where_clause.predicates.push(parse_quote!(Self: 'static));
        for ty in &resolved {
            where_clause
                .predicates
                .push(parse_quote!(#ty: ::core::clone::Clone + ::core::marker::Send + ::core::marker::Sync + 'static));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = construct_body(&krate, &fields);

    quote! {
        impl #impl_generics #krate::Injectable for #ident #ty_generics #where_clause {
            fn constructors() -> ::std::vec::Vec<#krate::Constructor<Self>> {
                ::std::vec![#krate::Constructor::with_resolver(
                    ::std::vec![#(#krate::DependencyKey::of::<#resolved>()),*],
                    |resolver: &dyn #krate::Resolver| ::core::result::Result::Ok(#body),
                )]
            }
        }
    }
}

/// The struct expression built inside the constructor.
fn construct_body(krate: &Path, fields: &Fields<InjectableField>) -> TokenStream2 {
    let values = fields.iter().map(|field| {
        let ty = &field.ty;
        if field.default {
            quote!(<#ty as ::core::default::Default>::default())
        } else {
            quote!(<dyn #krate::Resolver as #krate::ResolverApi>::resolve::<#ty>(resolver)?)
        }
    });

    match fields.style {
        Style::Struct => {
            let names = fields.iter().map(|field| &field.ident);
            quote!(Self { #(#names: #values),* })
        }
        Style::Tuple => quote!(Self(#(#values),*)),
        Style::Unit => quote!(Self),
    }
}
