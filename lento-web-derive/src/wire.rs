use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DataStruct, DeriveInput, Error, Field, Fields, Meta, Result};

const INJECT: &str = "inject";

fn is_injected(field: &Field) -> Result<bool> {
    let mut injected = false;
    for attr in &field.attrs {
        if attr.path().is_ident(INJECT) {
            if !matches!(attr.meta, Meta::Path(_)) {
                return Err(Error::new(attr.span(), "#[inject] takes no arguments!"));
            }

            injected = true;
        }
    }

    Ok(injected)
}

pub fn generate_wire(input: &DeriveInput) -> Result<TokenStream> {
    let fields: Vec<&Field> = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => fields.named.iter().collect(),
        Data::Struct(DataStruct {
            fields: Fields::Unit,
            ..
        }) => Vec::new(),
        _ => {
            return Err(Error::new(
                input.span(),
                "Only structs with named fields can be wired!",
            ))
        }
    };

    let injected: Vec<_> = fields
        .into_iter()
        .map(|field| is_injected(field).map(|injected| injected.then_some(field)))
        .filter_map_ok(|field| field)
        .try_collect()?;

    let arms = injected.iter().map(|field| {
        let ident = field.ident.as_ref();
        let name = ident.map(|ident| ident.to_string()).unwrap_or_default();
        let ty = &field.ty;

        quote! {
            #name => match <#ty as ::lento_web::controller::InjectTarget>::from_injected(value) {
                Some(value) => {
                    self.#ident = value;
                    true
                }
                None => false,
            }
        }
    });

    let properties = injected.iter().map(|field| {
        let name = field
            .ident
            .as_ref()
            .map(|ident| ident.to_string())
            .unwrap_or_default();
        let ty = &field.ty;

        quote! {
            ::lento_web::lento_router::descriptor::PropertyInjection::new(
                #name,
                <#ty as ::lento_web::controller::InjectTarget>::declared_type(),
            )
        }
    });

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::lento_web::controller::Wire for #ident #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn wire(&mut self, field: &str, value: ::lento_web::controller::Injected) -> bool {
                match field {
                    #(#arms,)*
                    _ => false,
                }
            }

            fn properties() -> Vec<::lento_web::lento_router::descriptor::PropertyInjection>
            where
                Self: Sized,
            {
                vec![#(#properties),*]
            }
        }
    })
}
