use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DataStruct, DeriveInput, Error, Field, Fields, LitInt, LitStr, Result};

const VALIDATE: &str = "validate";

fn parse_constraints(field: &Field) -> Result<Vec<TokenStream>> {
    let mut constraints = Vec::new();
    for attr in &field.attrs {
        if !attr.path().is_ident(VALIDATE) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("not_blank") {
                constraints.push(quote!(::lento_web::dto::Constraint::NotBlank));
                Ok(())
            } else if meta.path.is_ident("email") {
                constraints.push(quote!(::lento_web::dto::Constraint::Email));
                Ok(())
            } else if meta.path.is_ident("regex") {
                let pattern: LitStr = meta.value()?.parse()?;
                constraints.push(quote!(::lento_web::dto::Constraint::Regex(#pattern.to_string())));
                Ok(())
            } else if meta.path.is_ident("length") {
                let mut min = quote!(0);
                let mut max = quote!(usize::MAX);
                meta.parse_nested_meta(|length| {
                    let value: LitInt = length.value()?.parse()?;
                    if length.path.is_ident("min") {
                        min = quote!(#value);
                        Ok(())
                    } else if length.path.is_ident("max") {
                        max = quote!(#value);
                        Ok(())
                    } else {
                        Err(length.error("Expected min or max!"))
                    }
                })?;

                constraints.push(quote!(::lento_web::dto::Constraint::Length {
                    min: #min,
                    max: #max,
                }));
                Ok(())
            } else {
                Err(meta.error("Unsupported constraint!"))
            }
        })?;
    }

    Ok(constraints)
}

pub fn generate_dto(input: &DeriveInput) -> Result<TokenStream> {
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
                "Only structs with named fields can be DTOs!",
            ))
        }
    };

    let constraints: Vec<_> = fields
        .into_iter()
        .map(|field| -> Result<Option<TokenStream>> {
            let constraints = parse_constraints(field)?;
            if constraints.is_empty() {
                return Ok(None);
            }

            let ident = field.ident.as_ref();
            let name = ident.map(|ident| ident.to_string()).unwrap_or_default();

            Ok(Some(quote! {
                ::lento_web::dto::FieldConstraints {
                    field: #name,
                    value: ::lento_web::dto::ConstraintValue::constraint_value(&self.#ident),
                    constraints: vec![#(#constraints),*],
                }
            }))
        })
        .filter_map_ok(|constraints| constraints)
        .try_collect()?;

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::lento_web::dto::Dto for #ident #ty_generics #where_clause {
            fn constraints(&self) -> Vec<::lento_web::dto::FieldConstraints> {
                vec![#(#constraints),*]
            }
        }
    })
}
