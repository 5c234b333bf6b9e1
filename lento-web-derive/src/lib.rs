mod dto;
mod wire;

use crate::dto::generate_dto;
use crate::wire::generate_wire;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Error};

/// Generates the `Wire` implementation for a controller, assigning injected values to fields
/// marked with `#[inject]`. Injected field types must implement `InjectTarget`.
#[proc_macro_derive(Wire, attributes(inject))]
pub fn derive_wire(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let wire = generate_wire(&input).unwrap_or_else(Error::into_compile_error);

    (quote! {
        #wire
    })
    .into()
}

/// Generates the `Dto` implementation, reporting constraints declared with `#[validate(...)]`:
/// `not_blank`, `email`, `length(min = .., max = ..)` and `regex = ".."`.
#[proc_macro_derive(Dto, attributes(validate))]
pub fn derive_dto(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let dto = generate_dto(&input).unwrap_or_else(Error::into_compile_error);

    (quote! {
        #dto
    })
    .into()
}
