extern crate proc_macro;

use crate::proc_macro::TokenStream;

use quote::quote;

use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields};

/// Implements `aqua_write::AquaWrite` by writing each field in declaration order.
#[proc_macro_derive(AquaWrite)]
pub fn aqua_write_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let implementing_type = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => panic!("expected a struct with named fields"),
    };

    let field_names: Vec<_> = fields.iter().map(|field| &field.ident).collect();

    let expanded = quote! {
        impl #impl_generics aqua_write::AquaWrite for #implementing_type #ty_generics #where_clause {
            fn aqua_write<W: std::io::Write>(
                &self,
                writer: &mut W,
            ) -> std::io::Result<()> {
                #(
                    aqua_write::AquaWrite::aqua_write(&self.#field_names, writer)?;
                )*
                Ok(())
            }

            fn size_in_bytes(&self) -> u64 {
                let mut size = 0;
                #(
                    size += aqua_write::AquaWrite::size_in_bytes(&self.#field_names);
                )*
                size
            }
        }
    };

    TokenStream::from(expanded)
}
