use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive `flatfile::Record` and `flatfile::FieldValue` for a struct.
///
/// Fields annotated with `#[flat("tag")]` are decoded at the columns the tag
/// gives; other fields are left alone but still count toward field indices.
#[proc_macro_derive(FlatRecord, attributes(flat))]
pub fn derive_flat_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record::expand_flat_record(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}
