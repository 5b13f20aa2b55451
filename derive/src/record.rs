use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result,
    spanned::Spanned,
};

pub(crate) fn expand_flat_record(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new(
            input.span(),
            "`FlatRecord` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new(
            input.span(),
            "`FlatRecord` may only be derived on structs with named fields.",
        ))?
    };

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .collect::<Result<Vec<_>>>()?;

    let entries = fields.iter().map(|field| {
        let ident = &field.name;
        let name = ident.to_string();

        match &field.tag {
            Some(tag) => quote! { .field(#name, #tag, |record| &mut record.#ident) },
            None => quote! { .untagged(#name) },
        }
    });

    let name = &input.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::flatfile::Record for #name #ty_generics #where_clause {
            fn schema() -> ::flatfile::Schema<Self> {
                ::flatfile::Schema::<Self>::builder()
                    #(#entries)*
                    .build()
            }
        }

        impl #impl_generics ::flatfile::FieldValue for #name #ty_generics #where_clause {
            fn kind() -> ::flatfile::Kind {
                ::flatfile::Kind::Record(#type_name)
            }

            fn assign(
                &mut self,
                raw: &[u8],
                _desc: &::flatfile::FieldDescriptor,
                settings: &::flatfile::DecodeSettings,
            ) -> ::flatfile::DResult<()> {
                ::flatfile::de::decode_nested(raw, self, settings)
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    tag: Option<LitStr>,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Self> {
        let Some(name) = field.ident.clone() else {
            Err(Error::new_spanned(field, "Field must be named."))?
        };

        let mut attrs = field.attrs.iter().filter(|a| a.path().is_ident("flat"));

        let Some(attr) = attrs.next() else {
            return Ok(Self { name, tag: None });
        };

        if let Some(extra) = attrs.next() {
            Err(Error::new_spanned(
                extra,
                "A field may only have one `flat` attribute.",
            ))?
        }

        let tag: LitStr = attr.meta.require_list()?.parse_args()?;

        if tag.value().trim().is_empty() {
            Err(Error::new_spanned(
                &tag,
                "Field tag must not be empty, e.g. `#[flat(\"1,10\")]`.",
            ))?
        }

        Ok(Self {
            name,
            tag: Some(tag),
        })
    }
}
