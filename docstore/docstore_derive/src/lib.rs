use proc_macro::TokenStream;
use quote::quote;
use syn::{self, Lit, Meta, NestedMeta};

#[proc_macro_derive(DocumentModel, attributes(document))]
pub fn model_macro_derive(input: TokenStream) -> TokenStream {
    // Construct a representation of Rust code as a syntax tree
    // that we can manipulate
    let ast = syn::parse(input).expect("DocumentModel can only be derived for structs and enums");

    // Build the trait implementation
    impl_model_trait(&ast)
}

fn impl_model_trait(ast: &syn::DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let collection = collection_name(ast);
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let gen = quote! {
        impl #impl_generics ::docstore::DocumentModel for #name #ty_generics #where_clause {
            fn collection() -> &'static str {
                #collection
            }
        }
    };
    gen.into()
}

// `#[document(collection = "...")]`, defaulting to the lowercased type name.
fn collection_name(ast: &syn::DeriveInput) -> String {
    for attr in ast.attrs.iter().filter(|a| a.path.is_ident("document")) {
        if let Ok(Meta::List(list)) = attr.parse_meta() {
            for nested in list.nested {
                if let NestedMeta::Meta(Meta::NameValue(pair)) = nested {
                    if pair.path.is_ident("collection") {
                        if let Lit::Str(value) = pair.lit {
                            return value.value();
                        }
                    }
                }
            }
        }
    }
    ast.ident.to_string().to_lowercase()
}
