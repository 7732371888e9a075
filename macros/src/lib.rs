use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, GenericParam, Visibility,
};

/// Custom decoding declared on the type
#[derive(Debug, Clone, Copy, PartialEq)]
enum Capability {
    Text,
    Node,
}

#[derive(Debug, Default)]
struct StructConfig {
    capability: Option<Capability>,
    validate: bool,
}

#[derive(Debug, Default)]
struct FieldConfig {
    yaml: Option<String>,
    env: Option<String>,
}

/// Derives `yaml_loadr::Setting`.
///
/// Public fields are bound to document keys with
/// `#[field(yaml = "key", env = "VAR")]`. Private fields are never decoded
/// and start out as `Default::default()`.
///
/// On the type itself, `#[config(from_text)]` or `#[config(from_node)]`
/// hands decoding to a `FromText` / `FromNode` implementation (required
/// for enums and tuple structs), and `#[config(validate)]` runs the type's
/// `Validate` implementation after loading.
#[proc_macro_derive(Setting, attributes(field, config))]
pub fn derive_setting(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_setting(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct FieldInfo<'a> {
    ident: &'a syn::Ident,
    name: String,
    ty: &'a syn::Type,
    exported: bool,
    config: FieldConfig,
}

fn generate_setting(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_config = parse_struct_config(&input.attrs)?;

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Some(&fields.named),
            _ => None,
        },
        _ => None,
    };

    let fields = match named {
        Some(named) => named
            .iter()
            .map(|field| {
                let ident = field.ident.as_ref().ok_or_else(|| {
                    syn::Error::new_spanned(field, "expected a named field")
                })?;
                Ok(FieldInfo {
                    ident,
                    name: ident.unraw().to_string(),
                    ty: &field.ty,
                    exported: matches!(field.vis, Visibility::Public(_)),
                    config: parse_field_config(&field.attrs)?,
                })
            })
            .collect::<syn::Result<Vec<_>>>()?,
        None if struct_config.capability.is_some() => Vec::new(),
        None => {
            return Err(syn::Error::new_spanned(
                input,
                "Setting can only be derived for structs with named fields, \
                 other types need #[config(from_text)] or #[config(from_node)]",
            ));
        }
    };

    match struct_config.capability {
        Some(capability) => Ok(generate_opaque(input, &struct_config, capability, &fields)),
        None => Ok(generate_struct(input, &struct_config, &fields)),
    }
}

fn field_shapes(fields: &[FieldInfo], opaque: bool) -> Vec<proc_macro2::TokenStream> {
    fields
        .iter()
        .map(|field| {
            let name = &field.name;
            let exported = field.exported;
            let ty = field.ty;
            let yaml = option_str(&field.config.yaml);
            let env = option_str(&field.config.env);
            let shape = if field.exported && !opaque {
                quote! {
                    ::core::option::Option::Some(
                        <#ty as ::yaml_loadr::macros::Setting>::shape
                            as fn() -> ::yaml_loadr::macros::Shape
                    )
                }
            } else {
                quote! { ::core::option::Option::None }
            };
            quote! {
                ::yaml_loadr::macros::FieldShape {
                    name: #name,
                    exported: #exported,
                    yaml: #yaml,
                    env: #env,
                    shape: #shape,
                }
            }
        })
        .collect()
}

fn shape_fn(
    input: &DeriveInput,
    config: &StructConfig,
    capability: Option<Capability>,
    fields: &[FieldInfo],
) -> proc_macro2::TokenStream {
    let name = input.ident.unraw().to_string();
    let validates = config.validate;
    let shapes = field_shapes(fields, capability.is_some());
    let capability = match capability {
        Some(Capability::Text) => {
            quote! { ::core::option::Option::Some(::yaml_loadr::macros::Capability::Text) }
        }
        Some(Capability::Node) => {
            quote! { ::core::option::Option::Some(::yaml_loadr::macros::Capability::Node) }
        }
        None => quote! { ::core::option::Option::None },
    };

    quote! {
        fn shape() -> ::yaml_loadr::macros::Shape {
            ::yaml_loadr::macros::Shape::Struct(::yaml_loadr::macros::StructRef {
                name: #name,
                type_name: ::yaml_loadr::macros::type_name::<Self>(),
                capability: #capability,
                validates: #validates,
                fields: || ::std::vec![#(#shapes),*],
            })
        }
    }
}

fn validate_hook(config: &StructConfig) -> proc_macro2::TokenStream {
    if !config.validate {
        return quote! {};
    }
    quote! {
        ::yaml_loadr::macros::Validate::validate(self)
            .map_err(|e| ::yaml_loadr::macros::validation_error(node, e))?;
    }
}

fn generate_struct(
    input: &DeriveInput,
    config: &StructConfig,
    fields: &[FieldInfo],
) -> proc_macro2::TokenStream {
    let ident = &input.ident;
    let name = ident.unraw().to_string();

    let mut generics = input.generics.clone();
    let type_params: Vec<syn::Ident> = generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(ty) => Some(ty.ident.clone()),
            _ => None,
        })
        .collect();
    if !type_params.is_empty() {
        let where_clause = generics.make_where_clause();
        for param in type_params {
            where_clause
                .predicates
                .push(parse_quote! { #param: ::yaml_loadr::macros::Setting });
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let shape = shape_fn(input, config, None, fields);

    let tags: Vec<&String> = fields
        .iter()
        .filter(|f| f.exported)
        .filter_map(|f| f.config.yaml.as_ref())
        .collect();

    let decode_fields = fields.iter().map(|field| {
        let field_ident = field.ident;
        let field_name = &field.name;
        let ty = field.ty;
        match (&field.config.yaml, field.exported) {
            (Some(tag), true) => quote! { #field_ident: map.field::<#ty>(#tag)? },
            (None, true) => {
                quote! { #field_ident: ::yaml_loadr::macros::untagged(#name, #field_name)? }
            }
            (_, false) => quote! { #field_ident: ::core::default::Default::default() },
        }
    });

    let bound: Vec<&FieldInfo> = fields
        .iter()
        .filter(|f| f.exported && f.config.yaml.is_some())
        .collect();

    let env_fields = bound.iter().map(|field| {
        let field_ident = field.ident;
        let field_name = &field.name;
        let var = option_str(&field.config.env);
        quote! {
            ::yaml_loadr::macros::Setting::apply_env(
                &mut self.#field_ident,
                env,
                #var,
                &::std::format!("{}.{}", path, #field_name),
            )?;
        }
    });

    let validate_fields = bound.iter().map(|field| {
        let field_ident = field.ident;
        let tag = field.config.yaml.as_deref().unwrap_or_default();
        quote! {
            if let ::core::option::Option::Some(value) = node.get(#tag) {
                ::yaml_loadr::macros::Setting::run_validate(&self.#field_ident, value)?;
            }
        }
    });

    let hook = validate_hook(config);

    quote! {
        impl #impl_generics ::yaml_loadr::macros::Setting for #ident #ty_generics #where_clause {
            #shape

            #[allow(unused_variables)]
            fn decode(
                node: &::yaml_loadr::macros::Node,
            ) -> ::core::result::Result<Self, ::yaml_loadr::macros::Error> {
                let map = ::yaml_loadr::macros::StructNode::new(node, #name, &[#(#tags),*])?;
                ::core::result::Result::Ok(Self {
                    #(#decode_fields),*
                })
            }

            #[allow(unused_variables)]
            fn apply_env(
                &mut self,
                env: &dyn ::yaml_loadr::macros::EnvSource,
                var: ::core::option::Option<&str>,
                path: &str,
            ) -> ::core::result::Result<(), ::yaml_loadr::macros::Error> {
                #(#env_fields)*
                ::core::result::Result::Ok(())
            }

            #[allow(unused_variables)]
            fn run_validate(
                &self,
                node: &::yaml_loadr::macros::Node,
            ) -> ::core::result::Result<(), ::yaml_loadr::macros::Error> {
                #hook
                #(#validate_fields)*
                ::core::result::Result::Ok(())
            }
        }
    }
}

fn generate_opaque(
    input: &DeriveInput,
    config: &StructConfig,
    capability: Capability,
    fields: &[FieldInfo],
) -> proc_macro2::TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let shape = shape_fn(input, config, Some(capability), fields);

    let (decode, from_env_text) = match capability {
        Capability::Text => (
            quote! { ::yaml_loadr::macros::from_text::<Self>(node) },
            quote! {
                <Self as ::yaml_loadr::macros::FromText>::from_text(text)
                    .map_err(|e| ::std::string::ToString::to_string(&e))
            },
        ),
        Capability::Node => (
            quote! { ::yaml_loadr::macros::from_node::<Self>(node) },
            quote! {
                <Self as ::yaml_loadr::macros::FromNode>::from_node(
                    &::yaml_loadr::macros::Node::scalar(text),
                )
                .map_err(|e| ::std::string::ToString::to_string(&e))
            },
        ),
    };

    let hook = validate_hook(config);

    quote! {
        impl #impl_generics ::yaml_loadr::macros::Setting for #ident #ty_generics #where_clause {
            #shape

            fn decode(
                node: &::yaml_loadr::macros::Node,
            ) -> ::core::result::Result<Self, ::yaml_loadr::macros::Error> {
                #decode
            }

            fn from_env_text(text: &str) -> ::core::result::Result<Self, ::std::string::String> {
                #from_env_text
            }

            #[allow(unused_variables)]
            fn run_validate(
                &self,
                node: &::yaml_loadr::macros::Node,
            ) -> ::core::result::Result<(), ::yaml_loadr::macros::Error> {
                #hook
                ::core::result::Result::Ok(())
            }
        }
    }
}

fn option_str(value: &Option<String>) -> proc_macro2::TokenStream {
    match value {
        Some(value) => quote! { ::core::option::Option::Some(#value) },
        None => quote! { ::core::option::Option::None },
    }
}

/// Parse #[config(from_text | from_node | validate)] on the type
fn parse_struct_config(attrs: &[Attribute]) -> syn::Result<StructConfig> {
    let mut config = StructConfig::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("config")) {
        attr.parse_nested_meta(|meta| {
            let capability = if meta.path.is_ident("from_text") {
                Capability::Text
            } else if meta.path.is_ident("from_node") {
                Capability::Node
            } else if meta.path.is_ident("validate") {
                config.validate = true;
                return Ok(());
            } else {
                return Err(meta.error("expected one of: from_text, from_node, validate"));
            };

            if config.capability.is_some() {
                return Err(meta.error("only one of from_text and from_node can be used"));
            }
            config.capability = Some(capability);
            Ok(())
        })?;
    }

    Ok(config)
}

/// Parse #[field(yaml = "key", env = "VAR")] on a field
fn parse_field_config(attrs: &[Attribute]) -> syn::Result<FieldConfig> {
    let mut config = FieldConfig::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("field")) {
        attr.parse_nested_meta(|meta| {
            let key = meta
                .path
                .get_ident()
                .ok_or_else(|| meta.error("expected identifier"))?
                .to_string();
            let value: syn::LitStr = meta.value()?.parse()?;
            if value.value().is_empty() {
                return Err(syn::Error::new_spanned(&value, "tag must not be empty"));
            }

            let slot = match key.as_str() {
                "yaml" => &mut config.yaml,
                "env" => &mut config.env,
                _ => return Err(meta.error("expected yaml = \"...\" or env = \"...\"")),
            };
            if slot.is_some() {
                return Err(meta.error(format!("{} is already set for this field", key)));
            }
            *slot = Some(value.value());
            Ok(())
        })?;
    }

    Ok(config)
}
