//! Derive support for `brrtbind` controllers.
//!
//! `#[derive(Controller)]` generates the controller descriptor, the per-field
//! assignment code, and a `BindValue` impl so the same struct can be nested
//! inside another controller.
//!
//! Field shapes recognised by the derive:
//!
//! - `Slot<T>` - non-nullable, may be left unset
//! - `Option<T>` - nullable; set to `None` when no source provides a value
//! - any other `T` - non-nullable with a default (the value the instance was built with)
//!
//! Attributes:
//!
//! - container: `#[bind(rename_all = "camelCase")]`
//! - field: `#[bind(rename = "name")]`, `#[bind(default)]`, `#[bind(skip)]`
//!
//! A field named `request` receives the request itself and is not bound from sources.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments,
    Result as SynResult, Type,
};

enum Shape<'a> {
    Slot(&'a Type),
    Nullable(&'a Type),
    Plain(&'a Type),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    None,
    CamelCase,
    SnakeCase,
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    default: bool,
    skip: bool,
}

/// Returns the single generic argument of `Wrapper<T>` when the last path segment is `wrapper`.
fn wrapped<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(p) = ty else {
        return None;
    };
    if p.qself.is_some() {
        return None;
    }
    let seg = p.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn classify(ty: &Type) -> Shape<'_> {
    if let Some(inner) = wrapped(ty, "Slot") {
        Shape::Slot(inner)
    } else if let Some(inner) = wrapped(ty, "Option") {
        Shape::Nullable(inner)
    } else {
        Shape::Plain(ty)
    }
}

fn to_camel_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let mut upper_next = false;
    for (i, c) in ident.chars().enumerate() {
        if c == '_' {
            if i > 0 {
                upper_next = true;
            } else {
                out.push(c);
            }
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn container_rule(input: &DeriveInput) -> SynResult<RenameRule> {
    let mut rule = RenameRule::None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("bind")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                rule = match value.value().as_str() {
                    "camelCase" => RenameRule::CamelCase,
                    "snake_case" => RenameRule::SnakeCase,
                    other => {
                        return Err(meta.error(format!("unsupported rename_all rule `{other}`")))
                    }
                };
                Ok(())
            } else {
                Err(meta.error("unsupported container attribute"))
            }
        })?;
    }
    Ok(rule)
}

fn field_attrs(field: &syn::Field) -> SynResult<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("bind")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.rename = Some(value.value());
            } else if meta.path.is_ident("default") {
                attrs.default = true;
            } else if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else {
                return Err(meta.error("unsupported field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn bind_name(ident: &Ident, attrs: &FieldAttrs, rule: RenameRule) -> String {
    if let Some(rename) = &attrs.rename {
        return rename.clone();
    }
    let raw = ident.to_string();
    let raw = raw.trim_start_matches("r#");
    match rule {
        RenameRule::CamelCase => to_camel_case(raw),
        RenameRule::None | RenameRule::SnakeCase => raw.to_string(),
    }
}

fn expand(input: DeriveInput) -> SynResult<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Controller can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Controller can only be derived for structs",
            ))
        }
    };
    let rule = container_rule(&input)?;

    let mut descriptors = Vec::new();
    let mut arms = Vec::new();
    let mut inject = None;

    for field in fields {
        let attrs = field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;

        if ident == "request" {
            inject = Some(quote! {
                fn inject_request(&mut self, request: &::brrtbind::BindRequest) {
                    self.#ident = <#ty as ::brrtbind::InjectRequest>::inject(request);
                }
            });
            continue;
        }

        let bound_name = bind_name(ident, &attrs, rule);
        let (target, nullable, has_default, assign) = match classify(ty) {
            Shape::Slot(inner) => (
                inner,
                false,
                attrs.default,
                quote! {
                    self.#ident = ::brrtbind::Slot::Set(
                        <#inner as ::brrtbind::BindValue>::from_bound(field, value)?,
                    );
                },
            ),
            Shape::Nullable(inner) => (
                inner,
                true,
                attrs.default,
                quote! {
                    self.#ident = match value {
                        ::brrtbind::BoundValue::Null => ::std::option::Option::None,
                        other => ::std::option::Option::Some(
                            <#inner as ::brrtbind::BindValue>::from_bound(field, other)?,
                        ),
                    };
                },
            ),
            Shape::Plain(plain) => (
                plain,
                false,
                true,
                quote! {
                    self.#ident = <#plain as ::brrtbind::BindValue>::from_bound(field, value)?;
                },
            ),
        };

        descriptors.push(quote! {
            .field(
                ::brrtbind::FieldDescriptor::new(
                    #bound_name,
                    <#target as ::brrtbind::BindValue>::field_type(),
                )
                .nullable(#nullable)
                .with_default(#has_default),
            )
        });
        arms.push(quote! {
            #bound_name => { #assign }
        });
    }

    let request_field = inject.as_ref().map(|_| quote! { .with_request_field() });
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::brrtbind::Controller for #name #ty_generics #where_clause {
            fn describe() -> ::brrtbind::ControllerDescriptor {
                ::brrtbind::ControllerDescriptor::new(::std::any::type_name::<Self>())
                    #request_field
                    #(#descriptors)*
            }

            #[allow(unused_variables)]
            fn assign(
                &mut self,
                field: &str,
                value: ::brrtbind::BoundValue,
            ) -> ::std::result::Result<(), ::brrtbind::CoercionError> {
                match field {
                    #(#arms)*
                    _ => {}
                }
                ::std::result::Result::Ok(())
            }

            #inject
        }

        impl #impl_generics ::brrtbind::BindValue for #name #ty_generics #where_clause {
            fn field_type() -> ::brrtbind::FieldType {
                ::brrtbind::FieldType::Object(::brrtbind::DescriptorRef::of::<Self>())
            }

            fn from_bound(
                field: &str,
                value: ::brrtbind::BoundValue,
            ) -> ::std::result::Result<Self, ::brrtbind::CoercionError> {
                ::brrtbind::from_bound_object::<Self>(field, value)
            }
        }
    })
}

/// Derive `brrtbind::Controller` (and `brrtbind::BindValue`) for a struct.
///
/// The struct must implement `Default`; nested binding starts from the default instance.
/// A `request` field is filled only when the struct is the top-level controller.
#[proc_macro_derive(Controller, attributes(bind))]
pub fn derive_controller(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
