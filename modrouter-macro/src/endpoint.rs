use darling::{FromMeta, ast::NestedMeta};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Field, Fields, Ident, Lit, Meta, Type,
    parse_macro_input,
};

#[derive(Debug, FromMeta)]
struct RouteArgs {
    method: String,
    path: String,
}

#[derive(Debug, FromMeta)]
struct ActionArgs {
    name: String,
    #[darling(default)]
    keys: Option<String>,
}

#[derive(Debug, Default, FromMeta)]
struct InjectArgs {
    #[darling(default)]
    name: Option<String>,
}

/// Everything `#[bind(...)]` can say about one field.
#[derive(Debug, Default)]
struct BindArgs {
    /// `(tag, key)` in declaration order.
    sources: Vec<(String, String)>,
    default: Option<String>,
    alias: Option<String>,
    body: bool,
    skip: bool,
}

enum Role {
    Marker,
    Inject(String),
    Bound(BindArgs),
    Plain,
}

struct FieldInfo<'a> {
    ident: &'a Ident,
    name: String,
    ty: &'a Type,
    role: Role,
}

#[derive(Default)]
struct Marker {
    route: Option<RouteArgs>,
    action: Option<ActionArgs>,
}

pub fn derive_endpoint(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.write_errors()),
    }
}

fn expand(input: &DeriveInput) -> darling::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(darling::Error::custom(
                    "#[derive(Endpoint)] only supports structs with named fields",
                )
                .with_span(&input.ident));
            }
        },
        _ => {
            return Err(
                darling::Error::custom("#[derive(Endpoint)] can only be applied to structs")
                    .with_span(&input.ident),
            );
        }
    };

    let mut errors = darling::Error::accumulator();
    let mut marker: Option<(&Ident, Marker)> = None;
    let mut infos = Vec::new();

    for field in fields {
        let Some(info) = errors.handle(analyze_field(field, &mut marker)) else {
            continue;
        };
        infos.push(info);
    }

    let bodies: Vec<&FieldInfo> = infos
        .iter()
        .filter(|info| matches!(&info.role, Role::Bound(args) if args.body))
        .collect();
    if bodies.len() > 1 {
        errors.push(
            darling::Error::custom("only one field may be marked #[bind(body)]")
                .with_span(bodies[1].ident),
        );
    }

    errors.finish()?;

    let Some((_, marker)) = marker else {
        return Err(darling::Error::custom(
            "#[derive(Endpoint)] needs a Pattern field with #[route(...)] or #[action(...)]",
        )
        .with_span(&input.ident));
    };

    let endpoint_impl = expand_endpoint(input, &marker);
    let inject_impl = expand_inject(input, &infos);
    let bindable_impl = expand_bindable(input, &infos);

    Ok(quote! {
        #endpoint_impl
        #inject_impl
        #bindable_impl
    })
}

fn analyze_field<'a>(
    field: &'a Field,
    marker: &mut Option<(&'a Ident, Marker)>,
) -> darling::Result<FieldInfo<'a>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| darling::Error::custom("expected a named field"))?;
    let name = ident.to_string().trim_start_matches("r#").to_string();

    let mut errors = darling::Error::accumulator();
    let mut route = None;
    let mut action = None;
    let mut inject = None;
    let mut bind: Option<BindArgs> = None;

    for attr in &field.attrs {
        if attr.path().is_ident("route") {
            route = errors.handle(RouteArgs::from_meta(&attr.meta).map_err(|e| e.with_span(attr)));
        } else if attr.path().is_ident("action") {
            action =
                errors.handle(ActionArgs::from_meta(&attr.meta).map_err(|e| e.with_span(attr)));
        } else if attr.path().is_ident("inject") {
            inject = errors.handle(parse_inject(attr));
        } else if attr.path().is_ident("bind") {
            if let Some(args) = errors.handle(parse_bind(attr)) {
                bind = Some(merge_bind(bind.unwrap_or_default(), args));
            }
        }
    }

    let is_marker = route.is_some() || action.is_some();
    if is_marker {
        if inject.is_some() || bind.is_some() {
            errors.push(
                darling::Error::custom("the Pattern field cannot also be #[inject] or #[bind]")
                    .with_span(ident),
            );
        }
        if let Some(RouteArgs { method, path }) = &route {
            if method.is_empty() || path.is_empty() {
                errors.push(
                    darling::Error::custom("#[route] needs a non-empty method and path")
                        .with_span(ident),
                );
            }
        }
        if let Some(ActionArgs { name, .. }) = &action {
            if name.is_empty() {
                errors.push(darling::Error::custom("#[action] needs a non-empty name").with_span(ident));
            }
        }
        if let Some((first, _)) = marker {
            errors.push(
                darling::Error::custom(format!(
                    "routing attributes already declared on field `{first}`"
                ))
                .with_span(ident),
            );
        } else {
            *marker = Some((ident, Marker { route, action }));
        }
    }

    if inject.is_some() && bind.is_some() {
        errors.push(
            darling::Error::custom("a field cannot be both #[inject] and #[bind]").with_span(ident),
        );
    }
    if let Some(args) = &bind {
        if let Some(message) = validate_bind(args) {
            errors.push(darling::Error::custom(message).with_span(ident));
        }
    }

    errors.finish()?;

    let role = if is_marker || is_pattern(&field.ty) {
        Role::Marker
    } else if let Some(args) = inject {
        Role::Inject(args.name.unwrap_or_else(|| name.clone()))
    } else if let Some(args) = bind {
        Role::Bound(args)
    } else {
        Role::Plain
    };

    Ok(FieldInfo {
        ident,
        name,
        ty: &field.ty,
        role,
    })
}

fn parse_inject(attr: &Attribute) -> darling::Result<InjectArgs> {
    match &attr.meta {
        Meta::Path(_) => Ok(InjectArgs::default()),
        meta => InjectArgs::from_meta(meta).map_err(|e| e.with_span(attr)),
    }
}

fn parse_bind(attr: &Attribute) -> darling::Result<BindArgs> {
    let list = attr
        .meta
        .require_list()
        .map_err(darling::Error::from)?;
    let items = NestedMeta::parse_meta_list(list.tokens.clone())?;

    let mut args = BindArgs::default();
    let mut errors = darling::Error::accumulator();

    for item in items {
        let NestedMeta::Meta(meta) = item else {
            errors.push(darling::Error::custom("expected `key = \"value\"` or a flag").with_span(attr));
            continue;
        };
        let Some(key) = meta.path().get_ident().map(Ident::to_string) else {
            errors.push(darling::Error::custom("expected a plain identifier").with_span(&meta));
            continue;
        };

        match (&meta, key.as_str()) {
            (Meta::Path(_), "body") => args.body = true,
            (Meta::Path(_), "skip") => args.skip = true,
            (Meta::NameValue(nv), _) => {
                let Some(value) = string_literal(&nv.value) else {
                    errors.push(darling::Error::custom("expected a string literal").with_span(&nv.value));
                    continue;
                };
                match key.as_str() {
                    "default" => args.default = Some(value),
                    "json" => args.alias = Some(value),
                    _ => args.sources.push((key, value)),
                }
            }
            _ => errors.push(darling::Error::unknown_field(&key).with_span(&meta)),
        }
    }

    errors.finish_with(args)
}

fn merge_bind(mut base: BindArgs, next: BindArgs) -> BindArgs {
    base.sources.extend(next.sources);
    base.default = next.default.or(base.default);
    base.alias = next.alias.or(base.alias);
    base.body |= next.body;
    base.skip |= next.skip;
    base
}

fn validate_bind(args: &BindArgs) -> Option<&'static str> {
    if args.skip && (args.body || !args.sources.is_empty() || args.alias.is_some()) {
        return Some("#[bind(skip)] cannot be combined with other bind options");
    }
    if args.body && !args.sources.is_empty() {
        return Some("#[bind(body)] cannot be combined with request sources");
    }
    if args.default.is_some() && args.sources.is_empty() {
        return Some("#[bind(default = ...)] needs at least one source such as query = \"...\"");
    }
    None
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Some(s.value()),
        _ => None,
    }
}

fn is_pattern(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Pattern"),
        _ => false,
    }
}

fn expand_endpoint(input: &DeriveInput, marker: &Marker) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let route = marker.route.as_ref().map(|RouteArgs { method, path }| {
        quote!(.with_route(#method, #path))
    });
    let action = marker.action.as_ref().map(|ActionArgs { name, keys }| {
        let keys = keys.as_ref().map(|keys| quote!(.with_keys(#keys)));
        quote!(.with_action(#name) #keys)
    });

    quote! {
        impl #impl_generics ::modrouter::handler::Endpoint for #struct_name #ty_generics #where_clause {
            fn descriptor() -> ::modrouter::handler::Descriptor {
                ::modrouter::handler::Descriptor::new(::core::any::type_name::<Self>())
                    #route
                    #action
            }
        }
    }
}

fn expand_inject(input: &DeriveInput, infos: &[FieldInfo]) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fills = infos.iter().filter_map(|info| match &info.role {
        Role::Inject(name) => {
            let ident = info.ident;
            Some(quote! {
                ::modrouter::di::DependencySlot::fill(&mut self.#ident, container, #name);
            })
        }
        _ => None,
    });

    quote! {
        impl #impl_generics ::modrouter::di::Inject for #struct_name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn inject(&mut self, container: &::modrouter::di::Container) {
                #(#fills)*
            }
        }
    }
}

fn expand_bindable(input: &DeriveInput, infos: &[FieldInfo]) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let bound: Vec<(&FieldInfo, &BindArgs)> = infos
        .iter()
        .filter_map(|info| match &info.role {
            Role::Bound(args) => Some((info, args)),
            _ => None,
        })
        .collect();

    // Request-bound scalar fields.
    let specs = bound
        .iter()
        .filter(|(_, args)| !args.sources.is_empty())
        .map(|(info, args)| {
            let name = &info.name;
            let sources = args.sources.iter().map(|(tag, key)| {
                quote!(::modrouter::bind::Source { tag: #tag, key: #key })
            });
            let default = match &args.default {
                Some(value) => quote!(::core::option::Option::Some(#value)),
                None => quote!(::core::option::Option::None),
            };
            quote! {
                ::modrouter::bind::FieldSpec {
                    name: #name,
                    sources: &[#(#sources),*],
                    default: #default,
                }
            }
        });

    let set_field_arms = bound
        .iter()
        .filter(|(_, args)| !args.sources.is_empty())
        .map(|(info, _)| {
            let FieldInfo { ident, name, ty, .. } = info;
            quote! {
                #name => {
                    self.#ident = <#ty as ::modrouter::bind::FromParam>::from_param(raw)
                        .map_err(|e| ::modrouter::bind::BindError::invalid(#name, raw, e))?;
                    ::core::result::Result::Ok(())
                }
            }
        });

    let body = bound.iter().find(|(_, args)| args.body).map(|(info, _)| {
        let FieldInfo { ident, name, ty, .. } = info;
        quote! {
            fn body_field() -> ::core::option::Option<&'static str> {
                ::core::option::Option::Some(#name)
            }

            fn bind_body(&mut self, data: &[u8]) -> ::core::result::Result<(), ::modrouter::bind::BindError> {
                self.#ident = ::modrouter::__private::serde_json::from_slice::<#ty>(data)
                    .map_err(|e| ::modrouter::bind::BindError::Body(e.to_string()))?;
                ::core::result::Result::Ok(())
            }
        }
    });

    let payload: Vec<&FieldInfo> = infos
        .iter()
        .filter(|info| match &info.role {
            Role::Plain => true,
            Role::Bound(args) => !args.skip,
            Role::Marker | Role::Inject(_) => false,
        })
        .collect();

    let payload_fields = payload.iter().map(|info| {
        let name = &info.name;
        let alias = match &info.role {
            Role::Bound(BindArgs {
                alias: Some(alias), ..
            }) => quote!(::core::option::Option::Some(#alias)),
            _ => quote!(::core::option::Option::None),
        };
        quote!(::modrouter::bind::PayloadField { name: #name, alias: #alias })
    });

    let set_value_arms = payload.iter().map(|info| {
        let FieldInfo { ident, name, ty, .. } = info;
        quote! {
            #name => {
                self.#ident = ::modrouter::__private::serde_json::from_value::<#ty>(value)?;
            }
        }
    });

    let value_ident = if payload.is_empty() {
        Ident::new("_value", Span::call_site())
    } else {
        Ident::new("value", Span::call_site())
    };

    quote! {
        impl #impl_generics ::modrouter::bind::Bindable for #struct_name #ty_generics #where_clause {
            fn fields() -> &'static [::modrouter::bind::FieldSpec] {
                const FIELDS: &[::modrouter::bind::FieldSpec] = &[#(#specs),*];
                FIELDS
            }

            #[allow(unused_variables, unreachable_code)]
            fn set_field(
                &mut self,
                field: &str,
                raw: &str,
            ) -> ::core::result::Result<(), ::modrouter::bind::BindError> {
                match field {
                    #(#set_field_arms)*
                    _ => ::core::result::Result::Err(
                        ::modrouter::bind::BindError::UnknownField(field.to_string()),
                    ),
                }
            }

            #body

            fn payload_fields() -> &'static [::modrouter::bind::PayloadField] {
                const PAYLOAD_FIELDS: &[::modrouter::bind::PayloadField] = &[#(#payload_fields),*];
                PAYLOAD_FIELDS
            }

            fn set_value(
                &mut self,
                field: &str,
                #value_ident: ::modrouter::__private::serde_json::Value,
            ) -> ::core::result::Result<(), ::modrouter::__private::serde_json::Error> {
                match field {
                    #(#set_value_arms)*
                    _ => {}
                }
                ::core::result::Result::Ok(())
            }
        }
    }
}
