use super::field::FieldSchemaAttr;
use super::json::JsonType;
use proc_macro::TokenStream;
use quote::quote;
use serde_json::{json, Map, Value};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Error, Field, Fields, GenericArgument,
    LitStr, PathArguments, Result, Type,
};

pub(crate) struct InputParser {}

impl InputParser {
    pub fn parse(input: TokenStream) -> TokenStream {
        let input = parse_macro_input!(input as DeriveInput);
        match Self::schema(&input) {
            Ok(schema) => {
                let struct_ident = &input.ident;
                let schema_literal = LitStr::new(&schema.to_string(), struct_ident.span());
                let expanded = quote! {
                    impl ToolInputT for #struct_ident {
                        fn io_schema() -> &'static str {
                            #schema_literal
                        }
                    }
                };
                TokenStream::from(expanded)
            }
            Err(e) => e.to_compile_error().into(),
        }
    }

    fn schema(input: &DeriveInput) -> Result<Value> {
        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
                Fields::Unit => Vec::new(),
                Fields::Unnamed(_) => {
                    return Err(Error::new_spanned(
                        &input.ident,
                        "ToolInput needs named fields",
                    ))
                }
            },
            _ => {
                return Err(Error::new_spanned(
                    &input.ident,
                    "ToolInput can only be derived for structs",
                ))
            }
        };

        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in fields {
            let Some(ident) = field.ident.as_ref() else {
                continue;
            };
            let name = ident.to_string();
            let (optional, ty) = unwrap_option(&field.ty);
            if !optional {
                required.push(Value::String(name.clone()));
            }
            properties.insert(name, Self::property(field, ty)?);
        }

        Ok(json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }))
    }

    fn property(field: &Field, ty: &Type) -> Result<Value> {
        let kind = json_type(ty)?;
        let mut property = Map::new();
        property.insert("type".into(), kind.to_string().into());

        if kind == JsonType::Array {
            if let Some(item) = element_type(ty).and_then(|t| json_type(t).ok()) {
                property.insert("items".into(), json!({ "type": item.to_string() }));
            }
        }

        let attr = field_attr(&field.attrs)?;
        if let Some(description) = attr
            .description
            .map(|d| d.value())
            .or_else(|| doc_comment(&field.attrs))
        {
            property.insert("description".into(), description.into());
        }

        if let Some(choices) = attr.choice {
            let mut values = Vec::with_capacity(choices.len());
            for choice in &choices {
                if !choice.fits(kind) {
                    return Err(Error::new(
                        choice.span(),
                        format!("choice does not match the field type '{kind}'"),
                    ));
                }
                values.push(choice.to_json()?);
            }
            property.insert("enum".into(), Value::Array(values));
        }

        Ok(Value::Object(property))
    }
}

fn field_attr(attrs: &[Attribute]) -> Result<FieldSchemaAttr> {
    match attrs.iter().find(|a| a.path().is_ident("input")) {
        Some(attr) => attr.parse_args::<FieldSchemaAttr>(),
        None => Ok(FieldSchemaAttr::default()),
    }
}

fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            syn::Meta::NameValue(meta) => match &meta.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) => path.path.segments.last(),
        _ => None,
    }
}

fn first_generic(ty: &Type) -> Option<&Type> {
    match &last_segment(ty)?.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

fn unwrap_option(ty: &Type) -> (bool, &Type) {
    match last_segment(ty) {
        Some(segment) if segment.ident == "Option" => match first_generic(ty) {
            Some(inner) => (true, inner),
            None => (false, ty),
        },
        _ => (false, ty),
    }
}

fn element_type(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Slice(slice) => Some(&slice.elem),
        Type::Array(array) => Some(&array.elem),
        Type::Reference(reference) => element_type(&reference.elem),
        _ => first_generic(ty),
    }
}

fn json_type(ty: &Type) -> Result<JsonType> {
    match ty {
        Type::Reference(reference) => return json_type(&reference.elem),
        Type::Slice(_) | Type::Array(_) => return Ok(JsonType::Array),
        _ => {}
    }

    let ident = last_segment(ty)
        .map(|s| s.ident.to_string())
        .unwrap_or_default();
    let kind = match ident.as_str() {
        "String" | "str" | "char" => JsonType::String,
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => JsonType::Integer,
        "f32" | "f64" => JsonType::Number,
        "bool" => JsonType::Boolean,
        "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => JsonType::Array,
        _ => {
            return Err(Error::new_spanned(
                ty,
                "Unsupported data type for a tool input field",
            ))
        }
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_of(tokens: proc_macro2::TokenStream) -> Value {
        let input: DeriveInput = syn::parse2(tokens).unwrap();
        InputParser::schema(&input).unwrap()
    }

    #[test]
    fn test_string_field_schema() {
        let schema = schema_of(quote! {
            struct AddDataArgs {
                #[input(description = "Data to add")]
                message: String,
            }
        });
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {"message": {"type": "string", "description": "Data to add"}},
                "required": ["message"]
            })
        );
    }

    #[test]
    fn test_unit_struct_has_no_properties() {
        let schema = schema_of(quote! { struct ReadDataArgs; });
        assert_eq!(
            schema,
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn test_types_options_and_docs() {
        let schema = schema_of(quote! {
            struct Args {
                /// How many rows
                count: u32,
                ratio: Option<f64>,
                verbose: bool,
                tags: Vec<String>,
            }
        });
        assert_eq!(schema["properties"]["count"]["type"], "integer");
        assert_eq!(schema["properties"]["count"]["description"], "How many rows");
        assert_eq!(schema["properties"]["ratio"]["type"], "number");
        assert_eq!(schema["properties"]["verbose"]["type"], "boolean");
        assert_eq!(
            schema["properties"]["tags"],
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(schema["required"], json!(["count", "verbose", "tags"]));
    }

    #[test]
    fn test_choices() {
        let schema = schema_of(quote! {
            struct Args {
                #[input(choice = ["asc", "desc"])]
                order: String,
                #[input(choice = [1, 2, 3])]
                level: i32,
            }
        });
        assert_eq!(schema["properties"]["order"]["enum"], json!(["asc", "desc"]));
        assert_eq!(schema["properties"]["level"]["enum"], json!([1, 2, 3]));
    }

    #[test]
    fn test_mismatched_choice_is_error() {
        let input: DeriveInput = syn::parse2(quote! {
            struct Args {
                #[input(choice = [1])]
                order: String,
            }
        })
        .unwrap();
        assert!(InputParser::schema(&input).is_err());
    }

    #[test]
    fn test_array_fields_carry_item_type() {
        let schema = schema_of(quote! {
            struct Args {
                ids: Vec<u64>,
                names: &'static [String],
                flags: Option<Vec<bool>>,
            }
        });
        assert_eq!(
            schema["properties"]["ids"],
            json!({"type": "array", "items": {"type": "integer"}})
        );
        assert_eq!(
            schema["properties"]["names"],
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(
            schema["properties"]["flags"],
            json!({"type": "array", "items": {"type": "boolean"}})
        );
        assert_eq!(schema["required"], json!(["ids", "names"]));
    }

    #[test]
    fn test_unsupported_type_is_error() {
        let input: DeriveInput = syn::parse2(quote! {
            struct Args { when: std::time::Instant }
        })
        .unwrap();
        assert!(InputParser::schema(&input).is_err());
    }
}
