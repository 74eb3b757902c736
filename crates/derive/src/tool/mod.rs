mod attr;
pub(crate) mod field;
pub(crate) mod input;
pub(crate) mod json;
use attr::ToolAttributes;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;

pub(crate) struct ToolParser {}

impl ToolParser {
    pub fn parse(attr: TokenStream, item: TokenStream) -> TokenStream {
        let tool_attrs = parse_macro_input!(attr as ToolAttributes);
        let input_struct = parse_macro_input!(item as syn::ItemStruct);

        let struct_name = &input_struct.ident;
        let tool_name = &tool_attrs.name;
        let tool_description = &tool_attrs.description;
        let args_type = &tool_attrs.input;

        let expanded = quote! {
            #input_struct

            impl ToolT for #struct_name {
                fn name(&self) -> &'static str {
                    #tool_name
                }
                fn description(&self) -> &'static str {
                    #tool_description
                }
                fn args_schema(&self) -> serde_json::Value {
                    serde_json::from_str(<#args_type as ToolInputT>::io_schema()).unwrap_or_else(
                        |_| serde_json::json!({ "type": "object", "properties": {} }),
                    )
                }
            }

            impl std::fmt::Debug for #struct_name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.name())
                }
            }
        };

        expanded.into()
    }
}
