use std::str::FromStr;
use strum::{Display, EnumString};
use syn::{
    parse::{Parse, ParseStream},
    Ident, LitStr, Result, Token, Type,
};

/// Contents of `#[tool(name = "..", description = "..", input = Type)]`.
pub(crate) struct ToolAttributes {
    pub(crate) name: LitStr,
    pub(crate) description: LitStr,
    pub(crate) input: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
enum ToolAttributeKey {
    Name,
    Description,
    Input,
}

impl Parse for ToolAttributes {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut name = None;
        let mut description = None;
        let mut args = None;
        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            let key = ToolAttributeKey::from_str(&ident.to_string()).map_err(|_| {
                syn::Error::new(ident.span(), format!("Unexpected attribute key: {ident}"))
            })?;
            input.parse::<Token![=]>()?;

            match key {
                ToolAttributeKey::Name => {
                    let lit = input.parse::<LitStr>()?;
                    if lit.value().trim().is_empty() {
                        return Err(syn::Error::new(lit.span(), "Tool name must not be empty"));
                    }
                    name = Some(lit);
                }
                ToolAttributeKey::Description => description = Some(input.parse::<LitStr>()?),
                ToolAttributeKey::Input => args = Some(input.parse::<Type>()?),
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        let missing =
            |key: ToolAttributeKey| syn::Error::new(input.span(), format!("Missing attribute: {key}"));
        Ok(ToolAttributes {
            name: name.ok_or_else(|| missing(ToolAttributeKey::Name))?,
            description: description.ok_or_else(|| missing(ToolAttributeKey::Description))?,
            input: args.ok_or_else(|| missing(ToolAttributeKey::Input))?,
        })
    }
}
