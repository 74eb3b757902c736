use super::json::JsonType;
use serde_json::Value;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    Ident, Lit, LitInt, LitStr, Result, Token,
};

/// One allowed value in `choice = [..]`.
pub(crate) enum Choice {
    String(LitStr),
    Number(LitInt),
}

impl Choice {
    pub(crate) fn fits(&self, json_type: JsonType) -> bool {
        matches!(
            (self, json_type),
            (Choice::String(_), JsonType::String)
                | (Choice::Number(_), JsonType::Integer | JsonType::Number)
        )
    }

    pub(crate) fn to_json(&self) -> Result<Value> {
        match self {
            Choice::String(s) => Ok(Value::String(s.value())),
            Choice::Number(n) => Ok(Value::from(n.base10_parse::<i64>()?)),
        }
    }

    pub(crate) fn span(&self) -> proc_macro2::Span {
        match self {
            Choice::String(s) => s.span(),
            Choice::Number(n) => n.span(),
        }
    }
}

impl Parse for Choice {
    fn parse(input: ParseStream) -> Result<Self> {
        match input.parse::<Lit>()? {
            Lit::Str(lit_str) => Ok(Choice::String(lit_str)),
            Lit::Int(lit_int) => Ok(Choice::Number(lit_int)),
            other => Err(syn::Error::new(
                other.span(),
                "expected a string literal or an integer literal",
            )),
        }
    }
}

/// Contents of `#[input(description = "..", choice = [..])]`.
#[derive(Default)]
pub(crate) struct FieldSchemaAttr {
    pub(crate) description: Option<LitStr>,
    pub(crate) choice: Option<Vec<Choice>>,
}

impl Parse for FieldSchemaAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = FieldSchemaAttr::default();
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match key.to_string().as_str() {
                "description" => attr.description = Some(input.parse()?),
                "choice" => {
                    let content;
                    syn::bracketed!(content in input);
                    let choices: Punctuated<Choice, Token![,]> =
                        content.parse_terminated(Choice::parse, Token![,])?;
                    if !choices.is_empty() {
                        attr.choice = Some(choices.into_iter().collect());
                    }
                }
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("Unexpected field attribute key: {other}"),
                    ))
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(attr)
    }
}
