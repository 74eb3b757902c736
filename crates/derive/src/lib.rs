//! Derive macros for declaring host-side tools.
//!
//! `#[derive(ToolInput)]` turns a struct of named fields into the JSON schema
//! advertised for a tool's arguments. `#[tool(...)]` implements `ToolT` for a
//! unit struct using that schema. Both expand to code that names `ToolT`,
//! `ToolInputT` and `ToolCallError` unqualified, so those must be in scope.

extern crate proc_macro;
use proc_macro::TokenStream;
use tool::{input::InputParser, ToolParser};
mod tool;

#[proc_macro_derive(ToolInput, attributes(input))]
pub fn input(input: TokenStream) -> TokenStream {
    InputParser::parse(input)
}

#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    ToolParser::parse(attr, item)
}
