//! Plain-text robot source: tokenizer, section splitter and table parser.

pub mod lexer;
mod parser;
pub mod sections;

pub use parser::parse;
