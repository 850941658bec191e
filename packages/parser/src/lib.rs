//! # scened-parser
//!
//! Line-oriented, human-diffable text format used by every scened document.
//! `parse` turns text into a [`Message`] tree and `serialize` writes the
//! canonical form back, so `serialize(parse(serialize(m))) == serialize(m)`.

pub mod error;
pub mod message;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use error::{format_error, ParseError, ParseResult};
pub use message::{Field, FieldValue, Message};
pub use parser::{parse, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_basic() {
        let tokens = tokenize("name: \"level\"").unwrap();
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_format_error_mentions_problem() {
        let source = "id: @";
        let err = parse(source).unwrap_err();
        let rendered = format_error(source, "bad.go", &err);
        assert!(rendered.contains("unexpected character sequence"));
    }
}
