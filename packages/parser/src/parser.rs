use crate::error::{ParseError, ParseResult};
use crate::message::{FieldValue, Message};
use crate::tokenizer::{tokenize, unescape, Token};

/// Recursive-descent parser for the message text format
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    depth: usize,
}

/// Nesting limit, so hostile input cannot exhaust the stack
const MAX_DEPTH: usize = 128;

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse a complete document
    pub fn parse_document(&mut self) -> ParseResult<Message> {
        let message = self.parse_fields()?;
        if let Some((token, span)) = self.peek() {
            return Err(ParseError::unexpected_token(
                span.clone(),
                "field name",
                token.to_string(),
            ));
        }
        Ok(message)
    }

    /// Parse fields until end of input or a closing brace
    fn parse_fields(&mut self) -> ParseResult<Message> {
        let mut message = Message::new();

        while let Some((token, _)) = self.peek() {
            match token {
                Token::RBrace => break,
                Token::Ident(_) => {
                    let (name, value) = self.parse_field()?;
                    message.push(name, value);
                }
                _ => {
                    let (token, span) = self.advance_cloned()?;
                    return Err(ParseError::unexpected_token(
                        span,
                        "field name",
                        token.to_string(),
                    ));
                }
            }
        }

        Ok(message)
    }

    fn parse_field(&mut self) -> ParseResult<(String, FieldValue)> {
        let name = self.expect_ident()?;

        // `name { ... }` and `name: { ... }` are both accepted for nested messages
        let had_colon = self.match_token(&Token::Colon);

        match self.peek() {
            Some((Token::LBrace, _)) => {
                let nested = self.parse_nested()?;
                Ok((name, FieldValue::Message(nested)))
            }
            Some(_) if had_colon => {
                let value = self.parse_scalar()?;
                Ok((name, value))
            }
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.clone(),
                "':' or '{'",
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof("':' or '{'")),
        }
    }

    fn parse_nested(&mut self) -> ParseResult<Message> {
        let (_, open_span) = self.advance_cloned()?;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::invalid_syntax(
                open_span,
                "message nesting is too deep",
            ));
        }

        let nested = self.parse_fields()?;

        match self.peek() {
            Some((Token::RBrace, _)) => {
                self.pos += 1;
            }
            Some((token, span)) => {
                return Err(ParseError::unexpected_token(
                    span.clone(),
                    "'}'",
                    token.to_string(),
                ))
            }
            None => return Err(ParseError::unexpected_eof("'}'")),
        }

        self.depth -= 1;
        Ok(nested)
    }

    fn parse_scalar(&mut self) -> ParseResult<FieldValue> {
        let (token, span) = self.advance_cloned()?;
        match token {
            Token::String(literal) => unescape(literal)
                .map(FieldValue::Str)
                .ok_or_else(|| ParseError::invalid_syntax(span, "invalid escape sequence")),
            Token::Number(text) => parse_number(text)
                .ok_or_else(|| ParseError::invalid_syntax(span, format!("invalid number '{}'", text))),
            Token::Ident("true") => Ok(FieldValue::Bool(true)),
            Token::Ident("false") => Ok(FieldValue::Bool(false)),
            Token::Ident(ident) => Ok(FieldValue::Ident(ident.to_string())),
            other => Err(ParseError::unexpected_token(span, "value", other.to_string())),
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        let (token, span) = self.advance_cloned()?;
        match token {
            Token::Ident(name) => Ok(name.to_string()),
            other => Err(ParseError::unexpected_token(span, "field name", other.to_string())),
        }
    }

    fn match_token(&mut self, expected: &Token<'src>) -> bool {
        match self.peek() {
            Some((token, _)) if token == expected => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance_cloned(&mut self) -> ParseResult<(Token<'src>, std::ops::Range<usize>)> {
        let item = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ParseError::unexpected_eof("token"))?;
        self.pos += 1;
        Ok(item)
    }
}

fn parse_number(text: &str) -> Option<FieldValue> {
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().ok().map(FieldValue::Float)
    } else {
        text.parse::<i64>().ok().map(FieldValue::Int)
    }
}

/// Parse message text
pub fn parse(source: &str) -> ParseResult<Message> {
    Parser::new(source)?.parse_document()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        let msg = parse(
            r#"
            name: "level"
            count: 3
            scale: 0.5
            enabled: true
            kind: TYPE_DYNAMIC
            "#,
        )
        .unwrap();

        assert_eq!(msg.get_str("name"), Some("level"));
        assert_eq!(msg.get_i64("count"), Some(3));
        assert_eq!(msg.get_f64("scale"), Some(0.5));
        assert_eq!(msg.get_bool("enabled"), Some(true));
        assert_eq!(msg.get_ident("kind"), Some("TYPE_DYNAMIC"));
    }

    #[test]
    fn test_parse_nested_and_repeated() {
        let msg = parse(
            r#"
            instances {
              id: "a"
              position { x: 1.0 y: 2.0 z: 3.0 }
            }
            instances: {
              id: "b"
            }
            "#,
        )
        .unwrap();

        let ids: Vec<_> = msg
            .messages("instances")
            .filter_map(|m| m.get_str("id"))
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        let position = msg
            .get_message("instances")
            .and_then(|m| m.get_message("position"))
            .unwrap();
        assert_eq!(position.get_f64("z"), Some(3.0));
    }

    #[test]
    fn test_missing_closing_brace() {
        let err = parse("instances {\n id: \"a\"\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_stray_closing_brace() {
        let err = parse("id: \"a\"\n}").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_value_without_colon() {
        let err = parse("id \"a\"").unwrap_err();
        match err {
            ParseError::UnexpectedToken { expected, .. } => assert_eq!(expected, "':' or '{'"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let source = "a {".repeat(MAX_DEPTH + 1) + &"}".repeat(MAX_DEPTH + 1);
        let err = parse(&source).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }
}
