//! Textual type syntax.
//!
//! Lexing is done with logos; the grammar is small enough for a hand-written
//! recursive-descent parser on top of the token stream.
//!
//! ```
//! # use weft_types::Type;
//! let tp: Type = "{name: string, score: ?float64}".parse().unwrap();
//! assert_eq!(tp.to_string(), "{name: string, score: ?float64}");
//! ```

use std::ops::Range;
use std::str::FromStr;

use logos::Logos;

use crate::error::ParseError;
use crate::id::TypeId;
use crate::types::{StringEncoding, Type, TypeKind};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token<'s> {
    #[token("?")]
    Question,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[regex("[0-9]+", |lex| lex.slice().parse::<usize>().ok())]
    Int(usize),
    #[regex(r"'([^'\\]|\\.)*'", |lex| unquote(lex.slice()))]
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    Str(String),
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'s str),
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Question => "'?'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::Comma => "','".into(),
            Token::Colon => "':'".into(),
            Token::Int(n) => format!("integer {n}"),
            Token::Str(s) => format!("string '{s}'"),
            Token::Ident(name) => format!("identifier `{name}`"),
        }
    }
}

fn unquote(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

struct Parser<'s> {
    tokens: Vec<(Token<'s>, Range<usize>)>,
    pos: usize,
    len: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Result<Self, ParseError> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(source);
        while let Some(token) = lexer.next() {
            match token {
                Ok(token) => tokens.push((token, lexer.span())),
                Err(()) => {
                    return Err(ParseError::InvalidToken {
                        offset: lexer.span().start,
                    });
                }
            }
        }
        Ok(Self {
            tokens,
            pos: 0,
            len: source.len(),
        })
    }

    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.len, |(_, span)| span.start)
    }

    fn next(&mut self, expected: &'static str) -> Result<Token<'s>, ParseError> {
        match self.tokens.get(self.pos) {
            Some((token, _)) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    fn expect(&mut self, want: Token<'static>, expected: &'static str) -> Result<(), ParseError> {
        let offset = self.offset();
        let found = self.next(expected)?;
        if found == want {
            Ok(())
        } else {
            Err(ParseError::Unexpected {
                found: found.describe(),
                expected,
                offset,
            })
        }
    }

    fn eat(&mut self, want: &Token<'_>) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, found: &Token<'_>, expected: &'static str, offset: usize) -> ParseError {
        ParseError::Unexpected {
            found: found.describe(),
            expected,
            offset,
        }
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let offset = self.offset();
        match self.next("a type")? {
            Token::Question => Ok(Type::option(self.parse_type()?)),
            Token::LParen => {
                let fields = self.parse_list(&Token::RParen, Self::parse_type)?;
                Ok(Type::tuple(fields))
            }
            Token::LBrace => {
                let fields = self.parse_list(&Token::RBrace, Self::parse_field)?;
                Ok(Type::structure(fields))
            }
            Token::Ident(name) => self.parse_named(name, offset),
            other => Err(self.unexpected(&other, "a type", offset)),
        }
    }

    /// Comma separated items up to and including `close`.
    fn parse_list<T>(
        &mut self,
        close: &Token<'_>,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(Token::Comma, "',' or a closing delimiter")?;
        }
    }

    fn parse_field(&mut self) -> Result<(String, Type), ParseError> {
        let offset = self.offset();
        let name = match self.next("a field name")? {
            Token::Ident(name) => name.to_string(),
            Token::Str(name) => name,
            other => return Err(self.unexpected(&other, "a field name", offset)),
        };
        self.expect(Token::Colon, "':'")?;
        Ok((name, self.parse_type()?))
    }

    fn parse_string_arg(&mut self) -> Result<String, ParseError> {
        let offset = self.offset();
        match self.next("a quoted string")? {
            Token::Str(s) => Ok(s),
            other => Err(self.unexpected(&other, "a quoted string", offset)),
        }
    }

    fn parse_encoding(&mut self) -> Result<StringEncoding, ParseError> {
        let name = self.parse_string_arg()?;
        StringEncoding::from_name(&name).ok_or(ParseError::UnknownEncoding { name })
    }

    fn parse_bracketed_type(&mut self) -> Result<Type, ParseError> {
        self.expect(Token::LBracket, "'['")?;
        let inner = self.parse_type()?;
        self.expect(Token::RBracket, "']'")?;
        Ok(inner)
    }

    fn parse_named(&mut self, name: &str, offset: usize) -> Result<Type, ParseError> {
        let kind = match name {
            "bool" => TypeKind::Bool,
            "int8" => TypeKind::Int8,
            "int16" => TypeKind::Int16,
            "int32" => TypeKind::Int32,
            "int64" => TypeKind::Int64,
            "uint8" => TypeKind::UInt8,
            "uint16" => TypeKind::UInt16,
            "uint32" => TypeKind::UInt32,
            "uint64" => TypeKind::UInt64,
            "float16" => TypeKind::Float16,
            "float32" => TypeKind::Float32,
            "float64" => TypeKind::Float64,
            "complex64" => TypeKind::Complex64,
            "complex128" => TypeKind::Complex128,
            "string" => {
                let encoding = if self.eat(&Token::LBracket) {
                    let encoding = self.parse_encoding()?;
                    self.expect(Token::RBracket, "']'")?;
                    encoding
                } else {
                    StringEncoding::Utf8
                };
                TypeKind::String { encoding }
            }
            "fixed_string" => {
                self.expect(Token::LBracket, "'['")?;
                let size_offset = self.offset();
                let size = match self.next("a size")? {
                    Token::Int(n) => n,
                    other => return Err(self.unexpected(&other, "a size", size_offset)),
                };
                let encoding = if self.eat(&Token::Comma) {
                    self.parse_encoding()?
                } else {
                    StringEncoding::Utf8
                };
                self.expect(Token::RBracket, "']'")?;
                TypeKind::FixedString { size, encoding }
            }
            "categorical" => {
                self.expect(Token::LBracket, "'['")?;
                let categories = self.parse_list(&Token::RBracket, Self::parse_string_arg)?;
                return Ok(Type::categorical(categories));
            }
            "option" => return Ok(Type::option(self.parse_bracketed_type()?)),
            "pointer" => return Ok(Type::pointer(self.parse_bracketed_type()?)),
            other => {
                if let Some(id) = TypeId::from_kind_name(other) {
                    TypeKind::Kind(id)
                } else if other.starts_with(|c: char| c.is_ascii_uppercase()) {
                    TypeKind::TypeVar(other.into())
                } else {
                    return Err(ParseError::UnknownType {
                        name: other.to_string(),
                        offset,
                    });
                }
            }
        };
        Ok(Type::new(kind))
    }
}

impl Type {
    /// Parses the textual type syntax.
    pub fn parse(source: &str) -> Result<Type, ParseError> {
        let mut parser = Parser::new(source)?;
        let tp = parser.parse_type()?;
        if parser.pos < parser.tokens.len() {
            return Err(ParseError::TrailingInput {
                offset: parser.offset(),
            });
        }
        Ok(tp)
    }
}

impl FromStr for Type {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Type::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Type {
        Type::parse(s).unwrap()
    }

    #[test]
    fn scalars_and_strings() {
        assert_eq!(parse("int32"), Type::int32());
        assert_eq!(parse("string"), Type::string());
        assert_eq!(
            parse("string['utf16']"),
            Type::string_with(StringEncoding::Utf16)
        );
        assert_eq!(
            parse("fixed_string[8, 'ascii']"),
            Type::fixed_string(8, StringEncoding::Ascii)
        );
        assert_eq!(
            parse("fixed_string[3]"),
            Type::fixed_string(3, StringEncoding::Utf8)
        );
    }

    #[test]
    fn composites() {
        assert_eq!(parse("?float64"), Type::option(Type::float64()));
        assert_eq!(parse("option[int8]"), Type::option(Type::int8()));
        assert_eq!(parse("pointer[bool]"), Type::pointer(Type::bool()));
        assert_eq!(parse("()"), Type::tuple([]));
        assert_eq!(
            parse("(int8, ?string)"),
            Type::tuple([Type::int8(), Type::option(Type::string())])
        );
        assert_eq!(
            parse("{x: int32, 'my field': float32}"),
            Type::structure([("x", Type::int32()), ("my field", Type::float32())])
        );
        assert_eq!(
            parse(r"categorical['lo', 'it\'s']"),
            Type::categorical(["lo", "it's"])
        );
    }

    #[test]
    fn symbolic() {
        assert_eq!(parse("Int"), Type::any_of(TypeId::IntKind));
        assert_eq!(parse("T"), Type::var("T"));
        assert_eq!(parse("?T"), Type::option(Type::var("T")));
    }

    #[test]
    fn display_round_trips() {
        for src in [
            "int8",
            "string['utf32']",
            "fixed_string[4, 'utf16']",
            "?{a: int8, b: (float32, string)}",
            "pointer[categorical['x', 'y']]",
            "Scalar",
            "(T, T)",
        ] {
            let tp = parse(src);
            assert_eq!(parse(&tp.to_string()), tp, "{src}");
        }
    }

    #[test]
    fn errors() {
        assert!(matches!(
            Type::parse("int33"),
            Err(ParseError::UnknownType { .. })
        ));
        assert!(matches!(
            Type::parse("string['ebcdic']"),
            Err(ParseError::UnknownEncoding { .. })
        ));
        assert!(matches!(
            Type::parse("(int8"),
            Err(ParseError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            Type::parse("int8 int8"),
            Err(ParseError::TrailingInput { offset: 5 })
        ));
        assert!(matches!(
            Type::parse("int8 $"),
            Err(ParseError::InvalidToken { offset: 5 })
        ));
    }
}
