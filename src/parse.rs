use crate::{BinaryOperation, Expression, Parameter};
use std::{
    fmt::{self, Display, Formatter},
    iter::Peekable,
    ops::Range,
    str::FromStr,
};

/// Parse an [`Expression`] tree from some text.
pub fn parse(s: &str) -> Result<Expression, ParseError> {
    Parser::new(s).parse()
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { parse(s) }
}

/// A simple recursive descent parser (`LL(1)`) for converting a string into an
/// expression tree.
///
/// The grammar:
///
/// ```text
/// expression     := term (("+" | "-") term)*
///
/// term           := unary (("*" | "/") unary)*
///
/// unary          := "-" unary
///                 | "+" unary
///                 | "√" unary
///                 | power
///
/// power          := factor "^" unary
///                 | factor SUPERSCRIPT
///                 | factor
///
/// factor         := variable_or_function_call
///                 | "(" expression ")"
///                 | NUMBER
///
/// variable_or_function_call = IDENTIFIER "(" expression ")"
///                           | IDENTIFIER
/// ```
///
/// Unicode operators (`−`, `×`, `·`, `÷`) are accepted as aliases for their
/// ASCII counterparts, and `**` is an alias for `^`.
#[derive(Debug, Clone)]
pub(crate) struct Parser<'a> {
    tokens: Peekable<Tokens<'a>>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Parser {
            tokens: Tokens::new(src).peekable(),
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expression, ParseError> {
        let expr = self.expression()?;

        match self.tokens.next() {
            None => Ok(expr),
            Some(Ok(token)) => Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span,
                expected: &[
                    TokenKind::Plus,
                    TokenKind::Minus,
                    TokenKind::Times,
                    TokenKind::Divide,
                    TokenKind::Caret,
                ],
            }),
            Some(Err(e)) => Err(e),
        }
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.tokens
            .peek()
            .and_then(|result| result.as_ref().ok())
            .map(|tok| tok.kind)
    }

    fn advance(&mut self) -> Result<Token<'a>, ParseError> {
        match self.tokens.next() {
            Some(result) => result,
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    /// Consume the next token if it is one of the `expected` binary operators.
    fn binary_operator(
        &mut self,
        expected: &[TokenKind],
    ) -> Option<BinaryOperation> {
        let kind = self.peek()?;

        if expected.contains(&kind) {
            // skip past the operator
            let _ = self.tokens.next();
            kind.as_binary_op()
        } else {
            None
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.term()?;

        while let Some(op) =
            self.binary_operator(&[TokenKind::Plus, TokenKind::Minus])
        {
            let right = self.term()?;
            left = Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op,
            };
        }

        Ok(left)
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.unary()?;

        while let Some(op) =
            self.binary_operator(&[TokenKind::Times, TokenKind::Divide])
        {
            let right = self.unary()?;
            left = Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op,
            };
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        match self.peek() {
            Some(TokenKind::Minus) => {
                let _ = self.advance()?;
                let operand = self.unary()?;
                Ok(Expression::Negate(Box::new(operand)))
            },
            Some(TokenKind::Plus) => {
                let _ = self.advance()?;
                self.unary()
            },
            Some(TokenKind::Radical) => {
                let _ = self.advance()?;
                let operand = self.unary()?;
                Ok(Expression::call("sqrt", operand))
            },
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expression, ParseError> {
        let base = self.factor()?;

        match self.peek() {
            Some(TokenKind::Caret) => {
                let _ = self.advance()?;
                // recursing through unary() makes "^" right associative and
                // allows things like "x^-1"
                let exponent = self.unary()?;
                Ok(base.pow(exponent))
            },
            Some(TokenKind::Superscript) => {
                let token = self.advance()?;
                let exponent = superscript_value(token.text);
                Ok(base.pow(Expression::Constant(exponent)))
            },
            _ => Ok(base),
        }
    }

    fn factor(&mut self) -> Result<Expression, ParseError> {
        let expected = &[
            TokenKind::Number,
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::Minus,
        ];

        match self.peek() {
            Some(TokenKind::Number) => {
                return self.number();
            },
            Some(TokenKind::Identifier) => {
                return self.variable_or_function_call()
            },
            Some(TokenKind::OpenParen) => {
                let _ = self.advance()?;
                let expr = self.expression()?;
                let close_paren = self.advance()?;

                if close_paren.kind == TokenKind::CloseParen {
                    return Ok(expr);
                } else {
                    return Err(ParseError::UnexpectedToken {
                        found: close_paren.kind,
                        span: close_paren.span,
                        expected: &[TokenKind::CloseParen],
                    });
                }
            },
            _ => {},
        }

        // we couldn't parse the factor, return a nice error
        match self.tokens.next() {
            Some(Ok(Token { span, kind, .. })) => {
                Err(ParseError::UnexpectedToken {
                    found: kind,
                    expected,
                    span,
                })
            },
            Some(Err(e)) => Err(e),
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn variable_or_function_call(&mut self) -> Result<Expression, ParseError> {
        let ident = self.advance()?;
        debug_assert_eq!(ident.kind, TokenKind::Identifier);

        if self.peek() == Some(TokenKind::OpenParen) {
            self.function_call(ident)
        } else {
            Ok(Expression::Parameter(Parameter::named(ident.text)))
        }
    }

    fn function_call(
        &mut self,
        identifier: Token<'a>,
    ) -> Result<Expression, ParseError> {
        let open_paren = self.advance()?;
        debug_assert_eq!(open_paren.kind, TokenKind::OpenParen);

        let argument = self.expression()?;

        let Token { kind, span, .. } = self.advance()?;

        if kind == TokenKind::CloseParen {
            Ok(Expression::call(identifier.text, argument))
        } else {
            Err(ParseError::UnexpectedToken {
                found: kind,
                span,
                expected: &[TokenKind::CloseParen],
            })
        }
    }

    fn number(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance()?;
        debug_assert_eq!(token.kind, TokenKind::Number);

        token.text.parse().map(Expression::Constant).map_err(|_| {
            ParseError::InvalidNumber {
                text: token.text.to_string(),
                span: token.span,
            }
        })
    }
}

/// Possible errors that may occur while parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid character {character:?} at index {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error(
        "found {found} at {} but expected {}",
        span_text(.span),
        one_of(.expected)
    )]
    UnexpectedToken {
        found: TokenKind,
        span: Range<usize>,
        expected: &'static [TokenKind],
    },
    #[error("{text:?} is not a valid number")]
    InvalidNumber { text: String, span: Range<usize> },
}

impl ParseError {
    /// Shift any reported locations `offset` bytes to the right, for when the
    /// text that was parsed is a slice of some larger input.
    pub(crate) fn offset_by(self, offset: usize) -> ParseError {
        let shift = |span: Range<usize>| span.start + offset..span.end + offset;

        match self {
            ParseError::InvalidCharacter { character, index } => {
                ParseError::InvalidCharacter {
                    character,
                    index: index + offset,
                }
            },
            ParseError::UnexpectedEndOfInput => ParseError::UnexpectedEndOfInput,
            ParseError::UnexpectedToken {
                found,
                span,
                expected,
            } => ParseError::UnexpectedToken {
                found,
                span: shift(span),
                expected,
            },
            ParseError::InvalidNumber { text, span } => {
                ParseError::InvalidNumber {
                    text,
                    span: shift(span),
                }
            },
        }
    }
}

fn span_text(span: &Range<usize>) -> String {
    format!("{}..{}", span.start, span.end)
}

fn one_of(kinds: &[TokenKind]) -> String {
    let names: Vec<_> = kinds.iter().map(ToString::to_string).collect();

    match names.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
        None => String::from("nothing"),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self { Tokens { src, cursor: 0 } }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn chomp(
        &mut self,
        kind: TokenKind,
    ) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        self.advance()?;
        let end = self.cursor;

        Some(Ok(Token::from_text(self.src, start..end, kind)))
    }

    /// `*` is multiplication, but `**` is exponentiation.
    fn chomp_star(&mut self) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        self.advance()?;

        let kind = if self.peek() == Some('*') {
            self.advance();
            TokenKind::Caret
        } else {
            TokenKind::Times
        };

        Some(Ok(Token::from_text(self.src, start..self.cursor, kind)))
    }

    fn take_while<P>(&mut self, mut predicate: P) -> Range<usize>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.cursor;

        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        start..self.cursor
    }

    fn chomp_number(&mut self) -> Token<'a> {
        let start = self.cursor;
        self.take_while(|c| c.is_ascii_digit());

        if self.peek() == Some('.') {
            // skip past the decimal
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }

        let end = self.cursor;

        Token::from_text(self.src, start..end, TokenKind::Number)
    }

    fn chomp_identifier(&mut self) -> Token<'a> {
        let mut seen_first_character = false;

        let span = self.take_while(|c| {
            if seen_first_character {
                (c.is_alphanumeric() && superscript_digit(c).is_none())
                    || c == '_'
            } else {
                seen_first_character = true;
                c.is_alphabetic() || c == '_'
            }
        });

        Token::from_text(self.src, span, TokenKind::Identifier)
    }

    fn chomp_superscript(&mut self) -> Token<'a> {
        let span = self.take_while(|c| superscript_digit(c).is_some());
        Token::from_text(self.src, span, TokenKind::Superscript)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.advance();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen),
                ')' => self.chomp(TokenKind::CloseParen),
                '+' => self.chomp(TokenKind::Plus),
                '-' | '−' => self.chomp(TokenKind::Minus),
                '*' => self.chomp_star(),
                '×' | '·' | '⋅' => self.chomp(TokenKind::Times),
                '/' | '÷' => self.chomp(TokenKind::Divide),
                '^' => self.chomp(TokenKind::Caret),
                '√' => self.chomp(TokenKind::Radical),
                '0'..='9' => Some(Ok(self.chomp_number())),
                c if superscript_digit(c).is_some() => {
                    Some(Ok(self.chomp_superscript()))
                },
                c if c == '_' || c.is_alphabetic() => {
                    Some(Ok(self.chomp_identifier()))
                },
                other => {
                    let index = self.cursor;
                    // make sure we don't keep yielding the same error
                    self.cursor = self.src.len();
                    Some(Err(ParseError::InvalidCharacter {
                        character: other,
                        index,
                    }))
                },
            };
        }
    }
}

fn superscript_digit(c: char) -> Option<u32> {
    match c {
        '⁰' => Some(0),
        '¹' => Some(1),
        '²' => Some(2),
        '³' => Some(3),
        '⁴'..='⁹' => Some(c as u32 - '⁴' as u32 + 4),
        _ => None,
    }
}

fn superscript_value(text: &str) -> f64 {
    text.chars()
        .filter_map(superscript_digit)
        .fold(0.0, |acc, digit| acc * 10.0 + f64::from(digit))
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
    kind: TokenKind,
}

impl<'a> Token<'a> {
    fn from_text(
        original_source: &'a str,
        span: Range<usize>,
        kind: TokenKind,
    ) -> Self {
        Token {
            text: &original_source[span.clone()],
            span,
            kind,
        }
    }
}

/// The kinds of token that can appear in an [`Expression`]'s text form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number,
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Times,
    Divide,
    Caret,
    /// A run of superscript digits, e.g. the `²` in `x²`.
    Superscript,
    /// The `√` prefix operator.
    Radical,
}

impl TokenKind {
    fn as_binary_op(self) -> Option<BinaryOperation> {
        match self {
            TokenKind::Plus => Some(BinaryOperation::Plus),
            TokenKind::Minus => Some(BinaryOperation::Minus),
            TokenKind::Times => Some(BinaryOperation::Times),
            TokenKind::Divide => Some(BinaryOperation::Divide),
            TokenKind::Caret => Some(BinaryOperation::Power),
            _ => None,
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "an identifier"),
            TokenKind::Number => write!(f, "a number"),
            TokenKind::OpenParen => write!(f, "\"(\""),
            TokenKind::CloseParen => write!(f, "\")\""),
            TokenKind::Plus => write!(f, "\"+\""),
            TokenKind::Minus => write!(f, "\"-\""),
            TokenKind::Times => write!(f, "\"*\""),
            TokenKind::Divide => write!(f, "\"/\""),
            TokenKind::Caret => write!(f, "\"^\""),
            TokenKind::Superscript => write!(f, "a superscript"),
            TokenKind::Radical => write!(f, "\"√\""),
        }
    }
}

#[cfg(test)]
mod tokenizer_tests {
    use super::*;

    macro_rules! tokenize_test {
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let mut tokens = Tokens::new($src);

                let got = tokens.next().unwrap().unwrap();

                let Range { start, end } = got.span;
                assert_eq!(start, 0);
                assert_eq!(end, $src.len());
                assert_eq!(got.kind, $should_be);

                assert!(
                    tokens.next().is_none(),
                    "{:?} should be empty",
                    tokens
                );
            }
        };
    }

    tokenize_test!(open_paren, "(", TokenKind::OpenParen);
    tokenize_test!(close_paren, ")", TokenKind::CloseParen);
    tokenize_test!(plus, "+", TokenKind::Plus);
    tokenize_test!(minus, "-", TokenKind::Minus);
    tokenize_test!(unicode_minus, "−", TokenKind::Minus);
    tokenize_test!(times, "*", TokenKind::Times);
    tokenize_test!(unicode_times, "×", TokenKind::Times);
    tokenize_test!(divide, "/", TokenKind::Divide);
    tokenize_test!(caret, "^", TokenKind::Caret);
    tokenize_test!(double_star, "**", TokenKind::Caret);
    tokenize_test!(radical, "√", TokenKind::Radical);
    tokenize_test!(squared, "²", TokenKind::Superscript);
    tokenize_test!(multi_digit_superscript, "¹⁰", TokenKind::Superscript);
    tokenize_test!(single_digit_integer, "3", TokenKind::Number);
    tokenize_test!(multi_digit_integer, "31", TokenKind::Number);
    tokenize_test!(number_with_trailing_dot, "31.", TokenKind::Number);
    tokenize_test!(simple_decimal, "3.14", TokenKind::Number);
    tokenize_test!(simple_identifier, "x", TokenKind::Identifier);
    tokenize_test!(longer_identifier, "hello", TokenKind::Identifier);
    tokenize_test!(greek_identifier, "π", TokenKind::Identifier);
    tokenize_test!(
        identifiers_can_have_underscores,
        "hello_world",
        TokenKind::Identifier
    );
    tokenize_test!(
        identifiers_can_start_with_underscores,
        "_hello_world",
        TokenKind::Identifier
    );
    tokenize_test!(
        identifiers_can_contain_numbers,
        "var5",
        TokenKind::Identifier
    );

    #[test]
    fn invalid_characters_are_reported_once() {
        let mut tokens = Tokens::new("$$");

        let got = tokens.next().unwrap();

        assert_eq!(
            got,
            Err(ParseError::InvalidCharacter {
                character: '$',
                index: 0
            })
        );
        assert!(tokens.next().is_none());
    }
}
