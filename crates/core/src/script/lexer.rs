//! Tokeniser

use std::{iter::Peekable, str::CharIndices, str::FromStr};

use rust_decimal::Decimal;

use crate::script::error::{ParseError, Position};

/// Token kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Number(Decimal),
    Str(String),
    Ident(String),

    Let,
    If,
    Else,
    For,
    In,
    While,
    Break,
    Continue,
    Raise,
    True,
    False,
    Nil,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,

    Eof,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Number(number) => format!("number `{number}`"),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Eof => "end of script".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Let => "let",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::While => "while",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Raise => "raise",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Nil => "nil",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Number(_)
            | TokenKind::Str(_)
            | TokenKind::Ident(_)
            | TokenKind::Eof => "",
        }
    }
}

/// A token and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) position: Position,
}

/// Split source into tokens, ending with [`TokenKind::Eof`].
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'s> {
    chars: Peekable<CharIndices<'s>>,
    line: usize,
    column: usize,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();

            let position = self.position();

            let Some(c) = self.bump() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    position,
                });

                return Ok(tokens);
            };

            let kind = match c {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                ':' => TokenKind::Colon,
                ';' => TokenKind::Semicolon,
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '%' => TokenKind::Percent,
                '!' => self.pick('=', TokenKind::NotEq, TokenKind::Bang),
                '=' => self.pick('=', TokenKind::Eq, TokenKind::Assign),
                '<' => self.pick('=', TokenKind::Le, TokenKind::Lt),
                '>' => self.pick('=', TokenKind::Ge, TokenKind::Gt),
                '&' => self.pair('&', TokenKind::And, position)?,
                '|' => self.pair('|', TokenKind::Or, position)?,
                '"' => self.string(position)?,
                c if c.is_ascii_digit() => self.number(c, position)?,
                c if is_ident_start(c) => self.ident(c),
                other => {
                    return Err(ParseError::new(
                        position,
                        format!("unexpected character `{other}`"),
                    ));
                }
            };

            tokens.push(Token { kind, position });
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' || (c == '/' && self.second_is('/')) {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn second_is(&self, expected: char) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();

        ahead.next().is_some_and(|(_, c)| c == expected)
    }

    fn pick(&mut self, next: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.bump();
            matched
        } else {
            single
        }
    }

    fn pair(
        &mut self,
        next: char,
        kind: TokenKind,
        position: Position,
    ) -> Result<TokenKind, ParseError> {
        if self.peek() == Some(next) {
            self.bump();
            Ok(kind)
        } else {
            Err(ParseError::new(
                position,
                format!("expected `{next}{next}`"),
            ))
        }
    }

    fn string(&mut self, position: Position) -> Result<TokenKind, ParseError> {
        let mut text = String::new();

        loop {
            match self.bump() {
                None => return Err(ParseError::new(position, "unterminated string")),
                Some('"') => return Ok(TokenKind::Str(text)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(ParseError::new(
                                self.position(),
                                format!("unknown escape `\\{other}`"),
                            ));
                        }
                        None => return Err(ParseError::new(position, "unterminated string")),
                    };

                    text.push(escaped);
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn number(&mut self, first: char, position: Position) -> Result<TokenKind, ParseError> {
        let mut digits = String::from(first);
        let mut seen_dot = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else if c == '_' {
                // digit separator
            } else if c == '.' && !seen_dot && self.second_is_digit() {
                seen_dot = true;
                digits.push(c);
            } else {
                break;
            }

            self.bump();
        }

        Decimal::from_str(&digits)
            .map(TokenKind::Number)
            .map_err(|error| ParseError::new(position, format!("invalid number `{digits}`: {error}")))
    }

    fn second_is_digit(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();

        ahead.next().is_some_and(|(_, c)| c.is_ascii_digit())
    }

    fn ident(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(c) = self.peek().filter(|&c| is_ident_continue(c)) {
            name.push(c);
            self.bump();
        }

        match name.as_str() {
            "let" => TokenKind::Let,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "while" => TokenKind::While,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "raise" => TokenKind::Raise,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nil" => TokenKind::Nil,
            _ => TokenKind::Ident(name),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '?'
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;
    use testresult::TestResult;

    use super::*;

    fn kinds(source: &str) -> Result<Vec<TokenKind>, ParseError> {
        Ok(tokenize(source)?.into_iter().map(|token| token.kind).collect())
    }

    #[test]
    fn tokenizes_statement() -> TestResult {
        assert_eq!(
            kinds("let price = line.line_price * 0.9;")?,
            vec![
                TokenKind::Let,
                TokenKind::Ident("price".to_string()),
                TokenKind::Assign,
                TokenKind::Ident("line".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("line_price".to_string()),
                TokenKind::Star,
                TokenKind::Number(dec!(0.9)),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );

        Ok(())
    }

    #[test]
    fn two_character_operators() -> TestResult {
        assert_eq!(
            kinds("== != <= >= && || = < > !")?,
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Assign,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );

        Ok(())
    }

    #[test]
    fn skips_comments_and_tracks_positions() -> TestResult {
        let tokens = tokenize("# comment\n  // another\n  nil")?;
        let nil = tokens.first().ok_or("missing token")?;

        assert_eq!(nil.kind, TokenKind::Nil);
        assert_eq!(nil.position, Position { line: 3, column: 3 });

        Ok(())
    }

    #[test]
    fn numbers_allow_separators_and_member_access() -> TestResult {
        assert_eq!(
            kinds("1_000.50 2.size")?,
            vec![
                TokenKind::Number(dec!(1000.50)),
                TokenKind::Number(dec!(2)),
                TokenKind::Dot,
                TokenKind::Ident("size".to_string()),
                TokenKind::Eof,
            ]
        );

        Ok(())
    }

    #[test]
    fn string_escapes() -> TestResult {
        assert_eq!(
            kinds(r#""say \"hi\"\n""#)?,
            vec![TokenKind::Str("say \"hi\"\n".to_string()), TokenKind::Eof]
        );

        Ok(())
    }

    #[test]
    fn unterminated_string_errors() {
        let error = tokenize("\"open").err();

        assert_eq!(
            error.map(|e| e.message),
            Some("unterminated string".to_string())
        );
    }

    #[test]
    fn single_ampersand_errors() {
        assert!(tokenize("a & b").is_err());
    }

    #[test]
    fn unexpected_character_errors() {
        let error = tokenize("let x = @;").err();

        assert_eq!(
            error.map(|e| e.position),
            Some(Position { line: 1, column: 9 })
        );
    }
}
