//! Tokenizer for property and variable value expressions.
//!
//! Whitespace is not a token, but each token remembers whether whitespace
//! preceded it: `10px -2px` is a two-item list while `10px - 2px` is a
//! subtraction.

use nuance_trousse::CompactString;

use crate::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number { value: f64, unit: CompactString },
    /// `#` followed by name characters (hex color or otherwise)
    Hash(CompactString),
    Ident(CompactString),
    /// Variable reference, sigil included
    Variable(CompactString),
    Str { text: CompactString, quote: char },
    /// LESS `~"..."` escape, emitted verbatim without quotes
    Escaped(CompactString),
    /// Raw `url(...)` contents, kept as-is
    Url(CompactString),
    /// Identifier immediately followed by `(`; the paren is consumed
    Function(CompactString),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lexeme {
    pub token: Token,
    pub offset: usize,
    pub space_before: bool,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Lexeme>, EvalError> {
    Lexer {
        src: input,
        bytes: input.as_bytes(),
        pos: 0,
        out: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Vec<Lexeme>,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Lexeme>, EvalError> {
        loop {
            let space_before = self.skip_whitespace();
            let Some(b) = self.peek(0) else {
                break;
            };
            let offset = self.pos;

            let token = match b {
                b'0'..=b'9' => self.number(),
                b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
                b'-' => self.minus(space_before),
                b'+' => {
                    self.pos += 1;
                    Token::Plus
                }
                b'*' => {
                    self.pos += 1;
                    Token::Star
                }
                b'/' => {
                    self.pos += 1;
                    Token::Slash
                }
                b'(' => {
                    self.pos += 1;
                    Token::LParen
                }
                b')' => {
                    self.pos += 1;
                    Token::RParen
                }
                b',' => {
                    self.pos += 1;
                    Token::Comma
                }
                b'@' | b'$' => self.variable()?,
                b'#' => {
                    self.pos += 1;
                    let name = self.name();
                    if name.is_empty() {
                        return Err(EvalError::UnexpectedChar { ch: '#', offset });
                    }
                    Token::Hash(name.into())
                }
                b'"' | b'\'' => {
                    let (text, quote) = self.string()?;
                    Token::Str { text, quote }
                }
                b'~' if matches!(self.peek(1), Some(b'"' | b'\'')) => {
                    self.pos += 1;
                    let (text, _) = self.string()?;
                    Token::Escaped(text)
                }
                b'!' => {
                    self.pos += 1;
                    self.skip_whitespace();
                    let name = self.name();
                    if name.is_empty() {
                        return Err(EvalError::UnexpectedChar { ch: '!', offset });
                    }
                    Token::Ident(format!("!{name}").into())
                }
                b if is_name_start(b) => self.ident()?,
                _ => {
                    let ch = self.src[offset..].chars().next().unwrap_or('\0');
                    return Err(EvalError::UnexpectedChar { ch, offset });
                }
            };

            self.out.push(Lexeme {
                token,
                offset,
                space_before,
            });
        }
        Ok(self.out)
    }

    #[inline]
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek(0).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn previous_allows_operand(&self) -> bool {
        match self.out.last() {
            None => true,
            Some(last) => matches!(
                last.token,
                Token::LParen
                    | Token::Function(_)
                    | Token::Comma
                    | Token::Plus
                    | Token::Minus
                    | Token::Star
                    | Token::Slash
            ),
        }
    }

    fn minus(&mut self, space_before: bool) -> Token {
        let next = self.peek(1);
        let starts_number = next.is_some_and(|c| c.is_ascii_digit())
            || (next == Some(b'.') && self.peek(2).is_some_and(|c| c.is_ascii_digit()));

        // `-2px` right after an operator, or glued after a space (`1px -2px`)
        if starts_number && (self.previous_allows_operand() || space_before) {
            return self.number();
        }
        if next.is_some_and(|c| is_name_start(c) || c == b'-') {
            // vendor prefixes and negated keywords: `-webkit-box`
            if let Ok(token) = self.ident() {
                return token;
            }
        }
        self.pos += 1;
        Token::Minus
    }

    fn number(&mut self) -> Token {
        let start = self.pos;
        if self.peek(0) == Some(b'-') {
            self.pos += 1;
        }
        while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek(0) == Some(b'.') && self.peek(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let value = self.src[start..self.pos].parse::<f64>().unwrap_or(0.0);

        let unit_start = self.pos;
        if self.peek(0) == Some(b'%') {
            self.pos += 1;
        } else {
            while self.peek(0).is_some_and(|b| b.is_ascii_alphabetic()) {
                self.pos += 1;
            }
        }
        Token::Number {
            value,
            unit: self.src[unit_start..self.pos].into(),
        }
    }

    fn name(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek(0).is_some_and(is_name_char) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn ident(&mut self) -> Result<Token, EvalError> {
        let start = self.pos;
        while self.peek(0) == Some(b'-') {
            self.pos += 1;
        }
        self.name();
        let name = &self.src[start..self.pos];
        if name.is_empty() || name.bytes().all(|b| b == b'-') {
            self.pos = start;
            return Err(EvalError::UnexpectedChar { ch: '-', offset: start });
        }

        if self.peek(0) != Some(b'(') {
            return Ok(Token::Ident(name.into()));
        }
        self.pos += 1;

        if name.eq_ignore_ascii_case("url") {
            let body_start = self.pos;
            let mut depth = 1usize;
            while let Some(b) = self.peek(0) {
                self.pos += 1;
                match b {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            let body = &self.src[body_start..self.pos - 1];
                            return Ok(Token::Url(format!("url({})", body.trim()).into()));
                        }
                    }
                    _ => {}
                }
            }
            return Err(EvalError::UnterminatedString { offset: start });
        }

        Ok(Token::Function(name.into()))
    }

    fn variable(&mut self) -> Result<Token, EvalError> {
        let start = self.pos;
        self.pos += 1;
        let name = self.name();
        if name.is_empty() {
            let ch = self.bytes[start] as char;
            return Err(EvalError::UnexpectedChar { ch, offset: start });
        }
        Ok(Token::Variable(self.src[start..self.pos].into()))
    }

    fn string(&mut self) -> Result<(CompactString, char), EvalError> {
        let start = self.pos;
        let quote = self.bytes[start];
        self.pos += 1;
        let mut text = String::new();
        let mut chars = self.src[self.pos..].char_indices();
        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    text.push('\\');
                    text.push(escaped);
                }
                continue;
            }
            if c as u32 == quote as u32 {
                self.pos += i + 1;
                return Ok((text.into(), quote as char));
            }
            text.push(c);
        }
        Err(EvalError::UnterminatedString { offset: start })
    }
}

#[inline]
fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

#[inline]
fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|l| l.token)
            .collect()
    }

    fn num(value: f64, unit: &str) -> Token {
        Token::Number {
            value,
            unit: unit.into(),
        }
    }

    #[test]
    fn test_minus_disambiguation() {
        assert_eq!(
            kinds("10px - 9"),
            vec![num(10.0, "px"), Token::Minus, num(9.0, "")]
        );
        assert_eq!(kinds("1px -2px"), vec![num(1.0, "px"), num(-2.0, "px")]);
        assert_eq!(
            kinds("10px-9"),
            vec![num(10.0, "px"), Token::Minus, num(9.0, "")]
        );
        assert_eq!(kinds("-.5em"), vec![num(-0.5, "em")]);
        assert_eq!(kinds("-webkit-box"), vec![Token::Ident("-webkit-box".into())]);
    }

    #[test]
    fn test_functions_and_urls() {
        assert_eq!(
            kinds("darken(@c, 10%)"),
            vec![
                Token::Function("darken".into()),
                Token::Variable("@c".into()),
                Token::Comma,
                num(10.0, "%"),
                Token::RParen,
            ]
        );
        assert_eq!(
            kinds("url( a/b.png )"),
            vec![Token::Url("url(a/b.png)".into())]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#""Helvetica Neue", ~"calc(100% - 2px)""#),
            vec![
                Token::Str {
                    text: "Helvetica Neue".into(),
                    quote: '"',
                },
                Token::Comma,
                Token::Escaped("calc(100% - 2px)".into()),
            ]
        );
        assert!(matches!(
            tokenize("'open"),
            Err(EvalError::UnterminatedString { offset: 0 })
        ));
    }

    #[test]
    fn test_space_flags() {
        let lexemes = tokenize("#fc0 !important").unwrap();
        assert_eq!(lexemes[0].token, Token::Hash("fc0".into()));
        assert!(!lexemes[0].space_before);
        assert_eq!(lexemes[1].token, Token::Ident("!important".into()));
        assert!(lexemes[1].space_before);
    }

    #[test]
    fn test_rejects_stray_characters() {
        assert!(matches!(
            tokenize("1px ; 2px"),
            Err(EvalError::UnexpectedChar { ch: ';', offset: 4 })
        ));
        assert!(matches!(
            tokenize("@"),
            Err(EvalError::UnexpectedChar { ch: '@', offset: 0 })
        ));
    }
}
