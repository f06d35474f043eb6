//! Recursive-descent parser from tokens to [`Expr`].
//!
//! Precedence, loosest first: comma list, space list, `+ -`, `* /`, unary
//! minus, primary.

use nuance_trousse::CompactString;

use crate::{
    lexer::{tokenize, Lexeme, Token},
    Color, EvalError, Number, Separator,
};

/// Deepest operand nesting accepted, counting parentheses, calls, unary
/// signs and chained binary operators
pub(crate) const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    #[inline]
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Number(Number),
    Color(Color),
    Keyword(CompactString),
    Quoted {
        text: CompactString,
        quote: char,
    },
    Variable(CompactString),
    Call {
        name: CompactString,
        args: Vec<Expr>,
    },
    Paren(Box<Expr>),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    List(Vec<Expr>, Separator),
}

impl Expr {
    /// A literal operand: not a variable, call or parenthesized group
    pub fn is_plain(&self) -> bool {
        match self {
            Self::Variable(_) | Self::Call { .. } | Self::Paren(_) => false,
            Self::Negate(inner) => inner.is_plain(),
            _ => true,
        }
    }

    /// Whether `+`, `-` or `*` appear outside of nested lists
    pub fn uses_arithmetic(&self) -> bool {
        match self {
            Self::Binary { op, lhs, rhs } => {
                *op != BinaryOp::Div || lhs.uses_arithmetic() || rhs.uses_arithmetic()
            }
            Self::Negate(inner) => !matches!(**inner, Self::Number(_)) || inner.uses_arithmetic(),
            _ => false,
        }
    }
}

pub(crate) fn parse(input: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
        depth: 0,
    };
    let expr = parser.comma_list()?;
    if let Some(extra) = parser.peek() {
        return Err(EvalError::UnexpectedToken {
            offset: extra.offset,
            expected: "end of expression",
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Lexeme>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    #[inline]
    fn peek(&self) -> Option<&Lexeme> {
        self.tokens.get(self.pos)
    }

    #[inline]
    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|l| &l.token)
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end, |l| l.offset)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_token() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), EvalError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(EvalError::UnexpectedToken {
                offset: self.offset(),
                expected,
            })
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(EvalError::TooDeep(MAX_NESTING));
        }
        Ok(())
    }

    fn comma_list(&mut self) -> Result<Expr, EvalError> {
        let first = self.space_list()?;
        if self.peek_token() != Some(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            items.push(self.space_list()?);
        }
        Ok(Expr::List(items, Separator::Comma))
    }

    fn space_list(&mut self) -> Result<Expr, EvalError> {
        let first = self.additive()?;
        let mut items = Vec::new();
        while self.starts_operand() {
            if items.is_empty() {
                items.push(first.clone());
            }
            items.push(self.additive()?);
        }
        if items.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::List(items, Separator::Space))
        }
    }

    fn starts_operand(&self) -> bool {
        !matches!(
            self.peek_token(),
            None | Some(
                Token::Comma
                    | Token::RParen
                    | Token::Plus
                    | Token::Minus
                    | Token::Star
                    | Token::Slash
            )
        )
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        let base = self.depth;
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => {
                    self.depth = base;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            // each operator deepens the left-leaning tree
            self.descend()?;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, EvalError> {
        let base = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => {
                    self.depth = base;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        self.descend()?;
        let expr = if self.eat(&Token::Minus) {
            self.unary().map(|inner| Expr::Negate(Box::new(inner)))
        } else if self.eat(&Token::Plus) {
            self.unary()
        } else {
            self.primary()
        };
        self.depth -= 1;
        expr
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let offset = self.offset();
        let Some(lexeme) = self.tokens.get(self.pos) else {
            return Err(EvalError::UnexpectedToken {
                offset,
                expected: "a value",
            });
        };
        let token = lexeme.token.clone();
        self.pos += 1;

        let expr = match token {
            Token::Number { value, unit } => Expr::Number(Number { value, unit }),
            Token::Hash(name) => match Color::from_hex(&name) {
                Some(color) => Expr::Color(color),
                None => Expr::Keyword(format!("#{name}").into()),
            },
            Token::Ident(name) | Token::Escaped(name) | Token::Url(name) => Expr::Keyword(name),
            Token::Variable(name) => Expr::Variable(name),
            Token::Str { text, quote } => Expr::Quoted { text, quote },
            Token::Function(name) => {
                let args = self.arguments()?;
                Expr::Call { name, args }
            }
            Token::LParen => {
                let inner = self.comma_list()?;
                self.expect(&Token::RParen, "')'")?;
                Expr::Paren(Box::new(inner))
            }
            Token::RParen | Token::Comma | Token::Plus | Token::Minus | Token::Star | Token::Slash => {
                return Err(EvalError::UnexpectedToken {
                    offset,
                    expected: "a value",
                });
            }
        };
        Ok(expr)
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.space_list()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(expr: &Expr) -> String {
        match expr {
            Expr::Number(n) => n.to_string(),
            Expr::Color(c) => c.to_string(),
            Expr::Keyword(k) => k.to_string(),
            Expr::Quoted { text, quote } => format!("{quote}{text}{quote}"),
            Expr::Variable(v) => v.to_string(),
            Expr::Call { name, args } => format!(
                "{name}({})",
                args.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            Expr::Paren(inner) => format!("({})", shape(inner)),
            Expr::Negate(inner) => format!("neg {}", shape(inner)),
            Expr::Binary { op, lhs, rhs } => {
                format!("[{} {} {}]", shape(lhs), op.symbol(), shape(rhs))
            }
            Expr::List(items, sep) => format!(
                "<{}>",
                items.iter().map(shape).collect::<Vec<_>>().join(sep.as_str())
            ),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse("@a + 2 * 3px - 1").unwrap();
        insta::assert_snapshot!(shape(&expr), @"[[@a + [2 * 3px]] - 1]");
    }

    #[test]
    fn test_lists() {
        let expr = parse("1px solid #fc0, 0 0 2px red").unwrap();
        insta::assert_snapshot!(shape(&expr), @"<<1px solid #ffcc00>, <0 0 2px red>>");
    }

    #[test]
    fn test_calls_and_parens() {
        let expr = parse("fade(@c, 50%) (10px / 2)").unwrap();
        insta::assert_snapshot!(shape(&expr), @"<fade(@c, 50%) ([10px / 2])>");
        assert_eq!(
            parse("mix()").unwrap(),
            Expr::Call {
                name: "mix".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_invalid_hash_is_keyword() {
        assert_eq!(parse("#zzz").unwrap(), Expr::Keyword("#zzz".into()));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("   "), Err(EvalError::Empty));
        assert_eq!(
            parse("(1 + 2"),
            Err(EvalError::UnexpectedToken {
                offset: 6,
                expected: "')'"
            })
        );
        assert_eq!(
            parse("1 +"),
            Err(EvalError::UnexpectedToken {
                offset: 3,
                expected: "a value"
            })
        );
        assert_eq!(
            parse("a, )"),
            Err(EvalError::UnexpectedToken {
                offset: 3,
                expected: "a value"
            })
        );
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1px{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(parse(&deep), Err(EvalError::TooDeep(MAX_NESTING)));

        let chain = vec!["1px"; 10_000].join(" + ");
        assert_eq!(parse(&chain), Err(EvalError::TooDeep(MAX_NESTING)));
        assert_eq!(parse(&"-".repeat(1_000)), Err(EvalError::TooDeep(MAX_NESTING)));

        let nested = format!("{}1px{}", "(".repeat(50), ")".repeat(50));
        assert!(parse(&nested).is_ok());
        assert!(parse(&vec!["1px"; 50].join(" + ")).is_ok());
    }

    #[test]
    fn test_plain_operands() {
        let Expr::Binary { lhs, rhs, .. } = parse("14px/@lh").unwrap() else {
            panic!("expected a division");
        };
        assert!(lhs.is_plain());
        assert!(!rhs.is_plain());
        assert!(!parse("14px/20px").unwrap().uses_arithmetic());
        assert!(parse("14px/20px + 1").unwrap().uses_arithmetic());
    }
}
