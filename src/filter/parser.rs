//! Filter parser.
//!
//! Lexes with the `sqlparser` tokenizer, maps its tokens onto the filter
//! vocabulary and parses them with precedence climbing.

use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use super::ast::{BinaryOp, Expr, Literal, UnaryOp};
use super::error::{FilterError, FilterResult};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    True,
    False,
    And,
    Or,
    Not,
    In,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Minus,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
}

// binding power of unary `!`
const PREFIX_BP: u8 = 7;

impl Tok {
    /// left and right binding power of an infix operator
    fn infix(&self) -> Option<(BinaryOp, u8, u8)> {
        let op = match self {
            Tok::Or => return Some((BinaryOp::Or, 1, 2)),
            Tok::And => return Some((BinaryOp::And, 3, 4)),
            Tok::Eq => BinaryOp::Eq,
            Tok::Ne => BinaryOp::Ne,
            Tok::Lt => BinaryOp::Lt,
            Tok::Le => BinaryOp::Le,
            Tok::Gt => BinaryOp::Gt,
            Tok::Ge => BinaryOp::Ge,
            Tok::In => BinaryOp::In,
            _ => return None,
        };
        Some((op, 5, 6))
    }
}

fn lex(source: &str) -> FilterResult<Vec<Tok>> {
    let tokens = Tokenizer::new(&GenericDialect {}, source)
        .tokenize()
        .map_err(|e| FilterError::Syntax(e.to_string()))?;

    let mut out = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        let tok = match token {
            Token::Whitespace(_) | Token::EOF => continue,
            Token::Word(word) => match word.quote_style {
                Some('"') => Tok::Str(word.value),
                Some(_) => Tok::Ident(word.value),
                None => match word.value.to_ascii_uppercase().as_str() {
                    "AND" => Tok::And,
                    "OR" => Tok::Or,
                    "NOT" => Tok::Not,
                    "IN" => Tok::In,
                    "TRUE" => Tok::True,
                    "FALSE" => Tok::False,
                    _ => Tok::Ident(word.value),
                },
            },
            Token::SingleQuotedString(s) | Token::DoubleQuotedString(s) => Tok::Str(s),
            Token::Number(n, _) => Tok::Int(
                n.parse()
                    .map_err(|_| FilterError::Syntax(format!("invalid integer {}", n)))?,
            ),
            Token::DoubleEq | Token::Eq => Tok::Eq,
            Token::Neq => Tok::Ne,
            Token::Lt => Tok::Lt,
            Token::LtEq => Tok::Le,
            Token::Gt => Tok::Gt,
            Token::GtEq => Tok::Ge,
            Token::Overlap => Tok::And,
            Token::StringConcat => Tok::Or,
            Token::Ampersand => {
                if tokens.next_if_eq(&Token::Ampersand).is_none() {
                    return Err(FilterError::Syntax("expected `&&`".to_string()));
                }
                Tok::And
            }
            Token::Pipe => {
                if tokens.next_if_eq(&Token::Pipe).is_none() {
                    return Err(FilterError::Syntax("expected `||`".to_string()));
                }
                Tok::Or
            }
            Token::ExclamationMark => Tok::Not,
            Token::DoubleExclamationMark => {
                out.push(Tok::Not);
                Tok::Not
            }
            Token::Minus => Tok::Minus,
            Token::LParen => Tok::LParen,
            Token::RParen => Tok::RParen,
            Token::LBracket => Tok::LBracket,
            Token::RBracket => Tok::RBracket,
            Token::Period => Tok::Dot,
            Token::Comma => Tok::Comma,
            other => return Err(FilterError::Syntax(format!("unexpected `{}`", other))),
        };
        out.push(tok);
    }
    Ok(out)
}

/// Filter expression parser.
pub struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    /// Parse a filter; `None` for a blank filter.
    pub fn parse(source: &str) -> FilterResult<Option<Expr>> {
        let tokens = lex(source)?;
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr(0)?;
        if let Some(tok) = parser.peek() {
            return Err(FilterError::Syntax(format!("unexpected {:?} after expression", tok)));
        }
        Ok(Some(expr))
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Tok) -> FilterResult<()> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(FilterError::Syntax(format!("expected {:?}, found {:?}", expected, tok))),
            None => Err(FilterError::Syntax(format!("expected {:?} at end of filter", expected))),
        }
    }

    fn expr(&mut self, min_bp: u8) -> FilterResult<Expr> {
        let mut lhs = self.prefix()?;

        loop {
            match self.peek() {
                Some(Tok::Dot) => {
                    self.advance();
                    let function = match self.advance() {
                        Some(Tok::Ident(name)) => name,
                        other => return Err(FilterError::Syntax(format!("expected method name, found {:?}", other))),
                    };
                    self.expect(Tok::LParen)?;
                    let args = self.args()?;
                    lhs = Expr::Call {
                        receiver: Some(Box::new(lhs)),
                        function,
                        args,
                    };
                    continue;
                }
                Some(Tok::LBracket) => {
                    self.advance();
                    let key = self.expr(0)?;
                    self.expect(Tok::RBracket)?;
                    lhs = Expr::Index(Box::new(lhs), Box::new(key));
                    continue;
                }
                _ => {}
            }

            let Some((op, left_bp, right_bp)) = self.peek().and_then(Tok::infix) else {
                break;
            };
            if left_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.expr(right_bp)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn prefix(&mut self) -> FilterResult<Expr> {
        match self.advance() {
            Some(Tok::Not) => Ok(Expr::Unary(UnaryOp::Not, Box::new(self.expr(PREFIX_BP)?))),
            Some(Tok::Minus) => match self.advance() {
                Some(Tok::Int(n)) => Ok(Expr::Literal(Literal::Int(-n))),
                other => Err(FilterError::Syntax(format!("expected a number after `-`, found {:?}", other))),
            },
            Some(Tok::LParen) => {
                let inner = self.expr(0)?;
                self.expect(Tok::RParen)?;
                Ok(inner)
            }
            Some(Tok::Int(n)) => Ok(Expr::Literal(Literal::Int(n))),
            Some(Tok::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Tok::True) => Ok(Expr::Literal(Literal::Bool(true))),
            Some(Tok::False) => Ok(Expr::Literal(Literal::Bool(false))),
            Some(Tok::Ident(name)) => {
                if self.peek() == Some(&Tok::LParen) {
                    self.advance();
                    let args = self.args()?;
                    Ok(Expr::Call {
                        receiver: None,
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Field(name))
                }
            }
            Some(tok) => Err(FilterError::Syntax(format!("unexpected {:?}", tok))),
            None => Err(FilterError::Syntax("unexpected end of filter".to_string())),
        }
    }

    /// arguments after an opening parenthesis, through the closing one
    fn args(&mut self) -> FilterResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek() == Some(&Tok::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expr(0)?);
            match self.advance() {
                Some(Tok::Comma) => continue,
                Some(Tok::RParen) => return Ok(args),
                other => return Err(FilterError::Syntax(format!("expected `,` or `)`, found {:?}", other))),
            }
        }
    }
}
