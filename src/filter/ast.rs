use std::fmt;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::schema::FieldType;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `key in map`
    In,
}

impl BinaryOp {
    pub fn is_ordering(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Field(String),
    /// `map["key"]`
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `f(args)` or `receiver.f(args)`
    Call {
        receiver: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    /// `s.matches(pattern)` with the pattern compiled during type checking
    Matches(Box<Expr>, Regex),
}

/// Static type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Bool,
    String,
    Int,
    Timestamp,
    Map,
}

impl From<FieldType> for Type {
    fn from(ty: FieldType) -> Self {
        match ty {
            FieldType::String => Type::String,
            FieldType::Int => Type::Int,
            FieldType::Timestamp => Type::Timestamp,
            FieldType::StringMap => Type::Map,
        }
    }
}

impl Literal {
    pub fn ty(&self) -> Type {
        match self {
            Literal::Str(_) => Type::String,
            Literal::Int(_) => Type::Int,
            Literal::Bool(_) => Type::Bool,
            Literal::Timestamp(_) => Type::Timestamp,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Bool => "bool",
            Type::String => "string",
            Type::Int => "int",
            Type::Timestamp => "timestamp",
            Type::Map => "map",
        };
        f.write_str(name)
    }
}
