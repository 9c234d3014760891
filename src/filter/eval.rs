//! Type checking and evaluation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use super::ast::{BinaryOp, Expr, Literal, Type, UnaryOp};
use super::error::{FilterError, FilterResult};
use super::schema::{FieldType, Schema};
use crate::models::timestamp;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Bool(bool),
    Str(String),
    Int(i64),
    Time(DateTime<Utc>),
    Map(BTreeMap<String, String>),
}

impl Val {
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Bool(_) => "bool",
            Val::Str(_) => "string",
            Val::Int(_) => "int",
            Val::Time(_) => "timestamp",
            Val::Map(_) => "map",
        }
    }
}

fn type_error(message: String) -> FilterError {
    FilterError::Type(message)
}

fn parse_timestamp(value: &str) -> FilterResult<DateTime<Utc>> {
    timestamp::parse(value).map_err(|source| FilterError::Timestamp {
        value: value.to_string(),
        source,
    })
}

/// Check `expr` against `schema`, returning the rewritten expression and its type.
///
/// String literals compared with timestamps become timestamp literals and
/// `matches` patterns are compiled here.
pub fn check(expr: Expr, schema: &Schema) -> FilterResult<(Expr, Type)> {
    match expr {
        Expr::Literal(literal) => {
            let ty = literal.ty();
            Ok((Expr::Literal(literal), ty))
        }

        Expr::Field(name) => match schema.get(&name) {
            Some(ty) => Ok((Expr::Field(name), ty.into())),
            None => Err(FilterError::UnknownField(name)),
        },

        Expr::Index(target, key) => {
            let (target, target_ty) = check(*target, schema)?;
            let (key, key_ty) = check(*key, schema)?;
            if target_ty != Type::Map || key_ty != Type::String {
                return Err(type_error(format!("cannot index {} with {}", target_ty, key_ty)));
            }
            Ok((Expr::Index(Box::new(target), Box::new(key)), Type::String))
        }

        Expr::Unary(UnaryOp::Not, operand) => {
            let (operand, ty) = check(*operand, schema)?;
            if ty != Type::Bool {
                return Err(type_error(format!("`!` needs a bool, found {}", ty)));
            }
            Ok((Expr::Unary(UnaryOp::Not, Box::new(operand)), Type::Bool))
        }

        Expr::Binary(op, lhs, rhs) => {
            let (lhs, lhs_ty) = check(*lhs, schema)?;
            let (rhs, rhs_ty) = check(*rhs, schema)?;
            check_binary(op, lhs, lhs_ty, rhs, rhs_ty)
        }

        Expr::Call {
            receiver,
            function,
            args,
        } => check_call(receiver, function, args, schema),

        Expr::Matches(receiver, pattern) => Ok((Expr::Matches(receiver, pattern), Type::Bool)),
    }
}

fn check_binary(op: BinaryOp, lhs: Expr, lhs_ty: Type, rhs: Expr, rhs_ty: Type) -> FilterResult<(Expr, Type)> {
    let binary = |lhs, rhs| Expr::Binary(op, Box::new(lhs), Box::new(rhs));

    match op {
        BinaryOp::And | BinaryOp::Or => {
            if lhs_ty != Type::Bool || rhs_ty != Type::Bool {
                return Err(type_error(format!("{:?} needs bool operands, found {} and {}", op, lhs_ty, rhs_ty)));
            }
            Ok((binary(lhs, rhs), Type::Bool))
        }
        BinaryOp::In => {
            if lhs_ty != Type::String || rhs_ty != Type::Map {
                return Err(type_error(format!("`in` needs a string and a map, found {} and {}", lhs_ty, rhs_ty)));
            }
            Ok((binary(lhs, rhs), Type::Bool))
        }
        _ => {
            let (lhs, lhs_ty) = coerce_to_timestamp(lhs, lhs_ty, rhs_ty)?;
            let (rhs, rhs_ty) = coerce_to_timestamp(rhs, rhs_ty, lhs_ty)?;
            if lhs_ty != rhs_ty {
                return Err(type_error(format!("cannot compare {} with {}", lhs_ty, rhs_ty)));
            }
            if lhs_ty == Type::Map || (op.is_ordering() && lhs_ty == Type::Bool) {
                return Err(type_error(format!("{:?} is not defined for {}", op, lhs_ty)));
            }
            Ok((binary(lhs, rhs), Type::Bool))
        }
    }
}

/// a string literal compared with a timestamp is read as a timestamp
fn coerce_to_timestamp(expr: Expr, ty: Type, other: Type) -> FilterResult<(Expr, Type)> {
    match expr {
        Expr::Literal(Literal::Str(s)) if other == Type::Timestamp => {
            Ok((Expr::Literal(Literal::Timestamp(parse_timestamp(&s)?)), Type::Timestamp))
        }
        expr => Ok((expr, ty)),
    }
}

fn check_call(
    receiver: Option<Box<Expr>>,
    function: String,
    args: Vec<Expr>,
    schema: &Schema,
) -> FilterResult<(Expr, Type)> {
    let [arg]: [Expr; 1] = args
        .try_into()
        .map_err(|args: Vec<Expr>| type_error(format!("{} takes one argument, found {}", function, args.len())))?;

    let Some(receiver) = receiver else {
        return match function.as_str() {
            "size" => {
                let (arg, ty) = check(arg, schema)?;
                if ty != Type::String && ty != Type::Map {
                    return Err(type_error(format!("size() needs a string or map, found {}", ty)));
                }
                Ok((call(None, function, arg), Type::Int))
            }
            "timestamp" => match arg {
                Expr::Literal(Literal::Str(s)) => Ok((
                    Expr::Literal(Literal::Timestamp(parse_timestamp(&s)?)),
                    Type::Timestamp,
                )),
                _ => Err(type_error("timestamp() needs a string literal".to_string())),
            },
            _ => Err(type_error(format!("unknown function {}()", function))),
        };
    };

    let (receiver, receiver_ty) = check(*receiver, schema)?;
    if receiver_ty != Type::String {
        return Err(type_error(format!(".{}() needs a string receiver, found {}", function, receiver_ty)));
    }

    match function.as_str() {
        "contains" | "startsWith" | "endsWith" => {
            let (arg, ty) = check(arg, schema)?;
            if ty != Type::String {
                return Err(type_error(format!(".{}() needs a string argument, found {}", function, ty)));
            }
            Ok((call(Some(receiver), function, arg), Type::Bool))
        }
        "matches" => match arg {
            Expr::Literal(Literal::Str(pattern)) => {
                Ok((Expr::Matches(Box::new(receiver), Regex::new(&pattern)?), Type::Bool))
            }
            _ => Err(type_error(".matches() needs a string literal pattern".to_string())),
        },
        _ => Err(type_error(format!("unknown method .{}()", function))),
    }
}

fn call(receiver: Option<Expr>, function: String, arg: Expr) -> Expr {
    Expr::Call {
        receiver: receiver.map(Box::new),
        function,
        args: vec![arg],
    }
}

/// the value of field `name` in a row, read as the declared type
///
/// absent fields read as the empty value of their type
fn field_value(name: &str, ty: FieldType, fields: &BTreeMap<String, Value>) -> FilterResult<Val> {
    let wrong = |expected| FilterError::FieldValue {
        field: name.to_string(),
        expected,
    };

    let value = match fields.get(name) {
        None | Some(Value::Null) => {
            return Ok(match ty {
                FieldType::String => Val::Str(String::new()),
                FieldType::Int => Val::Int(0),
                FieldType::Timestamp => Val::Time(DateTime::<Utc>::default()),
                FieldType::StringMap => Val::Map(BTreeMap::new()),
            })
        }
        Some(value) => value,
    };

    match ty {
        FieldType::String => value.as_str().map(|s| Val::Str(s.to_string())).ok_or_else(|| wrong("string")),
        FieldType::Int => value.as_i64().map(Val::Int).ok_or_else(|| wrong("int")),
        FieldType::Timestamp => {
            let s = value.as_str().ok_or_else(|| wrong("timestamp"))?;
            parse_timestamp(s).map(Val::Time)
        }
        FieldType::StringMap => {
            let object = value.as_object().ok_or_else(|| wrong("map"))?;
            object
                .iter()
                .map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())).ok_or_else(|| wrong("map")))
                .collect::<FilterResult<BTreeMap<_, _>>>()
                .map(Val::Map)
        }
    }
}

/// Evaluate a checked expression against the fields of one row.
pub fn evaluate(expr: &Expr, schema: &Schema, fields: &BTreeMap<String, Value>) -> FilterResult<Val> {
    match expr {
        Expr::Literal(literal) => Ok(match literal {
            Literal::Str(s) => Val::Str(s.clone()),
            Literal::Int(n) => Val::Int(*n),
            Literal::Bool(b) => Val::Bool(*b),
            Literal::Timestamp(t) => Val::Time(*t),
        }),

        Expr::Field(name) => {
            let ty = schema.get(name).ok_or_else(|| FilterError::UnknownField(name.clone()))?;
            field_value(name, ty, fields)
        }

        Expr::Index(target, key) => match (evaluate(target, schema, fields)?, evaluate(key, schema, fields)?) {
            (Val::Map(map), Val::Str(key)) => Ok(Val::Str(map.get(&key).cloned().unwrap_or_default())),
            (t, k) => Err(type_error(format!("cannot index {} with {}", t.type_name(), k.type_name()))),
        },

        Expr::Unary(UnaryOp::Not, operand) => Ok(Val::Bool(!as_bool(evaluate(operand, schema, fields)?)?)),

        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            if !as_bool(evaluate(lhs, schema, fields)?)? {
                return Ok(Val::Bool(false));
            }
            Ok(Val::Bool(as_bool(evaluate(rhs, schema, fields)?)?))
        }

        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            if as_bool(evaluate(lhs, schema, fields)?)? {
                return Ok(Val::Bool(true));
            }
            Ok(Val::Bool(as_bool(evaluate(rhs, schema, fields)?)?))
        }

        Expr::Binary(BinaryOp::In, lhs, rhs) => match (evaluate(lhs, schema, fields)?, evaluate(rhs, schema, fields)?) {
            (Val::Str(key), Val::Map(map)) => Ok(Val::Bool(map.contains_key(&key))),
            (k, m) => Err(type_error(format!("cannot test {} in {}", k.type_name(), m.type_name()))),
        },

        Expr::Binary(op, lhs, rhs) => {
            let lhs = evaluate(lhs, schema, fields)?;
            let rhs = evaluate(rhs, schema, fields)?;
            let ordering = compare(&lhs, &rhs)?;
            let result = match op {
                BinaryOp::Eq => ordering == Ordering::Equal,
                BinaryOp::Ne => ordering != Ordering::Equal,
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Ge => ordering != Ordering::Less,
                BinaryOp::And | BinaryOp::Or | BinaryOp::In => {
                    return Err(type_error(format!("{:?} is not a comparison", op)))
                }
            };
            Ok(Val::Bool(result))
        }

        Expr::Call {
            receiver,
            function,
            args,
        } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, schema, fields))
                .collect::<FilterResult<Vec<_>>>()?;
            let receiver = receiver
                .as_ref()
                .map(|r| evaluate(r, schema, fields))
                .transpose()?;
            eval_call(receiver, function, args)
        }

        Expr::Matches(receiver, pattern) => match evaluate(receiver, schema, fields)? {
            Val::Str(s) => Ok(Val::Bool(pattern.is_match(&s))),
            other => Err(type_error(format!(".matches() on {}", other.type_name()))),
        },
    }
}

fn eval_call(receiver: Option<Val>, function: &str, args: Vec<Val>) -> FilterResult<Val> {
    match (receiver, function, args.as_slice()) {
        (None, "size", [Val::Str(s)]) => Ok(Val::Int(s.chars().count() as i64)),
        (None, "size", [Val::Map(m)]) => Ok(Val::Int(m.len() as i64)),
        (Some(Val::Str(s)), "contains", [Val::Str(arg)]) => Ok(Val::Bool(s.contains(arg.as_str()))),
        (Some(Val::Str(s)), "startsWith", [Val::Str(arg)]) => Ok(Val::Bool(s.starts_with(arg.as_str()))),
        (Some(Val::Str(s)), "endsWith", [Val::Str(arg)]) => Ok(Val::Bool(s.ends_with(arg.as_str()))),
        _ => Err(type_error(format!("cannot call {} with these arguments", function))),
    }
}

pub fn as_bool(value: Val) -> FilterResult<bool> {
    match value {
        Val::Bool(b) => Ok(b),
        other => Err(FilterError::NotBoolean(other.type_name())),
    }
}

fn compare(lhs: &Val, rhs: &Val) -> FilterResult<Ordering> {
    match (lhs, rhs) {
        (Val::Str(a), Val::Str(b)) => Ok(a.cmp(b)),
        (Val::Int(a), Val::Int(b)) => Ok(a.cmp(b)),
        (Val::Time(a), Val::Time(b)) => Ok(a.cmp(b)),
        (Val::Bool(a), Val::Bool(b)) => Ok(a.cmp(b)),
        (a, b) => Err(type_error(format!("cannot compare {} with {}", a.type_name(), b.type_name()))),
    }
}
