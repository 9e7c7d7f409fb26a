//! A small expression language for computing new identifiers from old ones.
//!
//! The old value is bound to `x` (always a string). Supported syntax:
//!
//! ```text
//! "id_" + x            x.upper()           int(x) + 1000
//! x[:3]                x.replace("-", "")  round(float(x) * 100, 2)
//! ```

use std::fmt;

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::data::model::format_number;
use crate::error::AppError;

#[derive(Parser)]
#[grammar = "remap/expr.pest"]
struct MappingParser;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Result of evaluating (part of) an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{}", format_number(*v)),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
        }
    }
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
        }
    }

    fn as_num(&self) -> Option<Num> {
        match self {
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(v) => Some(Num::Float(*v)),
            Value::Bool(b) => Some(Num::Int(*b as i64)),
            Value::Str(_) => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self.as_num()? {
            Num::Int(i) => Some(i),
            Num::Float(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn to_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(v) => v,
        }
    }
}

// ---------------------------------------------------------------------------
// Syntax tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Var,
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Method(Box<Expr>, String, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
}

/// A compiled mapping expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse an expression once; evaluate it for every value afterwards.
    pub fn parse(source: &str) -> Result<Self, AppError> {
        let mut pairs = MappingParser::parse(Rule::mapping, source)
            .map_err(|e| AppError::ExpressionSyntax(e.to_string()))?;
        let mapping = next(&mut pairs)?;
        let root = build(next(&mut mapping.into_inner())?)?;
        Ok(Expression {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with `x` bound to `value`.
    pub fn evaluate(&self, value: &str) -> Result<Value, AppError> {
        eval(&self.root, value)
    }
}

fn next<'i>(pairs: &mut Pairs<'i, Rule>) -> Result<Pair<'i, Rule>, AppError> {
    pairs
        .next()
        .ok_or_else(|| AppError::ExpressionSyntax("incomplete expression".into()))
}

fn build(pair: Pair<Rule>) -> Result<Expr, AppError> {
    match pair.as_rule() {
        Rule::sum | Rule::product => {
            let mut inner = pair.into_inner();
            let mut lhs = build(next(&mut inner)?)?;
            while let Some(op) = inner.next() {
                let op = match op.as_str() {
                    "+" => BinOp::Add,
                    "-" => BinOp::Sub,
                    "*" => BinOp::Mul,
                    "/" => BinOp::Div,
                    _ => BinOp::Rem,
                };
                let rhs = build(next(&mut inner)?)?;
                lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
            }
            Ok(lhs)
        }
        Rule::unary => {
            let mut negations = 0;
            let mut operand = None;
            for p in pair.into_inner() {
                match p.as_rule() {
                    Rule::neg => negations += 1,
                    _ => operand = Some(build(p)?),
                }
            }
            let mut expr =
                operand.ok_or_else(|| AppError::ExpressionSyntax("missing operand".into()))?;
            for _ in 0..negations {
                expr = Expr::Neg(Box::new(expr));
            }
            Ok(expr)
        }
        Rule::postfix => {
            let mut inner = pair.into_inner();
            let mut expr = build(next(&mut inner)?)?;
            for suffix in inner {
                expr = match suffix.as_rule() {
                    Rule::method => {
                        let mut parts = suffix.into_inner();
                        let name = next(&mut parts)?.as_str().to_string();
                        let args = build_args(next(&mut parts)?)?;
                        Expr::Method(Box::new(expr), name, args)
                    }
                    Rule::index => {
                        let index = build(next(&mut suffix.into_inner())?)?;
                        Expr::Index(Box::new(expr), Box::new(index))
                    }
                    _ => {
                        let (mut lower, mut upper) = (None, None);
                        for bound in suffix.into_inner() {
                            let rule = bound.as_rule();
                            let value = Box::new(build(next(&mut bound.into_inner())?)?);
                            if rule == Rule::lower {
                                lower = Some(value);
                            } else {
                                upper = Some(value);
                            }
                        }
                        Expr::Slice(Box::new(expr), lower, upper)
                    }
                };
            }
            Ok(expr)
        }
        Rule::call => {
            let mut parts = pair.into_inner();
            let name = next(&mut parts)?.as_str().to_string();
            let args = build_args(next(&mut parts)?)?;
            Ok(Expr::Call(name, args))
        }
        Rule::ident => match pair.as_str() {
            "x" => Ok(Expr::Var),
            "True" => Ok(Expr::Literal(Value::Bool(true))),
            "False" => Ok(Expr::Literal(Value::Bool(false))),
            other => Err(AppError::ExpressionSyntax(format!(
                "unknown name '{other}' (the old value is called x)"
            ))),
        },
        Rule::number => {
            let text = pair.as_str();
            let value = match text.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Float(text.parse::<f64>().map_err(|_| {
                    AppError::ExpressionSyntax(format!("invalid number {text}"))
                })?),
            };
            Ok(Expr::Literal(value))
        }
        Rule::string => {
            let body = next(&mut pair.into_inner())?;
            Ok(Expr::Literal(Value::Str(unescape(body.as_str()))))
        }
        other => Err(AppError::ExpressionSyntax(format!(
            "unexpected {other:?} in expression"
        ))),
    }
}

fn build_args(pair: Pair<Rule>) -> Result<Vec<Expr>, AppError> {
    pair.into_inner().map(build).collect()
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn eval_error(msg: impl Into<String>) -> AppError {
    AppError::ExpressionEval(msg.into())
}

fn eval(expr: &Expr, x: &str) -> Result<Value, AppError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var => Ok(Value::Str(x.to_string())),
        Expr::Neg(inner) => match eval(inner, x)?.as_num() {
            Some(Num::Int(i)) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| eval_error("integer overflow in unary -")),
            Some(Num::Float(v)) => Ok(Value::Float(-v)),
            None => Err(eval_error("bad operand type for unary -: 'str'")),
        },
        Expr::Binary(op, lhs, rhs) => binary(*op, eval(lhs, x)?, eval(rhs, x)?),
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|a| eval(a, x))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, &args)
        }
        Expr::Method(target, name, args) => {
            let target = match eval(target, x)? {
                Value::Str(s) => s,
                other => {
                    return Err(eval_error(format!(
                        "'{}' object has no attribute '{name}'",
                        other.type_name()
                    )))
                }
            };
            let args = args
                .iter()
                .map(|a| eval(a, x))
                .collect::<Result<Vec<_>, _>>()?;
            method(&target, name, &args)
        }
        Expr::Index(target, index) => {
            let s = expect_str(eval(target, x)?, "indexing")?;
            let i = eval(index, x)?
                .as_int()
                .ok_or_else(|| eval_error("string indices must be integers"))?;
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let pos = if i < 0 { i + len } else { i };
            if pos < 0 || pos >= len {
                return Err(eval_error("string index out of range"));
            }
            Ok(Value::Str(chars[pos as usize].to_string()))
        }
        Expr::Slice(target, lower, upper) => {
            let s = expect_str(eval(target, x)?, "slicing")?;
            let bound = |b: &Option<Box<Expr>>| -> Result<Option<i64>, AppError> {
                match b {
                    None => Ok(None),
                    Some(e) => eval(e, x)?
                        .as_int()
                        .map(Some)
                        .ok_or_else(|| eval_error("slice indices must be integers")),
                }
            };
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), bound(lower)?, bound(upper)?);
            Ok(Value::Str(chars[start..end].iter().collect()))
        }
    }
}

fn expect_str(value: Value, what: &str) -> Result<String, AppError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(eval_error(format!(
            "'{}' object does not support {what}",
            other.type_name()
        ))),
    }
}

/// Clamp slice bounds the way sequence slicing does; negative bounds count
/// from the end.
fn slice_bounds(len: usize, lower: Option<i64>, upper: Option<i64>) -> (usize, usize) {
    let len_i = len as i64;
    let clamp = |b: i64| -> usize {
        let b = if b < 0 { b + len_i } else { b };
        b.clamp(0, len_i) as usize
    };
    let start = lower.map(clamp).unwrap_or(0);
    let end = upper.map(clamp).unwrap_or(len);
    (start, end.max(start))
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, AppError> {
    let unsupported = |l: &Value, r: &Value| {
        eval_error(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op.symbol(),
            l.type_name(),
            r.type_name()
        ))
    };

    match (&lhs, &rhs) {
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => return Ok(Value::Str(format!("{a}{b}"))),
        (Value::Str(s), other) | (other, Value::Str(s)) if op == BinOp::Mul => {
            if let Some(n) = other.as_int() {
                return Ok(Value::Str(s.repeat(n.max(0) as usize)));
            }
            return Err(unsupported(&lhs, &rhs));
        }
        _ => {}
    }

    let (a, b) = match (lhs.as_num(), rhs.as_num()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported(&lhs, &rhs)),
    };

    if let (Num::Int(a), Num::Int(b)) = (a, b) {
        let exact = match op {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            BinOp::Rem if b == 0 => return Err(eval_error("integer modulo by zero")),
            BinOp::Rem => {
                let r = a
                    .checked_rem_euclid(b)
                    .ok_or_else(|| eval_error("integer overflow in %"))?;
                Some(if b < 0 && r != 0 { r + b } else { r })
            }
            BinOp::Div => None,
        };
        if let Some(v) = exact {
            return Ok(Value::Int(v));
        }
    }

    let (a, b) = (a.to_f64(), b.to_f64());
    let v = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div if b == 0.0 => return Err(eval_error("division by zero")),
        BinOp::Div => a / b,
        BinOp::Rem if b == 0.0 => return Err(eval_error("float modulo")),
        BinOp::Rem => a - b * (a / b).floor(),
    };
    Ok(Value::Float(v))
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), AppError> {
    if args.len() < min || args.len() > max {
        return Err(eval_error(format!(
            "{name}() takes {} argument(s) but {} were given",
            if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            },
            args.len()
        )));
    }
    Ok(())
}

fn call(name: &str, args: &[Value]) -> Result<Value, AppError> {
    match name {
        "int" => {
            arity(name, args, 1, 1)?;
            match &args[0] {
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    eval_error(format!("invalid literal for int() with base 10: '{s}'"))
                }),
                Value::Float(v) if !v.is_finite() => {
                    Err(eval_error(format!("cannot convert float {v} to integer")))
                }
                Value::Float(v) => Ok(Value::Int(v.trunc() as i64)),
                other => Ok(Value::Int(other.as_int().unwrap_or_default())),
            }
        }
        "float" => {
            arity(name, args, 1, 1)?;
            match &args[0] {
                Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    eval_error(format!("could not convert string to float: '{s}'"))
                }),
                other => Ok(Value::Float(other.as_num().map(Num::to_f64).unwrap_or_default())),
            }
        }
        "str" => {
            arity(name, args, 1, 1)?;
            Ok(Value::Str(args[0].to_string()))
        }
        "len" => {
            arity(name, args, 1, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(eval_error(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                ))),
            }
        }
        "abs" => {
            arity(name, args, 1, 1)?;
            match args[0].as_num() {
                Some(Num::Int(i)) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| eval_error("integer overflow in abs()")),
                Some(Num::Float(v)) => Ok(Value::Float(v.abs())),
                None => Err(eval_error("bad operand type for abs(): 'str'")),
            }
        }
        "round" => {
            arity(name, args, 1, 2)?;
            let value = args[0]
                .as_num()
                .ok_or_else(|| eval_error("type str doesn't define __round__ method"))?;
            match args.get(1) {
                None => match value {
                    Num::Int(i) => Ok(Value::Int(i)),
                    Num::Float(v) => Ok(Value::Int(v.round_ties_even() as i64)),
                },
                Some(digits) => {
                    let digits = digits
                        .as_int()
                        .ok_or_else(|| eval_error("round() digits must be an integer"))?;
                    match value {
                        Num::Int(i) if digits >= 0 => Ok(Value::Int(i)),
                        other => {
                            let scale = 10f64.powi(digits as i32);
                            Ok(Value::Float((other.to_f64() * scale).round_ties_even() / scale))
                        }
                    }
                }
            }
        }
        other => Err(eval_error(format!("unknown function {other}()"))),
    }
}

fn str_arg<'a>(name: &str, args: &'a [Value], i: usize) -> Result<&'a str, AppError> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(eval_error(format!(
            "{name}() argument {} must be str, not {}",
            i + 1,
            other.type_name()
        ))),
        None => Err(eval_error(format!("{name}() is missing argument {}", i + 1))),
    }
}

fn method(target: &str, name: &str, args: &[Value]) -> Result<Value, AppError> {
    let strip_set = |args: &[Value]| -> Result<Option<Vec<char>>, AppError> {
        arity(name, args, 0, 1)?;
        Ok(match args.first() {
            None => None,
            Some(_) => Some(str_arg(name, args, 0)?.chars().collect()),
        })
    };
    let stripped = |set: Option<Vec<char>>, left: bool, right: bool| -> String {
        let matcher = |c: char| match &set {
            Some(set) => set.contains(&c),
            None => c.is_whitespace(),
        };
        let mut s = target;
        if left {
            s = s.trim_start_matches(matcher);
        }
        if right {
            s = s.trim_end_matches(matcher);
        }
        s.to_string()
    };

    let result = match name {
        "upper" => {
            arity(name, args, 0, 0)?;
            target.to_uppercase()
        }
        "lower" => {
            arity(name, args, 0, 0)?;
            target.to_lowercase()
        }
        "strip" => stripped(strip_set(args)?, true, true),
        "lstrip" => stripped(strip_set(args)?, true, false),
        "rstrip" => stripped(strip_set(args)?, false, true),
        "title" => {
            arity(name, args, 0, 0)?;
            title_case(target)
        }
        "replace" => {
            arity(name, args, 2, 2)?;
            target.replace(str_arg(name, args, 0)?, str_arg(name, args, 1)?)
        }
        "zfill" => {
            arity(name, args, 1, 1)?;
            let width = args[0]
                .as_int()
                .ok_or_else(|| eval_error("zfill() width must be an integer"))?;
            zfill(target, width.max(0) as usize)
        }
        "startswith" => {
            arity(name, args, 1, 1)?;
            return Ok(Value::Bool(target.starts_with(str_arg(name, args, 0)?)));
        }
        "endswith" => {
            arity(name, args, 1, 1)?;
            return Ok(Value::Bool(target.ends_with(str_arg(name, args, 0)?)));
        }
        other => return Err(eval_error(format!("'str' object has no attribute '{other}'"))),
    };
    Ok(Value::Str(result))
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_cased = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if previous_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            out.push(c);
            previous_cased = false;
        }
    }
    out
}

fn zfill(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let padding = "0".repeat(width - len);
    match s.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{sign}{padding}{}", &s[1..]),
        _ => format!("{padding}{s}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(src: &str, x: &str) -> String {
        Expression::parse(src)
            .unwrap_or_else(|e| panic!("{src}: {e}"))
            .evaluate(x)
            .unwrap_or_else(|e| panic!("{src}: {e}"))
            .to_string()
    }

    #[test]
    fn identity_and_concatenation() {
        assert_eq!(eval_str("x", "abc"), "abc");
        assert_eq!(eval_str("'id_' + x", "7"), "id_7");
        assert_eq!(eval_str("x + \"-\" + x", "a"), "a-a");
    }

    #[test]
    fn integer_and_float_arithmetic() {
        assert_eq!(eval_str("int(x) + 1000", "5"), "1005");
        assert_eq!(eval_str("int(x) * 2 - 1", "5"), "9");
        assert_eq!(eval_str("int(x) / 2", "5"), "2.5");
        assert_eq!(eval_str("int(x) / 1", "4"), "4.0");
        assert_eq!(eval_str("float(x) * 2", "1.25"), "2.5");
        assert_eq!(eval_str("-int(x) % 3", "1"), "2");
        assert_eq!(eval_str("(1 + 2) * 3", ""), "9");
    }

    #[test]
    fn precedence_is_conventional() {
        assert_eq!(eval_str("1 + 2 * 3", ""), "7");
        assert_eq!(eval_str("10 - 4 - 3", ""), "3");
        assert_eq!(eval_str("--2", ""), "2");
    }

    #[test]
    fn indexing_and_slicing() {
        assert_eq!(eval_str("x[0]", "hello"), "h");
        assert_eq!(eval_str("x[-1]", "hello"), "o");
        assert_eq!(eval_str("x[1:3]", "hello"), "el");
        assert_eq!(eval_str("x[:2]", "hello"), "he");
        assert_eq!(eval_str("x[-3:]", "hello"), "llo");
        assert_eq!(eval_str("x[4:1]", "hello"), "");
        assert_eq!(eval_str("x[:100]", "hi"), "hi");
    }

    #[test]
    fn string_methods() {
        assert_eq!(eval_str("x.upper()", "abc"), "ABC");
        assert_eq!(eval_str("x.strip()", "  a b  "), "a b");
        assert_eq!(eval_str("x.strip('_')", "__a__"), "a");
        assert_eq!(eval_str("x.replace('-', '')", "a-b-c"), "abc");
        assert_eq!(eval_str("x.zfill(5)", "42"), "00042");
        assert_eq!(eval_str("x.zfill(4)", "-7"), "-007");
        assert_eq!(eval_str("x.title()", "hello wORLD"), "Hello World");
        assert_eq!(eval_str("x.lower().startswith('ab')", "ABC"), "True");
    }

    #[test]
    fn builtin_functions() {
        assert_eq!(eval_str("len(x)", "héllo"), "5");
        assert_eq!(eval_str("round(float(x))", "2.5"), "2");
        assert_eq!(eval_str("round(float(x), 1)", "2.26"), "2.3");
        assert_eq!(eval_str("abs(int(x))", "-4"), "4");
        assert_eq!(eval_str("str(int(x) + 1) + 'a'", "1"), "2a");
        assert_eq!(eval_str("x * 3", "ab"), "ababab");
    }

    #[test]
    fn escapes_in_string_literals() {
        assert_eq!(eval_str(r#"x + "\"q\"""#, "a"), "a\"q\"");
        assert_eq!(eval_str(r"'a\tb'", ""), "a\tb");
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(matches!(
            Expression::parse("x +"),
            Err(AppError::ExpressionSyntax(_))
        ));
        assert!(matches!(
            Expression::parse("y + 1"),
            Err(AppError::ExpressionSyntax(_))
        ));
        assert!(Expression::parse("x.upper(").is_err());
    }

    #[test]
    fn evaluation_errors_are_reported() {
        let e = Expression::parse("int(x)").unwrap();
        assert!(matches!(e.evaluate("abc"), Err(AppError::ExpressionEval(_))));
        let e = Expression::parse("x + 1").unwrap();
        assert!(e.evaluate("a").is_err());
        let e = Expression::parse("int(x) / 0").unwrap();
        assert!(e.evaluate("1").is_err());
        let e = Expression::parse("x[10]").unwrap();
        assert!(e.evaluate("abc").is_err());
        let e = Expression::parse("nosuch(x)").unwrap();
        assert!(e.evaluate("abc").is_err());
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let min = i64::MIN.to_string();
        for source in ["-int(x)", "abs(int(x))", "int(x) % -1"] {
            let e = Expression::parse(source).unwrap();
            assert!(
                matches!(e.evaluate(&min), Err(AppError::ExpressionEval(_))),
                "{source}"
            );
        }
        let e = Expression::parse("int(x) % -3").unwrap();
        assert_eq!(e.evaluate("7").unwrap().to_string(), "-2");
    }
}
