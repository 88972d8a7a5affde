//! Value expressions
//!
//! ```text
//! value   := number | "string" | ident | list | call | none
//! list    := '[' (value (',' value)*)? ']'
//! call    := ident '(' (value (',' value)*)? ')'
//! ```
//!
//! Expressions are untyped; [`to_param`] converts one against the type of
//! the parameter it is assigned to.

use crate::activation::ActivationFunction;
use crate::dimension::Dimension;
use crate::steps::{ColorSpace, ParamValue};
use crate::tensor::Tensor;
use crate::weights::{GaussPattern, WeightPattern, Weights};

/// Parsed value expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Ident(String),
    List(Vec<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Open(char),
    Close(char),
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '[' | '(' => {
                tokens.push(Token::Open(c));
                i += 1;
            }
            ']' | ')' => {
                tokens.push(Token::Close(c));
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '"' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&c| c == '"')
                    .map(|p| start + p)
                    .ok_or_else(|| "unterminated string".to_string())?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = i;
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    let exponent_sign = (d == '-' || d == '+') && matches!(chars[i - 1], 'e' | 'E');
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number: {}", literal))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn value(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(v)) => Ok(Expr::Number(v)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Open('[')) => Ok(Expr::List(self.items(']')?)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::Open('(')) {
                    self.pos += 1;
                    let args = self.items(')')?;
                    Ok(Expr::Call(name.to_lowercase(), args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(other) => Err(format!("unexpected {:?}", other)),
            None => Err("unexpected end of value".to_string()),
        }
    }

    fn items(&mut self, close: char) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();
        if self.peek() == Some(&Token::Close(close)) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.value()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close(c)) if c == close => return Ok(items),
                Some(other) => return Err(format!("expected ',' or '{}', got {:?}", close, other)),
                None => return Err(format!("missing '{}'", close)),
            }
        }
    }
}

/// Parse one complete value expression.
pub fn parse_expr(text: &str) -> Result<Expr, String> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };
    let expr = parser.value()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("trailing input after value: {}", text));
    }
    Ok(expr)
}

impl Expr {
    fn describe(&self) -> String {
        match self {
            Self::Number(v) => format!("number {}", v),
            Self::Str(s) => format!("string \"{}\"", s),
            Self::Ident(s) => format!("'{}'", s),
            Self::List(items) => format!("list of {}", items.len()),
            Self::Call(name, _) => format!("{}(..)", name),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::Ident(s) if s.eq_ignore_ascii_case("none"))
    }

    pub fn as_number(&self) -> Result<f64, String> {
        match self {
            Self::Number(v) => Ok(*v),
            other => Err(format!("expected a number, got {}", other.describe())),
        }
    }

    pub fn as_count(&self) -> Result<usize, String> {
        let v = self.as_number()?;
        if v < 0.0 || v.fract() != 0.0 {
            return Err(format!("expected a non-negative integer, got {}", v));
        }
        Ok(v as usize)
    }

    pub fn as_text(&self) -> Result<String, String> {
        match self {
            Self::Str(s) | Self::Ident(s) => Ok(s.clone()),
            other => Err(format!("expected a string, got {}", other.describe())),
        }
    }

    fn as_list(&self) -> Result<&[Expr], String> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(format!("expected a list, got {}", other.describe())),
        }
    }

    pub fn as_numbers(&self) -> Result<Vec<f64>, String> {
        match self {
            Self::Number(v) => Ok(vec![*v]),
            other => other.as_list()?.iter().map(Expr::as_number).collect(),
        }
    }

    pub fn as_counts(&self) -> Result<Vec<usize>, String> {
        self.as_list()?.iter().map(Expr::as_count).collect()
    }

    /// Nested lists to a rectangular tensor; a bare number is a scalar.
    pub fn as_tensor(&self) -> Result<Tensor, String> {
        let mut shape = Vec::new();
        let mut cursor = self;
        while let Self::List(items) = cursor {
            shape.push(items.len());
            match items.first() {
                Some(first) => cursor = first,
                None => break,
            }
        }
        let mut data = Vec::new();
        collect_tensor(self, &shape, &mut data)?;
        Tensor::new(shape, data).map_err(|e| e.to_string())
    }
}

fn collect_tensor(expr: &Expr, shape: &[usize], data: &mut Vec<f64>) -> Result<(), String> {
    match (expr, shape) {
        (Expr::List(items), [n, rest @ ..]) => {
            if items.len() != *n {
                return Err(format!("ragged array: expected {} items, got {}", n, items.len()));
            }
            items.iter().try_for_each(|item| collect_tensor(item, rest, data))
        }
        (Expr::Number(v), []) => {
            data.push(*v);
            Ok(())
        }
        (other, _) => Err(format!("ragged array at {}", other.describe())),
    }
}

fn arity(name: &str, args: &[Expr], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        return Err(format!("{}() takes {} to {} arguments, got {}", name, min, max, args.len()));
    }
    Ok(())
}

/// Convert an expression to a weight pattern.
///
/// Bare arrays become custom patterns. Named kernels are resolved by the
/// caller, which knows the target geometry.
pub fn to_pattern(expr: &Expr) -> Result<WeightPattern, String> {
    match expr {
        Expr::List(_) => Ok(WeightPattern::Custom(expr.as_tensor()?)),
        Expr::Call(name, args) => match name.as_str() {
            "gauss" => {
                arity(name, args, 2, 3)?;
                let height = args[0].as_number()?;
                let sigmas = args[1].as_numbers()?;
                let mut gauss = GaussPattern::new(height, sigmas);
                if let Some(mean) = args.get(2) {
                    gauss = gauss.with_mean(mean.as_numbers()?).map_err(|e| e.to_string())?;
                }
                Ok(WeightPattern::Gauss(gauss))
            }
            "sum" => {
                let patterns = args.iter().map(to_pattern).collect::<Result<Vec<_>, _>>()?;
                WeightPattern::sum(patterns).map_err(|e| e.to_string())
            }
            "repeat" => {
                arity(name, args, 2, 2)?;
                Ok(WeightPattern::repeat(to_pattern(&args[0])?, args[1].as_count()?))
            }
            "repeated" => {
                arity(name, args, 2, 2)?;
                Ok(WeightPattern::repeated_value(args[0].as_number()?, args[1].as_counts()?))
            }
            "custom" => {
                arity(name, args, 1, 1)?;
                Ok(WeightPattern::Custom(args[0].as_tensor()?))
            }
            other => Err(format!("unknown pattern: {}()", other)),
        },
        other => Err(format!("expected a weight pattern, got {}", other.describe())),
    }
}

/// Scalars stay scalars, everything else is a pattern.
pub fn to_weights(expr: &Expr) -> Result<Weights, String> {
    match expr {
        Expr::Number(v) => Ok(Weights::Scalar(*v)),
        other => to_pattern(other).map(Weights::Pattern),
    }
}

pub fn to_activation(expr: &Expr) -> Result<ActivationFunction, String> {
    match expr {
        Expr::Ident(s) if s.eq_ignore_ascii_case("identity") => Ok(ActivationFunction::Identity),
        Expr::Ident(s) if s.eq_ignore_ascii_case("sigmoid") => Ok(ActivationFunction::default()),
        Expr::Call(name, args) if name == "sigmoid" => {
            arity(name, args, 1, 1)?;
            Ok(ActivationFunction::sigmoid(args[0].as_number()?))
        }
        Expr::Call(name, args) if name == "identity" && args.is_empty() => Ok(ActivationFunction::Identity),
        other => Err(format!("expected an activation function, got {}", other.describe())),
    }
}

/// Sizes, or `dim(lower, upper, size[, "name"])` entries.
fn to_dimensions(expr: &Expr) -> Result<Vec<Dimension>, String> {
    expr.as_list()?
        .iter()
        .map(|item| match item {
            Expr::Number(_) => Dimension::from_size(item.as_count()?).map_err(|e| e.to_string()),
            Expr::Call(name, args) if name == "dim" => {
                arity(name, args, 3, 4)?;
                let dim = Dimension::new(args[0].as_number()?, args[1].as_number()?, args[2].as_count()?)
                    .map_err(|e| e.to_string())?;
                match args.get(3) {
                    Some(label) => Ok(dim.with_name(label.as_text()?)),
                    None => Ok(dim),
                }
            }
            other => Err(format!("expected a size or dim(..), got {}", other.describe())),
        })
        .collect()
}

fn to_timed_values(expr: &Expr) -> Result<Vec<(f64, f64)>, String> {
    expr.as_list()?
        .iter()
        .map(|pair| match pair.as_numbers()?.as_slice() {
            [t, v] => Ok((*t, *v)),
            _ => Err("expected [time, value] pairs".to_string()),
        })
        .collect()
}

/// Convert an expression to a parameter value shaped like `current`.
pub fn to_param(expr: &Expr, current: &ParamValue) -> Result<ParamValue, String> {
    let value = match current {
        ParamValue::Bool(_) => match expr {
            Expr::Ident(s) if s.eq_ignore_ascii_case("true") => ParamValue::Bool(true),
            Expr::Ident(s) if s.eq_ignore_ascii_case("false") => ParamValue::Bool(false),
            other => return Err(format!("expected true or false, got {}", other.describe())),
        },
        ParamValue::Float(_) => ParamValue::Float(expr.as_number()?),
        ParamValue::OptionalFloat(_) if expr.is_none() => ParamValue::OptionalFloat(None),
        ParamValue::OptionalFloat(_) => ParamValue::OptionalFloat(Some(expr.as_number()?)),
        ParamValue::Count(_) => ParamValue::Count(expr.as_count()?),
        ParamValue::Text(_) => ParamValue::Text(expr.as_text()?),
        ParamValue::Floats(_) => ParamValue::Floats(expr.as_numbers()?),
        ParamValue::Shape(_) => ParamValue::Shape(expr.as_counts()?),
        ParamValue::OptionalShape(_) if expr.is_none() => ParamValue::OptionalShape(None),
        ParamValue::OptionalShape(_) => ParamValue::OptionalShape(Some(expr.as_counts()?)),
        ParamValue::Dimensions(_) => ParamValue::Dimensions(to_dimensions(expr)?),
        ParamValue::Activation(_) => ParamValue::Activation(to_activation(expr)?),
        ParamValue::Kernel(_) if expr.is_none() => ParamValue::Kernel(None),
        ParamValue::Kernel(_) => ParamValue::Kernel(Some(to_pattern(expr)?)),
        ParamValue::Tensor(_) => match expr {
            Expr::Call(name, args) if name == "custom" && args.len() == 1 => {
                ParamValue::Tensor(args[0].as_tensor()?)
            }
            other => ParamValue::Tensor(other.as_tensor()?),
        },
        ParamValue::Tensors(_) => ParamValue::Tensors(
            expr.as_list()?
                .iter()
                .map(Expr::as_tensor)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        ParamValue::TimedValues(_) => ParamValue::TimedValues(to_timed_values(expr)?),
        ParamValue::Names(_) => ParamValue::Names(
            expr.as_list()?
                .iter()
                .map(Expr::as_text)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        ParamValue::ColorSpace(_) => {
            let text = expr.as_text()?;
            ParamValue::ColorSpace(
                ColorSpace::parse(&text).ok_or_else(|| format!("unknown color space: {}", text))?,
            )
        }
    };
    Ok(value)
}
