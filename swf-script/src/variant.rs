use std::{fmt, rc::Rc};

/// A function created by `DefineFunction`. Shared, never copied.
#[derive(Debug, PartialEq, Eq)]
pub struct Function {
    /// empty for anonymous functions
    pub name: String,
    pub params: Vec<String>,
    /// pc of the first body instruction
    pub entry: usize,
}

/// A value on the operand stack or in a scope.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Undefined,
    Text(String),
    Bool(bool),
    Float(f64),
    Int(i32),
    Function(Rc<Function>),
}

impl PartialEq for Value {
    /// Structural equality for tests and bookkeeping. Script equality is [`Value::loose_eq`].
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // f64::from_str also takes "inf" and "nan", which are not numbers here
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn format_number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "Infinity".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if v == 0.0 {
        "0".to_string()
    } else if (1e-6..1e21).contains(&v.abs()) {
        format!("{}", v)
    } else {
        // exponent form outside that range, always signed: 1e+21, 1.5e-7
        let s = format!("{:e}", v);
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => s,
        }
    }
}

impl Value {
    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    /// Normalize an arithmetic result: integral values that fit an i32 become `Int`.
    pub fn from_number(v: f64) -> Value {
        let negative_zero = v == 0.0 && v.is_sign_negative();
        if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 && !negative_zero {
            Value::Int(v as i32)
        } else {
            Value::Float(v)
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Text(s) => parse_number(s),
            Value::Bool(b) => *b as i32 as f64,
            Value::Float(v) => *v,
            Value::Int(v) => *v as f64,
            Value::Function(_) => f64::NAN,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Float(v) => format_number(*v),
            Value::Int(v) => v.to_string(),
            Value::Function(_) => "[type Function]".to_string(),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Float(v) => *v != 0.0 && !v.is_nan(),
            Value::Int(v) => *v != 0,
            Value::Function(_) => true,
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Undefined, _) | (_, Value::Undefined) => false,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Function(_), _) | (_, Value::Function(_)) => false,
            _ => self.to_number() == other.to_number(),
        }
    }

    fn is_textual(&self) -> bool {
        matches!(self, Value::Text(_) | Value::Function(_))
    }

    /// `self + rhs`; text on either side concatenates.
    pub fn add(&self, rhs: &Value) -> Value {
        if self.is_textual() || rhs.is_textual() {
            let mut s = self.to_text();
            s.push_str(&rhs.to_text());
            return Value::Text(s);
        }
        Value::from_number(self.to_number() + rhs.to_number())
    }

    pub fn sub(&self, rhs: &Value) -> Value {
        Value::from_number(self.to_number() - rhs.to_number())
    }

    pub fn mul(&self, rhs: &Value) -> Value {
        Value::from_number(self.to_number() * rhs.to_number())
    }

    pub fn rem(&self, rhs: &Value) -> Value {
        Value::from_number(self.to_number() % rhs.to_number())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Function(func) if func.name.is_empty() => write!(f, "function@0x{:X}", func.entry),
            Value::Function(func) => write!(f, "function {}@0x{:X}", func.name, func.entry),
            other => f.write_str(&other.to_text()),
        }
    }
}
