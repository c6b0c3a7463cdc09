use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Runtime values in Cappuccino
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

/// Faults raised while evaluating an arithmetic expression.
///
/// These never leave the expression evaluator: they select its literal-text
/// fallback instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in {0}")]
    Overflow(&'static str),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Faults that abort a whole `run`
#[derive(Debug, Error)]
pub enum RunError {
    /// Malformed `func` header
    #[error("Invalid function definition: {0}")]
    Syntax(String),
    /// A host collaborator (output, input, terminal, ...) failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Value {
    /// Parse a numeric literal: Float when the text contains `.`, Integer otherwise.
    ///
    /// Surrounding whitespace is ignored.
    pub fn parse_number(text: &str) -> Option<Value> {
        let text = text.trim();
        if text.contains('.') {
            text.parse::<f64>().ok().map(Value::Float)
        } else {
            text.parse::<i64>().ok().map(Value::Integer)
        }
    }

    /// Value for a line of user input: a number when it parses as one,
    /// otherwise the raw text.
    pub fn from_input(raw: String) -> Value {
        Value::parse_number(&raw).unwrap_or(Value::String(raw))
    }

    /// Check if value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }

    /// Get type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
        }
    }

    /// Coerce to a float, parsing strings
    pub fn as_float(&self) -> Result<f64, EvalError> {
        match self {
            Value::Integer(n) => Ok(*n as f64),
            Value::Float(n) => Ok(*n),
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
                EvalError::TypeError(format!("Cannot convert '{}' to a number", s))
            }),
        }
    }

    /// Coerce to an integer: floats truncate, strings must hold an integer
    pub fn as_integer(&self) -> Result<i64, EvalError> {
        match self {
            Value::Integer(n) => Ok(*n),
            Value::Float(n) => {
                if n.is_finite() && *n >= i64::MIN as f64 && *n < i64::MAX as f64 {
                    Ok(n.trunc() as i64)
                } else {
                    Err(EvalError::TypeError(format!("Cannot convert {} to an integer", n)))
                }
            }
            Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
                EvalError::TypeError(format!("Cannot convert '{}' to an integer", s))
            }),
        }
    }

    /// Order two values of compatible types; `None` for mixed string/number pairs
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::String(_), _) | (_, Value::String(_)) => None,
            (a, b) => {
                let a = a.as_float().ok()?;
                let b = b.as_float().ok()?;
                a.partial_cmp(&b)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => fmt_float(*n, f),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

/// Floats always read back as floats: integral values keep a `.0`,
/// very large magnitudes switch to exponent form.
fn fmt_float(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        write!(f, "nan")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "inf" } else { "-inf" })
    } else if n.abs() >= 1e16 {
        write!(f, "{:e}", n)
    } else if n.fract() == 0.0 {
        write!(f, "{:.1}", n)
    } else {
        write!(f, "{}", n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_number() {
        assert_eq!(Value::parse_number("3"), Some(Value::Integer(3)));
        assert_eq!(Value::parse_number("3.5"), Some(Value::Float(3.5)));
        assert_eq!(Value::parse_number(" -7 "), Some(Value::Integer(-7)));
        assert_eq!(Value::parse_number("abc"), None);
        assert_eq!(Value::parse_number("1.2.3"), None);
    }

    #[test]
    fn test_from_input_keeps_raw_text() {
        assert_eq!(Value::from_input("42".to_string()), Value::Integer(42));
        assert_eq!(Value::from_input("Alice".to_string()), Value::String("Alice".to_string()));
    }

    #[test]
    fn test_float_display() {
        assert_eq!(Value::Float(5.0).to_string(), "5.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(-0.25).to_string(), "-0.25");
        assert_eq!(Value::Float(1e20).to_string(), "1e20");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("0".to_string()).is_truthy());
        assert!(Value::Integer(-1).is_truthy());
    }

    #[test]
    fn test_integer_coercion_truncates() {
        assert_eq!(Value::Float(3.9).as_integer(), Ok(3));
        assert_eq!(Value::Float(-3.9).as_integer(), Ok(-3));
        assert_eq!(Value::String("12".to_string()).as_integer(), Ok(12));
        assert!(Value::String("twelve".to_string()).as_integer().is_err());
        assert!(Value::Float(f64::NAN).as_integer().is_err());
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Integer(2).compare(&Value::Float(2.0)), Some(Ordering::Equal));
        assert_eq!(Value::from("apple").compare(&Value::from("banana")), Some(Ordering::Less));
        assert_eq!(Value::from("1").compare(&Value::Integer(1)), None);
    }
}
