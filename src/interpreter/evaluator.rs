use std::cmp::Ordering;

use crate::ast::{BinaryOp, Expression, Literal, UnaryOp};
use crate::lexer::substitute;
use crate::parser::parse_expression;
use super::environment::Environment;
use super::value::{EvalError, Value};

/// Relational operators recognised in conditions, in the order they are
/// searched for. Two-character operators come first so `>=` is never split
/// as `>`.
const CONDITION_OPERATORS: [&str; 6] = [">=", "<=", ">", "<", "==", "!="];

/// Longest string, in bytes, that `*` may build
const MAX_REPEATED_LEN: usize = 1 << 24;

/// Resolves expression and condition text against an environment
pub struct Evaluator<'a> {
    environment: &'a Environment,
}

impl<'a> Evaluator<'a> {
    pub fn new(environment: &'a Environment) -> Self {
        Evaluator { environment }
    }

    /// Evaluate expression text. Never fails.
    ///
    /// The first rule that applies wins:
    /// 1. text wrapped in matching quotes is that text, unquoted
    /// 2. a numeric literal
    /// 3. the name of a bound variable
    /// 4. an arithmetic expression, after inlining bound variables
    /// 5. otherwise the original text, as a string
    pub fn evaluate(&self, expr: &str) -> Value {
        let expr = expr.trim();

        if let Some(inner) = unquote(expr) {
            return Value::String(inner.to_string());
        }

        if let Some(number) = Value::parse_number(expr) {
            return number;
        }

        if let Some(value) = self.environment.get(expr) {
            return value.clone();
        }

        match self.evaluate_arithmetic(expr) {
            Ok(value) => value,
            Err(err) => {
                log::trace!("'{}' evaluated as literal text: {}", expr, err);
                Value::String(expr.to_string())
            }
        }
    }

    /// Evaluate condition text to a boolean. Never fails.
    pub fn evaluate_condition(&self, condition: &str) -> bool {
        let condition = condition.trim();

        if let Some((left, right)) = condition.split_once(" is ") {
            return self.evaluate(left).to_string() == self.evaluate(right).to_string();
        }

        if let Some((left, right)) = condition.split_once(" not ") {
            return self.evaluate(left).to_string() != self.evaluate(right).to_string();
        }

        for op in CONDITION_OPERATORS {
            if let Some((left, right)) = condition.split_once(op) {
                let left = self.evaluate(left);
                let right = self.evaluate(right);
                return compare_condition(&left, op, &right);
            }
        }

        self.evaluate(condition).is_truthy()
    }

    /// Inline bound variables, then parse and evaluate the result
    fn evaluate_arithmetic(&self, expr: &str) -> anyhow::Result<Value> {
        let inlined = substitute(expr, |name| {
            self.environment.get(name).map(|value| value.to_string())
        })?;
        let ast = parse_expression(&inlined)?;
        Ok(evaluate_expression(&ast)?)
    }
}

/// Text inside matching single or double quotes, if `text` is wrapped in them
pub fn unquote(text: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|q| {
        if text.len() == 1 && text.starts_with(q) {
            // a lone quote opens and closes itself
            return Some("");
        }
        text.strip_prefix(q).and_then(|rest| rest.strip_suffix(q))
    })
}

/// Apply a condition operator, comparing numerically whenever both sides
/// coerce to numbers.
fn compare_condition(left: &Value, op: &str, right: &Value) -> bool {
    let ordering = match (left.as_float(), right.as_float()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => left.compare(right),
    };

    match ordering {
        Some(ordering) => match op {
            ">=" => ordering != Ordering::Less,
            "<=" => ordering != Ordering::Greater,
            ">" => ordering == Ordering::Greater,
            "<" => ordering == Ordering::Less,
            "==" => ordering == Ordering::Equal,
            _ => ordering != Ordering::Equal,
        },
        None => op == "!=",
    }
}

/// Evaluate a parsed arithmetic expression
pub fn evaluate_expression(expr: &Expression) -> Result<Value, EvalError> {
    match expr {
        Expression::Literal(Literal::Integer(n)) => Ok(Value::Integer(*n)),
        Expression::Literal(Literal::Float(n)) => Ok(Value::Float(*n)),
        Expression::Literal(Literal::String(s)) => Ok(Value::String(s.clone())),
        Expression::Variable(name) => Err(EvalError::UndefinedVariable(name.clone())),
        Expression::Unary { op, expr } => {
            let val = evaluate_expression(expr)?;
            evaluate_unary_op(*op, &val)
        }
        Expression::Binary { left, op, right } => {
            let left_val = evaluate_expression(left)?;
            let right_val = evaluate_expression(right)?;
            evaluate_binary_op(&left_val, *op, &right_val)
        }
    }
}

fn evaluate_unary_op(op: UnaryOp, val: &Value) -> Result<Value, EvalError> {
    match (op, val) {
        (UnaryOp::Negate, Value::Integer(n)) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or(EvalError::Overflow("negation")),
        (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Negate, _) => Err(EvalError::TypeError(format!(
            "Cannot negate {}",
            val.type_name()
        ))),
    }
}

fn evaluate_binary_op(left: &Value, op: BinaryOp, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => add_values(left, right),
        BinaryOp::Subtract => numeric_op(left, right, "subtract", i64::checked_sub, |a, b| a - b),
        BinaryOp::Multiply => multiply_values(left, right),
        BinaryOp::Divide => divide_values(left, right),
        BinaryOp::Modulo => modulo_values(left, right),
        BinaryOp::Power => power_values(left, right),
        BinaryOp::Equal => Ok(bool_value(left.compare(right) == Some(Ordering::Equal))),
        BinaryOp::NotEqual => Ok(bool_value(left.compare(right) != Some(Ordering::Equal))),
        BinaryOp::Less => compare_values(left, right, |c| c == Ordering::Less),
        BinaryOp::LessEq => compare_values(left, right, |c| c != Ordering::Greater),
        BinaryOp::Greater => compare_values(left, right, |c| c == Ordering::Greater),
        BinaryOp::GreaterEq => compare_values(left, right, |c| c != Ordering::Less),
    }
}

/// Relational results are integers: 1 for true, 0 for false
fn bool_value(b: bool) -> Value {
    Value::Integer(b as i64)
}

/// Shared integer/float promotion for arithmetic operators
fn numeric_op(
    left: &Value,
    right: &Value,
    name: &'static str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => int_op(*a, *b)
            .map(Value::Integer)
            .ok_or(EvalError::Overflow(name)),
        (Value::String(_), _) | (_, Value::String(_)) => Err(EvalError::TypeError(format!(
            "Cannot {} {} and {}",
            name,
            left.type_name(),
            right.type_name()
        ))),
        _ => Ok(Value::Float(float_op(left.as_float()?, right.as_float()?))),
    }
}

fn add_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        _ => numeric_op(left, right, "add", i64::checked_add, |a, b| a + b),
    }
}

fn multiply_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::String(s), Value::Integer(n)) | (Value::Integer(n), Value::String(s)) => {
            let count = usize::try_from((*n).max(0)).map_err(|_| EvalError::Overflow("multiply"))?;
            match s.len().checked_mul(count) {
                Some(len) if len <= MAX_REPEATED_LEN => Ok(Value::String(s.repeat(count))),
                _ => Err(EvalError::Overflow("multiply")),
            }
        }
        _ => numeric_op(left, right, "multiply", i64::checked_mul, |a, b| a * b),
    }
}

/// Division always produces a float
fn divide_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Err(EvalError::TypeError(format!(
            "Cannot divide {} and {}",
            left.type_name(),
            right.type_name()
        )));
    }
    let divisor = right.as_float()?;
    if divisor == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Value::Float(left.as_float()? / divisor))
}

/// Floored modulo: the result takes the sign of the divisor
fn modulo_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Integer(_), Value::Integer(0)) => Err(EvalError::DivisionByZero),
        (Value::Integer(a), Value::Integer(b)) => {
            let r = a.checked_rem(*b).ok_or(EvalError::Overflow("modulo"))?;
            Ok(Value::Integer(if r != 0 && (r < 0) != (*b < 0) { r + b } else { r }))
        }
        (Value::String(_), _) | (_, Value::String(_)) => Err(EvalError::TypeError(format!(
            "Cannot modulo {} and {}",
            left.type_name(),
            right.type_name()
        ))),
        _ => {
            let a = left.as_float()?;
            let b = right.as_float()?;
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let r = a % b;
            Ok(Value::Float(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }))
        }
    }
}

/// Integer powers stay integers for non-negative exponents
fn power_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Value::Integer(base), Value::Integer(exp)) = (left, right) {
        if *exp >= 0 {
            let exp = u32::try_from(*exp).map_err(|_| EvalError::Overflow("power"))?;
            return base
                .checked_pow(exp)
                .map(Value::Integer)
                .ok_or(EvalError::Overflow("power"));
        }
    }

    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Err(EvalError::TypeError(format!(
            "Cannot raise {} to {}",
            left.type_name(),
            right.type_name()
        )));
    }
    let base = left.as_float()?;
    let exp = right.as_float()?;
    if base == 0.0 && exp < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let result = base.powf(exp);
    if result.is_nan() {
        return Err(EvalError::InvalidOperation(format!("{} ** {}", left, right)));
    }
    Ok(Value::Float(result))
}

fn compare_values<F>(left: &Value, right: &Value, pred: F) -> Result<Value, EvalError>
where
    F: Fn(Ordering) -> bool,
{
    match left.compare(right) {
        Some(ordering) => Ok(bool_value(pred(ordering))),
        None => Err(EvalError::TypeError(format!(
            "Cannot compare {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}
