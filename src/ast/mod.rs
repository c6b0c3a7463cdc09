/// Abstract Syntax Tree for Cappuccino arithmetic expressions
///
/// Statements are never parsed into a tree; only the text handed to the
/// arithmetic step of the expression evaluator is.

use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
    Power,    // **
    Equal,    // ==
    NotEqual, // !=
    Less,     // <
    LessEq,   // <=
    Greater,  // >
    GreaterEq,// >=
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Negate, // -
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
}

/// An expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),

    /// Identifier left unresolved after variable substitution
    Variable(String),

    /// Unary operation
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
    },

    /// Binary operation
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Literal(Literal::Integer(n)) => write!(f, "{}", n),
            Expression::Literal(Literal::Float(n)) => write!(f, "{:?}", n),
            Expression::Literal(Literal::String(s)) => write!(f, "{:?}", s),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Unary { op: UnaryOp::Negate, expr } => write!(f, "(-{})", expr),
            Expression::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
        }
    }
}
