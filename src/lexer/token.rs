/// Token types for Cappuccino expressions
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Literals
    Identifier(String),
    String(String),
    Integer(i64),
    Float(f64),

    // Operators
    Plus,        // +
    Minus,       // -
    Star,        // *
    StarStar,    // **
    Slash,       // /
    Percent,     // %
    EqualEqual,  // ==
    BangEqual,   // !=
    Less,        // <
    LessEqual,   // <=
    Greater,     // >
    GreaterEqual,// >=

    // Delimiters
    LeftParen,   // (
    RightParen,  // )

    Eof,
}

/// A token with its type, source text, and byte span in the expression
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, start: usize, end: usize) -> Self {
        Token {
            token_type,
            lexeme,
            start,
            end,
        }
    }

    /// Check if this token is of a specific type
    pub fn is_type(&self, token_type: &TokenType) -> bool {
        match (&self.token_type, token_type) {
            (TokenType::Identifier(_), TokenType::Identifier(_)) => true,
            (TokenType::String(_), TokenType::String(_)) => true,
            (TokenType::Integer(_), TokenType::Integer(_)) => true,
            (TokenType::Float(_), TokenType::Float(_)) => true,
            (a, b) => a == b,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} '{}' at {}..{}", self.token_type, self.lexeme, self.start, self.end)
    }
}
