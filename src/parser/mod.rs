use crate::ast::*;
use crate::lexer::{Lexer, Token, TokenType};
use anyhow::{Result, bail};

/// Deepest nesting of parentheses, unary minus and `**` the parser accepts
const MAX_DEPTH: usize = 256;

/// Most tokens one expression may hold; bounds the depth of operator chains
const MAX_TOKENS: usize = 1024;

/// Parser for Cappuccino arithmetic expressions
///
/// Precedence, loosest first: relational, `+ -`, `* / %`, `**`, unary `-`.
/// Everything is left-associative except `**`.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    /// Parse the tokens into a single expression, rejecting trailing input
    pub fn parse(&mut self) -> Result<Expression> {
        if self.tokens.is_empty() || self.is_at_end() {
            bail!("Empty expression");
        }
        if self.tokens.len() > MAX_TOKENS {
            bail!("Expression too long ({} tokens)", self.tokens.len());
        }

        let expr = self.parse_comparison()?;

        if !self.is_at_end() {
            bail!(
                "Unexpected token '{}' at offset {}",
                self.peek().lexeme,
                self.peek().start
            );
        }

        Ok(expr)
    }

    /// Parse relational operators
    fn parse_comparison(&mut self) -> Result<Expression> {
        let mut expr = self.parse_term()?;

        while self.match_tokens(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
            TokenType::EqualEqual,
            TokenType::BangEqual,
        ]) {
            let op = match self.previous().token_type {
                TokenType::Greater => BinaryOp::Greater,
                TokenType::GreaterEqual => BinaryOp::GreaterEq,
                TokenType::Less => BinaryOp::Less,
                TokenType::LessEqual => BinaryOp::LessEq,
                TokenType::EqualEqual => BinaryOp::Equal,
                TokenType::BangEqual => BinaryOp::NotEqual,
                _ => unreachable!(),
            };
            let right = self.parse_term()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse addition and subtraction
    fn parse_term(&mut self) -> Result<Expression> {
        let mut expr = self.parse_factor()?;

        while self.match_tokens(&[TokenType::Minus, TokenType::Plus]) {
            let op = if self.previous().token_type == TokenType::Plus {
                BinaryOp::Add
            } else {
                BinaryOp::Subtract
            };
            let right = self.parse_factor()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse multiplication, division, modulo
    fn parse_factor(&mut self) -> Result<Expression> {
        let mut expr = self.parse_power()?;

        while self.match_tokens(&[TokenType::Slash, TokenType::Star, TokenType::Percent]) {
            let op = match self.previous().token_type {
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Percent => BinaryOp::Modulo,
                _ => unreachable!(),
            };
            let right = self.parse_power()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse exponentiation (right-associative)
    fn parse_power(&mut self) -> Result<Expression> {
        let base = self.parse_unary()?;

        if self.match_token(TokenType::StarStar) {
            self.descend()?;
            let exponent = self.parse_power()?;
            self.depth -= 1;
            return Ok(Expression::Binary {
                left: Box::new(base),
                op: BinaryOp::Power,
                right: Box::new(exponent),
            });
        }

        Ok(base)
    }

    /// Parse unary minus
    fn parse_unary(&mut self) -> Result<Expression> {
        if self.match_token(TokenType::Minus) {
            self.descend()?;
            let expr = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expression::Unary {
                op: UnaryOp::Negate,
                expr: Box::new(expr),
            });
        }

        self.parse_primary()
    }

    /// Parse literals, identifiers and parenthesised groups
    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.peek().clone();

        match token.token_type {
            TokenType::Integer(n) => {
                self.advance();
                Ok(Expression::Literal(Literal::Integer(n)))
            }
            TokenType::Float(n) => {
                self.advance();
                Ok(Expression::Literal(Literal::Float(n)))
            }
            TokenType::String(s) => {
                self.advance();
                Ok(Expression::Literal(Literal::String(s)))
            }
            TokenType::Identifier(name) => {
                self.advance();
                Ok(Expression::Variable(name))
            }
            TokenType::LeftParen => {
                self.advance();
                self.descend()?;
                let expr = self.parse_comparison()?;
                self.consume(TokenType::RightParen, "')' after expression")?;
                self.depth -= 1;
                Ok(expr)
            }
            _ => bail!(
                "Expected expression at offset {}. Got '{}' instead.",
                token.start,
                token.lexeme
            ),
        }
    }

    // Helper methods

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            bail!("Expression nested too deeply");
        }
        Ok(())
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for t in types {
            if self.check(t.clone()) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().is_type(&token_type)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<()> {
        if self.check(token_type) {
            self.advance();
            Ok(())
        } else {
            bail!(
                "Expected {} at offset {}. Got '{}' instead.",
                message,
                self.peek().start,
                self.peek().lexeme
            )
        }
    }
}

/// Tokenize and parse expression text in one step
pub fn parse_expression(source: &str) -> Result<Expression> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shape(source: &str) -> String {
        parse_expression(source).unwrap().to_string()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(shape("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(shape("1 + 2 > 2 * 1"), "((1 + 2) > (2 * 1))");
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(shape("10 - 4 - 3"), "((10 - 4) - 3)");
        assert_eq!(shape("8 / 4 % 3"), "((8 / 4) % 3)");
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(shape("2 ** 3 ** 2"), "(2 ** (3 ** 2))");
    }

    #[test]
    fn test_unary_binds_tighter_than_power() {
        assert_eq!(shape("-3 ** 2"), "((-3) ** 2)");
    }

    #[test]
    fn test_grouping() {
        assert_eq!(shape("(1 + 2) * 3"), "((1 + 2) * 3)");
    }

    #[test]
    fn test_identifiers_and_strings() {
        let expr = parse_expression("name + 'x'").unwrap();
        match expr {
            Expression::Binary { left, op, right } => {
                assert_eq!(*left, Expression::Variable("name".to_string()));
                assert_eq!(op, BinaryOp::Add);
                assert_eq!(*right, Expression::Literal(Literal::String("x".to_string())));
            }
            _ => panic!("Expected binary expression"),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        let err = parse_expression(&deep).unwrap_err();
        assert_eq!(err.to_string(), "Expression nested too deeply");
        assert!(parse_expression(&format!("{}1", "-".repeat(300))).is_err());
        assert!(parse_expression(&vec!["2"; 300].join(" ** ")).is_err());
        assert!(parse_expression(&format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000))).is_err());

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse_expression(&shallow).unwrap(), Expression::Literal(Literal::Integer(1)));
    }

    #[test]
    fn test_long_operator_chains_are_rejected() {
        let chain = vec!["1"; 5_000].join(" + ");
        assert!(parse_expression(&chain).is_err());
        assert!(parse_expression(&vec!["1"; 100].join(" + ")).is_ok());
    }

    #[test]
    fn test_malformed_input() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("1 +").is_err());
        assert!(parse_expression("(1 + 2").is_err());
        assert!(parse_expression("hello world").is_err());
    }
}
