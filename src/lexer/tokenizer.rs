use super::token::{Token, TokenType};
use anyhow::{Result, bail};

/// Lexer for Cappuccino expressions
///
/// Works on a single expression (one statement's worth of text), so
/// positions are byte offsets into that text rather than line/column pairs.
pub struct Lexer {
    /// Source text being lexed
    source: String,
    /// Current byte position in source
    current: usize,
    /// Start byte position of current token
    start: usize,
}

impl Lexer {
    /// Create a new lexer from expression text
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.to_string(),
            current: 0,
            start: 0,
        }
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the source
    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return Ok(self.make_token(TokenType::Eof));
        }

        let c = self.advance();

        match c {
            '(' => Ok(self.make_token(TokenType::LeftParen)),
            ')' => Ok(self.make_token(TokenType::RightParen)),
            '+' => Ok(self.make_token(TokenType::Plus)),
            '-' => Ok(self.make_token(TokenType::Minus)),
            '*' => {
                if self.match_char('*') {
                    Ok(self.make_token(TokenType::StarStar))
                } else {
                    Ok(self.make_token(TokenType::Star))
                }
            }
            '/' => Ok(self.make_token(TokenType::Slash)),
            '%' => Ok(self.make_token(TokenType::Percent)),
            '!' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenType::BangEqual))
                } else {
                    bail!("Unexpected character '!' at offset {}", self.start)
                }
            }
            '=' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenType::EqualEqual))
                } else {
                    bail!("Unexpected character '=' at offset {}", self.start)
                }
            }
            '<' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenType::LessEqual))
                } else {
                    Ok(self.make_token(TokenType::Less))
                }
            }
            '>' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenType::GreaterEqual))
                } else {
                    Ok(self.make_token(TokenType::Greater))
                }
            }
            '"' | '\'' => self.string(c),
            '.' if self.peek_matches(|c| c.is_ascii_digit()) => self.number(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            _ => bail!("Unexpected character '{}' at offset {}", c, self.start),
        }
    }

    /// Parse a string literal delimited by `quote`; no escape sequences
    fn string(&mut self, quote: char) -> Result<Token> {
        while !self.is_at_end() && self.peek() != Some(quote) {
            self.advance();
        }

        if self.is_at_end() {
            bail!("Unterminated string starting at offset {}", self.start);
        }

        // Consume closing quote
        self.advance();

        let value = self.source[self.start + 1..self.current - 1].to_string();
        Ok(self.make_token(TokenType::String(value)))
    }

    /// Parse a number (integer or float)
    fn number(&mut self) -> Result<Token> {
        let mut is_float = self.source[self.start..].starts_with('.');

        while self.peek_matches(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if !is_float && self.peek() == Some('.') {
            is_float = true;
            self.advance();
            while self.peek_matches(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent: only consumed when digits actually follow
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut lookahead = self.source[self.current + 1..].chars();
            let exponent_follows = match lookahead.next() {
                Some('+') | Some('-') => lookahead.next().map_or(false, |c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_follows {
                is_float = true;
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                while self.peek_matches(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.source[self.start..self.current];
        if is_float {
            let value: f64 = text.parse()?;
            Ok(self.make_token(TokenType::Float(value)))
        } else {
            let value: i64 = text.parse()?;
            Ok(self.make_token(TokenType::Integer(value)))
        }
    }

    /// Parse an identifier
    fn identifier(&mut self) -> Result<Token> {
        while self.peek_matches(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = self.source[self.start..self.current].to_string();
        Ok(self.make_token(TokenType::Identifier(text)))
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while self.peek_matches(char::is_whitespace) {
            self.advance();
        }
    }

    /// Check if we've reached the end of source
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Get the current character and advance
    fn advance(&mut self) -> char {
        match self.peek() {
            Some(c) => {
                self.current += c.len_utf8();
                c
            }
            None => '\0',
        }
    }

    /// Peek at the current character without advancing; `None` at the end
    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_matches(&self, pred: impl Fn(char) -> bool) -> bool {
        self.peek().map_or(false, pred)
    }

    /// Match and consume a specific character
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() != Some(expected) {
            return false;
        }
        self.current += expected.len_utf8();
        true
    }

    /// Create a token from the current position
    fn make_token(&self, token_type: TokenType) -> Token {
        Token::new(
            token_type,
            self.source[self.start..self.current].to_string(),
            self.start,
            self.current,
        )
    }
}

/// Replace every identifier token that `lookup` resolves with the text it
/// returns, leaving everything else (including string literal contents)
/// byte-for-byte intact.
pub fn substitute<F>(source: &str, mut lookup: F) -> Result<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let tokens = Lexer::new(source).tokenize()?;
    let mut output = String::with_capacity(source.len());
    let mut copied = 0;

    for token in &tokens {
        if let TokenType::Identifier(name) = &token.token_type {
            if let Some(replacement) = lookup(name) {
                output.push_str(&source[copied..token.start]);
                output.push_str(&replacement);
                copied = token.end;
            }
        }
    }
    output.push_str(&source[copied..]);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn types(source: &str) -> Vec<TokenType> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            types("+ - * ** / % == != < <= > >= ( )"),
            vec![
                TokenType::Plus,
                TokenType::Minus,
                TokenType::Star,
                TokenType::StarStar,
                TokenType::Slash,
                TokenType::Percent,
                TokenType::EqualEqual,
                TokenType::BangEqual,
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            types("42 3.14 .5 2e3 7."),
            vec![
                TokenType::Integer(42),
                TokenType::Float(3.14),
                TokenType::Float(0.5),
                TokenType::Float(2000.0),
                TokenType::Float(7.0),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_both_quotes() {
        assert_eq!(
            types(r#""hello world" 'it'"#),
            vec![
                TokenType::String("hello world".to_string()),
                TokenType::String("it".to_string()),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_fails() {
        assert!(Lexer::new("\"oops").tokenize().is_err());
    }

    #[test]
    fn test_nul_inside_string_is_ordinary_text() {
        assert_eq!(
            types("'a\0b' + 1"),
            vec![
                TokenType::String("a\0b".to_string()),
                TokenType::Plus,
                TokenType::Integer(1),
                TokenType::Eof,
            ]
        );
        assert!(Lexer::new("1 + \0").tokenize().is_err());
        assert!(Lexer::new("'\0").tokenize().is_err());
    }

    #[test]
    fn test_single_equals_is_rejected() {
        assert!(Lexer::new("x = 1").tokenize().is_err());
    }

    #[test]
    fn test_spans_cover_lexemes() {
        let tokens = Lexer::new("count + 1").tokenize().unwrap();
        assert_eq!((tokens[0].start, tokens[0].end), (0, 5));
        assert_eq!(tokens[2].lexeme, "1");
    }

    #[test]
    fn test_substitute_whole_identifiers_only() {
        let out = substitute("x + xx * x", |name| match name {
            "x" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(out, "2 + xx * 2");
    }

    #[test]
    fn test_substitute_skips_string_contents() {
        let out = substitute("'x' + x", |name| (name == "x").then(|| "'y'".to_string())).unwrap();
        assert_eq!(out, "'x' + 'y'");
    }
}
