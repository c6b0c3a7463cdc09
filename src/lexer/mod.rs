pub mod token;
pub mod tokenizer;

pub use token::{Token, TokenType};
pub use tokenizer::{Lexer, substitute};
