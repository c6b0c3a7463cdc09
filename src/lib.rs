//! Cappuccino Code: a small line-oriented scripting language for beginners.
//!
//! ```no_run
//! use cappuccino::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! interpreter.run("name = \"world\"\nsay name").unwrap();
//! ```

pub mod ast;
pub mod cli;
pub mod interpreter;
pub mod lexer;
pub mod parser;

pub use interpreter::host::{BufferedHost, Host, StdHost};
pub use interpreter::value::{EvalError, RunError, Value};
pub use interpreter::{Interpreter, InterpreterOptions};
