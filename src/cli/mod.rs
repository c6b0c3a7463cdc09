pub mod repl;

use clap::{Parser as ClapParser, Subcommand};
use anyhow::{Context, Result, bail};
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::interpreter::{Interpreter, InterpreterOptions};
use crate::lexer::{Lexer, TokenType};
use crate::parser::Parser as ExpressionParser;

/// Cappuccino Code CLI
#[derive(ClapParser)]
#[command(name = "cap")]
#[command(about = "Cappuccino Code: a small scripting language for beginners")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Program to run; starts the interactive prompt when omitted
    pub file: Option<PathBuf>,

    /// Allow func/repeat/if inside bodies
    #[arg(long)]
    pub nested: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a Cappuccino program
    Run {
        /// Path to the program (usually *.capu)
        file: PathBuf,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Allow func/repeat/if inside bodies
        #[arg(long)]
        nested: bool,
    },

    /// Start the interactive prompt
    Repl {
        /// Allow func/repeat/if inside bodies
        #[arg(long)]
        nested: bool,
    },

    /// Tokenize an expression (for debugging)
    Tokenize {
        /// Expression text
        expr: String,
    },

    /// Parse an expression and show its AST (for debugging)
    Parse {
        /// Expression text
        expr: String,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Run { file, verbose, nested }) => run_file(file, verbose, nested),
        Some(Commands::Repl { nested }) => repl::start(options(nested)),
        Some(Commands::Tokenize { expr }) => tokenize_expression(&expr),
        Some(Commands::Parse { expr }) => parse_expression(&expr),
        None => match cli.file {
            Some(file) => run_file(file, false, cli.nested),
            None => repl::start(options(cli.nested)),
        },
    }
}

fn options(nested: bool) -> InterpreterOptions {
    InterpreterOptions { nested_blocks: nested }
}

/// Run a program file to completion
fn run_file(file: PathBuf, verbose: bool, nested: bool) -> Result<()> {
    if verbose {
        println!("Running Cappuccino file: {}", file.display());
    }

    let source = match std::fs::read_to_string(&file) {
        Ok(source) => source,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            bail!("File '{}' not found", file.display())
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Cannot read '{}'", file.display()));
        }
    };

    let mut interpreter = Interpreter::new().with_options(options(nested));
    interpreter
        .run(&source)
        .with_context(|| format!("Error while running '{}'", file.display()))?;

    if verbose {
        println!(
            "Finished: {} function(s), {} variable(s) defined",
            interpreter.functions().len(),
            interpreter.environment().len()
        );
        let mut bindings: Vec<_> = interpreter.environment().iter().collect();
        bindings.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in bindings {
            println!("  {} = {}", name, value);
        }
    }

    Ok(())
}

/// Tokenize an expression and print tokens
fn tokenize_expression(expr: &str) -> Result<()> {
    println!("Tokenizing: {}", expr);
    println!("{}", "=".repeat(60));

    let mut lexer = Lexer::new(expr);
    let tokens = lexer.tokenize()?;

    for token in tokens {
        if matches!(token.token_type, TokenType::Eof) {
            break;
        }
        println!("{}", token);
    }

    Ok(())
}

/// Parse an expression and print its AST
fn parse_expression(expr: &str) -> Result<()> {
    println!("Parsing: {}", expr);
    println!("{}", "=".repeat(60));

    let mut lexer = Lexer::new(expr);
    let tokens = lexer.tokenize()?;
    let mut parser = ExpressionParser::new(tokens);
    let ast = parser.parse()?;

    println!("{}", ast);
    println!("{:#?}", ast);

    Ok(())
}
