// Interactive front end: lines are buffered until `run`, then executed
// against one interpreter that lives for the whole session.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::interpreter::host::Host;
use crate::interpreter::value::RunError;
use crate::interpreter::{Interpreter, InterpreterOptions};

/// What happened to one line typed at the prompt
#[derive(Debug)]
pub enum Feed {
    /// Line stored for the next `run`
    Buffered,
    /// Buffer executed
    Ran(Result<(), RunError>),
    /// `exit` typed
    Exit,
}

/// Line buffer plus the interpreter it feeds
pub struct Session<H: Host> {
    interpreter: Interpreter<H>,
    buffer: Vec<String>,
}

impl<H: Host> Session<H> {
    pub fn new(interpreter: Interpreter<H>) -> Self {
        Session {
            interpreter,
            buffer: Vec::new(),
        }
    }

    pub fn prompt(&self) -> &'static str {
        if self.buffer.is_empty() {
            ">>> "
        } else {
            "... "
        }
    }

    pub fn feed(&mut self, line: &str) -> Feed {
        match line.trim() {
            "exit" => Feed::Exit,
            "run" => {
                let source = self.buffer.join("\n");
                self.buffer.clear();
                Feed::Ran(self.interpreter.run(&source))
            }
            _ => {
                self.buffer.push(line.to_string());
                Feed::Buffered
            }
        }
    }

    /// Drop buffered lines
    pub fn discard(&mut self) {
        self.buffer.clear();
    }

    pub fn interpreter(&self) -> &Interpreter<H> {
        &self.interpreter
    }
}

fn show_banner() {
    println!("☕ Cappuccino Code Interpreter");
    println!("Usage: cap <filename.capu>");
    println!("\nOr run in REPL mode:");
    println!("Enter code line by line, type 'run' to execute, 'exit' to quit\n");
}

/// Run the interactive prompt on the terminal until `exit`, Ctrl-C or EOF
pub fn start(options: InterpreterOptions) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut session = Session::new(Interpreter::new().with_options(options));

    show_banner();

    loop {
        match editor.readline(session.prompt()) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                match session.feed(&line) {
                    Feed::Exit => break,
                    Feed::Ran(Err(err)) => {
                        println!("Error: {}", err);
                        session.discard();
                    }
                    Feed::Ran(Ok(())) | Feed::Buffered => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("\n\nExiting...");
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
