use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use rand::Rng;

/// Everything a program can do outside the interpreter itself.
///
/// Errors are passed through `Interpreter::run` untouched.
pub trait Host {
    /// Print one line of output
    fn print_line(&mut self, text: &str) -> io::Result<()>;

    /// Show `prompt` and read one line of input, without its line terminator
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Suspend the program
    fn delay(&mut self, duration: Duration) -> io::Result<()>;

    /// Clear the terminal
    fn clear_terminal(&mut self) -> io::Result<()>;

    /// Uniform random integer in `min..=max`
    fn random_integer(&mut self, min: i64, max: i64) -> io::Result<i64>;
}

/// Host backed by the process's standard streams
#[derive(Debug, Default)]
pub struct StdHost;

impl StdHost {
    pub fn new() -> Self {
        StdHost
    }
}

impl Host for StdHost {
    fn print_line(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", text)?;
        stdout.flush()
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}", prompt)?;
            stdout.flush()?;
        }

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF when reading a line"));
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    fn delay(&mut self, duration: Duration) -> io::Result<()> {
        std::thread::sleep(duration);
        Ok(())
    }

    fn clear_terminal(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "\x1B[2J\x1B[1;1H")?;
        stdout.flush()
    }

    fn random_integer(&mut self, min: i64, max: i64) -> io::Result<i64> {
        let mut rng = rand::thread_rng();
        Ok(rng.gen_range(min..=max))
    }
}

/// In-memory host: records what a program did and replays scripted input.
///
/// Random numbers come from the script while it lasts, then fall back to
/// the lower bound.
#[derive(Debug, Default, Clone)]
pub struct BufferedHost {
    output: Vec<String>,
    prompts: Vec<String>,
    delays: Vec<Duration>,
    clears: usize,
    inputs: VecDeque<String>,
    randoms: VecDeque<i64>,
}

impl BufferedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue lines to be returned by `read_line`
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Queue values to be returned by `random_integer`
    pub fn with_randoms<I: IntoIterator<Item = i64>>(mut self, randoms: I) -> Self {
        self.randoms.extend(randoms);
        self
    }

    /// Printed lines, oldest first
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Prompts shown by `read_line`
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Number of terminal clears requested
    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl Host for BufferedHost {
    fn print_line(&mut self, text: &str) -> io::Result<()> {
        self.output.push(text.to_string());
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.inputs
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted input left"))
    }

    fn delay(&mut self, duration: Duration) -> io::Result<()> {
        self.delays.push(duration);
        Ok(())
    }

    fn clear_terminal(&mut self) -> io::Result<()> {
        self.clears += 1;
        Ok(())
    }

    fn random_integer(&mut self, min: i64, _max: i64) -> io::Result<i64> {
        Ok(self.randoms.pop_front().unwrap_or(min))
    }
}
