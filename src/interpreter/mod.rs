pub mod block;
pub mod environment;
pub mod evaluator;
pub mod function;
pub mod host;
pub mod value;

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use block::extract_block;
use environment::Environment;
use evaluator::{Evaluator, unquote};
use function::{Function, FunctionRegistry};
use host::{Host, StdHost};
use value::{RunError, Value};

/// `name(args)` at the start of a statement; args run to the first `)`
static CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)\s*\((.*?)\)").expect("call pattern is valid"));

/// Operators that keep a line containing `=` from being an assignment
const COMPARISON_OPERATORS: [&str; 4] = ["==", "!=", "<=", ">="];

/// Interpreter settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterOptions {
    /// Run block and function bodies through the full statement dispatcher,
    /// so `func`, `repeat` and `if` nest. Off by default: bodies then hold
    /// simple statements only.
    pub nested_blocks: bool,
}

/// Cappuccino interpreter: one variable namespace, one function registry,
/// and the host it talks to.
pub struct Interpreter<H: Host = StdHost> {
    environment: Environment,
    functions: FunctionRegistry,
    host: H,
    options: InterpreterOptions,
}

impl Interpreter<StdHost> {
    /// Create an interpreter wired to the standard streams
    pub fn new() -> Self {
        Self::with_host(StdHost::new())
    }
}

impl Default for Interpreter<StdHost> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> Interpreter<H> {
    /// Create an interpreter that performs all I/O through `host`
    pub fn with_host(host: H) -> Self {
        Interpreter {
            environment: Environment::new(),
            functions: FunctionRegistry::new(),
            host,
            options: InterpreterOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InterpreterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> InterpreterOptions {
        self.options
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Evaluate expression text against the current variables. Never fails.
    pub fn evaluate(&self, expr: &str) -> Value {
        Evaluator::new(&self.environment).evaluate(expr)
    }

    /// Evaluate condition text against the current variables. Never fails.
    pub fn evaluate_condition(&self, condition: &str) -> bool {
        Evaluator::new(&self.environment).evaluate_condition(condition)
    }

    /// Run a program. Variables and functions persist across calls.
    ///
    /// Only a malformed `func` header or a host failure stops the run.
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        let lines: Vec<&str> = source.lines().collect();
        self.execute_program(&lines)
    }

    /// Statement dispatcher
    fn execute_program<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<(), RunError> {
        let mut cursor = 0;

        while cursor < lines.len() {
            let line = lines[cursor].as_ref().trim();

            if line.is_empty() || line.starts_with("//") {
                cursor += 1;
                continue;
            }

            if line.starts_with("func ") {
                let (function, consumed) = Function::parse(&lines[cursor..])?;
                log::debug!("defining function '{}'({})", function.name, function.params.join(", "));
                if let Some(previous) = self.functions.define(function) {
                    log::debug!("function '{}' redefined", previous.name);
                }
                cursor += consumed;
            } else if line.starts_with("repeat ") {
                let block = extract_block(&lines[cursor..]);
                let times = self.repeat_count(header_expression(line, "repeat"));
                log::debug!("repeat x{} over {} body lines", times, block.body.len());
                for _ in 0..times {
                    self.execute_body(&block.body)?;
                }
                cursor += block.consumed;
            } else if line.starts_with("if ") {
                let block = extract_block(&lines[cursor..]);
                let condition = header_expression(line, "if");
                if self.evaluate_condition(condition) {
                    log::debug!("condition '{}' holds", condition);
                    self.execute_body(&block.body)?;
                }
                cursor += block.consumed;
            } else {
                self.execute_line(line)?;
                cursor += 1;
            }
        }

        Ok(())
    }

    /// Run the body of a loop, conditional or function once
    fn execute_body(&mut self, body: &[String]) -> Result<(), RunError> {
        if self.options.nested_blocks {
            return self.execute_program(body);
        }

        for line in body {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            self.execute_line(line)?;
        }
        Ok(())
    }

    fn repeat_count(&self, expr: &str) -> i64 {
        match self.evaluate(expr).as_integer() {
            Ok(times) => times.max(0),
            Err(err) => {
                log::warn!("repeat count '{}' is not a whole number ({}); skipping loop", expr, err);
                0
            }
        }
    }

    /// Simple statement executor. `line` is already trimmed.
    fn execute_line(&mut self, line: &str) -> Result<(), RunError> {
        if let Some(text) = line.strip_prefix("say ") {
            return self.say(text);
        }

        if let Some((target, prompt)) = line.split_once(" = ask ") {
            return self.ask(target, prompt);
        }

        if let Some(seconds) = line.strip_prefix("wait ") {
            return self.wait(seconds);
        }

        if line == "clear" {
            log::debug!("clearing terminal");
            return Ok(self.host.clear_terminal()?);
        }

        if let Some((target, range)) = line.split_once(" = random ") {
            return self.random(target, range);
        }

        if line.contains('=') && !COMPARISON_OPERATORS.iter().any(|op| line.contains(op)) {
            if let Some((target, expr)) = line.split_once('=') {
                let value = self.evaluate(expr);
                log::debug!("{} = {:?}", target.trim(), value);
                self.environment.define(target.trim(), value);
            }
            return Ok(());
        }

        if line.contains('(') && line.contains(')') {
            return self.call_function(line);
        }

        log::debug!("ignoring statement '{}'", line);
        Ok(())
    }

    fn say(&mut self, text: &str) -> Result<(), RunError> {
        let text = text.trim();
        let output = match unquote(text) {
            Some(inner) => inner.to_string(),
            None => self.evaluate(text).to_string(),
        };
        Ok(self.host.print_line(&output)?)
    }

    fn ask(&mut self, target: &str, prompt: &str) -> Result<(), RunError> {
        let prompt = prompt.trim();
        let prompt = unquote(prompt).unwrap_or(prompt);
        let input = self.host.read_line(prompt)?;
        self.environment.define(target.trim(), Value::from_input(input));
        Ok(())
    }

    fn wait(&mut self, expr: &str) -> Result<(), RunError> {
        let value = self.evaluate(expr);
        let duration = value
            .as_float()
            .ok()
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok());

        match duration {
            Some(duration) => Ok(self.host.delay(duration)?),
            None => {
                log::warn!("cannot wait for '{}' seconds; skipping", value);
                Ok(())
            }
        }
    }

    fn random(&mut self, target: &str, range: &str) -> Result<(), RunError> {
        let mut bounds = range.split_whitespace().map(|expr| self.evaluate(expr).as_integer());

        let (min, max) = match (bounds.next(), bounds.next()) {
            (Some(Ok(min)), Some(Ok(max))) if min <= max => (min, max),
            _ => {
                log::warn!("invalid random range '{}'; '{}' left unchanged", range.trim(), target.trim());
                return Ok(());
            }
        };

        let value = self.host.random_integer(min, max)?;
        self.environment.define(target.trim(), Value::Integer(value));
        Ok(())
    }

    /// Function call executor.
    ///
    /// Unknown functions are ignored. Variables are restored to their
    /// pre-call state afterwards, even when the body fails.
    fn call_function(&mut self, line: &str) -> Result<(), RunError> {
        let Some(captures) = CALL.captures(line) else {
            log::debug!("ignoring statement '{}'", line);
            return Ok(());
        };
        let name = &captures[1];

        let args: Vec<Value> = captures[2]
            .split(',')
            .map(str::trim)
            .filter(|arg| !arg.is_empty())
            .map(|arg| self.evaluate(arg))
            .collect();

        let function = match self.functions.get(name) {
            Some(function) => function.clone(),
            None => {
                log::debug!("call to undefined function '{}' ignored", name);
                return Ok(());
            }
        };
        log::debug!("calling '{}' with {} argument(s)", name, args.len());

        let saved = self.environment.snapshot();
        for (param, arg) in function.params.iter().zip(args) {
            self.environment.define(param.as_str(), arg);
        }

        let result = self.execute_body(&function.body);
        self.environment.restore(saved);
        result
    }
}

/// Text between a compound statement's keyword and its opening brace
fn header_expression<'a>(line: &'a str, keyword: &str) -> &'a str {
    let rest = &line[keyword.len()..];
    rest.split('{').next().unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::BufferedHost;
    use pretty_assertions::assert_eq;

    fn run_with(host: BufferedHost, source: &str) -> Interpreter<BufferedHost> {
        let mut interpreter = Interpreter::with_host(host);
        interpreter.run(source).unwrap();
        interpreter
    }

    fn output_of(source: &str) -> Vec<String> {
        run_with(BufferedHost::new(), source).host().output().to_vec()
    }

    #[test]
    fn test_say_literal() {
        let interpreter = run_with(BufferedHost::new(), "say \"Hello\"");
        assert_eq!(interpreter.host().output(), ["Hello".to_string()]);
        assert!(interpreter.environment().is_empty());
    }

    #[test]
    fn test_host_is_shared_with_caller() {
        let mut interpreter = Interpreter::with_host(BufferedHost::new())
            .with_options(InterpreterOptions { nested_blocks: true });
        assert!(interpreter.options().nested_blocks);

        interpreter.host_mut().print_line("banner").unwrap();
        interpreter.run("say \"after\"").unwrap();
        assert_eq!(interpreter.host().output(), ["banner".to_string(), "after".to_string()]);
    }

    #[test]
    fn test_lone_quote_says_empty_line() {
        assert_eq!(output_of("say \""), vec![""]);
        assert_eq!(output_of("say '"), vec![""]);
    }

    #[test]
    fn test_deeply_nested_expression_is_said_verbatim() {
        let deep = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
        assert_eq!(output_of(&format!("say {}", deep)), vec![deep]);
    }

    #[test]
    fn test_assignment_then_say() {
        assert_eq!(output_of("x = 5\nsay x"), vec!["5"]);
    }

    #[test]
    fn test_say_expression() {
        assert_eq!(output_of("x = 4\nsay x * 2 + 1\nsay 10 / 4"), vec!["9", "2.5"]);
    }

    #[test]
    fn test_say_unresolved_reference() {
        assert_eq!(output_of("say foo"), vec!["foo"]);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        assert_eq!(output_of("// greeting\n\n   \nsay 'hi'"), vec!["hi"]);
    }

    #[test]
    fn test_repeat() {
        assert_eq!(output_of("repeat 3 {\n    say \"hi\"\n}"), vec!["hi", "hi", "hi"]);
    }

    #[test]
    fn test_repeat_inline() {
        assert_eq!(output_of("repeat 3 { say \"hi\" }\nsay \"done\""), vec!["hi", "hi", "hi", "done"]);
    }

    #[test]
    fn test_repeat_zero_and_expression_counts() {
        let source = "n = 2\nrepeat 0 {\nsay \"never\"\n}\nrepeat n + 1 {\nsay \"x\"\n}\nrepeat 2.9 {\nsay \"y\"\n}";
        assert_eq!(output_of(source), vec!["x", "x", "x", "y", "y"]);
    }

    #[test]
    fn test_repeat_with_bad_count_is_skipped() {
        assert_eq!(output_of("repeat lots {\nsay \"x\"\n}\nsay \"after\""), vec!["after"]);
    }

    #[test]
    fn test_repeat_body_mutates_variables() {
        assert_eq!(output_of("total = 0\nrepeat 4 {\ntotal = total + 2\n}\nsay total"), vec!["8"]);
    }

    #[test]
    fn test_if() {
        assert_eq!(output_of("if 5 > 3 {\nsay \"yes\"\n}\nsay \"end\""), vec!["yes", "end"]);
        assert_eq!(output_of("if 2 > 3 {\nsay \"no\"\n}\nsay \"end\""), vec!["end"]);
    }

    #[test]
    fn test_if_with_strings() {
        let source = "name = \"Alice\"\nif name is \"Alice\" {\nsay \"hi Alice\"\n}\nif name not \"Bob\" {\nsay \"not Bob\"\n}";
        assert_eq!(output_of(source), vec!["hi Alice", "not Bob"]);
    }

    #[test]
    fn test_function_call() {
        assert_eq!(output_of("func greet(name) {\n    say name\n}\ngreet(\"Bob\")"), vec!["Bob"]);
    }

    #[test]
    fn test_function_arguments_are_expressions() {
        let source = "func show(a, b) {\nsay a + b\n}\nx = 3\nshow(x, x * 2)";
        assert_eq!(output_of(source), vec!["9"]);
    }

    #[test]
    fn test_call_isolation() {
        assert_eq!(output_of("x = 10\nfunc f() { x = 20 }\nf()\nsay x"), vec!["10"]);
    }

    #[test]
    fn test_callee_reads_outer_variables() {
        let source = "greeting = \"Hello\"\nfunc hi(name) {\nsay greeting\nsay name\n}\nhi(\"Ann\")";
        assert_eq!(output_of(source), vec!["Hello", "Ann"]);
    }

    #[test]
    fn test_parameters_do_not_leak() {
        let interpreter = run_with(BufferedHost::new(), "func f(p) {\nlocal = p\n}\nf(1)");
        assert!(!interpreter.environment().contains("p"));
        assert!(!interpreter.environment().contains("local"));
    }

    #[test]
    fn test_surplus_and_missing_arguments() {
        let source = "func two(a, b) {\nsay a\nsay b\n}\ntwo(1, 2, 3)\ntwo(7)";
        assert_eq!(output_of(source), vec!["1", "2", "7", "b"]);
    }

    #[test]
    fn test_unknown_function_is_ignored() {
        assert_eq!(output_of("missing(1, 2)\nsay \"ok\""), vec!["ok"]);
    }

    #[test]
    fn test_redefinition_replaces_function() {
        let source = "func f() {\nsay 1\n}\nfunc f() {\nsay 2\n}\nf()";
        assert_eq!(output_of(source), vec!["2"]);
    }

    #[test]
    fn test_malformed_func_header_aborts_run() {
        let mut interpreter = Interpreter::with_host(BufferedHost::new());
        let err = interpreter.run("say 1\nfunc broken {\n}\nsay 2").unwrap_err();

        assert!(matches!(err, RunError::Syntax(ref header) if header == "func broken {"));
        assert_eq!(interpreter.host().output(), ["1".to_string()]);
    }

    #[test]
    fn test_flat_bodies_do_not_dispatch_compound_statements() {
        let source = "func check(n) {\nif n > 100 {\nsay \"big\"\n}\n}\ncheck(1)";
        assert_eq!(output_of(source), vec!["big"]);
    }

    #[test]
    fn test_nested_blocks_option() {
        let source = "func check(n) {\nif n > 100 {\nsay \"big\"\n}\nsay \"checked\"\n}\ncheck(1)\ncheck(500)";
        let mut interpreter = Interpreter::with_host(BufferedHost::new())
            .with_options(InterpreterOptions { nested_blocks: true });
        interpreter.run(source).unwrap();
        assert_eq!(interpreter.host().output(), ["checked", "big", "checked"].map(String::from));
    }

    #[test]
    fn test_ask() {
        let host = BufferedHost::new().with_inputs(["Zoe", "41", "1.5"]);
        let interpreter = run_with(host, "name = ask \"Name? \"\nage = ask 'Age? '\nh = ask height\nsay age + 1");

        assert_eq!(interpreter.host().prompts(), ["Name? ", "Age? ", "height"].map(String::from));
        assert_eq!(interpreter.environment().get("name"), Some(&Value::from("Zoe")));
        assert_eq!(interpreter.environment().get("h"), Some(&Value::Float(1.5)));
        assert_eq!(interpreter.host().output(), ["42".to_string()]);
    }

    #[test]
    fn test_ask_without_input_is_a_host_error() {
        let mut interpreter = Interpreter::with_host(BufferedHost::new());
        let err = interpreter.run("x = ask \"? \"").unwrap_err();
        assert!(matches!(err, RunError::Io(_)));
    }

    #[test]
    fn test_wait_and_clear() {
        let interpreter = run_with(BufferedHost::new(), "d = 0.5\nwait d\nwait 2\nwait nope\nwait -1\nclear");
        assert_eq!(
            interpreter.host().delays(),
            [Duration::from_millis(500), Duration::from_secs(2)]
        );
        assert_eq!(interpreter.host().clears(), 1);
    }

    #[test]
    fn test_random() {
        let host = BufferedHost::new().with_randoms([4]);
        let interpreter = run_with(host, "top = 6\nroll = random 1 top\nbad = random 6 1\nsay roll");
        assert_eq!(interpreter.host().output(), ["4".to_string()]);
        assert!(!interpreter.environment().contains("bad"));
    }

    #[test]
    fn test_comparison_lines_are_not_assignments() {
        let interpreter = run_with(BufferedHost::new(), "x == 5\ny <= 2");
        assert!(interpreter.environment().is_empty());
    }

    #[test]
    fn test_state_persists_across_runs() {
        let mut interpreter = Interpreter::with_host(BufferedHost::new());
        interpreter.run("func twice(v) {\nsay v * 2\n}\nn = 21").unwrap();
        interpreter.run("twice(n)").unwrap();
        assert_eq!(interpreter.host().output(), ["42".to_string()]);
    }

    #[test]
    fn test_header_expression() {
        assert_eq!(header_expression("repeat 3 {", "repeat"), "3");
        assert_eq!(header_expression("if x >= 2{", "if"), "x >= 2");
        assert_eq!(header_expression("if ready", "if"), "ready");
    }
}
