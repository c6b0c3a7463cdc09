use std::collections::HashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::block::extract_block;
use super::value::RunError;

static FUNC_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^func\s+(\w+)\s*\((.*?)\)\s*\{").expect("function header pattern is valid")
});

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+$").expect("identifier pattern is valid"));

/// A user-defined function: parameters plus raw body lines
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<String>,
}

impl Function {
    /// Parse `func name(a, b) {` plus its block from the front of `lines`.
    ///
    /// Returns the function and the number of lines it spans.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<(Function, usize), RunError> {
        let header = lines.first().map(|l| l.as_ref().trim()).unwrap_or_default();

        let captures = FUNC_HEADER
            .captures(header)
            .ok_or_else(|| RunError::Syntax(header.to_string()))?;
        let name = captures[1].to_string();

        let mut params = Vec::new();
        for param in captures[2].split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if !IDENTIFIER.is_match(param) {
                return Err(RunError::Syntax(header.to_string()));
            }
            params.push(param.to_string());
        }

        let block = extract_block(lines);
        Ok((
            Function {
                name,
                params,
                body: block.body,
            },
            block.consumed,
        ))
    }
}

/// Name to function mapping; later definitions replace earlier ones
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry {
            functions: HashMap::new(),
        }
    }

    /// Store a function, returning the definition it replaced
    pub fn define(&mut self, function: Function) -> Option<Function> {
        self.functions.insert(function.name.clone(), function)
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
