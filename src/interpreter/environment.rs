use std::collections::HashMap;
use super::value::Value;

/// Flat variable namespace shared by the whole program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    variables: HashMap<String, Value>,
}

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Environment {
            variables: HashMap::new(),
        }
    }

    /// Bind or rebind a variable
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Get a variable's value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Check if a variable exists
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate over all bindings in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.variables.iter()
    }

    /// Copy every binding, for restoring after a function call
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.variables.clone()
    }

    /// Replace every binding with a previously taken snapshot
    pub fn restore(&mut self, snapshot: HashMap<String, Value>) {
        self.variables = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        assert!(env.get("x").is_none());

        env.define("x", Value::Integer(1));
        env.define("x", Value::Integer(2));

        assert_eq!(env.get("x"), Some(&Value::Integer(2)));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_iter_visits_every_binding() {
        let mut env = Environment::new();
        env.define("b", Value::from("two"));
        env.define("a", Value::Integer(1));

        let mut names: Vec<&String> = env.iter().map(|(name, _)| name).collect();
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_restore_discards_later_changes() {
        let mut env = Environment::new();
        env.define("x", Value::Integer(10));
        let saved = env.snapshot();

        env.define("x", Value::Integer(20));
        env.define("y", Value::from("new"));
        env.restore(saved);

        assert_eq!(env.get("x"), Some(&Value::Integer(10)));
        assert!(!env.contains("y"));
    }
}
