use crate::value::Value;
use log::{debug, warn};
use std::collections::HashMap;

type Scope = HashMap<String, Value>;

/// Stack of lexical scopes.
///
/// `scopes[0]` is the global scope and is never popped. A call pushes its
/// activation scope on top of the caller's, so names resolve innermost
/// first across the whole stack.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![Scope::new()],
        }
    }

    /// Number of live scopes, the global one included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
        debug!("Pushed scope (depth {})", self.scopes.len());
    }

    pub fn pop(&mut self) {
        if self.scopes.len() <= 1 {
            warn!("Refusing to pop the global scope");
            return;
        }

        self.scopes.pop();
        debug!("Popped scope (depth {})", self.scopes.len());
    }

    /// Bind `name` in the innermost scope. Returns `false` if the innermost
    /// scope already holds `name`; the existing binding is left untouched.
    pub fn declare(&mut self, name: &str, value: Value) -> bool {
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };

        if scope.contains_key(name) {
            return false;
        }

        scope.insert(name.to_string(), value);
        true
    }

    /// Overwrite the nearest visible binding of `name`. Returns `false` if no
    /// binding is visible.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.resolve_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .copied()
    }

    fn resolve_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }
}
