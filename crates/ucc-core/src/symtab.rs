//! Lexically scoped symbol table.
//!
//! A stack of insertion-ordered name→binding maps. The analyzer pushes a
//! scope on entry to each function, compound, and loop, and pops it on
//! exit. Function names are inserted into the outermost scope so that
//! recursive and forward calls resolve while the function body is still
//! being processed.

use indexmap::IndexMap;

/// A stack of scopes mapping names to bindings.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    scopes: Vec<IndexMap<String, T>>,
}

impl<T> SymbolTable<T> {
    /// A fresh table with a single (global) scope.
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![IndexMap::new()],
        }
    }

    /// Push an empty innermost scope.
    pub fn create(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    /// Discard the innermost scope.
    ///
    /// # Panics
    /// Panics if called with only the global scope left; scope pushes and
    /// pops are strictly paired by the analyzer.
    pub fn pop(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    /// Number of live scopes (the global scope counts as one).
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Insert into the innermost scope.
    pub fn add(&mut self, name: impl Into<String>, value: T) {
        let last = self.scopes.len() - 1;
        self.scopes[last].insert(name.into(), value);
    }

    /// Insert into the scope at `depth` (0 = outermost). Used to register
    /// function names globally while their bodies are being checked.
    pub fn add_at_depth(&mut self, name: impl Into<String>, value: T, depth: usize) {
        self.scopes[depth].insert(name.into(), value);
    }

    /// Search innermost-to-outermost; first hit wins.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Inspect only the innermost scope.
    pub fn lookup_in_current_scope(&self, name: &str) -> Option<&T> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
