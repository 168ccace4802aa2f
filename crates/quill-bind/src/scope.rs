//! The nested lexical scope stack.
//!
//! Each scope maps names to symbols. Child scopes shadow parent bindings;
//! redeclaring a name within the same scope is an error surfaced to the
//! binder through the `Result` returns here.

use std::collections::HashMap;
use std::rc::Rc;

use quill_hir::{MethodSymbol, VariableSymbol};

#[derive(Default)]
pub(crate) struct Scope {
    variables: HashMap<String, Rc<VariableSymbol>>,
    /// Methods declared in this scope: one per name, no overloading within
    /// a single scope.
    methods: HashMap<String, Rc<MethodSymbol>>,
    /// Methods imported with `with Namespace;`. Several namespaces may
    /// contribute the same simple name; call binding disambiguates.
    imported: HashMap<String, Vec<Rc<MethodSymbol>>>,
    /// Namespace aliases from `with X = A.B;`.
    aliases: HashMap<String, String>,
}

pub(crate) struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the root scope");
        self.scopes.pop();
    }

    fn current(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    /// Declare a variable in the current scope. `Err` means the name is
    /// already taken in this scope (shadowing an outer scope is fine).
    pub fn declare_variable(&mut self, symbol: Rc<VariableSymbol>) -> Result<(), ()> {
        let scope = self.current();
        if scope.variables.contains_key(&symbol.name) {
            return Err(());
        }
        scope.variables.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Look a name up, walking outward through enclosing scopes.
    pub fn lookup_variable(&self, name: &str) -> Option<Rc<VariableSymbol>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.variables.get(name).cloned())
    }

    pub fn declare_method(&mut self, symbol: Rc<MethodSymbol>) -> Result<(), ()> {
        let scope = self.current();
        if scope.methods.contains_key(&symbol.name) {
            return Err(());
        }
        scope.methods.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    pub fn import_method(&mut self, symbol: Rc<MethodSymbol>) {
        self.current()
            .imported
            .entry(symbol.name.clone())
            .or_default()
            .push(symbol);
    }

    /// Candidate methods for a simple name: the nearest scope that knows
    /// the name contributes all of its candidates (declared and imported).
    pub fn lookup_methods(&self, name: &str) -> Vec<Rc<MethodSymbol>> {
        for scope in self.scopes.iter().rev() {
            let mut candidates = Vec::new();
            if let Some(declared) = scope.methods.get(name) {
                candidates.push(Rc::clone(declared));
            }
            if let Some(imported) = scope.imported.get(name) {
                candidates.extend(imported.iter().cloned());
            }
            if !candidates.is_empty() {
                return candidates;
            }
        }
        Vec::new()
    }

    /// The method declared (not imported) under `name` in the current
    /// scope, if any. Used to pair a declaration statement back up with the
    /// symbol its hoist pass created.
    pub fn lookup_declared_method_here(&self, name: &str) -> Option<Rc<MethodSymbol>> {
        self.scopes
            .last()
            .expect("scope stack is never empty")
            .methods
            .get(name)
            .cloned()
    }

    pub fn declare_alias(&mut self, name: String, path: String) {
        self.current().aliases.insert(name, path);
    }

    pub fn lookup_alias(&self, name: &str) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.aliases.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_hir::{SymbolId, Type};

    fn variable(id: u32, name: &str) -> Rc<VariableSymbol> {
        Rc::new(VariableSymbol::new(SymbolId(id), name, Type::Int, false, true))
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut scopes = ScopeStack::new();
        assert!(scopes.declare_variable(variable(0, "x")).is_ok());
        assert!(scopes.declare_variable(variable(1, "x")).is_err());
    }

    #[test]
    fn nested_scopes_shadow_and_restore() {
        let mut scopes = ScopeStack::new();
        let outer = variable(0, "x");
        scopes.declare_variable(Rc::clone(&outer)).unwrap();

        scopes.push();
        let inner = variable(1, "x");
        assert!(scopes.declare_variable(Rc::clone(&inner)).is_ok());
        assert_eq!(scopes.lookup_variable("x"), Some(inner));

        scopes.pop();
        assert_eq!(scopes.lookup_variable("x"), Some(outer));
    }

    #[test]
    fn method_lookup_stops_at_the_nearest_scope() {
        use quill_ast::Span;

        let mut scopes = ScopeStack::new();
        let outer = Rc::new(MethodSymbol::new(
            SymbolId(0),
            "f",
            "A.f",
            Vec::new(),
            Some(Type::Void),
            Span::default(),
        ));
        scopes.import_method(outer);

        scopes.push();
        let inner = Rc::new(MethodSymbol::new(
            SymbolId(1),
            "f",
            "f",
            Vec::new(),
            Some(Type::Void),
            Span::default(),
        ));
        scopes.declare_method(Rc::clone(&inner)).unwrap();

        let candidates = scopes.lookup_methods("f");
        assert_eq!(candidates, vec![inner]);
    }
}
