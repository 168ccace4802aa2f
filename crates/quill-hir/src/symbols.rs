//! Interned symbols: variables, methods and labels.
//!
//! Symbols are interned per compilation: every declaration produces exactly
//! one symbol, identified by a [`SymbolId`]. Equality and hashing key on the
//! id, so two symbols with the same name in different scopes are distinct
//! and every map keyed on symbols tracks identity, not spelling.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use quill_ast::Span;

use crate::types::Type;
use crate::value::Value;

/// A per-compilation unique symbol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// A variable (or parameter). A symbol with `constant` set is the constant
/// specialization produced by the optimizer: it carries its literal value
/// and has no runtime storage.
#[derive(Debug)]
pub struct VariableSymbol {
    pub id: SymbolId,
    pub name: String,
    pub ty: Type,
    pub read_only: bool,
    /// Declared outside any method, so it lives in the caller-supplied
    /// environment rather than a call frame.
    pub global: bool,
    pub constant: Option<Value>,
}

impl VariableSymbol {
    pub fn new(
        id: SymbolId,
        name: impl Into<String>,
        ty: Type,
        read_only: bool,
        global: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
            read_only,
            global,
            constant: None,
        }
    }

    /// The constant specialization of `variable`, carrying `value`.
    pub fn constant(id: SymbolId, variable: &VariableSymbol, value: Value) -> Self {
        Self {
            id,
            name: variable.name.clone(),
            ty: variable.ty,
            read_only: true,
            global: variable.global,
            constant: Some(value),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }
}

impl PartialEq for VariableSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VariableSymbol {}

impl Hash for VariableSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for VariableSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// A built-in method implemented by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    PrintLine,
}

/// A method. `full_name` includes the declaring namespace path and is what
/// ambiguity diagnostics list.
#[derive(Debug)]
pub struct MethodSymbol {
    pub id: SymbolId,
    pub name: String,
    pub full_name: String,
    pub params: Vec<Rc<VariableSymbol>>,
    pub builtin: Option<Builtin>,
    pub name_span: Span,
    /// `None` while an expression-bodied method's return type has not been
    /// inferred yet.
    return_type: Cell<Option<Type>>,
}

impl MethodSymbol {
    pub fn new(
        id: SymbolId,
        name: impl Into<String>,
        full_name: impl Into<String>,
        params: Vec<Rc<VariableSymbol>>,
        return_type: Option<Type>,
        name_span: Span,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            full_name: full_name.into(),
            params,
            builtin: None,
            name_span,
            return_type: Cell::new(return_type),
        }
    }

    pub fn builtin(
        id: SymbolId,
        name: impl Into<String>,
        params: Vec<Rc<VariableSymbol>>,
        return_type: Type,
        builtin: Builtin,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            full_name: name.clone(),
            name,
            params,
            builtin: Some(builtin),
            name_span: Span::default(),
            return_type: Cell::new(Some(return_type)),
        }
    }

    pub fn return_type(&self) -> Option<Type> {
        self.return_type.get()
    }

    pub fn set_return_type(&self, ty: Type) {
        debug_assert!(
            self.return_type.get().is_none(),
            "return type of '{}' inferred twice",
            self.full_name
        );
        self.return_type.set(Some(ty));
    }

    pub fn is_void(&self) -> bool {
        self.return_type() == Some(Type::Void)
    }
}

impl PartialEq for MethodSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MethodSymbol {}

impl Hash for MethodSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MethodSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// A jump target. References are symbolic (by id), never structural
/// pointers, which keeps the bound tree acyclic.
#[derive(Debug)]
pub struct LabelSymbol {
    pub id: SymbolId,
    pub name: String,
}

impl LabelSymbol {
    pub fn new(id: SymbolId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl PartialEq for LabelSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LabelSymbol {}

impl Hash for LabelSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for LabelSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
