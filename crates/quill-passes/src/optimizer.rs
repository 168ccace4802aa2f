//! Constant folding, constant propagation and dead-code elimination.
//!
//! A bottom-up [`BoundTreeRewriter`] specialization over the lowered bound
//! tree. Along the way it tracks which variables each root expression uses
//! and which variables are reassigned after initialization; both tables are
//! private working state for one run and are rebuilt from scratch on the
//! next.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use quill_hir::{
    BoundExpr, BoundMethod, BoundProgram, BoundStmt, BoundTreeRewriter, SymbolId, Value,
    VariableSymbol, literal_eval,
};

/// Optimize a lowered program. Unchanged subtrees are shared with the
/// input, and optimizing an already-optimized program returns it
/// structurally unchanged.
pub fn optimize(program: &BoundProgram) -> BoundProgram {
    let mut optimizer = Optimizer::new(program.symbol_count);

    let statements = optimizer
        .rewrite_statements(&program.statements)
        .unwrap_or_else(|| program.statements.clone());
    let methods = program
        .methods
        .iter()
        .map(|method| BoundMethod {
            method: Rc::clone(&method.method),
            statements: optimizer
                .rewrite_statements(&method.statements)
                .unwrap_or_else(|| method.statements.clone()),
        })
        .collect();

    BoundProgram {
        statements,
        methods,
        symbol_count: optimizer.next_symbol,
    }
}

pub struct Optimizer {
    next_symbol: u32,
    /// Which root expressions reference each variable.
    variable_usage: HashMap<SymbolId, HashSet<*const BoundExpr>>,
    /// Variables written after initialization; never promoted to constants.
    reassigned: HashSet<SymbolId>,
    /// Replacement map from a variable to the symbol that superseded it
    /// (a read-only variable promoted to a constant).
    updated: HashMap<SymbolId, Rc<VariableSymbol>>,
}

impl Optimizer {
    pub fn new(next_symbol: u32) -> Self {
        Self {
            next_symbol,
            variable_usage: HashMap::new(),
            reassigned: HashSet::new(),
            updated: HashMap::new(),
        }
    }

    pub fn reassigned_variables(&self) -> &HashSet<SymbolId> {
        &self.reassigned
    }

    pub fn variable_usage(&self) -> &HashMap<SymbolId, HashSet<*const BoundExpr>> {
        &self.variable_usage
    }

    fn next_id(&mut self) -> SymbolId {
        let id = self.next_symbol;
        self.next_symbol += 1;
        SymbolId(id)
    }

    /// The variable itself, or whatever symbol has replaced it.
    fn active_variable(&self, variable: &Rc<VariableSymbol>) -> Rc<VariableSymbol> {
        let mut current = Rc::clone(variable);
        while let Some(next) = self.updated.get(&current.id) {
            current = Rc::clone(next);
        }
        current
    }

    fn update_variable(&mut self, old: &Rc<VariableSymbol>, new: Rc<VariableSymbol>) {
        let usage = self.variable_usage.remove(&old.id).unwrap_or_default();
        self.variable_usage.insert(new.id, usage);
        if self.reassigned.remove(&old.id) {
            self.reassigned.insert(new.id);
        }
        self.updated.insert(old.id, new);
    }
}

impl BoundTreeRewriter for Optimizer {
    /// The initializer is rewritten first; a read-only variable whose
    /// initializer folded to a literal is promoted to a constant symbol and
    /// the declaration itself disappears — constants have no runtime
    /// storage.
    fn rewrite_variable_declaration(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::VariableDeclaration {
            variable,
            initializer,
        } = stmt.as_ref()
        else {
            unreachable!("rewrite_variable_declaration on non-declaration");
        };

        let rewritten = self.rewrite_root_expr(initializer);

        let active = self.active_variable(variable);
        self.variable_usage.insert(active.id, HashSet::new());

        if active.read_only && !self.reassigned.contains(&active.id) {
            if let Some(value) = rewritten.as_literal() {
                let id = self.next_id();
                let constant = Rc::new(VariableSymbol::constant(id, &active, value.clone()));
                self.update_variable(&active, constant);
                return Rc::new(BoundStmt::NoOp);
            }
        }

        if Rc::ptr_eq(&rewritten, initializer) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::VariableDeclaration {
                variable: Rc::clone(variable),
                initializer: rewritten,
            })
        }
    }

    /// References to promoted constants become literals (and re-enter the
    /// rewriter, since further folding may now apply); other references are
    /// recorded against their root expression for usage tracking.
    fn rewrite_variable_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        let BoundExpr::Variable { variable } = expr.as_ref() else {
            unreachable!("rewrite_variable_expression on non-variable");
        };

        let active = self.active_variable(variable);
        if let Some(value) = &active.constant {
            let result = BoundExpr::literal(value.clone());
            return self.rewrite_expr(&result, root);
        }

        self.variable_usage
            .entry(active.id)
            .or_default()
            .insert(Rc::as_ptr(root));
        Rc::clone(expr)
    }

    fn rewrite_assignment_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        let BoundExpr::Assignment {
            variable,
            expr: value,
        } = expr.as_ref()
        else {
            unreachable!("rewrite_assignment_expression on non-assignment");
        };

        let active = self.active_variable(variable);
        self.reassigned.insert(active.id);

        let rewritten = self.rewrite_expr(value, root);
        if Rc::ptr_eq(&rewritten, value) {
            Rc::clone(expr)
        } else {
            Rc::new(BoundExpr::Assignment {
                variable: Rc::clone(variable),
                expr: rewritten,
            })
        }
    }

    /// Operands fold when literal; increment/decrement mark their variable
    /// reassigned and are never folded.
    fn rewrite_unary_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        let BoundExpr::Unary { op, operand } = expr.as_ref() else {
            unreachable!("rewrite_unary_expression on non-unary");
        };

        if op.kind.is_increment_or_decrement() {
            if let BoundExpr::Variable { variable } = operand.as_ref() {
                let active = self.active_variable(variable);
                self.reassigned.insert(active.id);
            }
        }

        let rewritten = self.rewrite_expr(operand, root);

        if !op.kind.is_increment_or_decrement() {
            if let Some(value) = rewritten.as_literal() {
                let result = BoundExpr::literal(literal_eval::evaluate_unary(op.kind, value));
                return self.rewrite_expr(&result, root);
            }
        }

        if Rc::ptr_eq(&rewritten, operand) {
            Rc::clone(expr)
        } else {
            Rc::new(BoundExpr::Unary {
                op,
                operand: rewritten,
            })
        }
    }

    fn rewrite_binary_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        let BoundExpr::Binary { left, op, right } = expr.as_ref() else {
            unreachable!("rewrite_binary_expression on non-binary");
        };

        let new_left = self.rewrite_expr(left, root);
        let new_right = self.rewrite_expr(right, root);

        if let (Some(l), Some(r)) = (new_left.as_literal(), new_right.as_literal()) {
            // Division by a zero literal keeps its runtime behavior.
            if let Ok(value) = literal_eval::evaluate_binary(op.kind, l, r) {
                let result = BoundExpr::literal(value);
                return self.rewrite_expr(&result, root);
            }
        }

        if Rc::ptr_eq(&new_left, left) && Rc::ptr_eq(&new_right, right) {
            Rc::clone(expr)
        } else {
            Rc::new(BoundExpr::Binary {
                left: new_left,
                op,
                right: new_right,
            })
        }
    }

    /// A cast of a literal converts at compile time.
    fn rewrite_conversion_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        let BoundExpr::Conversion { ty, expr: inner } = expr.as_ref() else {
            unreachable!("rewrite_conversion_expression on non-conversion");
        };

        let rewritten = self.rewrite_expr(inner, root);
        if let Some(value) = rewritten.as_literal() {
            let result = BoundExpr::literal(literal_eval::convert(value, *ty));
            return self.rewrite_expr(&result, root);
        }

        if Rc::ptr_eq(&rewritten, inner) {
            Rc::clone(expr)
        } else {
            Rc::new(BoundExpr::Conversion {
                ty: *ty,
                expr: rewritten,
            })
        }
    }

    /// A constant condition turns the branch into a no-op (never taken) or
    /// an unconditional goto (always taken); the goto re-enters the
    /// rewriter so simplification can cascade.
    fn rewrite_conditional_goto_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::ConditionalGoto {
            label,
            condition,
            jump_if,
        } = stmt.as_ref()
        else {
            unreachable!("rewrite_conditional_goto_statement on non-conditional-goto");
        };

        let rewritten = self.rewrite_root_expr(condition);
        if let Some(Value::Bool(value)) = rewritten.as_literal() {
            if value == jump_if {
                let goto = Rc::new(BoundStmt::Goto {
                    label: Rc::clone(label),
                });
                return self.rewrite_stmt(&goto);
            }
            return Rc::new(BoundStmt::NoOp);
        }

        if Rc::ptr_eq(&rewritten, condition) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::ConditionalGoto {
                label: Rc::clone(label),
                condition: rewritten,
                jump_if: *jump_if,
            })
        }
    }

    /// Expression statements whose expression cannot mutate anything are
    /// deleted; deleting one also removes it from every usage set.
    fn rewrite_expression_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::Expression { expr } = stmt.as_ref() else {
            unreachable!("rewrite_expression_statement on non-expression");
        };

        if !expr.has_side_effects() {
            let pointer = Rc::as_ptr(expr);
            for usages in self.variable_usage.values_mut() {
                usages.remove(&pointer);
            }
            return Rc::new(BoundStmt::NoOp);
        }

        let rewritten = self.rewrite_root_expr(expr);
        if Rc::ptr_eq(&rewritten, expr) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::Expression { expr: rewritten })
        }
    }
}
