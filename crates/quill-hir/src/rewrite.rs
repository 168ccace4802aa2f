//! The generic bottom-up bound-tree rewriter.
//!
//! Each rewrite method returns either the original `Rc` (unchanged — this
//! is the structural-sharing contract) or a newly allocated node built from
//! rewritten children. Sequence rewriting only allocates once the first
//! changed element is found, copying earlier untouched elements by
//! reference.
//!
//! The lowerer and the optimizer specialize this trait by overriding the
//! per-kind methods they care about.

use std::rc::Rc;

use crate::node::{BoundExpr, BoundStmt};

pub trait BoundTreeRewriter {
    // -- Statements --

    /// Rewrite a statement sequence. Returns `None` when every element was
    /// returned unchanged.
    fn rewrite_statements(&mut self, statements: &[Rc<BoundStmt>]) -> Option<Vec<Rc<BoundStmt>>> {
        let mut rewritten: Option<Vec<Rc<BoundStmt>>> = None;
        for (index, old) in statements.iter().enumerate() {
            let new = self.rewrite_stmt(old);

            if rewritten.is_none() && !Rc::ptr_eq(&new, old) {
                // First difference: copy the untouched prefix by reference.
                let mut list = Vec::with_capacity(statements.len());
                list.extend(statements[..index].iter().cloned());
                rewritten = Some(list);
            }
            if let Some(list) = rewritten.as_mut() {
                list.push(new);
            }
        }
        rewritten
    }

    fn rewrite_stmt(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        match stmt.as_ref() {
            BoundStmt::Block { .. } => self.rewrite_block_statement(stmt),
            BoundStmt::VariableDeclaration { .. } => self.rewrite_variable_declaration(stmt),
            BoundStmt::MethodDeclaration { .. } => self.rewrite_method_declaration(stmt),
            BoundStmt::If { .. } => self.rewrite_if_statement(stmt),
            BoundStmt::While { .. } => self.rewrite_while_statement(stmt),
            BoundStmt::DoWhile { .. } => self.rewrite_do_while_statement(stmt),
            BoundStmt::For { .. } => self.rewrite_for_statement(stmt),
            BoundStmt::Label { .. } => self.rewrite_label_statement(stmt),
            BoundStmt::Goto { .. } => self.rewrite_goto_statement(stmt),
            BoundStmt::ConditionalGoto { .. } => self.rewrite_conditional_goto_statement(stmt),
            BoundStmt::Return { .. } => self.rewrite_return_statement(stmt),
            BoundStmt::Expression { .. } => self.rewrite_expression_statement(stmt),
            BoundStmt::NoOp => Rc::clone(stmt),
        }
    }

    /// An empty block collapses to a no-op and a one-statement block
    /// inlines to that statement.
    fn rewrite_block_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::Block { statements } = stmt.as_ref() else {
            unreachable!("rewrite_block_statement on non-block");
        };
        match statements.len() {
            0 => Rc::new(BoundStmt::NoOp),
            1 => self.rewrite_stmt(&statements[0]),
            _ => match self.rewrite_statements(statements) {
                Some(statements) => Rc::new(BoundStmt::Block { statements }),
                None => Rc::clone(stmt),
            },
        }
    }

    fn rewrite_variable_declaration(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::VariableDeclaration {
            variable,
            initializer,
        } = stmt.as_ref()
        else {
            unreachable!("rewrite_variable_declaration on non-declaration");
        };
        let rewritten = self.rewrite_root_expr(initializer);
        if Rc::ptr_eq(&rewritten, initializer) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::VariableDeclaration {
                variable: Rc::clone(variable),
                initializer: rewritten,
            })
        }
    }

    fn rewrite_method_declaration(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::MethodDeclaration { method, body } = stmt.as_ref() else {
            unreachable!("rewrite_method_declaration on non-method");
        };
        let rewritten = self.rewrite_stmt(body);
        if Rc::ptr_eq(&rewritten, body) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::MethodDeclaration {
                method: Rc::clone(method),
                body: rewritten,
            })
        }
    }

    fn rewrite_if_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::If {
            condition,
            then_branch,
            else_branch,
        } = stmt.as_ref()
        else {
            unreachable!("rewrite_if_statement on non-if");
        };
        let new_condition = self.rewrite_root_expr(condition);
        let new_then = self.rewrite_stmt(then_branch);
        let new_else = else_branch.as_ref().map(|branch| self.rewrite_stmt(branch));

        let unchanged = Rc::ptr_eq(&new_condition, condition)
            && Rc::ptr_eq(&new_then, then_branch)
            && match (&new_else, else_branch) {
                (Some(new), Some(old)) => Rc::ptr_eq(new, old),
                (None, None) => true,
                _ => false,
            };
        if unchanged {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::If {
                condition: new_condition,
                then_branch: new_then,
                else_branch: new_else,
            })
        }
    }

    fn rewrite_while_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::While {
            condition,
            body,
            continue_label,
            break_label,
        } = stmt.as_ref()
        else {
            unreachable!("rewrite_while_statement on non-while");
        };
        let new_condition = self.rewrite_root_expr(condition);
        let new_body = self.rewrite_stmt(body);
        if Rc::ptr_eq(&new_condition, condition) && Rc::ptr_eq(&new_body, body) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::While {
                condition: new_condition,
                body: new_body,
                continue_label: Rc::clone(continue_label),
                break_label: Rc::clone(break_label),
            })
        }
    }

    fn rewrite_do_while_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::DoWhile {
            body,
            condition,
            continue_label,
            break_label,
        } = stmt.as_ref()
        else {
            unreachable!("rewrite_do_while_statement on non-do-while");
        };
        let new_body = self.rewrite_stmt(body);
        let new_condition = self.rewrite_root_expr(condition);
        if Rc::ptr_eq(&new_body, body) && Rc::ptr_eq(&new_condition, condition) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::DoWhile {
                body: new_body,
                condition: new_condition,
                continue_label: Rc::clone(continue_label),
                break_label: Rc::clone(break_label),
            })
        }
    }

    fn rewrite_for_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::For {
            init,
            condition,
            update,
            body,
            continue_label,
            break_label,
        } = stmt.as_ref()
        else {
            unreachable!("rewrite_for_statement on non-for");
        };
        let new_init = self.rewrite_stmt(init);
        let new_condition = self.rewrite_root_expr(condition);
        let new_update = self.rewrite_stmt(update);
        let new_body = self.rewrite_stmt(body);

        if Rc::ptr_eq(&new_init, init)
            && Rc::ptr_eq(&new_condition, condition)
            && Rc::ptr_eq(&new_update, update)
            && Rc::ptr_eq(&new_body, body)
        {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::For {
                init: new_init,
                condition: new_condition,
                update: new_update,
                body: new_body,
                continue_label: Rc::clone(continue_label),
                break_label: Rc::clone(break_label),
            })
        }
    }

    fn rewrite_label_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        Rc::clone(stmt)
    }

    fn rewrite_goto_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        Rc::clone(stmt)
    }

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

    fn rewrite_return_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::Return { expr } = stmt.as_ref() else {
            unreachable!("rewrite_return_statement on non-return");
        };
        let Some(expr) = expr else {
            return Rc::clone(stmt);
        };
        let rewritten = self.rewrite_root_expr(expr);
        if Rc::ptr_eq(&rewritten, expr) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::Return {
                expr: Some(rewritten),
            })
        }
    }

    fn rewrite_expression_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::Expression { expr } = stmt.as_ref() else {
            unreachable!("rewrite_expression_statement on non-expression");
        };
        let rewritten = self.rewrite_root_expr(expr);
        if Rc::ptr_eq(&rewritten, expr) {
            Rc::clone(stmt)
        } else {
            Rc::new(BoundStmt::Expression { expr: rewritten })
        }
    }

    // -- Expressions --

    /// Rewrite an expression sequence with the same first-difference rule
    /// as [`BoundTreeRewriter::rewrite_statements`].
    fn rewrite_expressions(
        &mut self,
        expressions: &[Rc<BoundExpr>],
        root: &Rc<BoundExpr>,
    ) -> Option<Vec<Rc<BoundExpr>>> {
        let mut rewritten: Option<Vec<Rc<BoundExpr>>> = None;
        for (index, old) in expressions.iter().enumerate() {
            let new = self.rewrite_expr(old, root);

            if rewritten.is_none() && !Rc::ptr_eq(&new, old) {
                let mut list = Vec::with_capacity(expressions.len());
                list.extend(expressions[..index].iter().cloned());
                rewritten = Some(list);
            }
            if let Some(list) = rewritten.as_mut() {
                list.push(new);
            }
        }
        rewritten
    }

    /// Rewrite an expression that is itself a statement's root; usage
    /// tracking keys variable references on this node.
    fn rewrite_root_expr(&mut self, expr: &Rc<BoundExpr>) -> Rc<BoundExpr> {
        let root = Rc::clone(expr);
        self.rewrite_expr(expr, &root)
    }

    fn rewrite_expr(&mut self, expr: &Rc<BoundExpr>, root: &Rc<BoundExpr>) -> Rc<BoundExpr> {
        match expr.as_ref() {
            BoundExpr::Error => Rc::clone(expr),
            BoundExpr::Literal { .. } => self.rewrite_literal_expression(expr, root),
            BoundExpr::Variable { .. } => self.rewrite_variable_expression(expr, root),
            BoundExpr::Assignment { .. } => self.rewrite_assignment_expression(expr, root),
            BoundExpr::Unary { .. } => self.rewrite_unary_expression(expr, root),
            BoundExpr::Binary { .. } => self.rewrite_binary_expression(expr, root),
            BoundExpr::Call { .. } => self.rewrite_call_expression(expr, root),
            BoundExpr::Conversion { .. } => self.rewrite_conversion_expression(expr, root),
        }
    }

    fn rewrite_literal_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        _root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        Rc::clone(expr)
    }

    fn rewrite_variable_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        _root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
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

    fn rewrite_unary_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        let BoundExpr::Unary { op, operand } = expr.as_ref() else {
            unreachable!("rewrite_unary_expression on non-unary");
        };
        let rewritten = self.rewrite_expr(operand, root);
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

    fn rewrite_call_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        let BoundExpr::Call { method, args } = expr.as_ref() else {
            unreachable!("rewrite_call_expression on non-call");
        };
        match self.rewrite_expressions(args, root) {
            Some(args) => Rc::new(BoundExpr::Call {
                method: Rc::clone(method),
                args,
            }),
            None => Rc::clone(expr),
        }
    }

    fn rewrite_conversion_expression(
        &mut self,
        expr: &Rc<BoundExpr>,
        root: &Rc<BoundExpr>,
    ) -> Rc<BoundExpr> {
        let BoundExpr::Conversion { ty, expr: inner } = expr.as_ref() else {
            unreachable!("rewrite_conversion_expression on non-conversion");
        };
        let rewritten = self.rewrite_expr(inner, root);
        if Rc::ptr_eq(&rewritten, inner) {
            Rc::clone(expr)
        } else {
            Rc::new(BoundExpr::Conversion {
                ty: *ty,
                expr: rewritten,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::BoundBinaryOperator;
    use crate::types::Type;
    use crate::value::Value;
    use quill_ast::BinaryOperator;

    /// A rewriter with no overrides must hand every subtree back untouched.
    struct IdentityRewriter;

    impl BoundTreeRewriter for IdentityRewriter {}

    #[test]
    fn identity_rewriter_preserves_instances() {
        let op = BoundBinaryOperator::bind(BinaryOperator::Add, Type::Int, Type::Int).unwrap();
        let expr = Rc::new(BoundExpr::Binary {
            left: BoundExpr::literal(Value::Int(1)),
            op,
            right: BoundExpr::literal(Value::Int(2)),
        });
        let stmt = Rc::new(BoundStmt::Expression {
            expr: Rc::clone(&expr),
        });

        let mut rewriter = IdentityRewriter;
        let rewritten = rewriter.rewrite_stmt(&stmt);
        assert!(Rc::ptr_eq(&rewritten, &stmt));
    }

    #[test]
    fn unchanged_sequences_return_none() {
        let statements = vec![
            Rc::new(BoundStmt::NoOp),
            Rc::new(BoundStmt::Expression {
                expr: BoundExpr::literal(Value::Int(1)),
            }),
        ];
        let mut rewriter = IdentityRewriter;
        assert!(rewriter.rewrite_statements(&statements).is_none());
    }

    /// A rewriter that replaces every literal with 0 but leaves everything
    /// else to the defaults.
    struct ZeroLiterals;

    impl BoundTreeRewriter for ZeroLiterals {
        fn rewrite_literal_expression(
            &mut self,
            expr: &Rc<BoundExpr>,
            _root: &Rc<BoundExpr>,
        ) -> Rc<BoundExpr> {
            match expr.as_literal() {
                Some(Value::Int(0)) => Rc::clone(expr),
                Some(Value::Int(_)) => BoundExpr::literal(Value::Int(0)),
                _ => Rc::clone(expr),
            }
        }
    }

    #[test]
    fn first_difference_copies_untouched_prefix_by_reference() {
        let unchanged = Rc::new(BoundStmt::Expression {
            expr: BoundExpr::literal(Value::Int(0)),
        });
        let changed = Rc::new(BoundStmt::Expression {
            expr: BoundExpr::literal(Value::Int(7)),
        });
        let statements = vec![Rc::clone(&unchanged), Rc::clone(&changed)];

        let mut rewriter = ZeroLiterals;
        let rewritten = rewriter
            .rewrite_statements(&statements)
            .expect("one element changed");
        assert_eq!(rewritten.len(), 2);
        assert!(Rc::ptr_eq(&rewritten[0], &unchanged));
        assert!(!Rc::ptr_eq(&rewritten[1], &changed));
    }
}
