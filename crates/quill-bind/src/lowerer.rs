//! Lowering of structured control flow into label/goto form.
//!
//! A [`BoundTreeRewriter`] specialization: `if`/`while`/`do`/`for` become
//! label and (conditional) goto sequences, method declaration statements are
//! hoisted out into the program's method table, and the resulting tree is
//! flattened into the flat statement sequence the evaluator executes.

use std::rc::Rc;

use quill_hir::{
    BoundExpr, BoundMethod, BoundStmt, BoundTreeRewriter, LabelSymbol, MethodSymbol, SymbolId,
};

pub(crate) struct Lowerer {
    next_symbol: u32,
    methods: Vec<BoundMethod>,
}

impl Lowerer {
    pub fn new(next_symbol: u32) -> Self {
        Self {
            next_symbol,
            methods: Vec::new(),
        }
    }

    pub fn next_symbol(&self) -> u32 {
        self.next_symbol
    }

    pub fn take_methods(&mut self) -> Vec<BoundMethod> {
        std::mem::take(&mut self.methods)
    }

    fn generate_label(&mut self) -> Rc<LabelSymbol> {
        let id = self.next_symbol;
        self.next_symbol += 1;
        Rc::new(LabelSymbol::new(SymbolId(id), format!("L{id}")))
    }

    /// Lower a body to its flat statement sequence. Void method bodies get
    /// an implicit trailing `return` when control can fall off the end.
    pub fn lower_body(
        &mut self,
        body: &Rc<BoundStmt>,
        method: Option<&Rc<MethodSymbol>>,
    ) -> Vec<Rc<BoundStmt>> {
        let rewritten = self.rewrite_stmt(body);
        let mut flat = Vec::new();
        flatten(&rewritten, &mut flat);

        let falls_through = !matches!(
            flat.last().map(Rc::as_ref),
            Some(BoundStmt::Return { .. } | BoundStmt::Goto { .. })
        );
        if falls_through && method.is_some_and(|m| m.is_void()) {
            flat.push(Rc::new(BoundStmt::Return { expr: None }));
        }
        flat
    }

    fn label_stmt(label: &Rc<LabelSymbol>) -> Rc<BoundStmt> {
        Rc::new(BoundStmt::Label {
            label: Rc::clone(label),
        })
    }

    fn goto_stmt(label: &Rc<LabelSymbol>) -> Rc<BoundStmt> {
        Rc::new(BoundStmt::Goto {
            label: Rc::clone(label),
        })
    }

    fn goto_if(label: &Rc<LabelSymbol>, condition: &Rc<BoundExpr>, jump_if: bool) -> Rc<BoundStmt> {
        Rc::new(BoundStmt::ConditionalGoto {
            label: Rc::clone(label),
            condition: Rc::clone(condition),
            jump_if,
        })
    }
}

/// Flatten nested blocks into a single statement list, dropping no-ops.
fn flatten(stmt: &Rc<BoundStmt>, out: &mut Vec<Rc<BoundStmt>>) {
    match stmt.as_ref() {
        BoundStmt::Block { statements } => {
            for s in statements {
                flatten(s, out);
            }
        }
        BoundStmt::NoOp => {}
        _ => out.push(Rc::clone(stmt)),
    }
}

impl BoundTreeRewriter for Lowerer {
    /// ```text
    /// if <condition>              goto else unless <condition>
    ///     <then>                  <then>
    /// else             ==>       goto end
    ///     <else>                 else:
    ///                            <else>
    ///                            end:
    /// ```
    fn rewrite_if_statement(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::If {
            condition,
            then_branch,
            else_branch,
        } = stmt.as_ref()
        else {
            unreachable!("rewrite_if_statement on non-if");
        };

        let end_label = self.generate_label();
        let statements = match else_branch {
            None => vec![
                Self::goto_if(&end_label, condition, false),
                Rc::clone(then_branch),
                Self::label_stmt(&end_label),
            ],
            Some(else_branch) => {
                let else_label = self.generate_label();
                vec![
                    Self::goto_if(&else_label, condition, false),
                    Rc::clone(then_branch),
                    Self::goto_stmt(&end_label),
                    Self::label_stmt(&else_label),
                    Rc::clone(else_branch),
                    Self::label_stmt(&end_label),
                ]
            }
        };
        let result = Rc::new(BoundStmt::Block { statements });
        self.rewrite_stmt(&result)
    }

    /// ```text
    /// while <condition>          continue:
    ///     <body>        ==>      goto break unless <condition>
    ///                            <body>
    ///                            goto continue
    ///                            break:
    /// ```
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

        let result = Rc::new(BoundStmt::Block {
            statements: vec![
                Self::label_stmt(continue_label),
                Self::goto_if(break_label, condition, false),
                Rc::clone(body),
                Self::goto_stmt(continue_label),
                Self::label_stmt(break_label),
            ],
        });
        self.rewrite_stmt(&result)
    }

    /// ```text
    /// do                         start:
    ///     <body>        ==>      <body>
    /// while <condition>;         continue:
    ///                            goto start if <condition>
    ///                            break:
    /// ```
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

        let start_label = self.generate_label();
        let result = Rc::new(BoundStmt::Block {
            statements: vec![
                Self::label_stmt(&start_label),
                Rc::clone(body),
                Self::label_stmt(continue_label),
                Self::goto_if(&start_label, condition, true),
                Self::label_stmt(break_label),
            ],
        });
        self.rewrite_stmt(&result)
    }

    /// ```text
    /// for (<init>; <condition>; <update>)        <init>
    ///     <body>                                 check:
    ///                                   ==>      goto break unless <condition>
    ///                                            <body>
    ///                                            continue:
    ///                                            <update>
    ///                                            goto check
    ///                                            break:
    /// ```
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

        let check_label = self.generate_label();
        let result = Rc::new(BoundStmt::Block {
            statements: vec![
                Rc::clone(init),
                Self::label_stmt(&check_label),
                Self::goto_if(break_label, condition, false),
                Rc::clone(body),
                Self::label_stmt(continue_label),
                Rc::clone(update),
                Self::goto_stmt(&check_label),
                Self::label_stmt(break_label),
            ],
        });
        self.rewrite_stmt(&result)
    }

    /// Method bodies are lowered separately and collected into the program;
    /// the declaration statement itself disappears.
    fn rewrite_method_declaration(&mut self, stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
        let BoundStmt::MethodDeclaration { method, body } = stmt.as_ref() else {
            unreachable!("rewrite_method_declaration on non-method");
        };
        let statements = self.lower_body(body, Some(method));
        self.methods.push(BoundMethod {
            method: Rc::clone(method),
            statements,
        });
        Rc::new(BoundStmt::NoOp)
    }
}
