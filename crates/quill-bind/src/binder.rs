//! Name resolution, type checking and lowering.
//!
//! The binder walks the syntax tree against a stack of lexical scopes,
//! resolves operators against the fixed type tables, classifies
//! conversions, and lowers structured control flow into label/goto form.
//! Binding is best-effort: most errors bind to the error type, which
//! suppresses cascading diagnostics on the surrounding subtree.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use quill_ast::{
    AssignmentOperator, BinaryOperator, CompilationUnit, DeclarationKeyword, Expr, ExprKind, Lit,
    MethodBody, MethodDecl, QualifiedName, Span, Spanned, Stmt, StmtKind, TypeName, UnaryOperator,
};
use quill_diag::DiagnosticBag;
use quill_hir::{
    BoundBinaryOperator, BoundExpr, BoundProgram, BoundStmt, BoundUnaryOperator, Builtin,
    Conversion, LabelSymbol, MethodSymbol, SymbolId, Type, Value, VariableSymbol,
};

use crate::control_flow::ControlFlowGraph;
use crate::lowerer::Lowerer;
use crate::scope::ScopeStack;

/// The outcome of binding: the lowered program plus semantic diagnostics.
#[derive(Debug)]
pub struct BindResult {
    pub program: BoundProgram,
    pub diagnostics: DiagnosticBag,
}

/// Bind a syntax tree into a lowered [`BoundProgram`].
pub fn bind(unit: &CompilationUnit) -> BindResult {
    Binder::new().bind_unit(unit)
}

fn to_type(name: TypeName) -> Type {
    match name {
        TypeName::Int => Type::Int,
        TypeName::Float => Type::Float,
        TypeName::Bool => Type::Bool,
        TypeName::String => Type::String,
        TypeName::Char => Type::Char,
    }
}

struct Binder {
    bag: DiagnosticBag,
    scopes: ScopeStack,
    next_symbol: u32,
    /// Innermost-first (continue, break) labels for enclosing loops.
    loop_stack: Vec<(Rc<LabelSymbol>, Rc<LabelSymbol>)>,
    /// User labels of the unit currently being bound (top level or the
    /// current method), collected up front so forward gotos resolve.
    labels: HashMap<String, Rc<LabelSymbol>>,
    current_method: Option<Rc<MethodSymbol>>,
    block_depth: usize,
    /// Namespace path currently being declared into ("" at top level).
    namespace_prefix: String,
    inside_namespace: bool,
    namespace_methods: HashMap<String, Vec<Rc<MethodSymbol>>>,
    namespace_paths: HashSet<String>,
    /// Set once a simple `namespace X;` statement has taken effect; only
    /// declarations may follow it at top level.
    simple_namespace_active: bool,
}

impl Binder {
    fn new() -> Self {
        let mut binder = Self {
            bag: DiagnosticBag::new(),
            scopes: ScopeStack::new(),
            next_symbol: 0,
            loop_stack: Vec::new(),
            labels: HashMap::new(),
            current_method: None,
            block_depth: 0,
            namespace_prefix: String::new(),
            inside_namespace: false,
            namespace_methods: HashMap::new(),
            namespace_paths: HashSet::new(),
            simple_namespace_active: false,
        };
        binder.declare_builtins();
        binder
    }

    fn next_id(&mut self) -> SymbolId {
        let id = self.next_symbol;
        self.next_symbol += 1;
        SymbolId(id)
    }

    fn declare_builtins(&mut self) {
        for ty in [Type::String, Type::Int, Type::Float, Type::Bool, Type::Char] {
            self.declare_builtin("print", Builtin::Print, ty);
            self.declare_builtin("println", Builtin::PrintLine, ty);
        }
    }

    fn declare_builtin(&mut self, name: &str, builtin: Builtin, param_type: Type) {
        let param = Rc::new(VariableSymbol::new(
            self.next_id(),
            "value",
            param_type,
            false,
            false,
        ));
        let method = Rc::new(MethodSymbol::builtin(
            self.next_id(),
            name,
            vec![param],
            Type::Void,
            builtin,
        ));
        self.scopes.import_method(method);
    }

    // -- Unit binding --

    fn bind_unit(mut self, unit: &CompilationUnit) -> BindResult {
        self.hoist_top_level(unit);
        self.labels = self.collect_labels(&unit.statements);

        let mut statements = Vec::new();
        for stmt in &unit.statements {
            if self.simple_namespace_active
                && !matches!(
                    stmt.node,
                    StmtKind::MethodDeclaration(_)
                        | StmtKind::NamespaceDeclaration { .. }
                        | StmtKind::With { .. }
                )
            {
                self.bag.report_illegal_statement_placement(stmt.span);
            }
            statements.push(self.bind_statement(stmt));
        }

        // The program's value is its final expression statement (or the
        // variable a final declaration introduced); rewrite that tail into
        // a return so later passes cannot optimize the result away.
        if let Some(last) = statements.pop() {
            statements.push(convert_result_statement(&last));
        }

        let root = Rc::new(BoundStmt::Block { statements });
        let mut lowerer = Lowerer::new(self.next_symbol);
        let top_level = lowerer.lower_body(&root, None);
        let methods = lowerer.take_methods();
        let symbol_count = lowerer.next_symbol();

        // Non-void methods must return a value on every control path,
        // judged over the lowered label/goto form.
        for method in &methods {
            let returns_value = method
                .method
                .return_type()
                .is_some_and(|ty| !matches!(ty, Type::Void | Type::Error));
            if returns_value && !ControlFlowGraph::new(&method.statements).all_paths_return() {
                self.bag.report_not_all_paths_return(method.method.name_span);
            }
        }

        BindResult {
            program: BoundProgram {
                statements: top_level,
                methods,
                symbol_count,
            },
            diagnostics: self.bag,
        }
    }

    /// Register namespaces and declare top-level methods before binding, so
    /// forward references and `with` imports resolve.
    fn hoist_top_level(&mut self, unit: &CompilationUnit) {
        let mut prefix = String::new();
        for stmt in &unit.statements {
            match &stmt.node {
                StmtKind::NamespaceDeclaration {
                    name,
                    body: Some(body),
                } => {
                    let path = join_namespace(&prefix, &name.to_string());
                    self.register_namespace(&path, body);
                }
                StmtKind::NamespaceDeclaration { name, body: None } => {
                    prefix = join_namespace(&prefix, &name.to_string());
                    self.register_namespace_path(&prefix);
                }
                StmtKind::MethodDeclaration(decl) => {
                    let symbol = self.create_method_symbol(decl, &prefix);
                    if self.scopes.declare_method(Rc::clone(&symbol)).is_err() {
                        self.bag
                            .report_method_already_declared(decl.name.span, &decl.name.node);
                    }
                    if !prefix.is_empty() {
                        self.namespace_methods
                            .entry(prefix.clone())
                            .or_default()
                            .push(symbol);
                    }
                }
                _ => {}
            }
        }
    }

    fn register_namespace_path(&mut self, path: &str) {
        // Every prefix of a declared namespace is itself addressable.
        let mut so_far = String::new();
        for segment in path.split('.') {
            so_far = join_namespace(&so_far, segment);
            self.namespace_paths.insert(so_far.clone());
        }
    }

    fn register_namespace(&mut self, path: &str, body: &[Stmt]) {
        self.register_namespace_path(path);
        for stmt in body {
            match &stmt.node {
                StmtKind::MethodDeclaration(decl) => {
                    let symbol = self.create_method_symbol(decl, path);
                    let members = self.namespace_methods.entry(path.to_string()).or_default();
                    if members.iter().any(|m| m.name == symbol.name) {
                        self.bag
                            .report_method_already_declared(decl.name.span, &decl.name.node);
                    }
                    members.push(symbol);
                }
                StmtKind::NamespaceDeclaration {
                    name,
                    body: Some(nested),
                } => {
                    let nested_path = join_namespace(path, &name.to_string());
                    self.register_namespace(&nested_path, nested);
                }
                _ => {}
            }
        }
    }

    fn create_method_symbol(&mut self, decl: &MethodDecl, prefix: &str) -> Rc<MethodSymbol> {
        let mut params = Vec::new();
        let mut seen = HashSet::new();
        for param in &decl.params {
            if !seen.insert(param.name.node.clone()) {
                self.bag
                    .report_duplicate_parameter_name(param.name.span, &param.name.node);
            }
            params.push(Rc::new(VariableSymbol::new(
                self.next_id(),
                param.name.node.clone(),
                to_type(param.ty.node),
                false,
                false,
            )));
        }

        let return_type = match &decl.return_type {
            Some(ty) => Some(to_type(ty.node)),
            // A block body without an arrow is void; an expression body
            // infers its return type once the body is bound.
            None => match &decl.body {
                MethodBody::Block(..) => Some(Type::Void),
                MethodBody::Expression(_) => None,
            },
        };

        let full_name = join_namespace(prefix, &decl.name.node);
        Rc::new(MethodSymbol::new(
            self.next_id(),
            decl.name.node.clone(),
            full_name,
            params,
            return_type,
            decl.name.span,
        ))
    }

    /// Collect the user labels of one method (or the top level), reporting
    /// duplicates. Nested method bodies have their own label space.
    fn collect_labels(&mut self, statements: &[Stmt]) -> HashMap<String, Rc<LabelSymbol>> {
        fn walk<'a>(stmt: &'a Stmt, found: &mut Vec<&'a Spanned<String>>) {
            match &stmt.node {
                StmtKind::Label { name } => found.push(name),
                StmtKind::Block(statements) => {
                    for s in statements {
                        walk(s, found);
                    }
                }
                StmtKind::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    walk(then_branch, found);
                    if let Some(else_branch) = else_branch {
                        walk(else_branch, found);
                    }
                }
                StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => walk(body, found),
                StmtKind::For {
                    init, update, body, ..
                } => {
                    walk(init, found);
                    walk(update, found);
                    walk(body, found);
                }
                _ => {}
            }
        }

        let mut found = Vec::new();
        for stmt in statements {
            walk(stmt, &mut found);
        }

        let mut labels = HashMap::new();
        for name in found {
            if labels.contains_key(&name.node) {
                self.bag.report_label_already_declared(name.span, &name.node);
                continue;
            }
            let label = Rc::new(LabelSymbol::new(self.next_id(), name.node.clone()));
            labels.insert(name.node.clone(), label);
        }
        labels
    }

    fn generate_label(&mut self) -> Rc<LabelSymbol> {
        let id = self.next_id();
        Rc::new(LabelSymbol::new(id, format!("L{}", id.0)))
    }

    // -- Statements --

    fn bind_statement(&mut self, stmt: &Stmt) -> Rc<BoundStmt> {
        match &stmt.node {
            StmtKind::Block(statements) => self.bind_block(statements),
            StmtKind::VariableDeclaration {
                keyword,
                name,
                initializer,
            } => self.bind_variable_declaration(keyword, name, initializer),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.bind_condition(condition);
                let then_branch = self.bind_statement(then_branch);
                let else_branch = else_branch.as_ref().map(|branch| self.bind_statement(branch));
                Rc::new(BoundStmt::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            StmtKind::While { condition, body } => {
                let condition = self.bind_condition(condition);
                let (continue_label, break_label) = self.push_loop();
                let body = self.bind_statement(body);
                self.loop_stack.pop();
                Rc::new(BoundStmt::While {
                    condition,
                    body,
                    continue_label,
                    break_label,
                })
            }
            StmtKind::DoWhile { body, condition } => {
                let (continue_label, break_label) = self.push_loop();
                let body = self.bind_statement(body);
                self.loop_stack.pop();
                let condition = self.bind_condition(condition);
                Rc::new(BoundStmt::DoWhile {
                    body,
                    condition,
                    continue_label,
                    break_label,
                })
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.scopes.push();
                self.block_depth += 1;
                let init = self.bind_statement(init);
                let condition = self.bind_condition(condition);
                let update = self.bind_statement(update);
                let (continue_label, break_label) = self.push_loop();
                let body = self.bind_statement(body);
                self.loop_stack.pop();
                self.block_depth -= 1;
                self.scopes.pop();
                Rc::new(BoundStmt::For {
                    init,
                    condition,
                    update,
                    body,
                    continue_label,
                    break_label,
                })
            }
            StmtKind::Goto { label } => {
                let symbol = self.labels.get(&label.node).cloned();
                match symbol {
                    Some(symbol) => Rc::new(BoundStmt::Goto { label: symbol }),
                    None => {
                        self.bag.report_undefined_symbol(label.span, &label.node);
                        Rc::new(BoundStmt::NoOp)
                    }
                }
            }
            StmtKind::Label { name } => {
                let symbol = self.labels.get(&name.node).cloned();
                match symbol {
                    // Duplicate label statements share the first declaration's
                    // symbol; the duplicate itself was reported up front.
                    Some(symbol) => Rc::new(BoundStmt::Label { label: symbol }),
                    None => Rc::new(BoundStmt::NoOp),
                }
            }
            StmtKind::Return { value } => self.bind_return(value.as_ref(), stmt.span),
            StmtKind::Continue => self.bind_break_or_continue(stmt.span, false),
            StmtKind::Break => self.bind_break_or_continue(stmt.span, true),
            StmtKind::Expression(expr) => Rc::new(BoundStmt::Expression {
                expr: self.bind_expression(expr),
            }),
            StmtKind::MethodDeclaration(decl) => {
                let symbol = self.scopes.lookup_declared_method_here(&decl.name.node);
                match symbol {
                    Some(symbol) => self.bind_method_body(decl, symbol),
                    // The hoist pass rejected this declaration; there is
                    // nothing to bind against.
                    None => Rc::new(BoundStmt::NoOp),
                }
            }
            StmtKind::NamespaceDeclaration { name, body } => {
                self.bind_namespace_declaration(name, body.as_deref(), stmt.span)
            }
            StmtKind::With { alias, namespace } => self.bind_with(alias.as_ref(), namespace),
        }
    }

    fn push_loop(&mut self) -> (Rc<LabelSymbol>, Rc<LabelSymbol>) {
        let continue_label = self.generate_label();
        let break_label = self.generate_label();
        self.loop_stack
            .push((Rc::clone(&continue_label), Rc::clone(&break_label)));
        (continue_label, break_label)
    }

    fn bind_break_or_continue(&mut self, span: Span, is_break: bool) -> Rc<BoundStmt> {
        let Some((continue_label, break_label)) = self.loop_stack.last() else {
            self.bag.report_unexpected_break_or_continue(span);
            return Rc::new(BoundStmt::NoOp);
        };
        let label = if is_break { break_label } else { continue_label };
        Rc::new(BoundStmt::Goto {
            label: Rc::clone(label),
        })
    }

    fn bind_block(&mut self, statements: &[Stmt]) -> Rc<BoundStmt> {
        self.scopes.push();
        self.block_depth += 1;

        // Hoist method declarations so forward references within the block
        // resolve.
        for stmt in statements {
            if let StmtKind::MethodDeclaration(decl) = &stmt.node {
                let symbol = self.create_method_symbol(decl, "");
                if self.scopes.declare_method(symbol).is_err() {
                    self.bag
                        .report_method_already_declared(decl.name.span, &decl.name.node);
                }
            }
        }

        let statements = statements
            .iter()
            .map(|stmt| self.bind_statement(stmt))
            .collect();

        self.block_depth -= 1;
        self.scopes.pop();
        Rc::new(BoundStmt::Block { statements })
    }

    fn bind_variable_declaration(
        &mut self,
        keyword: &Spanned<DeclarationKeyword>,
        name: &Spanned<String>,
        initializer: &Expr,
    ) -> Rc<BoundStmt> {
        let bound = self.bind_expression(initializer);

        let (ty, read_only, initializer_expr) = match keyword.node {
            DeclarationKeyword::Var | DeclarationKeyword::Let => {
                let mut ty = bound.ty();
                if ty == Type::Void {
                    self.bag.report_cannot_assign_void(initializer.span);
                    ty = Type::Error;
                }
                (ty, keyword.node == DeclarationKeyword::Let, bound)
            }
            DeclarationKeyword::Type(type_name) => {
                let ty = to_type(type_name);
                let converted = self.bind_conversion(bound, ty, initializer.span, false);
                (ty, false, converted)
            }
        };

        let variable = Rc::new(VariableSymbol::new(
            self.next_id(),
            name.node.clone(),
            ty,
            read_only,
            self.current_method.is_none(),
        ));
        if self.scopes.declare_variable(Rc::clone(&variable)).is_err() {
            self.bag
                .report_variable_already_declared(name.span, &name.node);
        }

        Rc::new(BoundStmt::VariableDeclaration {
            variable,
            initializer: initializer_expr,
        })
    }

    fn bind_return(&mut self, value: Option<&Expr>, stmt_span: Span) -> Rc<BoundStmt> {
        let return_type = match &self.current_method {
            // The top level is a void context; a bare `return;` exits it.
            None => Type::Void,
            Some(method) => method.return_type().unwrap_or(Type::Error),
        };

        let expr = match value {
            Some(value) => {
                let bound = self.bind_expression(value);
                if return_type == Type::Void {
                    self.bag.report_invalid_return_in_void_method(value.span);
                    Some(bound)
                } else {
                    Some(self.bind_conversion(bound, return_type, value.span, false))
                }
            }
            None => {
                if !matches!(return_type, Type::Void | Type::Error) {
                    self.bag.report_missing_return_expression(stmt_span);
                }
                None
            }
        };
        Rc::new(BoundStmt::Return { expr })
    }

    fn bind_method_body(&mut self, decl: &MethodDecl, symbol: Rc<MethodSymbol>) -> Rc<BoundStmt> {
        let saved_method = self.current_method.replace(Rc::clone(&symbol));
        let saved_labels = std::mem::take(&mut self.labels);
        let saved_loops = std::mem::take(&mut self.loop_stack);

        self.scopes.push();
        for param in &symbol.params {
            // Duplicate parameter names were reported at declaration time.
            let _ = self.scopes.declare_variable(Rc::clone(param));
        }

        let body = match &decl.body {
            MethodBody::Block(statements, _) => {
                self.labels = self.collect_labels(statements);
                self.bind_block(statements)
            }
            MethodBody::Expression(expr) => {
                let bound = self.bind_expression(expr);
                match symbol.return_type() {
                    None => {
                        // First binding of the body settles the type.
                        symbol.set_return_type(bound.ty());
                        if bound.ty() == Type::Void {
                            Rc::new(BoundStmt::Expression { expr: bound })
                        } else {
                            Rc::new(BoundStmt::Return { expr: Some(bound) })
                        }
                    }
                    Some(Type::Void) => Rc::new(BoundStmt::Expression { expr: bound }),
                    Some(return_type) => {
                        let converted =
                            self.bind_conversion(bound, return_type, expr.span, false);
                        Rc::new(BoundStmt::Return {
                            expr: Some(converted),
                        })
                    }
                }
            }
        };

        self.scopes.pop();
        self.loop_stack = saved_loops;
        self.labels = saved_labels;
        self.current_method = saved_method;

        Rc::new(BoundStmt::MethodDeclaration {
            method: symbol,
            body,
        })
    }

    fn bind_namespace_declaration(
        &mut self,
        name: &QualifiedName,
        body: Option<&[Stmt]>,
        span: Span,
    ) -> Rc<BoundStmt> {
        if self.current_method.is_some() {
            self.bag.report_illegal_namespace_declaration(span);
            return Rc::new(BoundStmt::NoOp);
        }

        let Some(body) = body else {
            // The simple form binds the rest of the file; it is only legal
            // as a direct top-level statement.
            if self.block_depth > 0 || self.inside_namespace {
                self.bag.report_illegal_simple_namespace_declaration(span);
                return Rc::new(BoundStmt::NoOp);
            }
            self.namespace_prefix = join_namespace(&self.namespace_prefix, &name.to_string());
            self.simple_namespace_active = true;
            return Rc::new(BoundStmt::NoOp);
        };

        if self.block_depth > 0 {
            self.bag.report_illegal_namespace_declaration(span);
            return Rc::new(BoundStmt::NoOp);
        }

        let path = join_namespace(&self.namespace_prefix, &name.to_string());
        let saved_prefix = std::mem::replace(&mut self.namespace_prefix, path.clone());
        let saved_inside = std::mem::replace(&mut self.inside_namespace, true);

        // Members see their siblings by simple name.
        self.scopes.push();
        let members = self
            .namespace_methods
            .get(&path)
            .cloned()
            .unwrap_or_default();
        for member in &members {
            let _ = self.scopes.declare_method(Rc::clone(member));
        }

        let mut statements = Vec::new();
        for stmt in body {
            match &stmt.node {
                StmtKind::MethodDeclaration(decl) => {
                    let symbol = members.iter().find(|m| m.name == decl.name.node).cloned();
                    match symbol {
                        Some(symbol) => statements.push(self.bind_method_body(decl, symbol)),
                        None => statements.push(Rc::new(BoundStmt::NoOp)),
                    }
                }
                StmtKind::NamespaceDeclaration { name, body } => {
                    statements.push(self.bind_namespace_declaration(
                        name,
                        body.as_deref(),
                        stmt.span,
                    ));
                }
                StmtKind::With { alias, namespace } => {
                    statements.push(self.bind_with(alias.as_ref(), namespace));
                }
                _ => {
                    self.bag.report_illegal_statement_placement(stmt.span);
                    statements.push(Rc::new(BoundStmt::NoOp));
                }
            }
        }

        self.scopes.pop();
        self.inside_namespace = saved_inside;
        self.namespace_prefix = saved_prefix;
        Rc::new(BoundStmt::Block { statements })
    }

    fn bind_with(
        &mut self,
        alias: Option<&Spanned<String>>,
        namespace: &QualifiedName,
    ) -> Rc<BoundStmt> {
        let path = namespace.to_string();
        if !self.namespace_paths.contains(&path) {
            self.bag.report_undefined_symbol(namespace.span(), &path);
            return Rc::new(BoundStmt::NoOp);
        }

        match alias {
            Some(alias) => {
                self.scopes.declare_alias(alias.node.clone(), path);
            }
            None => {
                let methods = self
                    .namespace_methods
                    .get(&path)
                    .cloned()
                    .unwrap_or_default();
                for method in methods {
                    self.scopes.import_method(method);
                }
            }
        }
        Rc::new(BoundStmt::NoOp)
    }

    // -- Expressions --

    fn bind_expression(&mut self, expr: &Expr) -> Rc<BoundExpr> {
        match &expr.node {
            ExprKind::Literal(lit) => BoundExpr::literal(literal_value(lit)),
            ExprKind::Name(name) => self.bind_name(name, expr.span),
            ExprKind::Parenthesized(inner) => self.bind_expression(inner),
            ExprKind::Unary { op, operand } => self.bind_unary(op, operand),
            ExprKind::Binary { op, left, right } => {
                let left = self.bind_expression(left);
                let right = self.bind_expression(right);
                self.bind_binary_operation(op.node, left, right, op.span)
            }
            ExprKind::Assignment { target, op, value } => self.bind_assignment(target, op, value),
            ExprKind::Call { callee, args } => self.bind_call(callee, args, expr.span),
            ExprKind::Cast { ty, operand } => self.bind_cast(ty, operand),
            ExprKind::Typeof { ty } => {
                BoundExpr::literal(Value::String(to_type(ty.node).name().to_string()))
            }
            ExprKind::Nameof { name } => self.bind_nameof(name),
            ExprKind::Index { .. } => {
                self.bag.report_unsupported_expression(expr.span, "Indexers");
                Rc::new(BoundExpr::Error)
            }
            ExprKind::ArrayInit { .. } => {
                self.bag
                    .report_unsupported_expression(expr.span, "Array initializations");
                Rc::new(BoundExpr::Error)
            }
        }
    }

    fn bind_name(&mut self, name: &str, span: Span) -> Rc<BoundExpr> {
        if name.is_empty() {
            // A fabricated recovery token; the parser already reported it.
            return Rc::new(BoundExpr::Error);
        }
        match self.scopes.lookup_variable(name) {
            Some(variable) => Rc::new(BoundExpr::Variable { variable }),
            None => {
                self.bag.report_undefined_symbol(span, name);
                Rc::new(BoundExpr::Error)
            }
        }
    }

    fn bind_nameof(&mut self, name: &Spanned<String>) -> Rc<BoundExpr> {
        let known = self.scopes.lookup_variable(&name.node).is_some()
            || !self.scopes.lookup_methods(&name.node).is_empty();
        if !known {
            if !name.node.is_empty() {
                self.bag.report_undefined_symbol(name.span, &name.node);
            }
            return Rc::new(BoundExpr::Error);
        }
        BoundExpr::literal(Value::String(name.node.clone()))
    }

    fn bind_unary(&mut self, op: &Spanned<UnaryOperator>, operand: &Expr) -> Rc<BoundExpr> {
        let bound = self.bind_expression(operand);
        if bound.ty().is_error() {
            return Rc::new(BoundExpr::Error);
        }

        if op.node.is_increment_or_decrement() {
            match bound.as_ref() {
                BoundExpr::Variable { variable } => {
                    if variable.read_only {
                        self.bag
                            .report_cannot_assign_read_only(operand.span, &variable.name);
                    }
                }
                _ => {
                    self.bag.report_increment_operand_must_be_variable(operand.span);
                    return Rc::new(BoundExpr::Error);
                }
            }
        }

        match BoundUnaryOperator::bind(op.node, bound.ty()) {
            Some(bound_op) => Rc::new(BoundExpr::Unary {
                op: bound_op,
                operand: bound,
            }),
            None => {
                self.bag
                    .report_undefined_unary_operator(op.span, op.node.symbol(), bound.ty());
                Rc::new(BoundExpr::Error)
            }
        }
    }

    fn bind_binary_operation(
        &mut self,
        op: BinaryOperator,
        left: Rc<BoundExpr>,
        right: Rc<BoundExpr>,
        op_span: Span,
    ) -> Rc<BoundExpr> {
        if op == BinaryOperator::Pipe {
            self.bag.report_unsupported_expression(op_span, "Piped calls");
            return Rc::new(BoundExpr::Error);
        }
        let (left_ty, right_ty) = (left.ty(), right.ty());
        if left_ty.is_error() || right_ty.is_error() {
            return Rc::new(BoundExpr::Error);
        }

        if let Some(bound_op) = BoundBinaryOperator::bind(op, left_ty, right_ty) {
            return Rc::new(BoundExpr::Binary {
                left,
                op: bound_op,
                right,
            });
        }

        // Mixed int/float arithmetic widens the int operand.
        if matches!(
            (left_ty, right_ty),
            (Type::Int, Type::Float) | (Type::Float, Type::Int)
        ) {
            if let Some(bound_op) = BoundBinaryOperator::bind(op, Type::Float, Type::Float) {
                let widen = |expr: Rc<BoundExpr>| {
                    if expr.ty() == Type::Int {
                        Rc::new(BoundExpr::Conversion {
                            ty: Type::Float,
                            expr,
                        })
                    } else {
                        expr
                    }
                };
                return Rc::new(BoundExpr::Binary {
                    left: widen(left),
                    op: bound_op,
                    right: widen(right),
                });
            }
        }

        self.bag
            .report_undefined_binary_operator(op_span, op.symbol(), left_ty, right_ty);
        Rc::new(BoundExpr::Error)
    }

    fn bind_assignment(
        &mut self,
        target: &Spanned<String>,
        op: &Spanned<AssignmentOperator>,
        value: &Expr,
    ) -> Rc<BoundExpr> {
        let bound_value = self.bind_expression(value);

        if target.node.is_empty() {
            return Rc::new(BoundExpr::Error);
        }
        let Some(variable) = self.scopes.lookup_variable(&target.node) else {
            self.bag.report_undefined_symbol(target.span, &target.node);
            return Rc::new(BoundExpr::Error);
        };

        if variable.read_only {
            self.bag
                .report_cannot_assign_read_only(target.span, &variable.name);
        }

        let expr = match op.node.binary_operator() {
            None => self.bind_conversion(bound_value, variable.ty, value.span, false),
            Some(binary_op) => {
                // `a op= b` binds as `a = a op b`.
                let current = Rc::new(BoundExpr::Variable {
                    variable: Rc::clone(&variable),
                });
                let combined =
                    self.bind_binary_operation(binary_op, current, bound_value, op.span);
                self.bind_conversion(combined, variable.ty, value.span, false)
            }
        };

        Rc::new(BoundExpr::Assignment { variable, expr })
    }

    fn bind_cast(&mut self, ty: &Spanned<TypeName>, operand: &Expr) -> Rc<BoundExpr> {
        let bound = self.bind_expression(operand);
        let target = to_type(ty.node);
        if bound.ty().is_error() {
            return Rc::new(BoundExpr::Error);
        }
        self.bind_conversion(bound, target, operand.span, true)
    }

    /// Wrap `expr` in a conversion to `to`, reporting the appropriate
    /// diagnostic when the conversion is missing or needs a cast.
    fn bind_conversion(
        &mut self,
        expr: Rc<BoundExpr>,
        to: Type,
        span: Span,
        allow_explicit: bool,
    ) -> Rc<BoundExpr> {
        let from = expr.ty();
        if from.is_error() || to.is_error() {
            return expr;
        }
        match Conversion::classify(from, to) {
            Conversion::Identity => expr,
            Conversion::Implicit => Rc::new(BoundExpr::Conversion { ty: to, expr }),
            Conversion::Explicit if allow_explicit => {
                Rc::new(BoundExpr::Conversion { ty: to, expr })
            }
            Conversion::Explicit => {
                self.bag.report_cannot_implicitly_convert(span, from, to);
                Rc::new(BoundExpr::Error)
            }
            Conversion::None if allow_explicit => {
                self.bag.report_no_explicit_conversion(span, from, to);
                Rc::new(BoundExpr::Error)
            }
            Conversion::None => {
                self.bag.report_cannot_convert(span, from, to);
                Rc::new(BoundExpr::Error)
            }
        }
    }

    fn bind_condition(&mut self, condition: &Expr) -> Rc<BoundExpr> {
        let bound = self.bind_expression(condition);
        self.bind_conversion(bound, Type::Bool, condition.span, false)
    }

    fn bind_call(&mut self, callee: &QualifiedName, args: &[Expr], span: Span) -> Rc<BoundExpr> {
        let bound_args: Vec<Rc<BoundExpr>> = args.iter().map(|a| self.bind_expression(a)).collect();

        let name = &callee
            .segments
            .last()
            .expect("qualified names have at least one segment")
            .node;

        let candidates = if callee.is_simple() {
            if name.is_empty() {
                return Rc::new(BoundExpr::Error);
            }
            self.scopes.lookup_methods(name)
        } else {
            match self.resolve_qualified_candidates(callee, name) {
                Some(candidates) => candidates,
                None => return Rc::new(BoundExpr::Error),
            }
        };

        if candidates.is_empty() {
            self.bag
                .report_undefined_symbol(callee.span(), &callee.to_string());
            return Rc::new(BoundExpr::Error);
        }

        let arity_matching: Vec<Rc<MethodSymbol>> = candidates
            .iter()
            .filter(|m| m.params.len() == bound_args.len())
            .cloned()
            .collect();
        if arity_matching.is_empty() {
            let first = &candidates[0];
            self.bag
                .report_wrong_argument_count(span, name, first.params.len(), bound_args.len());
            return Rc::new(BoundExpr::Error);
        }

        // Candidates whose every parameter matches exactly win over ones
        // needing implicit conversions.
        let viable_with = |exact: bool| -> Vec<Rc<MethodSymbol>> {
            arity_matching
                .iter()
                .filter(|m| {
                    m.params.iter().zip(&bound_args).all(|(param, arg)| {
                        let conversion = Conversion::classify(arg.ty(), param.ty);
                        if exact {
                            conversion == Conversion::Identity
                        } else {
                            conversion.is_implicit()
                        }
                    })
                })
                .cloned()
                .collect()
        };
        let mut viable = viable_with(true);
        if viable.is_empty() {
            viable = viable_with(false);
        }

        match viable.len() {
            0 => {
                let method = &arity_matching[0];
                for (param, (arg, arg_expr)) in
                    method.params.iter().zip(bound_args.iter().zip(args))
                {
                    if arg.ty().is_error() {
                        return Rc::new(BoundExpr::Error);
                    }
                    if !Conversion::classify(arg.ty(), param.ty).is_implicit() {
                        self.bag.report_wrong_argument_type(
                            arg_expr.span,
                            &method.name,
                            &param.name,
                            param.ty,
                            arg.ty(),
                        );
                        break;
                    }
                }
                Rc::new(BoundExpr::Error)
            }
            1 => {
                let method = viable.remove(0);
                if method.return_type().is_none() {
                    self.bag.report_cannot_infer_return_type(span, name);
                }
                let args = method
                    .params
                    .iter()
                    .zip(bound_args)
                    .map(|(param, arg)| {
                        if Conversion::classify(arg.ty(), param.ty) == Conversion::Implicit {
                            Rc::new(BoundExpr::Conversion {
                                ty: param.ty,
                                expr: arg,
                            })
                        } else {
                            arg
                        }
                    })
                    .collect();
                Rc::new(BoundExpr::Call { method, args })
            }
            _ => {
                let mut names: Vec<String> =
                    viable.iter().map(|m| m.full_name.clone()).collect();
                names.sort();
                self.bag
                    .report_ambiguous_symbol_reference(callee.span(), &names);
                Rc::new(BoundExpr::Error)
            }
        }
    }

    fn resolve_qualified_candidates(
        &mut self,
        callee: &QualifiedName,
        name: &str,
    ) -> Option<Vec<Rc<MethodSymbol>>> {
        let mut segments: Vec<String> = callee
            .segments
            .iter()
            .take(callee.segments.len() - 1)
            .map(|s| s.node.clone())
            .collect();

        // The leading segment may be a namespace alias.
        if let Some(expansion) = self.scopes.lookup_alias(&segments[0]) {
            let mut expanded: Vec<String> = expansion.split('.').map(str::to_string).collect();
            expanded.extend(segments.into_iter().skip(1));
            segments = expanded;
        }
        let path = segments.join(".");

        if !self.namespace_paths.contains(&path) {
            self.bag
                .report_undefined_symbol(callee.span(), &callee.to_string());
            return None;
        }

        Some(
            self.namespace_methods
                .get(&path)
                .map(|methods| {
                    methods
                        .iter()
                        .filter(|m| m.name == name)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
        )
    }
}

fn literal_value(lit: &Lit) -> Value {
    match lit {
        Lit::Int(value) => Value::Int(*value),
        Lit::Float(value) => Value::Float(*value),
        Lit::Bool(value) => Value::Bool(*value),
        Lit::String(value) => Value::String(value.clone()),
        Lit::Char(value) => Value::Char(*value),
    }
}

fn join_namespace(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Rewrite the program's final statement so its value survives to the
/// evaluator: a trailing expression statement becomes a `return`, and a
/// trailing declaration returns the declared variable.
fn convert_result_statement(stmt: &Rc<BoundStmt>) -> Rc<BoundStmt> {
    match stmt.as_ref() {
        BoundStmt::Expression { expr } if !matches!(expr.ty(), Type::Void | Type::Error) => {
            Rc::new(BoundStmt::Return {
                expr: Some(Rc::clone(expr)),
            })
        }
        BoundStmt::VariableDeclaration { variable, .. }
            if !matches!(variable.ty, Type::Void | Type::Error) =>
        {
            let read = Rc::new(BoundExpr::Variable {
                variable: Rc::clone(variable),
            });
            Rc::new(BoundStmt::Block {
                statements: vec![Rc::clone(stmt), Rc::new(BoundStmt::Return { expr: Some(read) })],
            })
        }
        BoundStmt::Block { statements } if !statements.is_empty() => {
            let mut statements = statements.clone();
            let last = statements.pop().expect("block checked non-empty");
            statements.push(convert_result_statement(&last));
            Rc::new(BoundStmt::Block { statements })
        }
        _ => Rc::clone(stmt),
    }
}
