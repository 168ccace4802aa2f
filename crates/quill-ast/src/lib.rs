//! Syntax-tree definitions and source spans for Quill.
//!
//! This crate defines the immutable tree produced by the parser. Every node
//! carries a [`Span`] for source location tracking; nodes own their children
//! and are never mutated after parsing.

use std::fmt;

// ---------------------------------------------------------------------------
// Spans
// ---------------------------------------------------------------------------

/// A half-open byte offset range within the compiled source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start must not exceed its end");
        Self { start, end }
    }

    /// A zero-width span, used for fabricated tokens and synthesized nodes.
    pub fn empty(at: u32) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Create a span that covers both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A value paired with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

// ---------------------------------------------------------------------------
// Type names
// ---------------------------------------------------------------------------

/// A surface type keyword. Semantic types live in `quill-hir`; this is only
/// what the parser saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    Int,
    Float,
    Bool,
    String,
    Char,
}

impl TypeName {
    pub fn keyword(self) -> &'static str {
        match self {
            TypeName::Int => "int",
            TypeName::Float => "float",
            TypeName::Bool => "bool",
            TypeName::String => "string",
            TypeName::Char => "char",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Prefix `+`.
    Identity,
    /// Prefix `-`.
    Negation,
    /// Prefix `!`.
    LogicalNot,
    /// Prefix `~`.
    OnesComplement,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Identity => "+",
            UnaryOperator::Negation => "-",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::OnesComplement => "~",
            UnaryOperator::PreIncrement | UnaryOperator::PostIncrement => "++",
            UnaryOperator::PreDecrement | UnaryOperator::PostDecrement => "--",
        }
    }

    pub fn is_increment_or_decrement(self) -> bool {
        matches!(
            self,
            UnaryOperator::PreIncrement
                | UnaryOperator::PreDecrement
                | UnaryOperator::PostIncrement
                | UnaryOperator::PostDecrement
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
    /// `|>`, parsed but not yet given binding semantics.
    Pipe,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::Pipe => "|>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    AndAssign,
    OrAssign,
}

impl AssignmentOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignmentOperator::Assign => "=",
            AssignmentOperator::AddAssign => "+=",
            AssignmentOperator::SubtractAssign => "-=",
            AssignmentOperator::MultiplyAssign => "*=",
            AssignmentOperator::DivideAssign => "/=",
            AssignmentOperator::AndAssign => "&=",
            AssignmentOperator::OrAssign => "|=",
        }
    }

    /// The binary operator a compound assignment expands to, if any.
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Assign => None,
            AssignmentOperator::AddAssign => Some(BinaryOperator::Add),
            AssignmentOperator::SubtractAssign => Some(BinaryOperator::Subtract),
            AssignmentOperator::MultiplyAssign => Some(BinaryOperator::Multiply),
            AssignmentOperator::DivideAssign => Some(BinaryOperator::Divide),
            AssignmentOperator::AndAssign => Some(BinaryOperator::BitwiseAnd),
            AssignmentOperator::OrAssign => Some(BinaryOperator::BitwiseOr),
        }
    }
}

// ---------------------------------------------------------------------------
// Literal values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Char(char),
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Int(value) => write!(f, "{value}"),
            Lit::Float(value) => write!(f, "{value}"),
            Lit::Bool(value) => write!(f, "{value}"),
            Lit::String(value) => write!(f, "{value:?}"),
            Lit::Char(value) => write!(f, "{value:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// A dot-separated name: `Math.Vectors.dot`, or just `dot`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedName {
    pub segments: Vec<Spanned<String>>,
}

impl QualifiedName {
    pub fn single(name: Spanned<String>) -> Self {
        Self {
            segments: vec![name],
        }
    }

    pub fn span(&self) -> Span {
        let first = self.segments.first().map(|s| s.span).unwrap_or_default();
        let last = self.segments.last().map(|s| s.span).unwrap_or_default();
        first.merge(last)
    }

    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.node)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value.
    Literal(Lit),

    /// Variable reference.
    Name(String),

    /// Unary operator: prefix `+ - ! ~ ++ --` or postfix `++ --`.
    Unary {
        op: Spanned<UnaryOperator>,
        operand: Box<Expr>,
    },

    /// Binary operator: `left op right`.
    Binary {
        op: Spanned<BinaryOperator>,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Parenthesized expression: `(expr)`.
    Parenthesized(Box<Expr>),

    /// `typeof(type)`.
    Typeof { ty: Spanned<TypeName> },

    /// `nameof(identifier)`.
    Nameof { name: Spanned<String> },

    /// Assignment or compound assignment: `name op value`.
    Assignment {
        target: Spanned<String>,
        op: Spanned<AssignmentOperator>,
        value: Box<Expr>,
    },

    /// Method call: `name(args)` or `Namespace.name(args)`.
    Call {
        callee: QualifiedName,
        args: Vec<Expr>,
    },

    /// Explicit cast: `(type)expr`.
    Cast {
        ty: Spanned<TypeName>,
        operand: Box<Expr>,
    },

    /// Indexer: `base[index]`. Parsed-but-not-lowered extension point.
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    /// Array initialization: `{ e1, e2, ... }`. Parsed-but-not-lowered
    /// extension point.
    ArrayInit { elements: Vec<Expr> },
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

pub type Stmt = Spanned<StmtKind>;

/// The keyword introducing a variable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKeyword {
    /// `var` — mutable, type inferred from the initializer.
    Var,
    /// `let` — read-only, type inferred from the initializer.
    Let,
    /// An explicit type keyword — mutable, declared type.
    Type(TypeName),
}

impl fmt::Display for DeclarationKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationKeyword::Var => f.write_str("var"),
            DeclarationKeyword::Let => f.write_str("let"),
            DeclarationKeyword::Type(ty) => ty.fmt(f),
        }
    }
}

/// A method parameter: `int count`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: Spanned<TypeName>,
    pub name: Spanned<String>,
}

/// The body of a method declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    /// `def f() { ... }`
    Block(Vec<Stmt>, Span),
    /// `def f() => expr;`
    Expression(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    /// `None` means void for block bodies, inferred for expression bodies.
    pub return_type: Option<Spanned<TypeName>>,
    pub body: MethodBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<Stmt>),

    VariableDeclaration {
        keyword: Spanned<DeclarationKeyword>,
        name: Spanned<String>,
        initializer: Expr,
    },

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },

    For {
        init: Box<Stmt>,
        condition: Expr,
        update: Box<Stmt>,
        body: Box<Stmt>,
    },

    Goto { label: Spanned<String> },

    Label { name: Spanned<String> },

    Return { value: Option<Expr> },

    Continue,

    Break,

    Expression(Expr),

    MethodDeclaration(MethodDecl),

    /// `namespace A.B { ... }`, or the simple form `namespace A.B;` with no
    /// body (applies to the rest of the file, top level only).
    NamespaceDeclaration {
        name: QualifiedName,
        body: Option<Vec<Stmt>>,
    },

    /// `with A.B;` (import) or `with X = A.B;` (alias).
    With {
        alias: Option<Spanned<String>>,
        namespace: QualifiedName,
    },
}

/// The root of a parsed file.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Debug rendering
// ---------------------------------------------------------------------------

/// Render a compilation unit as an indented tree, for debugging.
pub fn render_unit(unit: &CompilationUnit) -> String {
    let mut out = String::new();
    out.push_str("CompilationUnit\n");
    for stmt in &unit.statements {
        write_stmt(&mut out, stmt, 1);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    indent(out, depth);
    match &stmt.node {
        StmtKind::Block(statements) => {
            out.push_str("BlockStatement\n");
            for s in statements {
                write_stmt(out, s, depth + 1);
            }
        }
        StmtKind::VariableDeclaration {
            keyword,
            name,
            initializer,
        } => {
            out.push_str(&format!(
                "VariableDeclaration {} {}\n",
                keyword.node, name.node
            ));
            write_expr(out, initializer, depth + 1);
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.push_str("IfStatement\n");
            write_expr(out, condition, depth + 1);
            write_stmt(out, then_branch, depth + 1);
            if let Some(else_branch) = else_branch {
                indent(out, depth + 1);
                out.push_str("ElseClause\n");
                write_stmt(out, else_branch, depth + 2);
            }
        }
        StmtKind::While { condition, body } => {
            out.push_str("WhileStatement\n");
            write_expr(out, condition, depth + 1);
            write_stmt(out, body, depth + 1);
        }
        StmtKind::DoWhile { body, condition } => {
            out.push_str("DoWhileStatement\n");
            write_stmt(out, body, depth + 1);
            write_expr(out, condition, depth + 1);
        }
        StmtKind::For {
            init,
            condition,
            update,
            body,
        } => {
            out.push_str("ForStatement\n");
            write_stmt(out, init, depth + 1);
            write_expr(out, condition, depth + 1);
            write_stmt(out, update, depth + 1);
            write_stmt(out, body, depth + 1);
        }
        StmtKind::Goto { label } => {
            out.push_str(&format!("GotoStatement {}\n", label.node));
        }
        StmtKind::Label { name } => {
            out.push_str(&format!("LabelStatement {}\n", name.node));
        }
        StmtKind::Return { value } => {
            out.push_str("ReturnStatement\n");
            if let Some(value) = value {
                write_expr(out, value, depth + 1);
            }
        }
        StmtKind::Continue => out.push_str("ContinueStatement\n"),
        StmtKind::Break => out.push_str("BreakStatement\n"),
        StmtKind::Expression(expr) => {
            out.push_str("ExpressionStatement\n");
            write_expr(out, expr, depth + 1);
        }
        StmtKind::MethodDeclaration(decl) => {
            out.push_str(&format!("MethodDeclaration {}\n", decl.name.node));
            for param in &decl.params {
                indent(out, depth + 1);
                out.push_str(&format!("Parameter {} {}\n", param.ty.node, param.name.node));
            }
            match &decl.body {
                MethodBody::Block(statements, _) => {
                    indent(out, depth + 1);
                    out.push_str("BlockBody\n");
                    for s in statements {
                        write_stmt(out, s, depth + 2);
                    }
                }
                MethodBody::Expression(expr) => {
                    indent(out, depth + 1);
                    out.push_str("ExpressionBody\n");
                    write_expr(out, expr, depth + 2);
                }
            }
        }
        StmtKind::NamespaceDeclaration { name, body } => {
            out.push_str(&format!("NamespaceDeclaration {name}\n"));
            if let Some(body) = body {
                for s in body {
                    write_stmt(out, s, depth + 1);
                }
            }
        }
        StmtKind::With { alias, namespace } => match alias {
            Some(alias) => {
                out.push_str(&format!("WithAlias {} = {namespace}\n", alias.node));
            }
            None => out.push_str(&format!("WithNamespace {namespace}\n")),
        },
    }
}

fn write_expr(out: &mut String, expr: &Expr, depth: usize) {
    indent(out, depth);
    match &expr.node {
        ExprKind::Literal(lit) => {
            out.push_str(&format!("LiteralExpression {lit}\n"));
        }
        ExprKind::Name(name) => {
            if name.is_empty() {
                // A placeholder from parser recovery.
                out.push_str("NameExpression\n");
            } else {
                out.push_str(&format!("NameExpression {name}\n"));
            }
        }
        ExprKind::Unary { op, operand } => {
            out.push_str(&format!("UnaryExpression {:?}\n", op.node));
            write_expr(out, operand, depth + 1);
        }
        ExprKind::Binary { op, left, right } => {
            out.push_str(&format!("BinaryExpression {}\n", op.node.symbol()));
            write_expr(out, left, depth + 1);
            write_expr(out, right, depth + 1);
        }
        ExprKind::Parenthesized(inner) => {
            out.push_str("ParenthesizedExpression\n");
            write_expr(out, inner, depth + 1);
        }
        ExprKind::Typeof { ty } => {
            out.push_str(&format!("TypeofExpression {}\n", ty.node));
        }
        ExprKind::Nameof { name } => {
            out.push_str(&format!("NameofExpression {}\n", name.node));
        }
        ExprKind::Assignment { target, op, value } => {
            out.push_str(&format!(
                "AssignmentExpression {} {}\n",
                target.node,
                op.node.symbol()
            ));
            write_expr(out, value, depth + 1);
        }
        ExprKind::Call { callee, args } => {
            out.push_str(&format!("CallExpression {callee}\n"));
            for arg in args {
                write_expr(out, arg, depth + 1);
            }
        }
        ExprKind::Cast { ty, operand } => {
            out.push_str(&format!("CastExpression {}\n", ty.node));
            write_expr(out, operand, depth + 1);
        }
        ExprKind::Index { base, index } => {
            out.push_str("IndexerExpression\n");
            write_expr(out, base, depth + 1);
            write_expr(out, index, depth + 1);
        }
        ExprKind::ArrayInit { elements } => {
            out.push_str("ArrayInitializationExpression\n");
            for element in elements {
                write_expr(out, element, depth + 1);
            }
        }
    }
}
