//! Recursive descent parser with precedence climbing for Quill.
//!
//! The parser never fails: an unexpected token is reported as a diagnostic
//! and a placeholder token is fabricated in its place, so the returned tree
//! is always well formed and the whole file is scanned in one pass.

use quill_ast::{
    CompilationUnit, DeclarationKeyword, Expr, ExprKind, Lit, MethodBody, MethodDecl, Param,
    QualifiedName, Span, Spanned, Stmt, StmtKind, TypeName, render_unit,
};
use quill_diag::{DiagnosticBag, SourceText};

use crate::facts;
use crate::lexer;
use crate::token::{Token, TokenKind};

// ---------------------------------------------------------------------------
// SyntaxTree
// ---------------------------------------------------------------------------

/// A parsed source file: the source text, the root node and every lexical
/// and syntactic diagnostic encountered along the way.
#[derive(Debug)]
pub struct SyntaxTree {
    source: SourceText,
    root: CompilationUnit,
    diagnostics: DiagnosticBag,
}

impl SyntaxTree {
    pub fn parse(text: &str) -> Self {
        let (tokens, bag) = lexer::lex(text);
        let mut parser = Parser {
            tokens,
            pos: 0,
            bag,
        };
        let root = parser.parse_compilation_unit();
        Self {
            source: SourceText::new(text),
            root,
            diagnostics: parser.bag,
        }
    }

    pub fn source(&self) -> &SourceText {
        &self.source
    }

    pub fn root(&self) -> &CompilationUnit {
        &self.root
    }

    pub fn diagnostics(&self) -> &DiagnosticBag {
        &self.diagnostics
    }

    /// Render the tree as indented text, for debugging.
    pub fn render(&self) -> String {
        render_unit(&self.root)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    bag: DiagnosticBag,
}

impl Parser {
    // -- Token helpers --

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &Token {
        let index = self.pos + offset;
        self.tokens
            .get(index)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with Eof"))
    }

    fn previous_span(&self) -> Span {
        if self.pos == 0 {
            self.current().span
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current().kind.same_kind(kind)
    }

    /// Consume the current token if it matches `kind`; otherwise report a
    /// diagnostic and fabricate a placeholder token without consuming, so
    /// parsing can continue on the real token.
    fn expect(&mut self, kind: &TokenKind) -> Token {
        if self.check(kind) {
            return self.advance();
        }
        let current = self.current().clone();
        self.bag
            .report_unexpected_token(current.span, current.kind.name(), kind.name());
        Token::new(kind.clone(), Span::empty(current.span.start))
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if let TokenKind::Ident(name) = &self.current().kind {
            let name = name.clone();
            let token = self.advance();
            return Spanned::new(name, token.span);
        }
        let current = self.current().clone();
        self.bag
            .report_unexpected_token(current.span, current.kind.name(), "identifier");
        Spanned::new(String::new(), Span::empty(current.span.start))
    }

    // -- Compilation unit --

    fn parse_compilation_unit(&mut self) -> CompilationUnit {
        let start = self.current().span;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Eof) {
            let before = self.pos;
            statements.push(self.parse_statement(true));

            // If no tokens were consumed by the parse call, escape the loop;
            // the errors have already been reported.
            if self.pos == before {
                break;
            }
        }
        let span = start.merge(self.previous_span());
        CompilationUnit { statements, span }
    }

    // -- Statements --

    fn parse_statement(&mut self, require_semicolon: bool) -> Stmt {
        if matches!(self.current().kind, TokenKind::Var | TokenKind::Let)
            || facts::is_type_keyword(&self.current().kind)
        {
            return self.parse_variable_declaration(require_semicolon);
        }

        let kind = self.current().kind.clone();
        match kind {
            TokenKind::LBrace => self.parse_block_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Goto => self.parse_goto_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Continue => self.parse_keyword_statement(StmtKind::Continue),
            TokenKind::Break => self.parse_keyword_statement(StmtKind::Break),
            TokenKind::Def => self.parse_method_declaration(),
            TokenKind::Namespace => self.parse_namespace_declaration(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Ident(_) if self.peek(1).kind == TokenKind::Colon => {
                self.parse_label_statement()
            }
            _ => self.parse_expression_statement(require_semicolon),
        }
    }

    fn parse_variable_declaration(&mut self, require_semicolon: bool) -> Stmt {
        let keyword_token = self.advance();
        let keyword = match &keyword_token.kind {
            TokenKind::Var => DeclarationKeyword::Var,
            TokenKind::Let => DeclarationKeyword::Let,
            kind => DeclarationKeyword::Type(
                facts::type_name(kind).expect("declaration starts with a declaration keyword"),
            ),
        };
        let keyword = Spanned::new(keyword, keyword_token.span);

        let name = self.expect_ident();
        self.expect(&TokenKind::Eq);
        let initializer = self.parse_expression(0);
        if require_semicolon {
            self.expect(&TokenKind::Semicolon);
        }

        let span = keyword_token.span.merge(self.previous_span());
        Stmt::new(
            StmtKind::VariableDeclaration {
                keyword,
                name,
                initializer,
            },
            span,
        )
    }

    fn parse_block_statement(&mut self) -> Stmt {
        let open = self.expect(&TokenKind::LBrace);
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            let before = self.pos;
            statements.push(self.parse_statement(true));
            if self.pos == before {
                break;
            }
        }
        let close = self.expect(&TokenKind::RBrace);
        Stmt::new(StmtKind::Block(statements), open.span.merge(close.span))
    }

    /// Report a declaration used as the direct body of a conditional or
    /// loop; such bodies must be wrapped in a block.
    fn check_conditional_body(&mut self, body: &Stmt) {
        if matches!(body.node, StmtKind::VariableDeclaration { .. }) {
            self.bag.report_cannot_declare_conditional(body.span);
        }
    }

    fn parse_if_statement(&mut self) -> Stmt {
        let keyword = self.advance();
        self.expect(&TokenKind::LParen);
        let condition = self.parse_expression(0);
        self.expect(&TokenKind::RParen);

        let then_branch = self.parse_statement(true);
        self.check_conditional_body(&then_branch);

        let else_branch = if self.check(&TokenKind::Else) {
            self.advance();
            let else_branch = self.parse_statement(true);
            self.check_conditional_body(&else_branch);
            Some(Box::new(else_branch))
        } else {
            None
        };

        let span = keyword.span.merge(self.previous_span());
        Stmt::new(
            StmtKind::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch,
            },
            span,
        )
    }

    fn parse_while_statement(&mut self) -> Stmt {
        let keyword = self.advance();
        self.expect(&TokenKind::LParen);
        let condition = self.parse_expression(0);
        self.expect(&TokenKind::RParen);

        let body = self.parse_statement(true);
        self.check_conditional_body(&body);

        let span = keyword.span.merge(self.previous_span());
        Stmt::new(
            StmtKind::While {
                condition,
                body: Box::new(body),
            },
            span,
        )
    }

    fn parse_do_while_statement(&mut self) -> Stmt {
        let keyword = self.advance();
        let body = self.parse_statement(true);

        self.expect(&TokenKind::While);
        self.expect(&TokenKind::LParen);
        let condition = self.parse_expression(0);
        self.expect(&TokenKind::RParen);
        self.expect(&TokenKind::Semicolon);

        let span = keyword.span.merge(self.previous_span());
        Stmt::new(
            StmtKind::DoWhile {
                body: Box::new(body),
                condition,
            },
            span,
        )
    }

    fn parse_for_statement(&mut self) -> Stmt {
        let keyword = self.advance();
        self.expect(&TokenKind::LParen);

        let init = self.parse_statement(false);
        self.expect(&TokenKind::Semicolon);
        let init_is_valid = match &init.node {
            StmtKind::VariableDeclaration { .. } => true,
            StmtKind::Expression(expr) => matches!(expr.node, ExprKind::Assignment { .. }),
            _ => false,
        };
        if !init_is_valid {
            self.bag.report_declaration_or_assignment_only(init.span);
        }

        let condition = self.parse_expression(0);
        self.expect(&TokenKind::Semicolon);

        let update = self.parse_statement(false);
        self.expect(&TokenKind::RParen);

        let body = self.parse_statement(true);
        self.check_conditional_body(&body);

        let span = keyword.span.merge(self.previous_span());
        Stmt::new(
            StmtKind::For {
                init: Box::new(init),
                condition,
                update: Box::new(update),
                body: Box::new(body),
            },
            span,
        )
    }

    fn parse_goto_statement(&mut self) -> Stmt {
        let keyword = self.advance();
        let label = self.expect_ident();
        self.expect(&TokenKind::Semicolon);
        let span = keyword.span.merge(self.previous_span());
        Stmt::new(StmtKind::Goto { label }, span)
    }

    fn parse_label_statement(&mut self) -> Stmt {
        let name = self.expect_ident();
        let colon = self.expect(&TokenKind::Colon);
        let span = name.span.merge(colon.span);
        Stmt::new(StmtKind::Label { name }, span)
    }

    fn parse_return_statement(&mut self) -> Stmt {
        let keyword = self.advance();
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(0))
        };
        self.expect(&TokenKind::Semicolon);
        let span = keyword.span.merge(self.previous_span());
        Stmt::new(StmtKind::Return { value }, span)
    }

    fn parse_keyword_statement(&mut self, kind: StmtKind) -> Stmt {
        let keyword = self.advance();
        self.expect(&TokenKind::Semicolon);
        Stmt::new(kind, keyword.span.merge(self.previous_span()))
    }

    fn parse_expression_statement(&mut self, require_semicolon: bool) -> Stmt {
        let expression = self.parse_expression(0);
        if require_semicolon {
            self.expect(&TokenKind::Semicolon);
        }
        let span = expression.span.merge(self.previous_span());
        Stmt::new(StmtKind::Expression(expression), span)
    }

    // -- Declarations --

    fn parse_type_name(&mut self) -> Spanned<TypeName> {
        if let Some(ty) = facts::type_name(&self.current().kind) {
            let token = self.advance();
            return Spanned::new(ty, token.span);
        }
        let current = self.current().clone();
        self.bag
            .report_type_expected(current.span, current.kind.name());
        Spanned::new(TypeName::Int, Span::empty(current.span.start))
    }

    fn parse_method_declaration(&mut self) -> Stmt {
        let keyword = self.advance();
        let name = self.expect_ident();

        self.expect(&TokenKind::LParen);
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.check(&TokenKind::Eof) {
            let before = self.pos;
            let ty = self.parse_type_name();
            let param_name = self.expect_ident();
            params.push(Param {
                ty,
                name: param_name,
            });
            if !self.check(&TokenKind::RParen) && !self.check(&TokenKind::Eof) {
                self.expect(&TokenKind::Comma);
            }
            if self.pos == before {
                break;
            }
        }
        self.expect(&TokenKind::RParen);

        let return_type = if self.check(&TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type_name())
        } else {
            None
        };

        let body = if self.check(&TokenKind::FatArrow) {
            self.advance();
            let expr = self.parse_expression(0);
            self.expect(&TokenKind::Semicolon);
            MethodBody::Expression(expr)
        } else {
            let open = self.expect(&TokenKind::LBrace);
            let mut statements = Vec::new();
            while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
                let before = self.pos;
                statements.push(self.parse_statement(true));
                if self.pos == before {
                    break;
                }
            }
            let close = self.expect(&TokenKind::RBrace);
            MethodBody::Block(statements, open.span.merge(close.span))
        };

        let span = keyword.span.merge(self.previous_span());
        Stmt::new(
            StmtKind::MethodDeclaration(MethodDecl {
                name,
                params,
                return_type,
                body,
            }),
            span,
        )
    }

    fn parse_qualified_name(&mut self) -> QualifiedName {
        let mut segments = vec![self.expect_ident()];
        while self.check(&TokenKind::Dot) {
            self.advance();
            segments.push(self.expect_ident());
        }
        QualifiedName { segments }
    }

    fn parse_namespace_declaration(&mut self) -> Stmt {
        let keyword = self.advance();
        let name = self.parse_qualified_name();

        let body = if self.check(&TokenKind::Semicolon) {
            self.advance();
            None
        } else {
            self.expect(&TokenKind::LBrace);
            let mut statements = Vec::new();
            while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
                let before = self.pos;
                statements.push(self.parse_statement(true));
                if self.pos == before {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace);
            Some(statements)
        };

        let span = keyword.span.merge(self.previous_span());
        Stmt::new(StmtKind::NamespaceDeclaration { name, body }, span)
    }

    fn parse_with_statement(&mut self) -> Stmt {
        let keyword = self.advance();

        let alias = if matches!(self.current().kind, TokenKind::Ident(_))
            && self.peek(1).kind == TokenKind::Eq
        {
            let alias = self.expect_ident();
            self.expect(&TokenKind::Eq);
            Some(alias)
        } else {
            None
        };
        let namespace = self.parse_qualified_name();
        self.expect(&TokenKind::Semicolon);

        let span = keyword.span.merge(self.previous_span());
        Stmt::new(StmtKind::With { alias, namespace }, span)
    }

    // -- Expressions --

    /// Precedence climbing: binds every binary operator whose precedence is
    /// strictly greater than `parent_precedence`, recursing with that
    /// operator's precedence as the new floor.
    fn parse_expression(&mut self, parent_precedence: u8) -> Expr {
        let mut left = self.parse_unary_or_primary(parent_precedence);

        loop {
            let precedence = facts::binary_operator_precedence(&self.current().kind);
            if precedence == 0 || precedence <= parent_precedence {
                break;
            }

            let op_token = self.advance();
            let op = facts::binary_operator(&op_token.kind)
                .expect("token with binary precedence maps to a binary operator");
            let right = self.parse_expression(precedence);
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op: Spanned::new(op, op_token.span),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        left
    }

    fn parse_unary_or_primary(&mut self, parent_precedence: u8) -> Expr {
        // Assignment: an identifier immediately followed by an
        // assignment-class operator.
        if matches!(self.current().kind, TokenKind::Ident(_))
            && facts::assignment_operator(&self.peek(1).kind).is_some()
        {
            return self.parse_assignment_expression();
        }

        // Postfix increment/decrement.
        if matches!(self.current().kind, TokenKind::Ident(_))
            && matches!(
                self.peek(1).kind,
                TokenKind::PlusPlus | TokenKind::MinusMinus
            )
        {
            return self.parse_postfix_unary_expression();
        }

        // Prefix unary.
        let unary_precedence = facts::unary_operator_precedence(&self.current().kind);
        if unary_precedence != 0 && unary_precedence > parent_precedence {
            return self.parse_prefix_unary_expression(unary_precedence);
        }

        self.parse_postfix_expression()
    }

    fn parse_assignment_expression(&mut self) -> Expr {
        let target = self.expect_ident();
        let op_token = self.advance();
        let op = facts::assignment_operator(&op_token.kind)
            .expect("assignment expression starts with an assignment operator");
        let value = self.parse_expression(0);

        let span = target.span.merge(value.span);
        Expr::new(
            ExprKind::Assignment {
                target,
                op: Spanned::new(op, op_token.span),
                value: Box::new(value),
            },
            span,
        )
    }

    fn parse_postfix_unary_expression(&mut self) -> Expr {
        let name = self.expect_ident();
        let operand = Expr::new(ExprKind::Name(name.node.clone()), name.span);
        let op_token = self.advance();
        let op = match op_token.kind {
            TokenKind::PlusPlus => quill_ast::UnaryOperator::PostIncrement,
            _ => quill_ast::UnaryOperator::PostDecrement,
        };

        let span = name.span.merge(op_token.span);
        Expr::new(
            ExprKind::Unary {
                op: Spanned::new(op, op_token.span),
                operand: Box::new(operand),
            },
            span,
        )
    }

    fn parse_prefix_unary_expression(&mut self, unary_precedence: u8) -> Expr {
        let op_token = self.advance();
        let op = facts::prefix_unary_operator(&op_token.kind)
            .expect("token with unary precedence maps to a unary operator");

        // Prefix increment/decrement only accept a name operand; other
        // prefix operators accept a full sub-expression.
        let operand = if op.is_increment_or_decrement() {
            let name = self.expect_ident();
            Expr::new(ExprKind::Name(name.node.clone()), name.span)
        } else {
            self.parse_expression(unary_precedence)
        };

        let span = op_token.span.merge(operand.span);
        Expr::new(
            ExprKind::Unary {
                op: Spanned::new(op, op_token.span),
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// A primary expression followed by any number of indexers.
    fn parse_postfix_expression(&mut self) -> Expr {
        let mut expr = self.parse_primary_expression();
        while self.check(&TokenKind::LBracket) {
            self.advance();
            let index = self.parse_expression(0);
            let close = self.expect(&TokenKind::RBracket);
            let span = expr.span.merge(close.span).merge(index.span);
            expr = Expr::new(
                ExprKind::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                },
                span,
            );
        }
        expr
    }

    fn parse_primary_expression(&mut self) -> Expr {
        let kind = self.current().kind.clone();
        match kind {
            TokenKind::LParen => {
                if facts::is_type_keyword(&self.peek(1).kind)
                    && self.peek(2).kind == TokenKind::RParen
                {
                    self.parse_cast_expression()
                } else {
                    self.parse_parenthesized_expression()
                }
            }
            TokenKind::Typeof => self.parse_typeof_expression(),
            TokenKind::Nameof => self.parse_nameof_expression(),
            TokenKind::True => self.parse_literal(Lit::Bool(true)),
            TokenKind::False => self.parse_literal(Lit::Bool(false)),
            TokenKind::Int(value) => self.parse_literal(Lit::Int(value)),
            TokenKind::Float(value) => self.parse_literal(Lit::Float(value)),
            TokenKind::Str(value) => self.parse_literal(Lit::String(value)),
            TokenKind::Char(value) => self.parse_literal(Lit::Char(value)),
            TokenKind::LBrace => self.parse_array_initialization(),
            _ => self.parse_name_or_call_expression(),
        }
    }

    fn parse_literal(&mut self, lit: Lit) -> Expr {
        let token = self.advance();
        Expr::new(ExprKind::Literal(lit), token.span)
    }

    fn parse_parenthesized_expression(&mut self) -> Expr {
        let open = self.expect(&TokenKind::LParen);
        let inner = self.parse_expression(0);
        let close = self.expect(&TokenKind::RParen);
        Expr::new(
            ExprKind::Parenthesized(Box::new(inner)),
            open.span.merge(close.span),
        )
    }

    fn parse_cast_expression(&mut self) -> Expr {
        let open = self.expect(&TokenKind::LParen);
        let ty = self.parse_type_name();
        self.expect(&TokenKind::RParen);

        // A cast binds tighter than any binary operator but still allows
        // a unary operand: `(int)-x`.
        let operand = self.parse_expression(facts::MAX_BINARY_PRECEDENCE);
        let span = open.span.merge(operand.span);
        Expr::new(
            ExprKind::Cast {
                ty,
                operand: Box::new(operand),
            },
            span,
        )
    }

    fn parse_typeof_expression(&mut self) -> Expr {
        let keyword = self.advance();
        self.expect(&TokenKind::LParen);
        let ty = self.parse_type_name();
        let close = self.expect(&TokenKind::RParen);
        Expr::new(ExprKind::Typeof { ty }, keyword.span.merge(close.span))
    }

    fn parse_nameof_expression(&mut self) -> Expr {
        let keyword = self.advance();
        self.expect(&TokenKind::LParen);
        let name = self.expect_ident();
        let close = self.expect(&TokenKind::RParen);
        Expr::new(ExprKind::Nameof { name }, keyword.span.merge(close.span))
    }

    fn parse_array_initialization(&mut self) -> Expr {
        let open = self.expect(&TokenKind::LBrace);
        let elements = self.parse_expression_list(&TokenKind::RBrace);
        let close = self.expect(&TokenKind::RBrace);
        Expr::new(
            ExprKind::ArrayInit { elements },
            open.span.merge(close.span),
        )
    }

    fn parse_name_or_call_expression(&mut self) -> Expr {
        if matches!(self.current().kind, TokenKind::Ident(_))
            && matches!(self.peek(1).kind, TokenKind::LParen | TokenKind::Dot)
        {
            return self.parse_call_expression();
        }

        // Also the recovery path: a non-identifier ends up as a fabricated
        // empty name plus a diagnostic.
        let name = self.expect_ident();
        Expr::new(ExprKind::Name(name.node.clone()), name.span)
    }

    fn parse_call_expression(&mut self) -> Expr {
        let callee = self.parse_qualified_name();
        self.expect(&TokenKind::LParen);
        let args = self.parse_expression_list(&TokenKind::RParen);
        let close = self.expect(&TokenKind::RParen);

        let span = callee.span().merge(close.span);
        Expr::new(ExprKind::Call { callee, args }, span)
    }

    /// Comma-separated expressions up to (not consuming) `terminator`. A
    /// trailing comma is rejected: the expression expected after it reports
    /// a diagnostic.
    fn parse_expression_list(&mut self, terminator: &TokenKind) -> Vec<Expr> {
        let mut items = Vec::new();
        if self.check(terminator) || self.check(&TokenKind::Eof) {
            return items;
        }
        loop {
            items.push(self.parse_expression(0));
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_ast::{BinaryOperator, UnaryOperator};

    fn parse(source: &str) -> SyntaxTree {
        SyntaxTree::parse(source)
    }

    fn parse_clean(source: &str) -> SyntaxTree {
        let tree = parse(source);
        assert!(
            tree.diagnostics().is_empty(),
            "unexpected diagnostics for {source:?}: {:?}",
            tree.diagnostics().sorted()
        );
        tree
    }

    fn single_expression(tree: &SyntaxTree) -> &Expr {
        assert_eq!(tree.root().statements.len(), 1);
        match &tree.root().statements[0].node {
            StmtKind::Expression(expr) => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let tree = parse_clean("1 + 2 * 3;");
        let expr = single_expression(&tree);
        let ExprKind::Binary { op, left, right } = &expr.node else {
            panic!("expected binary expression");
        };
        assert_eq!(op.node, BinaryOperator::Add);
        assert!(matches!(left.node, ExprKind::Literal(Lit::Int(1))));
        assert!(matches!(
            &right.node,
            ExprKind::Binary { op, .. } if op.node == BinaryOperator::Multiply
        ));
    }

    #[test]
    fn same_precedence_is_left_associative() {
        let tree = parse_clean("1 - 2 - 3;");
        let expr = single_expression(&tree);
        let ExprKind::Binary { op, left, right } = &expr.node else {
            panic!("expected binary expression");
        };
        assert_eq!(op.node, BinaryOperator::Subtract);
        assert!(matches!(
            &left.node,
            ExprKind::Binary { op, .. } if op.node == BinaryOperator::Subtract
        ));
        assert!(matches!(right.node, ExprKind::Literal(Lit::Int(3))));
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        let tree = parse_clean("-1 + 2;");
        let expr = single_expression(&tree);
        let ExprKind::Binary { op, left, .. } = &expr.node else {
            panic!("expected binary expression");
        };
        assert_eq!(op.node, BinaryOperator::Add);
        assert!(matches!(
            &left.node,
            ExprKind::Unary { op, .. } if op.node == UnaryOperator::Negation
        ));
    }

    #[test]
    fn assignment_is_detected_by_lookahead() {
        let tree = parse_clean("a = 1;");
        assert!(matches!(
            single_expression(&tree).node,
            ExprKind::Assignment { .. }
        ));

        let tree = parse_clean("a == 1;");
        assert!(matches!(
            single_expression(&tree).node,
            ExprKind::Binary { .. }
        ));
    }

    #[test]
    fn compound_assignment_parses() {
        let tree = parse_clean("a += 1 + 2;");
        let ExprKind::Assignment { op, .. } = &single_expression(&tree).node else {
            panic!("expected assignment");
        };
        assert_eq!(op.node, quill_ast::AssignmentOperator::AddAssign);
    }

    #[test]
    fn assignment_is_right_nested() {
        let tree = parse_clean("a = b = 2;");
        let ExprKind::Assignment { value, .. } = &single_expression(&tree).node else {
            panic!("expected assignment");
        };
        assert!(matches!(value.node, ExprKind::Assignment { .. }));
    }

    #[test]
    fn postfix_and_prefix_increment() {
        let tree = parse_clean("a++;");
        assert!(matches!(
            &single_expression(&tree).node,
            ExprKind::Unary { op, .. } if op.node == UnaryOperator::PostIncrement
        ));

        let tree = parse_clean("--a;");
        assert!(matches!(
            &single_expression(&tree).node,
            ExprKind::Unary { op, .. } if op.node == UnaryOperator::PreDecrement
        ));
    }

    #[test]
    fn prefix_increment_requires_a_name_operand() {
        let tree = parse("++1;");
        assert!(!tree.diagnostics().is_empty());
    }

    #[test]
    fn cast_is_distinguished_from_parenthesized() {
        let tree = parse_clean("(int)x;");
        assert!(matches!(
            single_expression(&tree).node,
            ExprKind::Cast { .. }
        ));

        let tree = parse_clean("(x);");
        assert!(matches!(
            single_expression(&tree).node,
            ExprKind::Parenthesized(_)
        ));
    }

    #[test]
    fn cast_binds_tighter_than_binary_operators() {
        let tree = parse_clean("(float)1 + 2;");
        let ExprKind::Binary { op, left, .. } = &single_expression(&tree).node else {
            panic!("expected binary expression");
        };
        assert_eq!(op.node, BinaryOperator::Add);
        assert!(matches!(left.node, ExprKind::Cast { .. }));
    }

    #[test]
    fn qualified_call_parses_all_segments() {
        let tree = parse_clean("Math.Vectors.dot(1, 2);");
        let ExprKind::Call { callee, args } = &single_expression(&tree).node else {
            panic!("expected call");
        };
        assert_eq!(callee.to_string(), "Math.Vectors.dot");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn trailing_comma_in_arguments_is_an_error() {
        let tree = parse("f(1,);");
        assert!(!tree.diagnostics().is_empty());
    }

    #[test]
    fn indexer_and_array_initialization_parse() {
        let tree = parse_clean("var a = { 1, 2, 3 };");
        let StmtKind::VariableDeclaration { initializer, .. } = &tree.root().statements[0].node
        else {
            panic!("expected declaration");
        };
        assert!(matches!(
            &initializer.node,
            ExprKind::ArrayInit { elements } if elements.len() == 3
        ));

        let tree = parse_clean("a[0];");
        assert!(matches!(
            single_expression(&tree).node,
            ExprKind::Index { .. }
        ));
    }

    #[test]
    fn pipe_operator_parses_with_lowest_precedence() {
        let tree = parse_clean("1 + 2 |> f();");
        let ExprKind::Binary { op, .. } = &single_expression(&tree).node else {
            panic!("expected binary expression");
        };
        assert_eq!(op.node, BinaryOperator::Pipe);
    }

    #[test]
    fn declaration_directly_after_condition_is_reported() {
        let tree = parse("if (true) var x = 1;");
        let diagnostics = tree.diagnostics().sorted();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Variable declarations cannot be placed right after a condition."
        );
    }

    #[test]
    fn for_init_must_be_declaration_or_assignment() {
        let tree = parse("for (1 + 2; true; i = i + 1) {}");
        let diagnostics = tree.diagnostics().sorted();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("initialization clause"));

        let tree = parse_clean("for (i = 0; i < 10; ++i) {}");
        assert!(matches!(tree.root().statements[0].node, StmtKind::For { .. }));
    }

    #[test]
    fn malformed_expression_recovers_with_placeholder() {
        let tree = parse("1 + ;");
        assert!(!tree.diagnostics().is_empty());
        assert_eq!(tree.root().statements.len(), 1);
        let ExprKind::Binary { right, .. } = &single_expression(&tree).node else {
            panic!("expected binary expression");
        };
        assert!(matches!(&right.node, ExprKind::Name(name) if name.is_empty()));
    }

    #[test]
    fn unterminated_block_terminates_with_diagnostics() {
        let tree = parse("{ var a = 1;");
        assert!(!tree.diagnostics().is_empty());
        assert_eq!(tree.root().statements.len(), 1);
    }

    #[test]
    fn label_and_goto_parse() {
        let tree = parse_clean("top: goto top;");
        assert!(matches!(tree.root().statements[0].node, StmtKind::Label { .. }));
        assert!(matches!(tree.root().statements[1].node, StmtKind::Goto { .. }));
    }

    #[test]
    fn method_declarations_parse_both_body_forms() {
        let tree = parse_clean("def add(int a, int b) -> int { return a + b; }");
        let StmtKind::MethodDeclaration(decl) = &tree.root().statements[0].node else {
            panic!("expected method declaration");
        };
        assert_eq!(decl.name.node, "add");
        assert_eq!(decl.params.len(), 2);
        assert!(matches!(decl.body, MethodBody::Block(..)));

        let tree = parse_clean("def twice(int a) => a * 2;");
        let StmtKind::MethodDeclaration(decl) = &tree.root().statements[0].node else {
            panic!("expected method declaration");
        };
        assert!(decl.return_type.is_none());
        assert!(matches!(decl.body, MethodBody::Expression(_)));
    }

    #[test]
    fn namespace_and_with_statements_parse() {
        let tree = parse_clean("namespace A.B { def f() {} } with A.B; with X = A.B;");
        let statements = &tree.root().statements;
        assert!(matches!(
            &statements[0].node,
            StmtKind::NamespaceDeclaration { body: Some(_), .. }
        ));
        assert!(matches!(
            &statements[1].node,
            StmtKind::With { alias: None, .. }
        ));
        assert!(matches!(
            &statements[2].node,
            StmtKind::With { alias: Some(_), .. }
        ));

        let tree = parse_clean("namespace A;");
        assert!(matches!(
            &tree.root().statements[0].node,
            StmtKind::NamespaceDeclaration { body: None, .. }
        ));
    }

    #[test]
    fn typeof_requires_a_type_literal() {
        let tree = parse_clean("typeof(string);");
        assert!(matches!(
            &single_expression(&tree).node,
            ExprKind::Typeof { ty } if ty.node == TypeName::String
        ));

        let tree = parse("typeof(var);");
        assert!(!tree.diagnostics().is_empty());
    }

    #[test]
    fn diagnostics_are_deduplicated_and_span_ordered() {
        // The same malformed construct twice at different spans.
        let tree = parse("1 + ; 2 + ;");
        let diagnostics = tree.diagnostics().sorted();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].span < diagnostics[1].span);
    }
}
