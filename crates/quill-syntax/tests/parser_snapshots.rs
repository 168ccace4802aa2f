//! Snapshot coverage of the syntax-tree debug rendering.

use insta::assert_snapshot;
use quill_syntax::SyntaxTree;

#[test]
fn renders_expression_statements() {
    let tree = SyntaxTree::parse("1 + 2 * 3;");
    assert_snapshot!(tree.render(), @r"
    CompilationUnit
      ExpressionStatement
        BinaryExpression +
          LiteralExpression 1
          BinaryExpression *
            LiteralExpression 2
            LiteralExpression 3
    ");
}

#[test]
fn renders_declarations_and_control_flow() {
    let tree = SyntaxTree::parse("{ var a = 0; if (a == 0) a = 10; }");
    assert_snapshot!(tree.render(), @r"
    CompilationUnit
      BlockStatement
        VariableDeclaration var a
          LiteralExpression 0
        IfStatement
          BinaryExpression ==
            NameExpression a
            LiteralExpression 0
          ExpressionStatement
            AssignmentExpression a =
              LiteralExpression 10
    ");
}

#[test]
fn renders_method_declarations() {
    let tree = SyntaxTree::parse("def add(int a, int b) -> int { return a + b; }");
    assert_snapshot!(tree.render(), @r"
    CompilationUnit
      MethodDeclaration add
        Parameter int a
        Parameter int b
        BlockBody
          ReturnStatement
            BinaryExpression +
              NameExpression a
              NameExpression b
    ");
}

#[test]
fn malformed_input_still_renders_a_tree() {
    let tree = SyntaxTree::parse("1 + ;");
    assert!(!tree.diagnostics().is_empty());
    assert_snapshot!(tree.render(), @r"
    CompilationUnit
      ExpressionStatement
        BinaryExpression +
          LiteralExpression 1
          NameExpression
    ");
}
