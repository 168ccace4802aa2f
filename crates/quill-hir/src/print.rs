//! Text rendering of bound programs, for debugging.

use std::fmt::{self, Write};

use crate::node::{BoundExpr, BoundMethod, BoundProgram, BoundStmt};
use crate::ops::BoundUnaryOperatorKind;
use crate::value::Value;

pub fn render_program(program: &BoundProgram) -> String {
    let mut out = String::new();
    for method in &program.methods {
        render_method(&mut out, method);
        out.push('\n');
    }
    for stmt in &program.statements {
        render_stmt(&mut out, stmt, 0);
    }
    out
}

fn render_method(out: &mut String, method: &BoundMethod) {
    let params = method
        .method
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect::<Vec<_>>()
        .join(", ");
    let return_type = method
        .method
        .return_type()
        .unwrap_or(crate::types::Type::Error);
    let _ = writeln!(
        out,
        "def {}({params}) -> {return_type} {{",
        method.method.full_name
    );
    for stmt in &method.statements {
        render_stmt(out, stmt, 1);
    }
    out.push_str("}\n");
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn render_stmt(out: &mut String, stmt: &BoundStmt, depth: usize) {
    match stmt {
        BoundStmt::Label { label } => {
            // Labels render dedented so jump targets stand out.
            if depth > 0 {
                indent(out, depth - 1);
            }
            let _ = writeln!(out, "{label}:");
            return;
        }
        _ => indent(out, depth),
    }

    match stmt {
        BoundStmt::Block { statements } => {
            out.push_str("{\n");
            for s in statements {
                render_stmt(out, s, depth + 1);
            }
            indent(out, depth);
            out.push_str("}\n");
        }
        BoundStmt::VariableDeclaration {
            variable,
            initializer,
        } => {
            let keyword = if variable.read_only { "let" } else { "var" };
            let _ = writeln!(
                out,
                "{keyword} {}: {} = {initializer};",
                variable.name, variable.ty
            );
        }
        BoundStmt::MethodDeclaration { method, body } => {
            let _ = writeln!(out, "def {} ", method.full_name);
            render_stmt(out, body, depth);
        }
        BoundStmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let _ = writeln!(out, "if {condition}");
            render_stmt(out, then_branch, depth + 1);
            if let Some(else_branch) = else_branch {
                indent(out, depth);
                out.push_str("else\n");
                render_stmt(out, else_branch, depth + 1);
            }
        }
        BoundStmt::While {
            condition, body, ..
        } => {
            let _ = writeln!(out, "while {condition}");
            render_stmt(out, body, depth + 1);
        }
        BoundStmt::DoWhile {
            body, condition, ..
        } => {
            out.push_str("do\n");
            render_stmt(out, body, depth + 1);
            indent(out, depth);
            let _ = writeln!(out, "while {condition};");
        }
        BoundStmt::For {
            init,
            condition,
            update,
            body,
            ..
        } => {
            out.push_str("for\n");
            render_stmt(out, init, depth + 1);
            indent(out, depth + 1);
            let _ = writeln!(out, "{condition};");
            render_stmt(out, update, depth + 1);
            render_stmt(out, body, depth + 1);
        }
        BoundStmt::Label { .. } => unreachable!("labels are rendered above"),
        BoundStmt::Goto { label } => {
            let _ = writeln!(out, "goto {label};");
        }
        BoundStmt::ConditionalGoto {
            label,
            condition,
            jump_if,
        } => {
            let keyword = if *jump_if { "if" } else { "unless" };
            let _ = writeln!(out, "goto {label} {keyword} {condition};");
        }
        BoundStmt::Return { expr } => match expr {
            Some(expr) => {
                let _ = writeln!(out, "return {expr};");
            }
            None => out.push_str("return;\n"),
        },
        BoundStmt::Expression { expr } => {
            let _ = writeln!(out, "{expr};");
        }
        BoundStmt::NoOp => out.push_str("nop;\n"),
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "{s:?}"),
        Value::Char(c) => write!(f, "{c:?}"),
        other => write!(f, "{other}"),
    }
}

impl fmt::Display for BoundExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundExpr::Error => f.write_str("?"),
            BoundExpr::Literal { value } => write_literal(f, value),
            BoundExpr::Variable { variable } => f.write_str(&variable.name),
            BoundExpr::Assignment { variable, expr } => {
                write!(f, "{} = {expr}", variable.name)
            }
            BoundExpr::Unary { op, operand } => match op.kind {
                BoundUnaryOperatorKind::PostIncrement | BoundUnaryOperatorKind::PostDecrement => {
                    write!(f, "{operand}{}", op.syntax.symbol())
                }
                _ => write!(f, "{}{operand}", op.syntax.symbol()),
            },
            BoundExpr::Binary { left, op, right } => {
                write!(f, "({left} {} {right})", op.syntax.symbol())
            }
            BoundExpr::Call { method, args } => {
                write!(f, "{}(", method.full_name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            BoundExpr::Conversion { ty, expr } => write!(f, "({ty}){expr}"),
        }
    }
}
