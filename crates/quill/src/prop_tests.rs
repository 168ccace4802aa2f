//! Property tests for the optimizer over generated programs.

use std::rc::Rc;

use proptest::prelude::*;
use quill_eval::evaluate_with_output;
use quill_hir::BoundProgram;
use quill_passes::optimize;

use crate::{Compilation, Variables};

/// A generated integer expression over a mutable variable `a` and a
/// read-only variable `k` (a constant-propagation candidate).
#[derive(Debug, Clone)]
enum GenExpr {
    Lit(i8),
    VarA,
    ConstK,
    Add(Box<GenExpr>, Box<GenExpr>),
    Sub(Box<GenExpr>, Box<GenExpr>),
    Mul(Box<GenExpr>, Box<GenExpr>),
    Neg(Box<GenExpr>),
}

fn render(expr: &GenExpr) -> String {
    match expr {
        GenExpr::Lit(value) => format!("({value})"),
        GenExpr::VarA => "a".to_string(),
        GenExpr::ConstK => "k".to_string(),
        GenExpr::Add(left, right) => format!("({} + {})", render(left), render(right)),
        GenExpr::Sub(left, right) => format!("({} - {})", render(left), render(right)),
        GenExpr::Mul(left, right) => format!("({} * {})", render(left), render(right)),
        GenExpr::Neg(inner) => format!("(-{})", render(inner)),
    }
}

fn program_source(expr: &GenExpr) -> String {
    format!("{{ var a = 7; let k = 3; {}; }}", render(expr))
}

fn arb_expr() -> impl Strategy<Value = GenExpr> {
    let leaf = prop_oneof![
        any::<i8>().prop_map(GenExpr::Lit),
        Just(GenExpr::VarA),
        Just(GenExpr::ConstK),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| GenExpr::Add(Box::new(l), Box::new(r))),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| GenExpr::Sub(Box::new(l), Box::new(r))),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| GenExpr::Mul(Box::new(l), Box::new(r))),
            inner.prop_map(|e| GenExpr::Neg(Box::new(e))),
        ]
    })
}

fn run(program: &BoundProgram) -> (Option<quill_hir::Value>, Vec<u8>) {
    let mut variables = Variables::new();
    let mut sink = Vec::new();
    let value = evaluate_with_output(program, &mut variables, &mut sink)
        .expect("generated programs cannot fail at runtime");
    (value, sink)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// `evaluate(T) == evaluate(optimize(T))` for diagnostic-free programs.
    #[test]
    fn optimization_preserves_semantics(expr in arb_expr()) {
        let source = program_source(&expr);
        let compilation = Compilation::compile(&source);
        prop_assert!(compilation.diagnostics().is_empty(), "diagnostics for {}", source);

        let program = compilation.program().expect("no diagnostics");
        let optimized = optimize(program);
        prop_assert_eq!(run(program), run(&optimized), "semantics changed for {}", source);
    }

    /// `optimize(optimize(T))` performs no further rewrites.
    #[test]
    fn optimization_is_idempotent(expr in arb_expr()) {
        let source = program_source(&expr);
        let compilation = Compilation::compile(&source);
        prop_assert!(compilation.diagnostics().is_empty());

        let once = optimize(compilation.program().expect("no diagnostics"));
        let twice = optimize(&once);
        prop_assert_eq!(once.render(), twice.render());
        for (a, b) in once.statements.iter().zip(&twice.statements) {
            prop_assert!(Rc::ptr_eq(a, b), "second pass reallocated a statement");
        }
    }
}
