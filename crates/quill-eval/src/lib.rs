//! The tree-walking evaluator for lowered Quill programs.
//!
//! Execution is a flat program-counter loop over the lowered statement
//! sequence: a label→index table is built once per body, gotos move the
//! counter, and a `return` terminates the body with its value. Variables
//! live in a caller-supplied global environment plus one local frame per
//! method call. Unexpected node kinds here are defects in the pipeline,
//! not user errors, and panic.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use quill_hir::{
    BoundExpr, BoundMethod, BoundProgram, BoundStmt, BoundUnaryOperatorKind, Builtin, SymbolId,
    Value, VariableSymbol, literal_eval,
};

/// An error raised while executing a diagnostic-free program. Distinct
/// from diagnostics: these depend on runtime values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Variable '{0}' was read before its declaration was executed.")]
    UninitializedVariable(String),
}

/// The mutable global variable environment, shared across evaluations of
/// the same compilation.
pub type Variables = HashMap<Rc<VariableSymbol>, Value>;

/// Evaluate a program, writing builtin output to stdout.
pub fn evaluate(
    program: &BoundProgram,
    variables: &mut Variables,
) -> Result<Option<Value>, RuntimeError> {
    let mut stdout = io::stdout();
    evaluate_with_output(program, variables, &mut stdout)
}

/// Evaluate a program against a caller-supplied output sink.
pub fn evaluate_with_output(
    program: &BoundProgram,
    variables: &mut Variables,
    out: &mut dyn Write,
) -> Result<Option<Value>, RuntimeError> {
    let methods = program
        .methods
        .iter()
        .map(|method| (method.method.id, method))
        .collect();
    let mut evaluator = Evaluator {
        methods,
        globals: variables,
        locals: Vec::new(),
        out,
    };
    evaluator.evaluate_statements(&program.statements)
}

struct Evaluator<'a> {
    methods: HashMap<SymbolId, &'a BoundMethod>,
    globals: &'a mut Variables,
    /// One frame per active method call; the top frame holds the current
    /// method's parameters and locals.
    locals: Vec<HashMap<SymbolId, Value>>,
    out: &'a mut dyn Write,
}

impl Evaluator<'_> {
    fn evaluate_statements(
        &mut self,
        statements: &[Rc<BoundStmt>],
    ) -> Result<Option<Value>, RuntimeError> {
        // The label table is built once per body; gotos are index jumps.
        let mut labels: HashMap<SymbolId, usize> = HashMap::new();
        for (index, stmt) in statements.iter().enumerate() {
            if let BoundStmt::Label { label } = stmt.as_ref() {
                labels.insert(label.id, index);
            }
        }
        let target = |labels: &HashMap<SymbolId, usize>, id: SymbolId| -> usize {
            *labels
                .get(&id)
                .expect("goto targets a label in the same body")
        };

        let mut pc = 0usize;
        while pc < statements.len() {
            match statements[pc].as_ref() {
                BoundStmt::Label { .. } | BoundStmt::NoOp => pc += 1,
                BoundStmt::VariableDeclaration {
                    variable,
                    initializer,
                } => {
                    let value = self.evaluate_expression(initializer)?;
                    self.write_variable(variable, value);
                    pc += 1;
                }
                BoundStmt::Expression { expr } => {
                    self.evaluate_expression(expr)?;
                    pc += 1;
                }
                BoundStmt::Goto { label } => pc = target(&labels, label.id),
                BoundStmt::ConditionalGoto {
                    label,
                    condition,
                    jump_if,
                } => {
                    let Value::Bool(value) = self.evaluate_expression(condition)? else {
                        unreachable!("conditional goto over a non-bool condition");
                    };
                    if value == *jump_if {
                        pc = target(&labels, label.id);
                    } else {
                        pc += 1;
                    }
                }
                BoundStmt::Return { expr } => {
                    return match expr {
                        Some(expr) => Ok(Some(self.evaluate_expression(expr)?)),
                        None => Ok(None),
                    };
                }
                other => unreachable!("statement {other:?} reached the evaluator"),
            }
        }
        Ok(None)
    }

    fn evaluate_expression(&mut self, expr: &Rc<BoundExpr>) -> Result<Value, RuntimeError> {
        match expr.as_ref() {
            BoundExpr::Error => unreachable!("error expression reached the evaluator"),
            BoundExpr::Literal { value } => Ok(value.clone()),
            BoundExpr::Variable { variable } => self.read_variable(variable),
            BoundExpr::Assignment {
                variable,
                expr: value,
            } => {
                let value = self.evaluate_expression(value)?;
                self.write_variable(variable, value.clone());
                Ok(value)
            }
            BoundExpr::Unary { op, operand } => {
                if op.kind.is_increment_or_decrement() {
                    return self.evaluate_increment(op.kind, operand);
                }
                let operand = self.evaluate_expression(operand)?;
                Ok(literal_eval::evaluate_unary(op.kind, &operand))
            }
            BoundExpr::Binary { left, op, right } => {
                let left = self.evaluate_expression(left)?;
                let right = self.evaluate_expression(right)?;
                literal_eval::evaluate_binary(op.kind, &left, &right)
                    .map_err(|_| RuntimeError::DivisionByZero)
            }
            BoundExpr::Call { method, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate_expression(arg)?);
                }
                self.evaluate_call(method.id, method.builtin, &method.params, values)
            }
            BoundExpr::Conversion { ty, expr } => {
                let value = self.evaluate_expression(expr)?;
                Ok(literal_eval::convert(&value, *ty))
            }
        }
    }

    fn evaluate_increment(
        &mut self,
        kind: BoundUnaryOperatorKind,
        operand: &Rc<BoundExpr>,
    ) -> Result<Value, RuntimeError> {
        let BoundExpr::Variable { variable } = operand.as_ref() else {
            unreachable!("increment over a non-variable operand");
        };

        let delta: i64 = match kind {
            BoundUnaryOperatorKind::PreIncrement | BoundUnaryOperatorKind::PostIncrement => 1,
            _ => -1,
        };
        let old = self.read_variable(variable)?;
        let new = match &old {
            Value::Int(value) => Value::Int(value.wrapping_add(delta)),
            Value::Float(value) => Value::Float(value + delta as f64),
            other => unreachable!("increment over a {} variable", other.ty()),
        };
        self.write_variable(variable, new.clone());

        let is_pre = matches!(
            kind,
            BoundUnaryOperatorKind::PreIncrement | BoundUnaryOperatorKind::PreDecrement
        );
        Ok(if is_pre { new } else { old })
    }

    fn evaluate_call(
        &mut self,
        method_id: SymbolId,
        builtin: Option<Builtin>,
        params: &[Rc<VariableSymbol>],
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if let Some(builtin) = builtin {
            match builtin {
                Builtin::Print => {
                    let _ = write!(self.out, "{}", args[0]);
                }
                Builtin::PrintLine => {
                    let _ = writeln!(self.out, "{}", args[0]);
                }
            }
            return Ok(Value::Unit);
        }

        let body = *self
            .methods
            .get(&method_id)
            .expect("calls resolve to a method in the program");

        let mut frame = HashMap::new();
        for (param, value) in params.iter().zip(args) {
            frame.insert(param.id, value);
        }
        self.locals.push(frame);
        let result = self.evaluate_statements(&body.statements);
        self.locals.pop();

        Ok(result?.unwrap_or(Value::Unit))
    }

    fn read_variable(&self, variable: &Rc<VariableSymbol>) -> Result<Value, RuntimeError> {
        // Constants carry their value; they have no runtime storage.
        if let Some(value) = &variable.constant {
            return Ok(value.clone());
        }
        let value = if variable.global {
            self.globals.get(variable).cloned()
        } else {
            // Symbol ids are unique, so searching older frames is safe; it
            // is what lets a nested method read its enclosing method's
            // locals.
            self.locals
                .iter()
                .rev()
                .find_map(|frame| frame.get(&variable.id))
                .cloned()
        };
        value.ok_or_else(|| RuntimeError::UninitializedVariable(variable.name.clone()))
    }

    fn write_variable(&mut self, variable: &Rc<VariableSymbol>, value: Value) {
        if variable.global {
            self.globals.insert(Rc::clone(variable), value);
        } else {
            let frame = self
                .locals
                .iter_mut()
                .rev()
                .find(|frame| frame.contains_key(&variable.id));
            match frame {
                Some(frame) => {
                    frame.insert(variable.id, value);
                }
                None => {
                    self.locals
                        .last_mut()
                        .expect("locals exist inside a method call")
                        .insert(variable.id, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_bind::bind;
    use quill_syntax::SyntaxTree;

    fn run(source: &str) -> Result<Option<Value>, RuntimeError> {
        let mut variables = Variables::new();
        run_with(source, &mut variables)
    }

    fn run_with(
        source: &str,
        variables: &mut Variables,
    ) -> Result<Option<Value>, RuntimeError> {
        let tree = SyntaxTree::parse(source);
        assert!(tree.diagnostics().is_empty(), "syntax errors in {source:?}");
        let result = bind(tree.root());
        assert!(
            result.diagnostics.is_empty(),
            "bind errors in {source:?}: {:?}",
            result.diagnostics.sorted()
        );
        let mut sink = Vec::new();
        evaluate_with_output(&result.program, variables, &mut sink)
    }

    fn output_of(source: &str) -> String {
        let tree = SyntaxTree::parse(source);
        let result = bind(tree.root());
        assert!(result.diagnostics.is_empty());
        let mut variables = Variables::new();
        let mut sink = Vec::new();
        evaluate_with_output(&result.program, &mut variables, &mut sink).unwrap();
        String::from_utf8(sink).unwrap()
    }

    #[test]
    fn evaluates_the_final_expression_statement() {
        assert_eq!(run("1;"), Ok(Some(Value::Int(1))));
        assert_eq!(run("14 + 12;"), Ok(Some(Value::Int(26))));
        assert_eq!(run("{ var a = 5; }"), Ok(Some(Value::Int(5))));
    }

    #[test]
    fn follows_lowered_control_flow() {
        assert_eq!(
            run("{ var a = 0; if (a == 0) a = 10; a; }"),
            Ok(Some(Value::Int(10)))
        );
        assert_eq!(
            run("{ var a = 0; while (a < 10) a = a + 1; a; }"),
            Ok(Some(Value::Int(10)))
        );
    }

    #[test]
    fn user_gotos_jump_by_label_table() {
        assert_eq!(
            run("{ var a = 1; goto skip; a = 99; skip: a; }"),
            Ok(Some(Value::Int(1)))
        );
    }

    #[test]
    fn method_calls_push_their_own_frame() {
        assert_eq!(
            run("def add(int a, int b) -> int { return a + b; } add(1, 2) + add(3, 4);"),
            Ok(Some(Value::Int(10)))
        );
    }

    #[test]
    fn nested_methods_see_enclosing_locals() {
        let source = "def outer() -> int { var x = 20; def inner() -> int { return x + 1; } return inner() * 2; } outer();";
        assert_eq!(run(source), Ok(Some(Value::Int(42))));
    }

    #[test]
    fn recursion_terminates_with_return() {
        let source = "def fact(int n) -> int { if (n <= 1) return 1; return n * fact(n - 1); } fact(5);";
        assert_eq!(run(source), Ok(Some(Value::Int(120))));
    }

    #[test]
    fn increments_yield_pre_and_post_values() {
        assert_eq!(run("{ var a = 11; a++; }"), Ok(Some(Value::Int(11))));
        assert_eq!(run("{ var a = 11; ++a; }"), Ok(Some(Value::Int(12))));
        assert_eq!(run("{ var a = 11; a--; a; }"), Ok(Some(Value::Int(10))));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        assert_eq!(run("1 / 0;"), Err(RuntimeError::DivisionByZero));
        assert_eq!(run("{ var a = 0; 1 % a; }"), Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn jumping_over_a_declaration_is_a_runtime_error() {
        assert_eq!(
            run("goto l; var x = 1; l: x;"),
            Err(RuntimeError::UninitializedVariable("x".into()))
        );
    }

    #[test]
    fn builtins_write_to_the_supplied_sink() {
        assert_eq!(output_of("print(\"hi\"); println(42);"), "hi42\n");
        assert_eq!(output_of("println(1.5); println('c');"), "1.5\nc\n");
    }

    #[test]
    fn global_environment_is_mutated_in_place() {
        let mut variables = Variables::new();
        assert_eq!(run_with("var a = 1; a;", &mut variables), Ok(Some(Value::Int(1))));
        assert_eq!(variables.len(), 1);
        let (symbol, value) = variables.iter().next().unwrap();
        assert_eq!(symbol.name, "a");
        assert_eq!(value, &Value::Int(1));
    }

    #[test]
    fn typeof_and_nameof_evaluate_to_strings() {
        assert_eq!(run("typeof(string);"), Ok(Some(Value::String("string".into()))));
        assert_eq!(
            run("{ var a = 0; nameof(a); }"),
            Ok(Some(Value::String("a".into())))
        );
    }
}
