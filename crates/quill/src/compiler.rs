//! The compilation pipeline.

use std::io::{self, Write};

use quill_bind::{BindResult, ControlFlowGraph, bind};
use quill_diag::{Diagnostic, DiagnosticError, SourceText};
use quill_eval::{RuntimeError, Variables, evaluate_with_output};
use quill_hir::{BoundProgram, Value};
use quill_passes::optimize;
use quill_syntax::SyntaxTree;

/// One compilation of one source text. Owns the syntax tree and, when the
/// source parsed cleanly, the bound program.
#[derive(Debug)]
pub struct Compilation {
    syntax_tree: SyntaxTree,
    /// `None` when syntax diagnostics aborted the pipeline before binding.
    binding: Option<BindResult>,
}

/// What evaluating a compilation produced. `value` is set only when there
/// were no diagnostics and execution finished without a runtime error.
#[derive(Debug)]
pub struct EvaluationResult {
    pub value: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<RuntimeError>,
}

impl Compilation {
    pub fn compile(source: &str) -> Self {
        let syntax_tree = SyntaxTree::parse(source);
        let binding = if syntax_tree.diagnostics().is_empty() {
            Some(bind(syntax_tree.root()))
        } else {
            None
        };
        Self {
            syntax_tree,
            binding,
        }
    }

    pub fn syntax_tree(&self) -> &SyntaxTree {
        &self.syntax_tree
    }

    pub fn source(&self) -> &SourceText {
        self.syntax_tree.source()
    }

    /// Every diagnostic so far, deduplicated and in ascending span order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut bag = self.syntax_tree.diagnostics().clone();
        if let Some(binding) = &self.binding {
            bag.merge(binding.diagnostics.clone());
        }
        bag.sorted()
    }

    /// The bound program, available only for diagnostic-free compilations.
    pub fn program(&self) -> Result<&BoundProgram, DiagnosticError> {
        match &self.binding {
            Some(binding) if binding.diagnostics.is_empty() => Ok(&binding.program),
            _ => Err(DiagnosticError(self.diagnostics())),
        }
    }

    pub fn optimized_program(&self) -> Result<BoundProgram, DiagnosticError> {
        Ok(optimize(self.program()?))
    }

    /// Evaluate with builtin output going to stdout, running the optimizer
    /// first.
    pub fn evaluate(&self, variables: &mut Variables) -> EvaluationResult {
        let mut stdout = io::stdout();
        self.evaluate_with(variables, &mut stdout, true)
    }

    /// Evaluate against a caller-supplied output sink, optionally skipping
    /// the optimizer.
    pub fn evaluate_with(
        &self,
        variables: &mut Variables,
        out: &mut dyn Write,
        optimized: bool,
    ) -> EvaluationResult {
        let diagnostics = self.diagnostics();
        if !diagnostics.is_empty() {
            return EvaluationResult {
                value: None,
                diagnostics,
                error: None,
            };
        }

        let program = self
            .binding
            .as_ref()
            .expect("diagnostic-free compilations are bound");
        let result = if optimized {
            let program = optimize(&program.program);
            evaluate_with_output(&program, variables, out)
        } else {
            evaluate_with_output(&program.program, variables, out)
        };

        match result {
            Ok(value) => EvaluationResult {
                value,
                diagnostics,
                error: None,
            },
            Err(error) => EvaluationResult {
                value: None,
                diagnostics,
                error: Some(error),
            },
        }
    }

    /// Emit one control-flow graph per unit — the top level first, then
    /// every method — through writers obtained from `open_writer`. The core
    /// knows nothing about file systems; the caller supplies and disposes
    /// the sinks.
    pub fn generate_control_flow_graphs<W: Write>(
        &self,
        mut open_writer: impl FnMut(&str) -> io::Result<W>,
        mut close_writer: impl FnMut(W) -> io::Result<()>,
    ) -> io::Result<()> {
        let Some(binding) = &self.binding else {
            return Ok(());
        };
        let program = &binding.program;

        let mut writer = open_writer("main")?;
        ControlFlowGraph::new(&program.statements).write_dot("main", &mut writer)?;
        close_writer(writer)?;

        for method in &program.methods {
            let name = &method.method.full_name;
            let mut writer = open_writer(name)?;
            ControlFlowGraph::new(&method.statements).write_dot(name, &mut writer)?;
            close_writer(writer)?;
        }
        Ok(())
    }
}
