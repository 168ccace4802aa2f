//! Control-flow graphs over lowered statement sequences.
//!
//! Basic blocks are delimited by labels (block starts) and by gotos,
//! conditional gotos and returns (block ends). The graph backs the
//! all-paths-return check and the optional dot-format debug export; the
//! writer is supplied by the caller, so this module knows nothing about
//! file systems.

use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use quill_hir::{BoundExpr, BoundStmt, SymbolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Start,
    End,
    Normal,
}

#[derive(Debug)]
pub struct BasicBlock {
    kind: BlockKind,
    pub statements: Vec<Rc<BoundStmt>>,
}

impl BasicBlock {
    fn label_text(&self) -> String {
        match self.kind {
            BlockKind::Start => "<start>".to_string(),
            BlockKind::End => "<end>".to_string(),
            BlockKind::Normal => self
                .statements
                .iter()
                .map(|stmt| statement_text(stmt))
                .collect::<Vec<_>>()
                .join("\\n"),
        }
    }
}

#[derive(Debug)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    /// Condition text for conditional branches, empty for unconditional
    /// flow.
    pub label: String,
}

#[derive(Debug)]
pub struct ControlFlowGraph {
    pub blocks: Vec<BasicBlock>,
    pub edges: Vec<Edge>,
    removed: Vec<bool>,
}

impl ControlFlowGraph {
    pub fn new(statements: &[Rc<BoundStmt>]) -> Self {
        let blocks = build_blocks(statements);
        let edges = build_edges(&blocks);
        let mut graph = Self {
            removed: vec![false; blocks.len()],
            blocks,
            edges,
        };
        graph.remove_unreachable_blocks();
        graph
    }

    fn end_index(&self) -> usize {
        self.blocks.len() - 1
    }

    /// Iteratively drop blocks with no incoming edges (other than the
    /// start block), so code that can never execute does not influence
    /// reachability questions.
    fn remove_unreachable_blocks(&mut self) {
        loop {
            let mut incoming = vec![0usize; self.blocks.len()];
            for edge in &self.edges {
                if !self.removed[edge.from] {
                    incoming[edge.to] += 1;
                }
            }
            let unreachable = (0..self.blocks.len()).find(|&index| {
                !self.removed[index]
                    && self.blocks[index].kind == BlockKind::Normal
                    && incoming[index] == 0
            });
            match unreachable {
                Some(index) => {
                    self.removed[index] = true;
                    self.edges.retain(|edge| edge.from != index && edge.to != index);
                }
                None => break,
            }
        }
    }

    /// True when every edge into the end block leaves from a `return`
    /// statement. A body that cannot reach its end (an infinite loop)
    /// trivially satisfies this.
    pub fn all_paths_return(&self) -> bool {
        let end = self.end_index();
        self.edges.iter().filter(|edge| edge.to == end).all(|edge| {
            matches!(
                self.blocks[edge.from].statements.last().map(Rc::as_ref),
                Some(BoundStmt::Return { .. })
            )
        })
    }

    /// Write the graph in dot format.
    pub fn write_dot<W: io::Write>(&self, name: &str, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "digraph \"{}\" {{", escape(name))?;
        for (index, block) in self.blocks.iter().enumerate() {
            if self.removed[index] {
                continue;
            }
            writeln!(
                writer,
                "    N{index} [label=\"{}\", shape=box]",
                escape(&block.label_text())
            )?;
        }
        for edge in &self.edges {
            if edge.label.is_empty() {
                writeln!(writer, "    N{} -> N{}", edge.from, edge.to)?;
            } else {
                writeln!(
                    writer,
                    "    N{} -> N{} [label=\"{}\"]",
                    edge.from,
                    edge.to,
                    escape(&edge.label)
                )?;
            }
        }
        writeln!(writer, "}}")
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn statement_text(stmt: &BoundStmt) -> String {
    match stmt {
        BoundStmt::Label { label } => format!("{label}:"),
        BoundStmt::Goto { label } => format!("goto {label};"),
        BoundStmt::ConditionalGoto {
            label,
            condition,
            jump_if,
        } => {
            let keyword = if *jump_if { "if" } else { "unless" };
            format!("goto {label} {keyword} {condition};")
        }
        BoundStmt::Return { expr: Some(expr) } => format!("return {expr};"),
        BoundStmt::Return { expr: None } => "return;".to_string(),
        BoundStmt::VariableDeclaration {
            variable,
            initializer,
        } => format!("{} = {initializer};", variable.name),
        BoundStmt::Expression { expr } => format!("{expr};"),
        BoundStmt::NoOp => "nop;".to_string(),
        other => unreachable!("structured statement {other:?} in a lowered body"),
    }
}

fn is_block_terminator(stmt: &BoundStmt) -> bool {
    matches!(
        stmt,
        BoundStmt::Goto { .. } | BoundStmt::ConditionalGoto { .. } | BoundStmt::Return { .. }
    )
}

fn build_blocks(statements: &[Rc<BoundStmt>]) -> Vec<BasicBlock> {
    let mut blocks = vec![BasicBlock {
        kind: BlockKind::Start,
        statements: Vec::new(),
    }];

    let mut current: Vec<Rc<BoundStmt>> = Vec::new();
    for stmt in statements {
        if matches!(stmt.as_ref(), BoundStmt::Label { .. }) && !current.is_empty() {
            blocks.push(BasicBlock {
                kind: BlockKind::Normal,
                statements: std::mem::take(&mut current),
            });
        }
        current.push(Rc::clone(stmt));
        if is_block_terminator(stmt) {
            blocks.push(BasicBlock {
                kind: BlockKind::Normal,
                statements: std::mem::take(&mut current),
            });
        }
    }
    if !current.is_empty() {
        blocks.push(BasicBlock {
            kind: BlockKind::Normal,
            statements: current,
        });
    }

    blocks.push(BasicBlock {
        kind: BlockKind::End,
        statements: Vec::new(),
    });
    blocks
}

fn build_edges(blocks: &[BasicBlock]) -> Vec<Edge> {
    let end = blocks.len() - 1;

    // Labels are resolved through a symbol-id table built once, never by
    // structural pointers.
    let mut label_blocks: HashMap<SymbolId, usize> = HashMap::new();
    for (index, block) in blocks.iter().enumerate() {
        for stmt in &block.statements {
            if let BoundStmt::Label { label } = stmt.as_ref() {
                label_blocks.insert(label.id, index);
            }
        }
    }

    let mut edges = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        if block.kind == BlockKind::End {
            continue;
        }
        let next = index + 1;
        match block.statements.last().map(Rc::as_ref) {
            Some(BoundStmt::Goto { label }) => {
                edges.push(Edge {
                    from: index,
                    to: label_blocks.get(&label.id).copied().unwrap_or(end),
                    label: String::new(),
                });
            }
            Some(BoundStmt::ConditionalGoto {
                label,
                condition,
                jump_if,
            }) => {
                edges.push(Edge {
                    from: index,
                    to: label_blocks.get(&label.id).copied().unwrap_or(end),
                    label: condition_text(condition, *jump_if),
                });
                edges.push(Edge {
                    from: index,
                    to: next,
                    label: condition_text(condition, !*jump_if),
                });
            }
            Some(BoundStmt::Return { .. }) => {
                edges.push(Edge {
                    from: index,
                    to: end,
                    label: String::new(),
                });
            }
            _ => {
                edges.push(Edge {
                    from: index,
                    to: next,
                    label: String::new(),
                });
            }
        }
    }
    edges
}

fn condition_text(condition: &Rc<BoundExpr>, when: bool) -> String {
    if when {
        condition.to_string()
    } else {
        format!("!({condition})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_hir::Value;

    fn ret(value: Option<i64>) -> Rc<BoundStmt> {
        Rc::new(BoundStmt::Return {
            expr: value.map(|v| BoundExpr::literal(Value::Int(v))),
        })
    }

    #[test]
    fn straight_line_body_with_return_satisfies_all_paths() {
        let body = vec![
            Rc::new(BoundStmt::Expression {
                expr: BoundExpr::literal(Value::Int(1)),
            }),
            ret(Some(1)),
        ];
        let graph = ControlFlowGraph::new(&body);
        assert!(graph.all_paths_return());
    }

    #[test]
    fn fall_through_to_end_fails_all_paths() {
        let body = vec![Rc::new(BoundStmt::Expression {
            expr: BoundExpr::literal(Value::Int(1)),
        })];
        let graph = ControlFlowGraph::new(&body);
        assert!(!graph.all_paths_return());
    }

    #[test]
    fn code_after_a_return_is_unreachable_and_ignored() {
        let body = vec![
            ret(Some(1)),
            Rc::new(BoundStmt::Expression {
                expr: BoundExpr::literal(Value::Int(2)),
            }),
        ];
        let graph = ControlFlowGraph::new(&body);
        assert!(graph.all_paths_return());
    }

    #[test]
    fn dot_output_names_every_live_block() {
        let body = vec![ret(None)];
        let graph = ControlFlowGraph::new(&body);
        let mut out = Vec::new();
        graph.write_dot("unit", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("digraph \"unit\" {"));
        assert!(text.contains("<start>"));
        assert!(text.contains("<end>"));
        assert!(text.contains("return;"));
    }
}
