//! Plain-text rendering of diagnostics with source context.

use std::io::{self, Write};

use quill_diag::{Diagnostic, SourceText};

/// Write diagnostics with 1-based line/column locations and the offending
/// span marked in its source line. `diagnostics` is expected in ascending
/// span order.
pub fn write_diagnostics(
    out: &mut dyn Write,
    source: &SourceText,
    diagnostics: &[Diagnostic],
) -> io::Result<()> {
    for diagnostic in diagnostics {
        let (line, column) = source.line_col(diagnostic.span.start);
        writeln!(out)?;
        writeln!(out, "({line}, {column}): {diagnostic}")?;

        let line_span = source.line_span(line - 1);
        let text = source.slice(line_span);
        writeln!(out, "    {text}")?;

        let prefix = source.slice(quill_ast::Span::new(line_span.start, diagnostic.span.start));
        let marked = diagnostic
            .span
            .len()
            .min(line_span.end.saturating_sub(diagnostic.span.start))
            .max(1) as usize;
        writeln!(
            out,
            "    {}{}",
            " ".repeat(prefix.chars().count()),
            "^".repeat(marked)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_ast::Span;

    #[test]
    fn marks_the_offending_span_in_its_line() {
        let source = SourceText::new("var a = 1;\nvar a = 2;\n");
        let diagnostics = vec![Diagnostic::new(
            Span::new(15, 16),
            "A variable with the name 'a' is already declared.",
        )];
        let mut out = Vec::new();
        write_diagnostics(&mut out, &source, &diagnostics).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(2, 5): A variable with the name 'a' is already declared."));
        assert!(text.contains("    var a = 2;"));
        assert!(text.contains("\n        ^\n"));
    }
}
