//! Error reporting and diagnostics for Quill.
//!
//! Diagnostics are span-tagged messages compared by value: reporting the same
//! `(span, message)` pair twice collapses to a single entry. They are created
//! by the lexer, parser and binder and rendered by the driver.

use std::fmt;

use quill_ast::Span;

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A single compiler message tied to a source span.
///
/// Equality and hashing use the full value, which is what the deduplication
/// in [`DiagnosticBag`] keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Error type wrapping the diagnostics that stopped a pipeline stage.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.message.as_str()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// DiagnosticBag
// ---------------------------------------------------------------------------

/// A value-deduplicated collection of diagnostics.
///
/// Insertion order is preserved; [`DiagnosticBag::sorted`] yields diagnostics
/// in ascending span order, which is the order they are reported in.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// All diagnostics in ascending span order.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics.clone();
        diagnostics.sort_by_key(|d| d.span);
        diagnostics
    }

    /// Move every diagnostic from `other` into this bag, deduplicating.
    pub fn merge(&mut self, other: DiagnosticBag) {
        for diagnostic in other.diagnostics {
            self.insert(diagnostic);
        }
    }

    fn insert(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    fn report(&mut self, span: Span, message: String) {
        self.insert(Diagnostic::new(span, message));
    }

    // -- Lexical --

    pub fn report_bad_character(&mut self, position: u32, character: char) {
        let span = Span::new(position, position + character.len_utf8() as u32);
        self.report(span, format!("Bad character input '{character}'."));
    }

    pub fn report_unterminated_string(&mut self, span: Span) {
        self.report(span, "Unterminated string literal.".to_string());
    }

    pub fn report_unterminated_character_literal(&mut self, span: Span) {
        self.report(span, "Unterminated character literal.".to_string());
    }

    pub fn report_empty_character_literal(&mut self, span: Span) {
        self.report(span, "Empty character literal.".to_string());
    }

    pub fn report_invalid_value(&mut self, span: Span, text: &str, ty: impl fmt::Display) {
        self.report(
            span,
            format!("The number '{text}' is not a valid value for type '{ty}'."),
        );
    }

    // -- Syntactic --

    pub fn report_unexpected_token(&mut self, span: Span, actual: &str, expected: &str) {
        self.report(
            span,
            format!("Unexpected token <{actual}>, expected <{expected}>."),
        );
    }

    pub fn report_type_expected(&mut self, span: Span, actual: &str) {
        self.report(
            span,
            format!("Unexpected token <{actual}>, expected explicit type."),
        );
    }

    pub fn report_cannot_declare_conditional(&mut self, span: Span) {
        self.report(
            span,
            "Variable declarations cannot be placed right after a condition.".to_string(),
        );
    }

    pub fn report_declaration_or_assignment_only(&mut self, span: Span) {
        self.report(
            span,
            "The initialization clause of a for statement must be a variable declaration or an assignment.".to_string(),
        );
    }

    // -- Semantic --

    pub fn report_undefined_symbol(&mut self, span: Span, name: &str) {
        self.report(span, format!("Symbol '{name}' does not exist."));
    }

    pub fn report_variable_already_declared(&mut self, span: Span, name: &str) {
        self.report(
            span,
            format!("A variable with the name '{name}' is already declared."),
        );
    }

    pub fn report_label_already_declared(&mut self, span: Span, name: &str) {
        self.report(
            span,
            format!("A label with the name '{name}' is already declared."),
        );
    }

    pub fn report_method_already_declared(&mut self, span: Span, name: &str) {
        self.report(
            span,
            format!("A method with the name '{name}' is already declared in this scope."),
        );
    }

    pub fn report_duplicate_parameter_name(&mut self, span: Span, name: &str) {
        self.report(span, format!("Duplicate parameter name '{name}'."));
    }

    pub fn report_wrong_argument_count(
        &mut self,
        span: Span,
        name: &str,
        expected: usize,
        actual: usize,
    ) {
        self.report(
            span,
            format!("Method '{name}' requires {expected} arguments, but received {actual}."),
        );
    }

    pub fn report_wrong_argument_type(
        &mut self,
        span: Span,
        method: &str,
        parameter: &str,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) {
        self.report(
            span,
            format!(
                "Parameter '{parameter}' in method '{method}' requires value of type '{expected}', but received value of type '{actual}'."
            ),
        );
    }

    /// `candidates` must already be sorted by full name.
    pub fn report_ambiguous_symbol_reference(&mut self, span: Span, candidates: &[String]) {
        let list = candidates
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(", ");
        self.report(
            span,
            format!("Reference is ambiguous between the following symbols: {list}."),
        );
    }

    pub fn report_cannot_assign_read_only(&mut self, span: Span, name: &str) {
        self.report(
            span,
            format!("Variable '{name}' is read-only and cannot be modified."),
        );
    }

    pub fn report_increment_operand_must_be_variable(&mut self, span: Span) {
        self.report(
            span,
            "The operand of an increment or decrement operation must be a variable.".to_string(),
        );
    }

    pub fn report_undefined_unary_operator(
        &mut self,
        span: Span,
        operator: &str,
        operand: impl fmt::Display,
    ) {
        self.report(
            span,
            format!("Unary operator '{operator}' is not defined for type '{operand}'."),
        );
    }

    pub fn report_undefined_binary_operator(
        &mut self,
        span: Span,
        operator: &str,
        left: impl fmt::Display,
        right: impl fmt::Display,
    ) {
        self.report(
            span,
            format!(
                "Binary operator '{operator}' is not defined for types '{left}' and '{right}'."
            ),
        );
    }

    pub fn report_cannot_implicitly_convert(
        &mut self,
        span: Span,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) {
        self.report(
            span,
            format!(
                "Cannot implicitly convert type '{from}' to '{to}'. An explicit conversion exists (are you missing a cast?)"
            ),
        );
    }

    pub fn report_no_explicit_conversion(
        &mut self,
        span: Span,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) {
        self.report(
            span,
            format!("No explicit conversion exists for type '{from}' to '{to}'."),
        );
    }

    pub fn report_cannot_convert(
        &mut self,
        span: Span,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) {
        self.report(span, format!("Cannot convert type '{from}' to '{to}'."));
    }

    pub fn report_cannot_assign_void(&mut self, span: Span) {
        self.report(
            span,
            "Cannot assign void to an implicitly-typed variable.".to_string(),
        );
    }

    pub fn report_unexpected_break_or_continue(&mut self, span: Span) {
        self.report(
            span,
            "No enclosing loop out of which to break or continue.".to_string(),
        );
    }

    pub fn report_not_all_paths_return(&mut self, span: Span) {
        self.report(span, "Not all paths return a value.".to_string());
    }

    pub fn report_invalid_return_in_void_method(&mut self, span: Span) {
        self.report(
            span,
            "Cannot return an expression from a method returning void.".to_string(),
        );
    }

    pub fn report_missing_return_expression(&mut self, span: Span) {
        self.report(
            span,
            "Expected to return expression in non-void returning method.".to_string(),
        );
    }

    pub fn report_cannot_infer_return_type(&mut self, span: Span, name: &str) {
        self.report(
            span,
            format!("Implicit return type of method '{name}' cannot be inferred."),
        );
    }

    pub fn report_illegal_statement_placement(&mut self, span: Span) {
        self.report(
            span,
            "Unexpected statement. Namespaces cannot directly contain statements.".to_string(),
        );
    }

    pub fn report_illegal_namespace_declaration(&mut self, span: Span) {
        self.report(
            span,
            "Namespaces may not be declared inside of methods.".to_string(),
        );
    }

    pub fn report_illegal_simple_namespace_declaration(&mut self, span: Span) {
        self.report(
            span,
            "Simple namespace declarations may only exist as top-level statements (not nested in other namespaces).".to_string(),
        );
    }

    pub fn report_unsupported_expression(&mut self, span: Span, what: &str) {
        self.report(span, format!("{what} are not supported yet."));
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

// ---------------------------------------------------------------------------
// SourceText
// ---------------------------------------------------------------------------

/// Source text with a line index, for resolving spans to 1-based line and
/// column numbers and for slicing the offending line out for display.
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    line_starts: Vec<u32>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The 0-based index of the line containing `position`.
    pub fn line_index(&self, position: u32) -> usize {
        self.line_starts.partition_point(|&start| start <= position) - 1
    }

    /// 1-based line and column of `position`.
    pub fn line_col(&self, position: u32) -> (usize, usize) {
        let line = self.line_index(position);
        let column = (position - self.line_starts[line]) as usize + 1;
        (line + 1, column)
    }

    /// The span of the given 0-based line, excluding its line break.
    pub fn line_span(&self, line: usize) -> Span {
        let start = self.line_starts[line];
        let end = match self.line_starts.get(line + 1) {
            Some(&next) => {
                let mut end = next;
                let bytes = self.text.as_bytes();
                while end > start && matches!(bytes[end as usize - 1], b'\n' | b'\r') {
                    end -= 1;
                }
                end
            }
            None => self.len(),
        };
        Span::new(start, end)
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.start as usize..span.end as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_deduplicates_by_value() {
        let mut bag = DiagnosticBag::new();
        let span = Span::new(3, 7);
        bag.report_undefined_symbol(span, "x");
        bag.report_undefined_symbol(span, "x");
        bag.report_undefined_symbol(span, "y");
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn sorted_orders_by_ascending_span() {
        let mut bag = DiagnosticBag::new();
        bag.report_undefined_symbol(Span::new(9, 10), "b");
        bag.report_undefined_symbol(Span::new(2, 3), "a");
        let sorted = bag.sorted();
        assert_eq!(sorted[0].span, Span::new(2, 3));
        assert_eq!(sorted[1].span, Span::new(9, 10));
    }

    #[test]
    fn line_index_resolves_lines_and_columns() {
        let text = SourceText::new("var a = 1;\nvar b = 2;\n");
        assert_eq!(text.line_col(0), (1, 1));
        assert_eq!(text.line_col(4), (1, 5));
        assert_eq!(text.line_col(11), (2, 1));
        assert_eq!(text.line_col(15), (2, 5));
        assert_eq!(text.slice(text.line_span(1)), "var b = 2;");
    }

    #[test]
    fn diagnostic_display_is_its_message() {
        let diagnostic = Diagnostic::new(Span::new(0, 1), "Bad character input '$'.");
        assert_eq!(format!("{diagnostic}"), "Bad character input '$'.");
    }
}
