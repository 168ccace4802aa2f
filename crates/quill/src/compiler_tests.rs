use quill_ast::Span;
use quill_hir::Value;

use crate::{Compilation, Variables};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Test text with `[...]` markers around the spans diagnostics are expected
/// to point at. Multi-line inputs are unindented first.
struct AnnotatedText {
    text: String,
    spans: Vec<Span>,
}

impl AnnotatedText {
    fn parse(text: &str) -> Self {
        let text = unindent(text);
        let mut clean = String::new();
        let mut spans = Vec::new();
        let mut starts = Vec::new();
        for c in text.chars() {
            match c {
                '[' => starts.push(clean.len() as u32),
                ']' => {
                    let start = starts.pop().expect("unmatched ']' in annotated text");
                    spans.push(Span::new(start, clean.len() as u32));
                }
                c => clean.push(c),
            }
        }
        assert!(starts.is_empty(), "unmatched '[' in annotated text");
        Self { text: clean, spans }
    }
}

fn unindent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let stripped: Vec<&str> = lines
        .iter()
        .map(|line| if line.len() >= indent { &line[indent..] } else { "" })
        .collect();
    stripped.join("\n").trim_matches('\n').to_string()
}

fn evaluate(source: &str) -> (Option<Value>, Vec<quill_diag::Diagnostic>) {
    let compilation = Compilation::compile(source);
    let mut variables = Variables::new();
    let mut sink = Vec::new();
    let result = compilation.evaluate_with(&mut variables, &mut sink, true);
    assert!(result.error.is_none(), "runtime error in {source:?}");
    (result.value, result.diagnostics)
}

#[track_caller]
fn assert_value(source: &str, expected: Value) {
    let (value, diagnostics) = evaluate(source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics for {source:?}: {diagnostics:?}"
    );
    assert_eq!(value, Some(expected), "wrong value for {source:?}");
}

#[track_caller]
fn assert_diagnostics(annotated: &str, expected: &[&str]) {
    let annotated = AnnotatedText::parse(annotated);
    assert_eq!(
        annotated.spans.len(),
        expected.len(),
        "mark as many spans as there are expected diagnostics"
    );

    let compilation = Compilation::compile(&annotated.text);
    let mut variables = Variables::new();
    let mut sink = Vec::new();
    let result = compilation.evaluate_with(&mut variables, &mut sink, true);

    assert_eq!(
        result.diagnostics.len(),
        expected.len(),
        "wrong diagnostic count: {:?}",
        result.diagnostics
    );
    assert_eq!(result.value, None, "diagnostics must abort evaluation");
    for ((diagnostic, message), span) in result
        .diagnostics
        .iter()
        .zip(expected)
        .zip(&annotated.spans)
    {
        assert_eq!(diagnostic.message, *message);
        assert_eq!(&diagnostic.span, span);
    }
}

// ---------------------------------------------------------------------------
// Evaluation corpus
// ---------------------------------------------------------------------------

fn int(value: i64) -> Value {
    Value::Int(value)
}

fn float(value: f64) -> Value {
    Value::Float(value)
}

fn boolean(value: bool) -> Value {
    Value::Bool(value)
}

fn string(value: &str) -> Value {
    Value::String(value.to_string())
}

#[test]
fn evaluates_bool_operations() {
    for (source, expected) in [
        ("true;", true),
        ("false;", false),
        ("!true;", false),
        ("!false;", true),
        ("true || false;", true),
        ("false || false;", false),
        ("true && true;", true),
        ("true && false;", false),
        ("false == false;", true),
        ("true == false;", false),
        ("true != false;", true),
        ("false | false;", false),
        ("false | true;", true),
        ("true & false;", false),
        ("true & true;", true),
        ("false ^ false;", false),
        ("true ^ false;", true),
        ("true ^ true;", false),
    ] {
        assert_value(source, boolean(expected));
    }
}

#[test]
fn evaluates_int_operations() {
    for (source, expected) in [
        ("1;", 1),
        ("+1;", 1),
        ("-1;", -1),
        ("~1;", !1),
        ("14 + 12;", 26),
        ("12 - 3;", 9),
        ("4 * 2;", 8),
        ("9 / 3;", 3),
        ("9 % 4;", 1),
        ("(10);", 10),
        ("1 | 2;", 3),
        ("1 & 2;", 0),
        ("1 & 1;", 1),
        ("1 ^ 3;", 2),
    ] {
        assert_value(source, int(expected));
    }
}

#[test]
fn evaluates_int_comparisons() {
    for (source, expected) in [
        ("12 == 3;", false),
        ("3 == 3;", true),
        ("12 != 3;", true),
        ("3 < 4;", true),
        ("5 < 4;", false),
        ("4 <= 4;", true),
        ("5 <= 4;", false),
        ("4 > 3;", true),
        ("4 > 5;", false),
        ("4 >= 4;", true),
        ("4 >= 5;", false),
    ] {
        assert_value(source, boolean(expected));
    }
}

#[test]
fn evaluates_int_variables_and_assignments() {
    for (source, expected) in [
        ("{ var a = 0; (a = 10) * a; }", 100),
        ("{ var a = 11; ++a; }", 12),
        ("{ var a = 11; --a; }", 10),
        ("{ var a = 11; a++; }", 11),
        ("{ var a = 11; a--; }", 11),
        ("{ var a = 11; ++a; a; }", 12),
        ("{ var a = 11; a++; a; }", 12),
        ("{ var a = 11; a--; a; }", 10),
        ("{ var a = 11; a += -1; }", 10),
        ("{ var a = 11; a -= 1; }", 10),
        ("{ var a = 10; a *= 2; }", 20),
        ("{ var a = 10; a /= 2; }", 5),
        ("{ var a = 1; a &= 3; }", 1),
        ("{ var a = 1; a |= 2; }", 3),
    ] {
        assert_value(source, int(expected));
    }
}

#[test]
fn evaluates_float_operations() {
    for (source, expected) in [
        ("1f;", 1.0),
        ("+1f;", 1.0),
        ("-1f;", -1.0),
        ("14f + 12f;", 26.0),
        ("12f - 3f;", 9.0),
        ("4f * 2f;", 8.0),
        ("9f / 3f;", 3.0),
        ("(10f);", 10.0),
        ("{ var a = 0f; (a = 10f) * a; }", 100.0),
        ("{ var a = 11f; ++a; }", 12.0),
        ("{ var a = 11f; a++; }", 11.0),
        ("{ var a = 11f; a--; a; }", 10.0),
        ("{ var a = 10f; a /= 2f; }", 5.0),
        ("1.5 + 1.25;", 2.75),
    ] {
        assert_value(source, float(expected));
    }
}

#[test]
fn evaluates_float_comparisons() {
    for (source, expected) in [
        ("3f == 3f;", true),
        ("12f != 3f;", true),
        ("3f < 4f;", true),
        ("5f <= 4f;", false),
        ("4f > 3f;", true),
        ("4f >= 5f;", false),
    ] {
        assert_value(source, boolean(expected));
    }
}

#[test]
fn evaluates_mixed_numeric_arithmetic() {
    assert_value("1 + 1.5;", float(2.5));
    assert_value("2.5 * 2;", float(5.0));
    assert_value("1 < 1.5;", boolean(true));
}

#[test]
fn evaluates_strings_and_chars() {
    assert_value("\"ab\" + \"cd\";", string("abcd"));
    assert_value("\"ab\" == \"ab\";", boolean(true));
    assert_value("\"ab\" != \"cd\";", boolean(true));
    assert_value("'a' == 'a';", boolean(true));
    assert_value("'a' < 'b';", boolean(true));
    assert_value("(string)12 + \"!\";", string("12!"));
}

#[test]
fn evaluates_explicit_casts() {
    assert_value("(int)3.9;", int(3));
    assert_value("(float)3;", float(3.0));
    assert_value("(char)65;", Value::Char('A'));
    assert_value("(int)'a';", int(97));
    assert_value("(string)true;", string("true"));
}

#[test]
fn evaluates_if_statements() {
    for (source, expected) in [
        ("{ var a = 0; if (a == 0) a = 10; a; }", 10),
        ("{ var a = 4; if (a == 0) a = 10; a; }", 4),
        ("{ var a = 0; if (a == 0) a = 10; else a = 34; a; }", 10),
        ("{ var a = 4; if (a == 0) a = 10; else a = 32; a; }", 32),
    ] {
        assert_value(source, int(expected));
    }
}

#[test]
fn evaluates_loops() {
    for (source, expected) in [
        ("{ var a = 0; while (a < 10) a = a + 1; a; }", 10),
        (
            "{ var result = 0; for (var i = 0; i <= 10; ++i) result = result + i; result; }",
            55,
        ),
        ("{ var a = 0; do a = a + 1; while (a < 3); a; }", 3),
        ("{ var a = 10; do a = a + 1; while (false); a; }", 11),
        (
            "{ var a = 0; while (true) { a = a + 1; if (a == 7) break; } a; }",
            7,
        ),
        (
            "{ var sum = 0; for (var i = 0; i < 10; ++i) { if (i % 2 == 1) continue; sum = sum + i; } sum; }",
            20,
        ),
    ] {
        assert_value(source, int(expected));
    }
}

#[test]
fn evaluates_gotos() {
    assert_value("{ var a = 1; goto skip; a = 99; skip: a; }", int(1));
}

#[test]
fn evaluates_typeof_and_nameof() {
    assert_value("typeof(string);", string("string"));
    assert_value("typeof(int);", string("int"));
    assert_value("typeof(bool);", string("bool"));
    assert_value("{ var a = 0; nameof(a); }", string("a"));
}

#[test]
fn evaluates_source_with_comments() {
    assert_value("{ var a = 3; nameof(a); // gets the name of a\n }", string("a"));
    assert_value("{ var a = 5; //nameof(a); \n }", int(5));
    assert_value("/* block */ 1 + 1;", int(2));
}

#[test]
fn evaluates_read_only_declarations() {
    assert_value("{ let a = 21; a * 2; }", int(42));
    assert_value("{ let greeting = \"hi\"; greeting + \"!\"; }", string("hi!"));
}

#[test]
fn evaluates_methods_and_namespaces() {
    assert_value(
        "def add(int a, int b) -> int { return a + b; } add(19, 23);",
        int(42),
    );
    assert_value("def twice(int a) => a * 2; twice(21);", int(42));
    assert_value(
        "namespace Math { def square(int x) -> int { return x * x; } } \
         with Math; square(6) + Math.square(1) + 0;",
        int(37),
    );
}

#[test]
fn optimized_and_unoptimized_evaluation_agree() {
    let sources = [
        "1;",
        "14 + 12;",
        "{ var a = 0; if (a == 0) a = 10; a; }",
        "{ var result = 0; for (var i = 0; i <= 10; ++i) result = result + i; result; }",
        "{ let a = 5; a + 2; }",
        "{ var a = 11; a++; a; }",
        "if (false) print(1); else print(2);",
        "{ var a = 0; (a = 10) * a; }",
    ];
    for source in sources {
        let compilation = Compilation::compile(source);
        assert!(compilation.diagnostics().is_empty());

        let mut run = |optimized: bool| {
            let mut variables = Variables::new();
            let mut sink = Vec::new();
            let result = compilation.evaluate_with(&mut variables, &mut sink, optimized);
            (result.value, String::from_utf8(sink).unwrap())
        };
        assert_eq!(run(true), run(false), "optimizer changed {source:?}");
    }
}

// ---------------------------------------------------------------------------
// Diagnostic scenarios
// ---------------------------------------------------------------------------

#[test]
fn reports_redeclaration_at_the_outer_shadow() {
    assert_diagnostics(
        "
        {
            var x = 10;
            var y = 100;
            {
                var x = 10;
            }
            var [x] = 5;
        }
        ",
        &["A variable with the name 'x' is already declared."],
    );
}

#[test]
fn reports_undefined_assignment_target() {
    assert_diagnostics("[x] = 10;", &["Symbol 'x' does not exist."]);
}

#[test]
fn reports_assignment_type_mismatch() {
    assert_diagnostics(
        "
        {
            var x = 10;
            x = [true];
        }
        ",
        &["Cannot convert type 'bool' to 'int'."],
    );
}

#[test]
fn reports_undefined_unary_operator() {
    assert_diagnostics("[+]true;", &["Unary operator '+' is not defined for type 'bool'."]);
}

#[test]
fn reports_undefined_binary_operator_and_stops_evaluation() {
    assert_diagnostics(
        "10 [*] true;",
        &["Binary operator '*' is not defined for types 'int' and 'bool'."],
    );
}

#[test]
fn syntax_errors_stop_the_pipeline_before_binding() {
    let compilation = Compilation::compile("1 + ; undeclared;");
    // The undefined name is never reported because binding never ran.
    assert!(
        compilation
            .diagnostics()
            .iter()
            .all(|d| d.message.starts_with("Unexpected token"))
    );
    assert!(compilation.program().is_err());
}

#[test]
fn diagnostics_are_deduplicated_across_stages() {
    let compilation = Compilation::compile("{ x = 1; x = 1; }");
    // Two distinct spans, same message; both survive, sorted by span.
    let diagnostics = compilation.diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].span < diagnostics[1].span);
}

// ---------------------------------------------------------------------------
// Pipeline surfaces
// ---------------------------------------------------------------------------

#[test]
fn runtime_errors_are_distinct_from_diagnostics() {
    let compilation = Compilation::compile("1 / 0;");
    assert!(compilation.diagnostics().is_empty());

    let mut variables = Variables::new();
    let mut sink = Vec::new();
    let result = compilation.evaluate_with(&mut variables, &mut sink, true);
    assert_eq!(result.error, Some(crate::RuntimeError::DivisionByZero));
    assert_eq!(result.value, None);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn initial_variables_survive_into_the_environment() {
    let compilation = Compilation::compile("var counter = 3; counter * 2;");
    let mut variables = Variables::new();
    let mut sink = Vec::new();
    let result = compilation.evaluate_with(&mut variables, &mut sink, true);
    assert_eq!(result.value, Some(int(6)));

    let stored: Vec<_> = variables.iter().collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0.name, "counter");
    assert_eq!(stored[0].1, &int(3));
}

#[test]
fn control_flow_graphs_are_emitted_per_unit() {
    let compilation = Compilation::compile(
        "def abs(int x) -> int { if (x < 0) return -x; return x; } abs(-3);",
    );
    assert!(compilation.diagnostics().is_empty());

    let graphs: std::cell::RefCell<Vec<(String, Vec<u8>)>> = std::cell::RefCell::new(Vec::new());
    let closed = std::cell::Cell::new(0usize);
    compilation
        .generate_control_flow_graphs(
            |name| {
                graphs.borrow_mut().push((name.to_string(), Vec::new()));
                Ok(Vec::new())
            },
            |writer| {
                closed.set(closed.get() + 1);
                let mut graphs = graphs.borrow_mut();
                let slot = &mut graphs.last_mut().expect("opened before closed").1;
                *slot = writer;
                Ok(())
            },
        )
        .unwrap();

    let closed = closed.get();
    let graphs = graphs.into_inner();
    assert_eq!(closed, graphs.len());
    let names: Vec<&str> = graphs.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["main", "abs"]);
    for (name, bytes) in &graphs {
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with(&format!("digraph \"{name}\"")));
        assert!(text.contains("->"), "graph {name} has no edges");
    }
}

#[test]
fn rendered_trees_are_stable() {
    let compilation = Compilation::compile("1;");
    insta::assert_snapshot!(compilation.syntax_tree().render(), @r"
    CompilationUnit
      ExpressionStatement
        LiteralExpression 1
    ");

    let optimized = compilation.optimized_program().unwrap();
    insta::assert_snapshot!(optimized.render(), @"return 1;");
}

#[test]
fn bound_program_rendering_shows_constant_propagation() {
    let compilation = Compilation::compile("{ let a = 5; a + 2; }");
    let optimized = compilation.optimized_program().unwrap();
    insta::assert_snapshot!(optimized.render(), @r"
    nop;
    return 7;
    ");
}
