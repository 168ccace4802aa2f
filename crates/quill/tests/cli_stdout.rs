//! End-to-end checks of the CLI binary.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

struct TempDir(PathBuf);

impl TempDir {
    fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!("quill-cli-{tag}-{}", std::process::id()));
        fs::create_dir_all(&path).expect("create temp dir");
        Self(path)
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.0.join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn quill() -> Command {
    Command::new(env!("CARGO_BIN_EXE_quill"))
}

#[test]
fn evaluates_a_file_and_prints_the_result() {
    let dir = TempDir::new("eval");
    let file = dir.file("prog.quill", "14 + 12;");

    let output = quill().arg(&file).output().expect("run quill");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "26");
}

#[test]
fn builtin_output_precedes_the_result_value() {
    let dir = TempDir::new("print");
    let file = dir.file("prog.quill", "println(\"hello\"); 1 + 1;");

    let output = quill().arg(&file).output().expect("run quill");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n2\n");
}

#[test]
fn diagnostics_go_to_stderr_with_a_failing_exit_code() {
    let dir = TempDir::new("diag");
    let file = dir.file("prog.quill", "10 * true;");

    let output = quill().arg(&file).output().expect("run quill");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Binary operator '*' is not defined for types 'int' and 'bool'."));
    assert!(stderr.contains("(1, 4)"));
    assert!(String::from_utf8_lossy(&output.stdout).is_empty());
}

#[test]
fn show_tree_prints_the_syntax_tree() {
    let dir = TempDir::new("tree");
    let file = dir.file("prog.quill", "1;");

    let output = quill()
        .arg("--show-tree")
        .arg(&file)
        .output()
        .expect("run quill");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CompilationUnit"));
    assert!(stdout.contains("LiteralExpression 1"));
}

#[test]
fn cfg_flag_writes_dot_files_per_unit() {
    let dir = TempDir::new("cfg");
    let file = dir.file("prog.quill", "def id(int x) -> int { return x; } id(1);");
    let graphs = dir.0.join("graphs");

    let output = quill()
        .arg("--cfg")
        .arg(&graphs)
        .arg(&file)
        .output()
        .expect("run quill");
    assert!(output.status.success());

    let main = fs::read_to_string(graphs.join("main.dot")).expect("main graph written");
    assert!(main.starts_with("digraph \"main\""));
    let id = fs::read_to_string(graphs.join("id.dot")).expect("method graph written");
    assert!(id.contains("return x;"));
}

#[test]
fn multiple_sources_are_concatenated_in_order() {
    let dir = TempDir::new("multi");
    let first = dir.file("a.quill", "var a = 20;");
    let second = dir.file("b.quill", "a + 2;");

    let output = quill()
        .arg(&first)
        .arg(&second)
        .output()
        .expect("run quill");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "22");
}

#[test]
fn runtime_errors_are_reported_on_stderr() {
    let dir = TempDir::new("runtime");
    let file = dir.file("prog.quill", "1 / 0;");

    let output = quill().arg(&file).output().expect("run quill");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Division by zero."));
}
