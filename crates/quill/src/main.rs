use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use quill::{Compilation, Variables, write_diagnostics};

const USAGE: &str = "usage: quill [options] <file-or-directory>...

options:
    --show-tree      print the parsed syntax tree
    --show-program   print the bound program
    --cfg <dir>      write one control-flow graph per unit into <dir>
    --no-optimize    evaluate the unoptimized program
    -h, --help       show this help";

fn main() {
    if let Err(message) = run() {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct Options {
    inputs: Vec<PathBuf>,
    show_tree: bool,
    show_program: bool,
    cfg_dir: Option<PathBuf>,
    no_optimize: bool,
}

fn run() -> Result<(), String> {
    let args = std::env::args().collect::<Vec<_>>();
    let options = parse_cli(&args)?;

    let mut source = String::new();
    for input in &options.inputs {
        append_source(input, &mut source)?;
    }

    let compilation = Compilation::compile(&source);

    if options.show_tree {
        print!("{}", compilation.syntax_tree().render());
    }
    if options.show_program {
        if let Ok(program) = compilation.program() {
            print!("{}", program.render());
        }
    }
    if let Some(dir) = &options.cfg_dir {
        write_control_flow_graphs(&compilation, dir)?;
    }

    let diagnostics = compilation.diagnostics();
    if !diagnostics.is_empty() {
        let mut stderr = io::stderr();
        write_diagnostics(&mut stderr, compilation.source(), &diagnostics)
            .map_err(|err| format!("failed to render diagnostics: {err}"))?;
        let plural = if diagnostics.len() == 1 { "" } else { "s" };
        return Err(format!("{} error{plural} found.", diagnostics.len()));
    }

    let mut variables = Variables::new();
    let mut stdout = io::stdout();
    let result = compilation.evaluate_with(&mut variables, &mut stdout, !options.no_optimize);

    if let Some(error) = result.error {
        return Err(error.to_string());
    }
    if let Some(value) = result.value {
        println!("{value}");
    }
    Ok(())
}

fn parse_cli(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--show-tree" => options.show_tree = true,
            "--show-program" => options.show_program = true,
            "--no-optimize" => options.no_optimize = true,
            "--cfg" => {
                let dir = iter
                    .next()
                    .ok_or_else(|| "--cfg requires a directory argument".to_string())?;
                options.cfg_dir = Some(PathBuf::from(dir));
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if other.starts_with('-') => {
                return Err(format!("unknown option `{other}`\n\n{USAGE}"));
            }
            other => options.inputs.push(PathBuf::from(other)),
        }
    }
    if options.inputs.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(options)
}

/// Append a file, or every file under a directory (recursively, in sorted
/// order), to the source buffer.
fn append_source(path: &Path, out: &mut String) -> Result<(), String> {
    if path.is_dir() {
        let mut entries: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();
        for entry in entries {
            append_source(&entry, out)?;
        }
        Ok(())
    } else if path.is_file() {
        let text = fs::read_to_string(path)
            .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
        out.push_str(&text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
        Ok(())
    } else {
        Err(format!("Source '{}' does not exist.", path.display()))
    }
}

fn write_control_flow_graphs(compilation: &Compilation, dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|err| format!("failed to create `{}`: {err}", dir.display()))?;

    let mut count = 0usize;
    compilation
        .generate_control_flow_graphs(
            |name| {
                count += 1;
                let path = dir.join(format!("{}.dot", sanitize_file_name(name)));
                Ok(BufWriter::new(fs::File::create(path)?))
            },
            |mut writer| writer.flush(),
        )
        .map_err(|err| format!("failed to write control flow graphs: {err}"))?;

    println!("Printed {count} control flow graph(s) to {}.", dir.display());
    Ok(())
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
