//! Mica CLI - компиляция исходного файла в LLVM bitcode.
//!
//! Использование:
//!   mica <file.mica>   - скомпилировать файл в ./main.bc
//!   mica --help        - справка
//!
//! Дамп сгенерированного IR печатается на stdout, bitcode пишется в
//! `main.bc` в текущем каталоге. Любая ошибка завершает процесс с
//! ненулевым кодом.

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use mica_lang::compiler;
use mica_lang::CompileError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP: &str = r#"
Mica - a small imperative language compiled to LLVM bitcode

USAGE:
    mica <file.mica>     Compile a file; IR goes to stdout, bitcode to ./main.bc
    mica --help, -h      Show this help
    mica --version, -v   Show version

SYNTAX:
    let x;               ; scalar declaration
    let a[3];            ; array of three i32 cells
    x = 10;              ; assignment
    a[0] = x + 5;        ; array element assignment
    x + a[0];            ; expression statement prints its value
    loop { ... }         ; infinite loop with break/continue
    if x >= 3 { break; } ; conditional, optional else block
    return x;            ; finish with an exit code
"#;

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.len() {
        2 => match args[1].as_str() {
            "--help" | "-h" => {
                println!("{}", HELP);
            }
            "--version" | "-v" => {
                println!("mica {}", VERSION);
            }
            file => run_file(file),
        },
        _ => {
            eprintln!("Usage: mica <file.mica>");
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
    }
}

/// Скомпилировать файл; каждая ошибка фатальна.
fn run_file(path: &str) {
    let source = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    };

    let module_name = Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("main");

    match compiler::compile(&source, module_name, Path::new("main.bc")) {
        Ok(()) => {}
        Err(CompileError::Parse(e)) => {
            // Синтаксические ошибки печатаем с контекстом исходника.
            eprintln!("{}", e.format_with_source(&String::from_utf8_lossy(&source)));
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(1);
        }
    }
}
