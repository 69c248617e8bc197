//! Модуль `compiler`
//!
//! Постадийный конвейер компиляции Mica:
//! разбор -> генерация IR -> верификация -> сериализация.
//!
//! Стадии строго последовательны: парсер полностью вычитывает лексер до
//! начала генерации, генерация завершается до верификации, bitcode
//! записывается только после успешной верификации.

use std::fs;
use std::path::Path;

use inkwell::context::Context;

use crate::error::CompileResult;
use crate::intern::Interner;
use crate::llvm_backend::LLVMBackend;
use crate::parser;

/// Скомпилировать исходник и вернуть текстовый дамп IR.
///
/// Модуль верифицируется; bitcode не записывается. Основной вход для
/// тестов и инструментов.
pub fn compile_to_ir(source: &[u8], module_name: &str) -> CompileResult<String> {
    let mut interner = Interner::new();
    let program = parser::parse(source, &mut interner)?;

    let context = Context::create();
    let mut backend = LLVMBackend::new(&context, module_name, &interner);
    backend.compile(&program)?;
    backend.verify()?;
    Ok(backend.get_ir())
}

/// Скомпилировать исходник в bitcode-файл.
///
/// Дамп IR печатается на stdout до верификации (диагностика доступна
/// и для модуля, который верификатор отклонит); bitcode пишется только
/// после успешной верификации.
pub fn compile(source: &[u8], module_name: &str, bitcode_path: &Path) -> CompileResult<()> {
    let mut interner = Interner::new();
    let program = parser::parse(source, &mut interner)?;

    let context = Context::create();
    let mut backend = LLVMBackend::new(&context, module_name, &interner);
    backend.compile(&program)?;

    println!("{}", backend.get_ir());

    backend.verify()?;
    backend.write_bitcode(bitcode_path)?;
    Ok(())
}

/// Прочитать файл и скомпилировать его в bitcode-файл.
pub fn compile_file(input: &Path, bitcode_path: &Path) -> CompileResult<()> {
    let source = fs::read(input)?;
    let module_name = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("main");
    compile(&source, module_name, bitcode_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    #[test]
    fn test_pipeline_produces_main() {
        let ir = compile_to_ir(b"1 + 2 * 3;", "demo").unwrap();
        assert!(ir.contains("define i32 @main()"));
        assert!(ir.contains("printf"));
    }

    #[test]
    fn test_pipeline_sets_host_triple() {
        let ir = compile_to_ir(b";", "demo").unwrap();
        assert!(ir.contains("target triple"));
    }

    #[test]
    fn test_pipeline_scenarios_verify() {
        // Сквозные сценарии: каждый обязан дать верифицируемый модуль.
        let scenarios: &[&str] = &[
            "1 + 2 * 3;",
            "1 || (1/0);",
            "let x; x = 10; x = x + 5; x;",
            "let a[3]; a[0] = 7; a[1] = 8; a[2] = a[0] + a[1]; a[2];",
            "let i; i = 0; loop { if i >= 3 { break; } i; i = i + 1; }",
            "if 0 { 1; } else { if 1 { 2; } else { 3; } }",
        ];
        for source in scenarios {
            let result = compile_to_ir(source.as_bytes(), "scenario");
            assert!(result.is_ok(), "scenario failed: {:?} -> {:?}", source, result.err());
        }
    }

    #[test]
    fn test_pipeline_reports_parse_error() {
        let err = compile_to_ir(b"let ;", "demo").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn test_pipeline_reports_missing_file() {
        let err = compile_file(
            Path::new("no-such-file.mica"),
            Path::new("main.bc"),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Io(_)));
    }
}
