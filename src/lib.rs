//! # Mica
//!
//! Компилятор небольшого императивного языка Mica: ahead-of-time
//! трансляция исходного текста в верифицированный LLVM-модуль с
//! записью bitcode.
//!
//! ## Основные модули
//!
//! - [`intern`] - таблица идентификаторов (имя <-> плотный id)
//! - [`parser`] - ручной лексер и парсер рекурсивного спуска
//! - [`ast`] - дерево выражений и операторов
//! - [`symbols`] - таблица символов со стеком областей видимости
//! - [`llvm_backend`] - генерация типизированного SSA IR через inkwell
//! - [`compiler`] - постадийный конвейер компиляции
//!
//! ## Конвейер
//!
//! Стадии строго последовательны: лексер -> парсер -> генератор IR ->
//! верификатор -> bitcode. Первая же ошибка прерывает компиляцию.
//!
//! ## Пример
//!
//! ```rust,ignore
//! use mica_lang::compiler::compile_to_ir;
//!
//! let ir = compile_to_ir(b"let x; x = 2; x * 21;", "demo").unwrap();
//! assert!(ir.contains("@main"));
//! ```

pub mod ast;
pub mod compiler;
pub mod error;
pub mod intern;
pub mod llvm_backend;
pub mod parser;
pub mod symbols;

// === Re-exports для удобства ===
pub use ast::{BinOp, Decl, Expr, Program, Stmt, UnOp};
pub use error::{CompileError, CompileResult};
pub use intern::{IdentId, Interner};
pub use llvm_backend::LLVMBackend;
pub use parser::{parse, ParseError};
