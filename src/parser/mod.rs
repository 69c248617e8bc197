//! Модуль разбора исходного текста Mica.
//!
//! Лексер — ручной сканер по байтам; парсер — рекурсивный спуск
//! с приоритетами операторов в духе C.
//!
//! # Синтаксис
//!
//! ```text
//! // Объявления и присваивания
//! let x;          // скаляр
//! let a[3];       // массив из трёх ячеек i32
//! x = 10;
//! a[0] = x + 5;
//!
//! // Выражение-оператор печатает своё значение
//! x + a[0];
//!
//! // Управление
//! loop {
//!     if x >= 3 { break; }
//!     x = x + 1;
//! }
//! return x;
//! ```
//!
//! Приоритеты, от низшего к высшему: `||`, `&&`, сравнения,
//! аддитивные (`+ - ^ |`), мультипликативные (`<< >> & * / %`),
//! унарные, первичные.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::ParseError;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Span, Spanned, Token};

use crate::ast::Program;
use crate::intern::Interner;

/// Распарсить исходный текст в дерево программы.
///
/// # Аргументы
///
/// * `source` — байтовый буфер исходника; конец буфера или NUL-байт
///   завершают ввод.
/// * `interner` — таблица идентификаторов; заполняется по ходу разбора.
pub fn parse(source: &[u8], interner: &mut Interner) -> Result<Program, ParseError> {
    Parser::new(source, interner).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Stmt;

    #[test]
    fn test_parse_program() {
        let mut interner = Interner::new();
        let program = parse(b"let x; x = 1; x;", &mut interner).unwrap();
        assert_eq!(program.stmts.len(), 3);
    }

    #[test]
    fn test_parse_fills_interner() {
        let mut interner = Interner::new();
        parse(b"let first; let second;", &mut interner).unwrap();
        // Ключевые слова плюс два имени.
        assert!(interner.len() >= 9);
    }

    #[test]
    fn test_parse_empty_source() {
        let mut interner = Interner::new();
        let program = parse(b"", &mut interner).unwrap();
        assert!(program.stmts.is_empty());
    }

    #[test]
    fn test_parse_comment_only() {
        let mut interner = Interner::new();
        let program = parse(b"// nothing here\n", &mut interner).unwrap();
        assert_eq!(program.stmts, Vec::<Stmt>::new());
    }
}
