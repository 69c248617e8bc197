//! Определения ошибок компилятора Mica.

use thiserror::Error;

use crate::parser::ParseError;

/// Основной тип `Result` для библиотеки.
pub type CompileResult<T> = Result<T, CompileError>;

/// Перечисление всех возможных ошибок. Каждая фатальна:
/// компиляция либо доходит до конца, либо прерывается первой ошибкой.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Лексическая или синтаксическая ошибка.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Использование имени до объявления.
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// Скаляр использован как массив.
    #[error("'{0}' is not an array")]
    NotAnArray(String),

    /// Массив использован как скаляр.
    #[error("Array '{0}' cannot be used as a scalar")]
    NotAScalar(String),

    /// Размер массива в `let` — не целочисленный литерал.
    #[error("Array size for '{0}' must be an integer literal")]
    BadArraySize(String),

    /// Слева от `=` не переменная и не элемент массива.
    #[error("Assignment target must be a variable or an array element")]
    BadAssignTarget,

    /// `break` вне цикла.
    #[error("'break' outside of a loop")]
    BreakOutsideLoop,

    /// `continue` вне цикла.
    #[error("'continue' outside of a loop")]
    ContinueOutsideLoop,

    /// Повторное объявление имени в одной области видимости.
    #[error("'{0}' is already declared in this scope")]
    Redeclaration(String),

    /// Ошибка построителя LLVM.
    #[error("LLVM builder error: {0}")]
    Llvm(String),

    /// Верификатор LLVM отклонил модуль.
    #[error("Module verification failed: {0}")]
    Verify(String),

    /// Ошибка ввода-вывода (включая запись bitcode).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Нарушение внутреннего инварианта.
    #[error("Internal error: {0}")]
    Internal(String),
}
