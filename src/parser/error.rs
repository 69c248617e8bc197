//! Ошибки лексера и парсера.

use thiserror::Error;

use super::token::Span;

/// Ошибка разбора. Первая же ошибка прерывает компиляцию:
/// восстановления нет.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Целочисленный литерал не влезает в i32.
    #[error("Integer literal at position {} does not fit in i32", span.start)]
    IntegerOverflow { span: Span },

    /// Байт вне алфавита языка.
    #[error("Unexpected character {:?} at position {}", *byte as char, span.start)]
    UnexpectedByte { span: Span, byte: u8 },

    /// Неожиданный токен.
    #[error("Unexpected token at position {}: expected {expected}, found {found}", span.start)]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    /// Неожиданный конец ввода.
    #[error("Unexpected end of input at position {}", span.start)]
    UnexpectedEof { span: Span },
}

impl ParseError {
    /// Создать ошибку "неожиданный токен". `found` — написание токена;
    /// идентификаторы вызывающая сторона разворачивает в имя.
    pub fn unexpected_token(
        span: Span,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Получить позицию ошибки.
    pub fn span(&self) -> Span {
        match self {
            Self::IntegerOverflow { span } => *span,
            Self::UnexpectedByte { span, .. } => *span,
            Self::UnexpectedToken { span, .. } => *span,
            Self::UnexpectedEof { span } => *span,
        }
    }

    /// Format error with source context showing line:column.
    pub fn format_with_source(&self, source: &str) -> String {
        let span = self.span();
        let (line, col) = calculate_line_col(source, span.start);

        let lines: Vec<&str> = source.lines().collect();
        let line_content = lines.get(line.saturating_sub(1)).unwrap_or(&"");

        let mut msg = format!("Error at line {}, column {}:\n", line, col);
        msg.push_str(&format!("  {}\n", line_content));

        let caret_pos = col.saturating_sub(1);
        msg.push_str(&format!("  {}^\n", " ".repeat(caret_pos)));

        msg.push_str(&format!("{}", self));
        msg
    }
}

/// Calculate line and column from byte offset.
pub fn calculate_line_col(source: &str, byte_offset: usize) -> (usize, usize) {
    let prefix = &source[..byte_offset.min(source.len())];
    let line = prefix.matches('\n').count() + 1;
    let col = match prefix.rfind('\n') {
        Some(i) => byte_offset - i,
        None => byte_offset + 1,
    };
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_first_line() {
        assert_eq!(calculate_line_col("let x;", 4), (1, 5));
    }

    #[test]
    fn test_line_col_after_newline() {
        assert_eq!(calculate_line_col("let x;\nx = 1;", 8), (2, 2));
    }

    #[test]
    fn test_format_with_source_points_at_error() {
        let err = ParseError::unexpected_token(Span::new(4, 5), ";", "=");
        let msg = err.format_with_source("1 + 2 = 3;");
        assert!(msg.contains("line 1"));
        assert!(msg.contains("^"));
        assert!(msg.contains("expected ;"));
        assert!(msg.contains("found ="));
    }
}
