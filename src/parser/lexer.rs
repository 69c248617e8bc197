//! Лексер Mica.
//!
//! Ручной сканер по байтовому буферу: идентификаторы интернируются на
//! месте, ключевые слова распознаются по id, многосимвольные операторы
//! сворачиваются при чтении. Кодировка не проверяется — буфер читается
//! как байты. Конец среза или встреченный NUL-байт завершают ввод;
//! курсор никогда не продвигается дальше.

use crate::intern::Interner;

use super::error::ParseError;
use super::token::{Span, Spanned, Token};

/// Ключевые слова языка. Интернируются при создании лексера,
/// чтобы диспетчеризация шла по id идентификатора.
const KEYWORDS: &[(&str, Token)] = &[
    ("let", Token::Let),
    ("break", Token::Break),
    ("continue", Token::Continue),
    ("return", Token::Return),
    ("loop", Token::Loop),
    ("if", Token::If),
    ("else", Token::Else),
];

/// Лексер Mica: курсор по байтам с одним токеном предпросмотра.
pub struct Lexer<'src, 'i> {
    src: &'src [u8],
    pos: usize,
    line: usize,
    interner: &'i mut Interner,
    /// Таблица ключевых слов, индексируемая id идентификатора.
    keywords: Vec<Option<Token>>,
    peeked: Option<Spanned<Token>>,
}

impl<'src, 'i> Lexer<'src, 'i> {
    /// Создать новый лексер над байтовым буфером.
    pub fn new(src: &'src [u8], interner: &'i mut Interner) -> Self {
        let mut keywords: Vec<Option<Token>> = Vec::new();
        for (name, token) in KEYWORDS {
            let id = interner.intern(name) as usize;
            if keywords.len() <= id {
                keywords.resize(id + 1, None);
            }
            keywords[id] = Some(*token);
        }
        Self {
            src,
            pos: 0,
            line: 1,
            interner,
            keywords,
            peeked: None,
        }
    }

    /// Получить следующий токен.
    pub fn next_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        self.read_token()
    }

    /// Посмотреть на следующий токен без его потребления.
    pub fn peek(&mut self) -> Result<&Spanned<Token>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.read_token()?);
        }
        Ok(self.peeked.as_ref().unwrap())
    }

    /// Текущая строка (нумерация с 1).
    pub fn line(&self) -> usize {
        self.line
    }

    /// Таблица идентификаторов: диагностика разворачивает id в имя.
    pub fn interner(&self) -> &Interner {
        self.interner
    }

    /// Байт под курсором; NUL за концом буфера.
    fn byte(&self) -> u8 {
        self.src.get(self.pos).copied().unwrap_or(0)
    }

    /// Байт со смещением от курсора; NUL за концом буфера.
    fn byte_at(&self, offset: usize) -> u8 {
        self.src.get(self.pos + offset).copied().unwrap_or(0)
    }

    /// Прочитать один токен, применяя правила по порядку.
    fn read_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        // 1. Пробельные байты; переводы строк считаем.
        while is_whitespace(self.byte()) {
            if self.byte() == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }

        let start = self.pos;

        // 2. Конец ввода: конец буфера или NUL.
        if self.pos >= self.src.len() || self.byte() == 0 {
            return Ok(Spanned::new(Token::Eof, Span::new(start, start)));
        }

        // 2. Односимвольная пунктуация.
        if let Some(token) = mono_token(self.byte()) {
            self.pos += 1;
            return Ok(Spanned::new(token, Span::new(start, self.pos)));
        }

        // 3. Десятичный литерал.
        if self.byte().is_ascii_digit() {
            return self.read_int(start);
        }

        // 4. Идентификатор или ключевое слово.
        if is_ident_start(self.byte()) {
            return Ok(self.read_ident(start));
        }

        // 5. Двухсимвольные операторы и их одиночные формы.
        match self.byte() {
            b'/' if self.byte_at(1) == b'/' => self.skip_comment(),
            b'/' => Ok(self.one(start, Token::Slash)),
            b'|' if self.byte_at(1) == b'|' => Ok(self.two(start, Token::OrOr)),
            b'|' => Ok(self.one(start, Token::Pipe)),
            b'&' if self.byte_at(1) == b'&' => Ok(self.two(start, Token::AndAnd)),
            b'&' => Ok(self.one(start, Token::Amp)),
            b'=' if self.byte_at(1) == b'=' => Ok(self.two(start, Token::EqEq)),
            b'=' => Ok(self.one(start, Token::Assign)),
            b'!' if self.byte_at(1) == b'=' => Ok(self.two(start, Token::Ne)),
            b'!' => Ok(self.one(start, Token::Bang)),
            b'<' if self.byte_at(1) == b'<' => Ok(self.two(start, Token::Shl)),
            b'<' if self.byte_at(1) == b'=' => Ok(self.two(start, Token::Le)),
            b'<' => Ok(self.one(start, Token::Lt)),
            b'>' if self.byte_at(1) == b'>' => Ok(self.two(start, Token::Shr)),
            b'>' if self.byte_at(1) == b'=' => Ok(self.two(start, Token::Ge)),
            b'>' => Ok(self.one(start, Token::Gt)),
            // 6. Всё прочее — вне алфавита.
            byte => Err(ParseError::UnexpectedByte {
                span: Span::new(start, start + 1),
                byte,
            }),
        }
    }

    /// Однобайтовый токен.
    fn one(&mut self, start: usize, token: Token) -> Spanned<Token> {
        self.pos += 1;
        Spanned::new(token, Span::new(start, self.pos))
    }

    /// Двухбайтовый токен.
    fn two(&mut self, start: usize, token: Token) -> Spanned<Token> {
        self.pos += 2;
        Spanned::new(token, Span::new(start, self.pos))
    }

    /// Десятичный литерал с накоплением в i32; переполнение — ошибка.
    fn read_int(&mut self, start: usize) -> Result<Spanned<Token>, ParseError> {
        let mut value: i32 = 0;
        while self.byte().is_ascii_digit() {
            let digit = (self.byte() - b'0') as i32;
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or(ParseError::IntegerOverflow {
                    span: Span::new(start, self.pos + 1),
                })?;
            self.pos += 1;
        }
        Ok(Spanned::new(Token::Int(value), Span::new(start, self.pos)))
    }

    /// Идентификатор: интернировать и проверить таблицу ключевых слов.
    fn read_ident(&mut self, start: usize) -> Spanned<Token> {
        while is_ident_continue(self.byte()) {
            self.pos += 1;
        }
        // Класс байтов идентификатора — чистый ASCII.
        let spelling = String::from_utf8_lossy(&self.src[start..self.pos]);
        let id = self.interner.intern(&spelling);
        let token = self
            .keywords
            .get(id as usize)
            .and_then(|slot| *slot)
            .unwrap_or(Token::Ident(id));
        Spanned::new(token, Span::new(start, self.pos))
    }

    /// Комментарий `//`: до конца строки, затем следующий токен.
    fn skip_comment(&mut self) -> Result<Spanned<Token>, ParseError> {
        self.pos += 2;
        while !matches!(self.byte(), b'\n' | 0) {
            self.pos += 1;
        }
        self.read_token()
    }
}

/// Пробельные байты; перевод строки считается отдельно.
fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\n' | b'\t' | b'\r' | 0x0b | 0x0c)
}

/// Односимвольная пунктуация, представляющая токен сама по себе.
fn mono_token(byte: u8) -> Option<Token> {
    match byte {
        b';' => Some(Token::Semi),
        b'~' => Some(Token::Tilde),
        b'^' => Some(Token::Caret),
        b'*' => Some(Token::Star),
        b'%' => Some(Token::Percent),
        b'(' => Some(Token::LParen),
        b')' => Some(Token::RParen),
        b':' => Some(Token::Colon),
        b'{' => Some(Token::LBrace),
        b'}' => Some(Token::RBrace),
        b'[' => Some(Token::LBracket),
        b']' => Some(Token::RBracket),
        b'+' => Some(Token::Plus),
        b'-' => Some(Token::Minus),
        b',' => Some(Token::Comma),
        _ => None,
    }
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &[u8]) -> Result<Vec<Token>, ParseError> {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(source, &mut interner);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?.value;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    #[test]
    fn test_lexer_basic() {
        let tokens = lex_all(b"let x = 10;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Let,
                Token::Ident(7),
                Token::Assign,
                Token::Int(10),
                Token::Semi,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_folds_two_char_operators() {
        let tokens = lex_all(b"<< <= < >> >= > == = != ! && & || |").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Shl,
                Token::Le,
                Token::Lt,
                Token::Shr,
                Token::Ge,
                Token::Gt,
                Token::EqEq,
                Token::Assign,
                Token::Ne,
                Token::Bang,
                Token::AndAnd,
                Token::Amp,
                Token::OrOr,
                Token::Pipe,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_comment() {
        let tokens = lex_all(b"1; // comment ;;; let\n2;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Int(1),
                Token::Semi,
                Token::Int(2),
                Token::Semi,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_keywords() {
        let tokens = lex_all(b"break continue return loop if else").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Break,
                Token::Continue,
                Token::Return,
                Token::Loop,
                Token::If,
                Token::Else,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_identifier_roundtrip() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(b"alpha _beta alpha", &mut interner);
        let a = lexer.next_token().unwrap().value;
        let b = lexer.next_token().unwrap().value;
        let a2 = lexer.next_token().unwrap().value;
        assert_eq!(a, a2);
        assert_ne!(a, b);
        match (a, b) {
            (Token::Ident(a_id), Token::Ident(b_id)) => {
                assert_eq!(interner.lookup(a_id), Some("alpha"));
                assert_eq!(interner.lookup(b_id), Some("_beta"));
            }
            other => panic!("Expected identifiers, got {:?}", other),
        }
    }

    #[test]
    fn test_lexer_int_bounds() {
        let tokens = lex_all(b"2147483647;").unwrap();
        assert_eq!(tokens[0], Token::Int(i32::MAX));

        let err = lex_all(b"2147483648;").unwrap_err();
        assert!(matches!(err, ParseError::IntegerOverflow { .. }));
    }

    #[test]
    fn test_lexer_bad_char() {
        let err = lex_all(b"1 $ 2").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedByte { byte: b'$', .. }));
    }

    #[test]
    fn test_lexer_stops_at_nul() {
        let tokens = lex_all(b"1;\0garbage $$$").unwrap();
        assert_eq!(tokens, vec![Token::Int(1), Token::Semi, Token::Eof]);
    }

    #[test]
    fn test_lexer_counts_lines() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(b"1;\n2;\n\n3;", &mut interner);
        while lexer.next_token().unwrap().value != Token::Eof {}
        assert_eq!(lexer.line(), 4);
    }
}
