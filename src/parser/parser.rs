//! Парсер Mica: рекурсивный спуск по потоку токенов.
//!
//! По одной функции на уровень приоритета; все бинарные уровни
//! левоассоциативны, унарные операторы правоассоциативны через рекурсию.
//! `=` — операторный, а не выражающий: после разбора выражения один
//! предпросмотр решает, присваивание это или выражение-оператор.

use crate::ast::{BinOp, Decl, Expr, Program, Stmt, UnOp};
use crate::intern::{IdentId, Interner};

use super::error::ParseError;
use super::lexer::Lexer;
use super::token::{Spanned, Token};

/// Парсер Mica.
pub struct Parser<'src, 'i> {
    lexer: Lexer<'src, 'i>,
}

impl<'src, 'i> Parser<'src, 'i> {
    /// Создать новый парсер над байтовым буфером.
    pub fn new(source: &'src [u8], interner: &'i mut Interner) -> Self {
        Self {
            lexer: Lexer::new(source, interner),
        }
    }

    /// Распарсить программу: операторы до конца ввода.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while self.lexer.peek()?.value != Token::Eof {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Program { stmts })
    }

    /// Написание токена для диагностики: идентификаторы печатаются
    /// по имени из таблицы, остальные токены — как в исходнике.
    fn spell(&self, token: &Token) -> String {
        match token {
            Token::Ident(id) => self
                .lexer
                .interner()
                .lookup(*id)
                .unwrap_or("identifier")
                .to_string(),
            other => other.to_string(),
        }
    }

    /// Потребить текущий токен, если он совпадает с ожидаемым.
    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        let Spanned { value: found, span } = *self.lexer.peek()?;
        if found == expected {
            self.lexer.next_token()?;
            Ok(())
        } else {
            Err(ParseError::unexpected_token(
                span,
                expected.to_string(),
                self.spell(&found),
            ))
        }
    }

    /// Потребить идентификатор, вернуть его id.
    fn expect_ident(&mut self) -> Result<IdentId, ParseError> {
        let Spanned { value, span } = *self.lexer.peek()?;
        match value {
            Token::Ident(id) => {
                self.lexer.next_token()?;
                Ok(id)
            }
            found => Err(ParseError::unexpected_token(
                span,
                "identifier",
                self.spell(&found),
            )),
        }
    }

    // === Операторы ===

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.lexer.peek()?.value {
            Token::Break => {
                self.lexer.next_token()?;
                self.expect(Token::Semi)?;
                Ok(Stmt::Break)
            }
            Token::Continue => {
                self.lexer.next_token()?;
                self.expect(Token::Semi)?;
                Ok(Stmt::Continue)
            }
            Token::Loop => {
                self.lexer.next_token()?;
                Ok(Stmt::Loop(self.parse_block()?))
            }
            Token::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            Token::Semi => {
                self.lexer.next_token()?;
                Ok(Stmt::Nop)
            }
            Token::If => self.parse_if(),
            Token::Let => self.parse_let(),
            Token::Return => {
                self.lexer.next_token()?;
                let value = self.parse_expr()?;
                self.expect(Token::Semi)?;
                Ok(Stmt::Return(value))
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// Блок `{ STMT* }`.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(Token::LBrace)?;
        let mut stmts = Vec::new();
        while self.lexer.peek()?.value != Token::RBrace {
            if self.lexer.peek()?.value == Token::Eof {
                let span = self.lexer.peek()?.span;
                return Err(ParseError::UnexpectedEof { span });
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(Token::RBrace)?;
        Ok(stmts)
    }

    /// `if EXPR BLOCK ( else BLOCK )?`. Ветка `else` — всегда блок.
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.lexer.next_token()?;
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let else_body = if self.lexer.peek()?.value == Token::Else {
            self.lexer.next_token()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
        })
    }

    /// `let x;` или `let a[N];`.
    fn parse_let(&mut self) -> Result<Stmt, ParseError> {
        self.lexer.next_token()?;
        let (id, index) = self.parse_variable()?;
        self.expect(Token::Semi)?;
        let decl = match index {
            Some(size) => Decl::Array(id, size),
            None => Decl::Scalar(id),
        };
        Ok(Stmt::Let(decl))
    }

    /// `EXPR = EXPR ;` либо `EXPR ;` — решает предпросмотр после выражения.
    fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expr()?;
        if self.lexer.peek()?.value == Token::Assign {
            self.lexer.next_token()?;
            let value = self.parse_expr()?;
            self.expect(Token::Semi)?;
            Ok(Stmt::Assign {
                target: expr,
                value,
            })
        } else {
            self.expect(Token::Semi)?;
            Ok(Stmt::Expr(expr))
        }
    }

    // === Выражения, от низшего приоритета к высшему ===

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.lexer.peek()?.value == Token::OrOr {
            self.lexer.next_token()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_rel()?;
        while self.lexer.peek()?.value == Token::AndAnd {
            self.lexer.next_token()?;
            let rhs = self.parse_rel()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_rel(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_add()?;
        loop {
            let op = match self.lexer.peek()?.value {
                Token::Lt => BinOp::Lt,
                Token::Gt => BinOp::Gt,
                Token::Le => BinOp::Le,
                Token::Ge => BinOp::Ge,
                Token::EqEq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                _ => return Ok(lhs),
            };
            self.lexer.next_token()?;
            let rhs = self.parse_add()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.lexer.peek()?.value {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                Token::Caret => BinOp::BitXor,
                Token::Pipe => BinOp::BitOr,
                _ => return Ok(lhs),
            };
            self.lexer.next_token()?;
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.lexer.peek()?.value {
                Token::Shl => BinOp::Shl,
                Token::Shr => BinOp::Shr,
                Token::Amp => BinOp::BitAnd,
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.lexer.next_token()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// Унарные операторы правоассоциативны: `- - x` разбирается рекурсией.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.lexer.peek()?.value {
            Token::Plus => UnOp::Plus,
            Token::Minus => UnOp::Neg,
            Token::Tilde => UnOp::BitNot,
            Token::Bang => UnOp::Not,
            _ => return self.parse_primary(),
        };
        self.lexer.next_token()?;
        Ok(Expr::Unary(op, Box::new(self.parse_unary()?)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Spanned { value, span } = *self.lexer.peek()?;
        match value {
            Token::Int(n) => {
                self.lexer.next_token()?;
                Ok(Expr::Int(n))
            }
            Token::LParen => {
                self.lexer.next_token()?;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(_) => {
                let (id, index) = self.parse_variable()?;
                Ok(match index {
                    Some(index) => Expr::Index(id, index),
                    None => Expr::Var(id),
                })
            }
            Token::Eof => Err(ParseError::UnexpectedEof { span }),
            found => Err(ParseError::unexpected_token(
                span,
                "expression",
                self.spell(&found),
            )),
        }
    }

    /// `id ( '[' EXPR ']' )?` — общая форма для primary и `let`.
    fn parse_variable(&mut self) -> Result<(IdentId, Option<Box<Expr>>), ParseError> {
        let id = self.expect_ident()?;
        if self.lexer.peek()?.value == Token::LBracket {
            self.lexer.next_token()?;
            let index = self.parse_expr()?;
            self.expect(Token::RBracket)?;
            Ok((id, Some(Box::new(index))))
        } else {
            Ok((id, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_source(source: &str) -> Result<Program, ParseError> {
        let mut interner = Interner::new();
        Parser::new(source.as_bytes(), &mut interner).parse_program()
    }

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 разбирается как 1 + (2 * 3).
        let program = parse_source("1 + 2 * 3;").unwrap();
        assert_eq!(
            program.stmts,
            vec![Stmt::Expr(Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Int(1)),
                Box::new(Expr::Binary(
                    BinOp::Mul,
                    Box::new(Expr::Int(2)),
                    Box::new(Expr::Int(3)),
                )),
            ))]
        );
    }

    #[test]
    fn test_parse_left_associativity() {
        // 10 - 4 - 3 разбирается как (10 - 4) - 3.
        let program = parse_source("10 - 4 - 3;").unwrap();
        assert_eq!(
            program.stmts,
            vec![Stmt::Expr(Expr::Binary(
                BinOp::Sub,
                Box::new(Expr::Binary(
                    BinOp::Sub,
                    Box::new(Expr::Int(10)),
                    Box::new(Expr::Int(4)),
                )),
                Box::new(Expr::Int(3)),
            ))]
        );
    }

    #[test]
    fn test_parse_unary_right_associative() {
        let program = parse_source("- - 5;").unwrap();
        assert_eq!(
            program.stmts,
            vec![Stmt::Expr(Expr::Unary(
                UnOp::Neg,
                Box::new(Expr::Unary(UnOp::Neg, Box::new(Expr::Int(5)))),
            ))]
        );
    }

    #[test]
    fn test_parse_parens_override_precedence() {
        let program = parse_source("(1 + 2) * 3;").unwrap();
        assert_eq!(
            program.stmts,
            vec![Stmt::Expr(Expr::Binary(
                BinOp::Mul,
                Box::new(Expr::Binary(
                    BinOp::Add,
                    Box::new(Expr::Int(1)),
                    Box::new(Expr::Int(2)),
                )),
                Box::new(Expr::Int(3)),
            ))]
        );
    }

    #[test]
    fn test_parse_shift_binds_tighter_than_add() {
        // 1 + 2 << 3 разбирается как 1 + (2 << 3).
        let program = parse_source("1 + 2 << 3;").unwrap();
        assert_eq!(
            program.stmts,
            vec![Stmt::Expr(Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Int(1)),
                Box::new(Expr::Binary(
                    BinOp::Shl,
                    Box::new(Expr::Int(2)),
                    Box::new(Expr::Int(3)),
                )),
            ))]
        );
    }

    #[test]
    fn test_parse_let_forms() {
        let program = parse_source("let x; let a[3];").unwrap();
        assert_eq!(program.stmts.len(), 2);
        assert!(matches!(program.stmts[0], Stmt::Let(Decl::Scalar(_))));
        match &program.stmts[1] {
            Stmt::Let(Decl::Array(_, size)) => assert_eq!(size.as_int(), Some(3)),
            other => panic!("Expected array declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_assign_vs_expr_stmt() {
        let program = parse_source("let x; x = 1; x;").unwrap();
        assert!(matches!(program.stmts[1], Stmt::Assign { .. }));
        assert!(matches!(program.stmts[2], Stmt::Expr(Expr::Var(_))));
    }

    #[test]
    fn test_parse_array_assign_target() {
        let program = parse_source("a[i + 1] = 2;").unwrap();
        match &program.stmts[0] {
            Stmt::Assign { target, .. } => {
                assert!(matches!(target, Expr::Index(_, _)));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_else_and_loop() {
        let program = parse_source("loop { if x > 3 { break; } else { continue; } }").unwrap();
        match &program.stmts[0] {
            Stmt::Loop(body) => match &body[0] {
                Stmt::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    assert_eq!(then_body, &vec![Stmt::Break]);
                    assert_eq!(else_body.as_deref(), Some(&[Stmt::Continue][..]));
                }
                other => panic!("Expected if, got {:?}", other),
            },
            other => panic!("Expected loop, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_return() {
        let program = parse_source("return 1 + 2;").unwrap();
        assert!(matches!(program.stmts[0], Stmt::Return(Expr::Binary(..))));
    }

    #[test]
    fn test_parse_empty_statement() {
        let program = parse_source(";;").unwrap();
        assert_eq!(program.stmts, vec![Stmt::Nop, Stmt::Nop]);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "let a[2]; loop { a[0] = a[0] + 1; if a[0] >= 3 { break; } } a[0];";
        let first = parse_source(source).unwrap();
        let second = parse_source(source).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unexpected_identifier_reported_by_name() {
        // В диагностике идентификатор печатается по имени из таблицы.
        let err = parse_source("let x y;").unwrap_err();
        match err {
            ParseError::UnexpectedToken { found, .. } => assert_eq!(found, "y"),
            other => panic!("Expected unexpected-token error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_semicolon() {
        let err = parse_source("1 + 2").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_parse_unclosed_block() {
        let err = parse_source("loop { 1;").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_parse_stray_rbrace() {
        let err = parse_source("}").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }
}
