//! Синтаксическое дерево Mica.
//!
//! Закрытые суммы: каждый обход обязан разобрать все варианты.
//! Идентификаторы хранятся как id из таблицы интернирования,
//! текст имени восстанавливается через неё.

use serde::{Deserialize, Serialize};

use crate::intern::IdentId;

/// Унарная операция.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// `+x` — тождественность.
    Plus,
    /// `-x` — арифметическое отрицание.
    Neg,
    /// `~x` — побитовое отрицание.
    BitNot,
    /// `!x` — логическое отрицание.
    Not,
}

/// Бинарная операция.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    /// `&&` — короткое замыкание.
    And,
    /// `||` — короткое замыкание.
    Or,
}

/// Выражение. Каждое выражение даёт i32.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Целочисленный литерал.
    Int(i32),
    /// Обращение к скалярной переменной.
    Var(IdentId),
    /// Индексация массива: `a[i]`.
    Index(IdentId, Box<Expr>),
    /// Унарная операция.
    Unary(UnOp, Box<Expr>),
    /// Бинарная операция.
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Значение литерала, если выражение — целочисленный литерал.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Expr::Int(value) => Some(*value),
            _ => None,
        }
    }
}

/// Объявление в `let`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    /// Скаляр: `let x;`.
    Scalar(IdentId),
    /// Массив: `let a[N];`. Размер хранится выражением; генератор IR
    /// требует целочисленный литерал.
    Array(IdentId, Box<Expr>),
}

/// Оператор.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Пустой оператор `;`.
    Nop,
    /// Выход из ближайшего цикла.
    Break,
    /// Переход к следующей итерации ближайшего цикла.
    Continue,
    /// Блок `{ ... }`: открывает область видимости.
    Block(Vec<Stmt>),
    /// Бесконечный цикл `loop { ... }`.
    Loop(Vec<Stmt>),
    /// Условный оператор с необязательной веткой `else`.
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    /// Объявление переменной или массива.
    Let(Decl),
    /// Присваивание `lhs = rhs;`. Допустимость цели проверяет
    /// генератор IR.
    Assign { target: Expr, value: Expr },
    /// Выражение-оператор: печатает своё значение.
    Expr(Expr),
    /// Возврат значения из программы.
    Return(Expr),
}

/// Программа — последовательность операторов верхнего уровня.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_int() {
        assert_eq!(Expr::Int(7).as_int(), Some(7));
        assert_eq!(Expr::Var(0).as_int(), None);
        let neg = Expr::Unary(UnOp::Neg, Box::new(Expr::Int(3)));
        assert_eq!(neg.as_int(), None);
    }
}
