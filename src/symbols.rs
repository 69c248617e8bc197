//! Таблица символов: стек областей видимости.
//!
//! Каждая область отображает id идентификатора в символ — дескриптор
//! хранилища плюс разновидность. Поиск идёт от внутренней области к
//! внешней, поэтому внутренние объявления затеняют внешние.

use std::collections::HashMap;

use crate::intern::IdentId;

/// Разновидность символа.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Одна ячейка i32.
    Scalar,
    /// Непрерывный регион ячеек i32.
    Array,
}

/// Символ: дескриптор хранилища и разновидность.
///
/// Параметр `T` — тип дескриптора; у генератора IR это указатель на
/// слот в кадре функции.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol<T> {
    pub storage: T,
    pub kind: SymbolKind,
}

/// Стек областей видимости. Всегда содержит хотя бы одну область —
/// глобальную, открытую при создании.
#[derive(Debug)]
pub struct SymbolTable<T> {
    scopes: Vec<HashMap<IdentId, Symbol<T>>>,
}

impl<T> SymbolTable<T> {
    /// Создать таблицу с глобальной областью.
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Открыть вложенную область.
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Закрыть верхнюю область. Глобальная область не снимается.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Объявить символ в верхней области.
    ///
    /// Возвращает `false`, если id уже объявлен в ней: повторное
    /// объявление в одной области — ошибка, затенение через вложенную
    /// область — нет.
    pub fn declare(&mut self, id: IdentId, symbol: Symbol<T>) -> bool {
        let scope = self
            .scopes
            .last_mut()
            .expect("scope stack always holds the global scope");
        if scope.contains_key(&id) {
            return false;
        }
        scope.insert(id, symbol);
        true
    }

    /// Найти символ, от внутренней области к внешней.
    pub fn resolve(&self, id: IdentId) -> Option<&Symbol<T>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&id))
    }

    /// Текущая глубина вложенности (включая глобальную область).
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(storage: u32) -> Symbol<u32> {
        Symbol {
            storage,
            kind: SymbolKind::Scalar,
        }
    }

    #[test]
    fn test_declare_and_resolve() {
        let mut table = SymbolTable::new();
        assert!(table.declare(0, scalar(100)));
        let symbol = table.resolve(0).unwrap();
        assert_eq!(symbol.storage, 100);
        assert_eq!(symbol.kind, SymbolKind::Scalar);
    }

    #[test]
    fn test_resolve_unknown() {
        let table = SymbolTable::<u32>::new();
        assert!(table.resolve(5).is_none());
    }

    #[test]
    fn test_redeclaration_in_same_scope_rejected() {
        let mut table = SymbolTable::new();
        assert!(table.declare(0, scalar(1)));
        assert!(!table.declare(0, scalar(2)));
        // Первое объявление остаётся в силе.
        assert_eq!(table.resolve(0).unwrap().storage, 1);
    }

    #[test]
    fn test_shadowing_and_restore() {
        let mut table = SymbolTable::new();
        table.declare(0, scalar(1));

        table.push_scope();
        assert!(table.declare(0, scalar(2)));
        assert_eq!(table.resolve(0).unwrap().storage, 2);

        table.pop_scope();
        // После выхода из блока снова видно внешнее хранилище.
        assert_eq!(table.resolve(0).unwrap().storage, 1);
    }

    #[test]
    fn test_outer_visible_from_inner() {
        let mut table = SymbolTable::new();
        table.declare(3, scalar(7));
        table.push_scope();
        assert_eq!(table.resolve(3).unwrap().storage, 7);
    }

    #[test]
    fn test_global_scope_never_popped() {
        let mut table = SymbolTable::new();
        table.declare(0, scalar(9));
        table.pop_scope();
        table.pop_scope();
        assert_eq!(table.depth(), 1);
        assert_eq!(table.resolve(0).unwrap().storage, 9);
    }
}
