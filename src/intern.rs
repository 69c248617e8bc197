//! Таблица идентификаторов Mica.
//!
//! Отображение имя <-> плотный целочисленный id. Таблица владеет текстом
//! имён; id стабильны на всё время её жизни. Таблица создаётся конвейером
//! и передаётся компонентам явно: `&mut` лексеру на время разбора,
//! `&` генератору IR после него.

use std::collections::HashMap;

/// Идентификатор имени. Плотный, начиная с 0.
pub type IdentId = u32;

/// Таблица интернирования идентификаторов.
#[derive(Debug, Default)]
pub struct Interner {
    names: Vec<String>,
    ids: HashMap<String, IdentId>,
}

impl Interner {
    /// Создать пустую таблицу.
    pub fn new() -> Self {
        Self::default()
    }

    /// Интернировать имя: вернуть существующий id или присвоить следующий.
    pub fn intern(&mut self, name: &str) -> IdentId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as IdentId;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Получить имя по id. `None` для id вне диапазона.
    pub fn lookup(&self, id: IdentId) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Количество интернированных имён.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Пустая ли таблица.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
