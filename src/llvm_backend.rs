//! Модуль `llvm_backend`
//!
//! Генерация LLVM IR для Mica через inkwell.
//!
//! Дерево программы линеаризуется в граф базовых блоков внутри функции
//! `main`. Все скаляры и массивы живут в ячейках i32 на стеке; булевы
//! значения представлены i32, где ноль — ложь. Свёрткой констант
//! генератор не занимается — это дело LLVM.

use std::collections::HashMap;
use std::path::Path;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::targets::TargetMachine;
use inkwell::values::{FunctionValue, IntValue, PointerValue};
use inkwell::AddressSpace;
use inkwell::IntPredicate;

use crate::ast::{BinOp, Decl, Expr, Program, Stmt, UnOp};
use crate::error::{CompileError, CompileResult};
use crate::intern::{IdentId, Interner};
use crate::symbols::{Symbol, SymbolKind, SymbolTable};

/// Генератор LLVM IR для Mica.
///
/// Дисциплина терминаторов: каждый блок либо открыт (инструкции можно
/// добавлять), либо закрыт `br`/`cond_br`/`ret`. Генерация оператора —
/// no-op, когда текущий блок уже закрыт: код после `break`, `continue`
/// или `return` недостижим.
pub struct LLVMBackend<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    interner: &'ctx Interner,
    /// Области видимости: id идентификатора -> слот на стеке.
    symbols: SymbolTable<PointerValue<'ctx>>,
    /// Кэш интернированных форматных строк printf.
    formats: HashMap<&'static str, PointerValue<'ctx>>,
    /// Цели `continue`: заголовки объемлющих циклов.
    continue_targets: Vec<BasicBlock<'ctx>>,
    /// Цели `break`: блоки за объемлющими циклами.
    break_targets: Vec<BasicBlock<'ctx>>,
}

impl<'ctx> LLVMBackend<'ctx> {
    /// Создать новый backend. Целевая триплет-строка модуля берётся
    /// с хост-машины.
    pub fn new(context: &'ctx Context, module_name: &str, interner: &'ctx Interner) -> Self {
        let module = context.create_module(module_name);
        module.set_triple(&TargetMachine::get_default_triple());
        let builder = context.create_builder();

        Self {
            context,
            module,
            builder,
            interner,
            symbols: SymbolTable::new(),
            formats: HashMap::new(),
            continue_targets: Vec::new(),
            break_targets: Vec::new(),
        }
    }

    /// Скомпилировать программу в функцию `i32 @main()`.
    ///
    /// Если после последнего оператора текущий блок остался открытым,
    /// добавляется `ret i32 0`.
    pub fn compile(&mut self, program: &Program) -> CompileResult<()> {
        let i32_type = self.context.i32_type();
        let fn_type = i32_type.fn_type(&[], false);
        let main_fn = self.module.add_function("main", fn_type, None);
        let entry = self.context.append_basic_block(main_fn, "entry");
        self.builder.position_at_end(entry);

        for stmt in &program.stmts {
            self.gen_stmt(stmt)?;
        }

        if !self.block_terminated() {
            self.builder
                .build_return(Some(&i32_type.const_int(0, false)))
                .map_err(|e| CompileError::Llvm(e.to_string()))?;
        }
        Ok(())
    }

    /// Получить LLVM IR как строку.
    pub fn get_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Проверить модуль верификатором LLVM.
    pub fn verify(&self) -> CompileResult<()> {
        self.module
            .verify()
            .map_err(|e| CompileError::Verify(e.to_string()))
    }

    /// Сериализовать модуль в bitcode-файл.
    pub fn write_bitcode(&self, path: &Path) -> CompileResult<()> {
        if !self.module.write_bitcode_to_path(path) {
            return Err(CompileError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("failed to write bitcode to {}", path.display()),
            )));
        }
        Ok(())
    }

    // === Операторы ===

    /// Сгенерировать код оператора.
    fn gen_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        // Код после терминатора недостижим — пропускаем.
        if self.block_terminated() {
            return Ok(());
        }

        match stmt {
            Stmt::Nop => Ok(()),
            Stmt::Block(stmts) => self.gen_block(stmts),
            Stmt::Let(decl) => self.gen_let(decl),
            Stmt::Assign { target, value } => self.gen_assign(target, value),
            Stmt::Expr(expr) => self.gen_print(expr),
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => self.gen_if(cond, then_body, else_body.as_deref()),
            Stmt::Loop(body) => self.gen_loop(body),
            Stmt::Break => self.gen_break(),
            Stmt::Continue => self.gen_continue(),
            Stmt::Return(expr) => self.gen_return(expr),
        }
    }

    /// Блок: новая область видимости на время тела.
    fn gen_block(&mut self, stmts: &[Stmt]) -> CompileResult<()> {
        self.symbols.push_scope();
        let result = stmts.iter().try_for_each(|stmt| self.gen_stmt(stmt));
        self.symbols.pop_scope();
        result
    }

    /// `let`: слот под скаляр или непрерывный регион под массив.
    /// Аллокация — в точке объявления, без выноса в entry.
    fn gen_let(&mut self, decl: &Decl) -> CompileResult<()> {
        let i32_type = self.context.i32_type();
        match decl {
            Decl::Scalar(id) => {
                let name = self.name(*id)?;
                let slot = self
                    .builder
                    .build_alloca(i32_type, name)
                    .map_err(|e| CompileError::Llvm(e.to_string()))?;
                self.declare(*id, slot, SymbolKind::Scalar)
            }
            Decl::Array(id, size) => {
                let name = self.name(*id)?;
                let len = size
                    .as_int()
                    .ok_or_else(|| CompileError::BadArraySize(name.to_string()))?;
                let len = i32_type.const_int(len as u64, false);
                let base = self
                    .builder
                    .build_array_alloca(i32_type, len, name)
                    .map_err(|e| CompileError::Llvm(e.to_string()))?;
                self.declare(*id, base, SymbolKind::Array)
            }
        }
    }

    /// `lhs = rhs`: правая часть вычисляется до разрешения левой.
    fn gen_assign(&mut self, target: &Expr, value: &Expr) -> CompileResult<()> {
        let value = self.gen_expr(value)?;
        let slot = match target {
            Expr::Var(id) => self.scalar_slot(*id)?,
            Expr::Index(id, index) => {
                let base = self.array_base(*id)?;
                let index = self.gen_expr(index)?;
                self.element_ptr(base, index)?
            }
            Expr::Int(_) | Expr::Unary(..) | Expr::Binary(..) => {
                return Err(CompileError::BadAssignTarget)
            }
        };
        self.builder
            .build_store(slot, value)
            .map_err(|e| CompileError::Llvm(e.to_string()))?;
        Ok(())
    }

    /// Выражение-оператор печатает своё значение: `printf("%d\n", v)`.
    fn gen_print(&mut self, expr: &Expr) -> CompileResult<()> {
        let value = self.gen_expr(expr)?;
        let printf = self.get_or_declare_printf();
        let fmt = self.format_string("%d\n", "fmt_int");
        self.builder
            .build_call(printf, &[fmt.into(), value.into()], "printf_call")
            .map_err(|e| CompileError::Llvm(e.to_string()))?;
        Ok(())
    }

    /// Условный оператор. Ветка else существует всегда, даже пустая:
    /// обе ветки сходятся в merge, если их хвосты остались открыты.
    fn gen_if(
        &mut self,
        cond: &Expr,
        then_body: &[Stmt],
        else_body: Option<&[Stmt]>,
    ) -> CompileResult<()> {
        let cond_val = self.gen_expr(cond)?;
        let cond_bool = self.to_bool(cond_val)?;

        let current_fn = self.current_fn()?;
        let then_block = self.context.append_basic_block(current_fn, "then");
        let else_block = self.context.append_basic_block(current_fn, "else");
        let merge_block = self.context.append_basic_block(current_fn, "merge");

        self.builder
            .build_conditional_branch(cond_bool, then_block, else_block)
            .map_err(|e| CompileError::Llvm(e.to_string()))?;

        // Ветка then.
        self.builder.position_at_end(then_block);
        self.gen_block(then_body)?;
        if !self.block_terminated() {
            self.builder
                .build_unconditional_branch(merge_block)
                .map_err(|e| CompileError::Llvm(e.to_string()))?;
        }

        // Ветка else.
        self.builder.position_at_end(else_block);
        if let Some(body) = else_body {
            self.gen_block(body)?;
        }
        if !self.block_terminated() {
            self.builder
                .build_unconditional_branch(merge_block)
                .map_err(|e| CompileError::Llvm(e.to_string()))?;
        }

        // Если обе ветки завершились терминаторами, merge недостижим,
        // но остаётся корректным блоком.
        self.builder.position_at_end(merge_block);
        Ok(())
    }

    /// Бесконечный цикл с плотным обратным ребром.
    fn gen_loop(&mut self, body: &[Stmt]) -> CompileResult<()> {
        let current_fn = self.current_fn()?;
        let loop_block = self.context.append_basic_block(current_fn, "loop");
        let after_block = self.context.append_basic_block(current_fn, "afterloop");

        self.builder
            .build_unconditional_branch(loop_block)
            .map_err(|e| CompileError::Llvm(e.to_string()))?;
        self.builder.position_at_end(loop_block);

        self.continue_targets.push(loop_block);
        self.break_targets.push(after_block);
        let result = self.gen_block(body);
        self.continue_targets.pop();
        self.break_targets.pop();
        result?;

        if !self.block_terminated() {
            self.builder
                .build_unconditional_branch(loop_block)
                .map_err(|e| CompileError::Llvm(e.to_string()))?;
        }
        self.builder.position_at_end(after_block);
        Ok(())
    }

    fn gen_break(&mut self) -> CompileResult<()> {
        let target = *self
            .break_targets
            .last()
            .ok_or(CompileError::BreakOutsideLoop)?;
        self.builder
            .build_unconditional_branch(target)
            .map_err(|e| CompileError::Llvm(e.to_string()))?;
        Ok(())
    }

    fn gen_continue(&mut self) -> CompileResult<()> {
        let target = *self
            .continue_targets
            .last()
            .ok_or(CompileError::ContinueOutsideLoop)?;
        self.builder
            .build_unconditional_branch(target)
            .map_err(|e| CompileError::Llvm(e.to_string()))?;
        Ok(())
    }

    fn gen_return(&mut self, expr: &Expr) -> CompileResult<()> {
        let value = self.gen_expr(expr)?;
        self.builder
            .build_return(Some(&value))
            .map_err(|e| CompileError::Llvm(e.to_string()))?;
        Ok(())
    }

    // === Выражения ===

    /// Сгенерировать выражение; результат — i32.
    fn gen_expr(&mut self, expr: &Expr) -> CompileResult<IntValue<'ctx>> {
        let i32_type = self.context.i32_type();
        match expr {
            Expr::Int(value) => Ok(i32_type.const_int(*value as i64 as u64, true)),
            Expr::Var(id) => {
                let slot = self.scalar_slot(*id)?;
                let loaded = self
                    .builder
                    .build_load(slot, self.name(*id)?)
                    .map_err(|e| CompileError::Llvm(e.to_string()))?;
                Ok(loaded.into_int_value())
            }
            Expr::Index(id, index) => {
                let base = self.array_base(*id)?;
                let index = self.gen_expr(index)?;
                let elem = self.element_ptr(base, index)?;
                let loaded = self
                    .builder
                    .build_load(elem, "elem")
                    .map_err(|e| CompileError::Llvm(e.to_string()))?;
                Ok(loaded.into_int_value())
            }
            Expr::Unary(op, operand) => self.gen_unary(*op, operand),
            Expr::Binary(op, lhs, rhs) => {
                if matches!(op, BinOp::And | BinOp::Or) {
                    self.gen_short_circuit(*op, lhs, rhs)
                } else {
                    self.gen_binary(*op, lhs, rhs)
                }
            }
        }
    }

    fn gen_unary(&mut self, op: UnOp, operand: &Expr) -> CompileResult<IntValue<'ctx>> {
        let value = self.gen_expr(operand)?;
        let zero = self.context.i32_type().const_int(0, false);
        match op {
            UnOp::Plus => Ok(value),
            UnOp::Neg => self
                .builder
                .build_int_sub(zero, value, "neg")
                .map_err(|e| CompileError::Llvm(e.to_string())),
            UnOp::BitNot => self
                .builder
                .build_not(value, "not")
                .map_err(|e| CompileError::Llvm(e.to_string())),
            UnOp::Not => {
                let is_zero = self
                    .builder
                    .build_int_compare(IntPredicate::EQ, value, zero, "iszero")
                    .map_err(|e| CompileError::Llvm(e.to_string()))?;
                self.from_bool(is_zero)
            }
        }
    }

    /// Строгая бинарная операция: оба операнда вычисляются безусловно.
    fn gen_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> CompileResult<IntValue<'ctx>> {
        let l = self.gen_expr(lhs)?;
        let r = self.gen_expr(rhs)?;
        let result = match op {
            BinOp::Add => self.builder.build_int_add(l, r, "add"),
            BinOp::Sub => self.builder.build_int_sub(l, r, "sub"),
            BinOp::Mul => self.builder.build_int_mul(l, r, "mul"),
            BinOp::Div => self.builder.build_int_signed_div(l, r, "div"),
            BinOp::Rem => self.builder.build_int_signed_rem(l, r, "rem"),
            BinOp::Shl => self.builder.build_left_shift(l, r, "shl"),
            // Сдвиг вправо — арифметический, с распространением знака.
            BinOp::Shr => self.builder.build_right_shift(l, r, true, "shr"),
            BinOp::BitAnd => self.builder.build_and(l, r, "and"),
            BinOp::BitOr => self.builder.build_or(l, r, "or"),
            BinOp::BitXor => self.builder.build_xor(l, r, "xor"),
            BinOp::Lt => return self.gen_compare(IntPredicate::SLT, l, r),
            BinOp::Gt => return self.gen_compare(IntPredicate::SGT, l, r),
            BinOp::Le => return self.gen_compare(IntPredicate::SLE, l, r),
            BinOp::Ge => return self.gen_compare(IntPredicate::SGE, l, r),
            BinOp::Eq => return self.gen_compare(IntPredicate::EQ, l, r),
            BinOp::Ne => return self.gen_compare(IntPredicate::NE, l, r),
            BinOp::And | BinOp::Or => {
                return Err(CompileError::Internal(
                    "short-circuit operator lowered as strict".to_string(),
                ))
            }
        };
        result.map_err(|e| CompileError::Llvm(e.to_string()))
    }

    /// Сравнение со знаком: i1 расширяется обратно до i32.
    fn gen_compare(
        &mut self,
        predicate: IntPredicate,
        lhs: IntValue<'ctx>,
        rhs: IntValue<'ctx>,
    ) -> CompileResult<IntValue<'ctx>> {
        let cmp = self
            .builder
            .build_int_compare(predicate, lhs, rhs, "cmp")
            .map_err(|e| CompileError::Llvm(e.to_string()))?;
        self.from_bool(cmp)
    }

    /// Короткое замыкание `&&`/`||` через явные ветвления и phi.
    ///
    /// Phi получает фактический блок-предшественник на момент
    /// безусловного перехода: правая часть может сама расщепить граф,
    /// и её хвостовой блок не обязан совпадать с тем, где она началась.
    fn gen_short_circuit(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CompileResult<IntValue<'ctx>> {
        let lhs_val = self.gen_expr(lhs)?;
        let lhs_bool = self.to_bool(lhs_val)?;

        let lhs_block = self
            .builder
            .get_insert_block()
            .ok_or_else(|| CompileError::Internal("no current block".to_string()))?;
        let current_fn = lhs_block
            .get_parent()
            .ok_or_else(|| CompileError::Internal("no parent function".to_string()))?;
        let rhs_block = self.context.append_basic_block(current_fn, "rhs");
        let merge_block = self.context.append_basic_block(current_fn, "merge");

        if op == BinOp::Or {
            // Истинная левая часть решает `||` без правой.
            self.builder
                .build_conditional_branch(lhs_bool, merge_block, rhs_block)
        } else {
            // Ложная левая часть решает `&&` без правой.
            self.builder
                .build_conditional_branch(lhs_bool, rhs_block, merge_block)
        }
        .map_err(|e| CompileError::Llvm(e.to_string()))?;

        self.builder.position_at_end(rhs_block);
        let rhs_val = self.gen_expr(rhs)?;
        let rhs_bool = self.to_bool(rhs_val)?;
        // Вложенный поток управления мог сменить текущий блок.
        let rhs_tail = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CompileError::Llvm(e.to_string()))?;

        self.builder.position_at_end(merge_block);
        let phi = self
            .builder
            .build_phi(self.context.bool_type(), "scval")
            .map_err(|e| CompileError::Llvm(e.to_string()))?;
        phi.add_incoming(&[(&lhs_bool, lhs_block), (&rhs_bool, rhs_tail)]);
        self.from_bool(phi.as_basic_value().into_int_value())
    }

    // === Вспомогательные ===

    /// i32 -> i1: ноль — ложь, всё остальное — истина.
    fn to_bool(&self, value: IntValue<'ctx>) -> CompileResult<IntValue<'ctx>> {
        let zero = self.context.i32_type().const_int(0, false);
        self.builder
            .build_int_compare(IntPredicate::NE, value, zero, "tobool")
            .map_err(|e| CompileError::Llvm(e.to_string()))
    }

    /// i1 -> i32 (zext).
    fn from_bool(&self, value: IntValue<'ctx>) -> CompileResult<IntValue<'ctx>> {
        self.builder
            .build_int_z_extend(value, self.context.i32_type(), "frombool")
            .map_err(|e| CompileError::Llvm(e.to_string()))
    }

    /// Закрыт ли текущий блок терминатором.
    fn block_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .map_or(true, |block| block.get_terminator().is_some())
    }

    /// Функция, которой принадлежит текущий блок.
    fn current_fn(&self) -> CompileResult<FunctionValue<'ctx>> {
        self.builder
            .get_insert_block()
            .ok_or_else(|| CompileError::Internal("no current block".to_string()))?
            .get_parent()
            .ok_or_else(|| CompileError::Internal("no parent function".to_string()))
    }

    /// Имя идентификатора по id.
    fn name(&self, id: IdentId) -> CompileResult<&'ctx str> {
        self.interner
            .lookup(id)
            .ok_or_else(|| CompileError::Internal(format!("identifier id {} out of range", id)))
    }

    /// Объявить слот в верхней области; повторное объявление — ошибка.
    fn declare(
        &mut self,
        id: IdentId,
        storage: PointerValue<'ctx>,
        kind: SymbolKind,
    ) -> CompileResult<()> {
        if !self.symbols.declare(id, Symbol { storage, kind }) {
            return Err(CompileError::Redeclaration(self.name(id)?.to_string()));
        }
        Ok(())
    }

    /// Разрешить имя в символ.
    fn resolve(&self, id: IdentId) -> CompileResult<Symbol<PointerValue<'ctx>>> {
        match self.symbols.resolve(id) {
            Some(symbol) => Ok(*symbol),
            None => Err(CompileError::UnknownVariable(self.name(id)?.to_string())),
        }
    }

    /// Слот скаляра; массив на этом месте — ошибка.
    fn scalar_slot(&self, id: IdentId) -> CompileResult<PointerValue<'ctx>> {
        let symbol = self.resolve(id)?;
        match symbol.kind {
            SymbolKind::Scalar => Ok(symbol.storage),
            SymbolKind::Array => Err(CompileError::NotAScalar(self.name(id)?.to_string())),
        }
    }

    /// База массива; скаляр на этом месте — ошибка.
    fn array_base(&self, id: IdentId) -> CompileResult<PointerValue<'ctx>> {
        let symbol = self.resolve(id)?;
        match symbol.kind {
            SymbolKind::Array => Ok(symbol.storage),
            SymbolKind::Scalar => Err(CompileError::NotAnArray(self.name(id)?.to_string())),
        }
    }

    /// Адрес элемента массива: типизированный GEP по ячейкам i32.
    fn element_ptr(
        &self,
        base: PointerValue<'ctx>,
        index: IntValue<'ctx>,
    ) -> CompileResult<PointerValue<'ctx>> {
        // Один индекс по однородному региону i32; выход за границы
        // остаётся на совести исходной программы.
        unsafe {
            self.builder
                .build_in_bounds_gep(base, &[index], "elem_ptr")
                .map_err(|e| CompileError::Llvm(e.to_string()))
        }
    }

    /// Получить или объявить printf.
    fn get_or_declare_printf(&self) -> FunctionValue<'ctx> {
        if let Some(printf) = self.module.get_function("printf") {
            return printf;
        }

        let i32_type = self.context.i32_type();
        let ptr_type = self.context.i8_type().ptr_type(AddressSpace::default());
        let printf_type = i32_type.fn_type(&[ptr_type.into()], true);
        self.module.add_function("printf", printf_type, None)
    }

    /// Интернированная форматная строка: создаётся в модуле один раз.
    fn format_string(&mut self, fmt: &'static str, name: &str) -> PointerValue<'ctx> {
        if let Some(ptr) = self.formats.get(fmt) {
            return *ptr;
        }
        let ptr = self.create_global_string(fmt, name);
        self.formats.insert(fmt, ptr);
        ptr
    }

    /// Создать глобальную NUL-терминированную строку.
    fn create_global_string(&self, s: &str, name: &str) -> PointerValue<'ctx> {
        let string_val = self.context.const_string(s.as_bytes(), true);
        let global = self.module.add_global(string_val.get_type(), None, name);
        global.set_initializer(&string_val);
        let zero = self.context.i32_type().const_zero();
        unsafe {
            self.builder
                .build_in_bounds_gep(global.as_pointer_value(), &[zero, zero], "str_ptr")
                .expect("gep on freshly created global string cannot fail")
        }
    }
}

// === Тесты ===
