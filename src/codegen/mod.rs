//! Bytecode generation.
//!
//! The second pass walks the same AST as the analyzer but consumes only
//! the frozen [`Analysis`]: symbol annotations say where values live, type
//! annotations pick instruction variants. It runs exclusively on a clean
//! analysis; an annotation miss here is a compiler bug, not a user error.
//!
//! Code is emitted into one flat buffer in source order: the three builtin
//! method bodies first, then every program method. Calls are resolved
//! through a name-to-offset map filled as methods are emitted; callees are
//! declared before use, so the offset is always known at the call site.

mod cond;
mod stmts;

use rustc_hash::FxHashMap;

use crate::analyzer::Analysis;
use crate::ast::{BinOp, Designator, DesignatorKind, Expr, ExprKind, MethodDecl, NodeId, Program};
use crate::bytecode::{CodeBuffer, JumpLabel, OpCode};
use crate::symbols::{Symbol, SymbolKind};
use crate::types::Type;

/// The generator's output: the flat code image and what the VM needs to
/// start it.
#[derive(Debug)]
pub struct CompiledProgram {
    pub code: CodeBuffer,
    /// Entry point: offset of `main`'s `Enter`.
    pub main_pc: usize,
    /// Size of the static data segment, in word slots.
    pub global_slots: u32,
}

/// Generate code for `program`. The analysis must be clean.
pub fn generate(program: &Program, analysis: &Analysis) -> CompiledProgram {
    assert!(
        analysis.is_clean(),
        "code generation requires a diagnostic-free analysis"
    );
    let mut generator = CodeGenerator::new(analysis);
    generator.builtins();
    for method in &program.methods {
        generator.method(method);
    }
    let main_pc = generator.method_offsets["main"];
    CompiledProgram {
        code: generator.code,
        main_pc,
        global_slots: analysis.global_slots,
    }
}

/// Open branch labels of the do-while currently being generated.
#[derive(Debug, Default)]
pub(super) struct LoopLabels {
    pub(super) breaks: Vec<JumpLabel>,
    pub(super) continues: Vec<JumpLabel>,
}

/// Branch-target context threaded through statement generation: where the
/// innermost loop's breaks/continues and the innermost switch's yields
/// must eventually land.
pub(super) struct FlowCtx<'a> {
    pub(super) loop_labels: Option<&'a mut LoopLabels>,
    pub(super) yields: Option<&'a mut Vec<JumpLabel>>,
}

impl FlowCtx<'_> {
    pub(super) fn none() -> FlowCtx<'static> {
        FlowCtx {
            loop_labels: None,
            yields: None,
        }
    }

    /// A child context borrowing the same targets.
    pub(super) fn reborrow(&mut self) -> FlowCtx<'_> {
        FlowCtx {
            loop_labels: self.loop_labels.as_deref_mut(),
            yields: self.yields.as_deref_mut(),
        }
    }
}

pub(super) struct CodeGenerator<'a> {
    pub(super) code: CodeBuffer,
    pub(super) analysis: &'a Analysis,
    pub(super) method_offsets: FxHashMap<String, usize>,
}

impl<'a> CodeGenerator<'a> {
    fn new(analysis: &'a Analysis) -> Self {
        Self {
            code: CodeBuffer::new(),
            analysis,
            method_offsets: FxHashMap::default(),
        }
    }

    pub(super) fn sym_of(&self, id: NodeId) -> &Symbol {
        match self.analysis.symbol_of(id) {
            Some(sym) => sym,
            None => unreachable!("node without a symbol annotation"),
        }
    }

    pub(super) fn type_of(&self, id: NodeId) -> &Type {
        match self.analysis.type_of(id) {
            Some(ty) => ty,
            None => unreachable!("expression without a type annotation"),
        }
    }

    // ========================================================================
    // Methods
    // ========================================================================

    /// Emit the bodies of `chr`, `ord`, and `len`. `chr` and `ord` only
    /// reinterpret their argument, so both reduce to returning it.
    fn builtins(&mut self) {
        for name in ["chr", "ord"] {
            self.builtin_prologue(name);
            self.code.put(OpCode::Exit);
            self.code.put(OpCode::Return);
        }
        self.builtin_prologue("len");
        self.code.put(OpCode::ArrayLength);
        self.code.put(OpCode::Exit);
        self.code.put(OpCode::Return);
    }

    fn builtin_prologue(&mut self, name: &str) {
        self.method_offsets.insert(name.to_string(), self.code.pc());
        self.code.put(OpCode::Enter);
        self.code.put1(1);
        self.code.put1(1);
        self.code.put(OpCode::Load0);
    }

    fn method(&mut self, method: &MethodDecl) {
        let (name, ret, formals, frame_slots) = {
            let sym = self.sym_of(method.id);
            (sym.name.clone(), sym.ty.clone(), sym.level, sym.locals.len())
        };
        self.method_offsets.insert(name, self.code.pc());
        self.code.put(OpCode::Enter);
        self.code.put1(formals as u8);
        self.code.put1(frame_slots as u8);

        let mut ctx = FlowCtx::none();
        for stmt in &method.body {
            self.stmt(stmt, &mut ctx);
        }

        if ret == Type::None {
            self.code.put(OpCode::Exit);
            self.code.put(OpCode::Return);
        } else {
            // Running off the end of a value-returning method traps.
            self.code.put(OpCode::Trap);
            self.code.put1(0);
        }
    }

    pub(super) fn call(&mut self, name: &str) {
        let target = self.method_offsets[name];
        self.code.put_call(target);
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Emit code leaving the expression's value on top of the stack.
    pub(super) fn expr(&mut self, expr: &Expr, ctx: &mut FlowCtx) {
        match &expr.kind {
            ExprKind::Literal(literal) => self.code.load_const(literal.value()),
            ExprKind::Designator(designator) => self.designator_value(designator, ctx),
            ExprKind::Call { callee, args } => {
                for arg in args {
                    self.expr(arg, ctx);
                }
                let name = self.sym_of(callee.id).name.clone();
                self.call(&name);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(lhs, ctx);
                self.expr(rhs, ctx);
                self.code.put(match op {
                    BinOp::Add => OpCode::Add,
                    BinOp::Sub => OpCode::Sub,
                    BinOp::Mul => OpCode::Mul,
                    BinOp::Div => OpCode::Div,
                    BinOp::Rem => OpCode::Rem,
                });
            }
            ExprKind::Neg(inner) => {
                self.expr(inner, ctx);
                self.code.put(OpCode::Neg);
            }
            ExprKind::New { length, .. } => match length {
                Some(length) => {
                    self.expr(length, ctx);
                    let elem = match self.type_of(expr.id).elem() {
                        Some(elem) => elem.clone(),
                        None => unreachable!("array allocation without array type"),
                    };
                    self.code.put(OpCode::NewArray);
                    // Word stride for int arrays, byte stride otherwise.
                    self.code.put1(if elem == Type::Int { 1 } else { 0 });
                }
                None => {
                    let fields = match self.type_of(expr.id) {
                        Type::Class(info) => info.fields.get(),
                        _ => unreachable!("bare allocation of a non-class type"),
                    };
                    self.code.put(OpCode::New);
                    self.code.put2(fields as i16);
                }
            },
            ExprKind::Switch { selector, cases } => self.switch(selector, cases, ctx),
        }
    }

    /// Emit code loading the value a designator denotes.
    pub(super) fn designator_value(&mut self, designator: &Designator, ctx: &mut FlowCtx) {
        match &designator.kind {
            DesignatorKind::Ident(_) => {
                let sym = self.sym_of(designator.id).clone();
                self.load(&sym);
            }
            DesignatorKind::Index { base, index } => {
                self.designator_value(base, ctx);
                self.expr(index, ctx);
                let elem_ty = self.sym_of(designator.id).ty.clone();
                self.code.put(Self::array_load(&elem_ty));
            }
        }
    }

    // ========================================================================
    // Loads and stores
    // ========================================================================

    pub(super) fn load(&mut self, sym: &Symbol) {
        match sym.kind {
            SymbolKind::Constant => self.code.load_const(sym.adr),
            SymbolKind::Variable => {
                if sym.level == 0 {
                    self.code.put(OpCode::GetStatic);
                    self.code.put2(sym.adr as i16);
                } else {
                    self.code.load_local(sym.adr as u32);
                }
            }
            _ => unreachable!("cannot load a {:?} symbol", sym.kind),
        }
    }

    pub(super) fn store(&mut self, sym: &Symbol) {
        match sym.kind {
            SymbolKind::Variable => {
                if sym.level == 0 {
                    self.code.put(OpCode::PutStatic);
                    self.code.put2(sym.adr as i16);
                } else {
                    self.code.store_local(sym.adr as u32);
                }
            }
            SymbolKind::ArrayElement => self.code.put(Self::array_store(&sym.ty)),
            _ => unreachable!("cannot store into a {:?} symbol", sym.kind),
        }
    }

    /// Char and bool arrays pack byte elements.
    pub(super) fn array_load(elem: &Type) -> OpCode {
        if matches!(elem, Type::Char | Type::Bool) {
            OpCode::BALoad
        } else {
            OpCode::ALoad
        }
    }

    pub(super) fn array_store(elem: &Type) -> OpCode {
        if matches!(elem, Type::Char | Type::Bool) {
            OpCode::BAStore
        } else {
            OpCode::AStore
        }
    }
}
