//! Semantic analysis.
//!
//! One post-order traversal over the AST that never fails: every violation
//! becomes a [`Diagnostic`] and the walk continues with the `Error` type
//! sentinel. The traversal carries its context explicitly: the scope
//! stack lives on the [`Analyzer`], while per-method facts (return type,
//! loop depth, the enclosing switch frame) travel down the recursion in a
//! [`StmtCtx`] so no state leaks between constructs.
//!
//! The result is an [`Analysis`]: the ordered diagnostics, the frozen
//! symbol table, per-node type and symbol annotations, and the global
//! variable-slot count. The code generator consumes only this value.

mod decls;
mod exprs;
mod stmts;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{NodeId, Program};
use crate::error::{Diagnostic, SemanticError};
use crate::scope::ScopeStack;
use crate::symbols::{Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::types::Type;

/// Everything the semantic pass learned about a program.
#[derive(Debug)]
pub struct Analysis {
    /// Violations in the order they were discovered.
    pub diagnostics: Vec<Diagnostic>,
    /// The frozen symbol arena.
    pub symbols: SymbolTable,
    /// Number of global variable slots the program needs.
    pub global_slots: u32,
    types: FxHashMap<NodeId, Type>,
    resolved: FxHashMap<NodeId, SymbolId>,
}

impl Analysis {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The type recorded for an expression node.
    pub fn type_of(&self, id: NodeId) -> Option<&Type> {
        self.types.get(&id)
    }

    /// The symbol a designator or method node resolved to.
    pub fn symbol_id_of(&self, id: NodeId) -> Option<SymbolId> {
        self.resolved.get(&id).copied()
    }

    pub fn symbol_of(&self, id: NodeId) -> Option<&Symbol> {
        self.symbol_id_of(id).map(|sym| self.symbols.get(sym))
    }
}

/// Run the semantic pass over `program`.
pub fn analyze(program: &Program) -> Analysis {
    let mut analyzer = Analyzer::new();
    analyzer.scopes.open_scope(); // universe
    analyzer.seed_universe();
    analyzer.program(program);
    Analysis {
        diagnostics: analyzer.diagnostics,
        global_slots: analyzer.global_slots,
        types: analyzer.types,
        resolved: analyzer.resolved,
        symbols: analyzer.scopes.into_table(),
    }
}

/// Collected yields and labels of the switch expression currently being
/// analyzed. One frame per switch, owned by its recursion step, so nested
/// switches cannot clobber each other.
#[derive(Debug, Default)]
pub(super) struct SwitchFrame {
    pub(super) yields: Vec<Type>,
    pub(super) labels: FxHashSet<i32>,
    pub(super) defaults: u32,
}

/// Context threaded through statement and expression analysis.
pub(super) struct StmtCtx<'a> {
    /// Return type of the enclosing method (`Type::None` for void).
    pub(super) ret: &'a Type,
    /// Number of enclosing do-while bodies.
    pub(super) loop_depth: u32,
    /// The innermost enclosing switch expression, if any.
    pub(super) switch: Option<&'a mut SwitchFrame>,
}

impl StmtCtx<'_> {
    /// A child context borrowing the same frames.
    pub(super) fn reborrow(&mut self) -> StmtCtx<'_> {
        StmtCtx {
            ret: self.ret,
            loop_depth: self.loop_depth,
            switch: self.switch.as_deref_mut(),
        }
    }
}

pub(super) struct Analyzer {
    pub(super) scopes: ScopeStack,
    pub(super) diagnostics: Vec<Diagnostic>,
    pub(super) types: FxHashMap<NodeId, Type>,
    pub(super) resolved: FxHashMap<NodeId, SymbolId>,
    pub(super) global_slots: u32,
}

impl Analyzer {
    fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
            diagnostics: Vec::new(),
            types: FxHashMap::default(),
            resolved: FxHashMap::default(),
            global_slots: 0,
        }
    }

    pub(super) fn report(&mut self, line: u32, error: SemanticError) {
        self.diagnostics.push(Diagnostic { line, error });
    }

    // ========================================================================
    // Universe scope
    // ========================================================================

    /// Declare the builtin types, the `eol` constant, and the builtin
    /// methods `chr`, `ord`, and `len`.
    fn seed_universe(&mut self) {
        self.scopes.insert(SymbolKind::TypeAlias, "int", Type::Int);
        self.scopes.insert(SymbolKind::TypeAlias, "char", Type::Char);
        self.scopes.insert(SymbolKind::TypeAlias, "bool", Type::Bool);

        let eol = self.scopes.insert(SymbolKind::Constant, "eol", Type::Char);
        self.scopes.symbol_mut(eol).adr = '\n' as i32;

        self.builtin_method("chr", Type::Char, "i", Type::Int);
        self.builtin_method("ord", Type::Int, "ch", Type::Char);
        // len accepts any array; its formal's element type None marks that.
        self.builtin_method("len", Type::Int, "arr", Type::array_of(Type::None));
    }

    fn builtin_method(&mut self, name: &str, ret: Type, param: &str, param_ty: Type) {
        let method = self.scopes.insert(SymbolKind::Method, name, ret);
        self.scopes.open_scope();
        let p = self.scopes.insert(SymbolKind::Variable, param, param_ty);
        {
            let sym = self.scopes.symbol_mut(p);
            sym.level = 1;
            sym.fp_pos = 1;
        }
        self.scopes.chain_locals(method);
        self.scopes.close_scope();
        self.scopes.symbol_mut(method).level = 1;
    }

    // ========================================================================
    // Program
    // ========================================================================

    fn program(&mut self, program: &Program) {
        use crate::ast::Decl;

        let prog = self
            .scopes
            .insert(SymbolKind::Program, &program.name, Type::None);
        self.scopes.open_scope();

        for decl in &program.decls {
            match decl {
                Decl::Const(decl) => self.const_decl(decl),
                Decl::Var(decl) => self.var_decl(decl, 0, SymbolKind::Variable),
                Decl::Class(decl) => self.class_decl(decl),
            }
        }
        for method in &program.methods {
            self.method_decl(method);
        }

        self.global_slots = self.scopes.current_var_count();
        self.scopes.chain_locals(prog);
        let main = self.scopes.find("main");
        self.scopes.close_scope();
        self.check_main(main);
    }

    fn check_main(&mut self, main: Option<SymbolId>) {
        let Some(id) = main else {
            self.report(0, SemanticError::MissingMain);
            return;
        };
        let (kind, level, ty) = {
            let sym = self.scopes.symbol(id);
            (sym.kind, sym.level, sym.ty.clone())
        };
        if kind != SymbolKind::Method {
            self.report(0, SemanticError::MainNotAMethod);
            return;
        }
        if level != 0 {
            self.report(0, SemanticError::MainHasParams);
        }
        if ty != Type::None {
            self.report(0, SemanticError::MainNotVoid);
        }
    }

    // ========================================================================
    // Redeclaration
    // ========================================================================

    /// Whether declaring `name` at `level` would clash with a visible
    /// declaration in the current scope. A method redeclaration with the
    /// same return type is tolerated, as is a parameter shadowing a class
    /// field.
    fn is_double_declaration(
        &self,
        name: &str,
        level: u32,
        method_ret: Option<&Type>,
        in_signature: bool,
    ) -> bool {
        let Some(id) = self.scopes.find(name) else {
            return false;
        };
        let sym = self.scopes.symbol(id);
        if sym.level != level {
            return false;
        }
        if self.scopes.find_in_current(name).is_none() {
            return false;
        }
        if sym.kind == SymbolKind::Method
            && method_ret.is_some_and(|ret| *ret == sym.ty)
        {
            return false;
        }
        if sym.kind == SymbolKind::Field && in_signature {
            return false;
        }
        true
    }

    /// Report and return true if the declaration clashes.
    pub(super) fn check_redeclaration(
        &mut self,
        name: &str,
        line: u32,
        level: u32,
        method_ret: Option<&Type>,
        in_signature: bool,
    ) -> bool {
        if self.is_double_declaration(name, level, method_ret, in_signature) {
            self.report(
                line,
                SemanticError::AlreadyDefined {
                    name: name.to_string(),
                },
            );
            true
        } else {
            false
        }
    }
}
