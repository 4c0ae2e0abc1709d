//! The analyzer-owned scope stack.
//!
//! Scopes nest strictly: universe, program, then one per class or method.
//! Each scope keeps a name map for lookup, the declaration order for
//! freezing member lists, and a running variable count that doubles as the
//! slot allocator for that frame (globals in the program scope, formals and
//! locals in a method scope).
//!
//! Lookup is innermost-first. Synthetic symbols (array-element accesses,
//! placeholders for undeclared names) are allocated in the arena without
//! entering any scope, so they can never be found by name.

use rustc_hash::FxHashMap;

use crate::symbols::{Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::types::Type;

#[derive(Debug, Default)]
struct Scope {
    entries: FxHashMap<String, SymbolId>,
    order: Vec<SymbolId>,
    n_vars: u32,
}

/// Stack of lexical scopes over the symbol arena.
#[derive(Debug, Default)]
pub struct ScopeStack {
    table: SymbolTable,
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn close_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declare a symbol in the innermost scope. Variables and fields are
    /// assigned the next free slot of the scope's frame.
    pub fn insert(&mut self, kind: SymbolKind, name: &str, ty: Type) -> SymbolId {
        let mut symbol = Symbol::new(kind, name, ty);
        let scope = self
            .scopes
            .last_mut()
            .unwrap_or_else(|| unreachable!("insert with no open scope"));
        if matches!(kind, SymbolKind::Variable | SymbolKind::Field) {
            symbol.adr = scope.n_vars as i32;
            scope.n_vars += 1;
        }
        let id = self.table.push(symbol);
        let scope = self
            .scopes
            .last_mut()
            .unwrap_or_else(|| unreachable!("insert with no open scope"));
        scope.entries.insert(name.to_string(), id);
        scope.order.push(id);
        id
    }

    /// Allocate a symbol that belongs to no scope.
    pub fn insert_detached(&mut self, kind: SymbolKind, name: &str, ty: Type) -> SymbolId {
        self.table.push(Symbol::new(kind, name, ty))
    }

    /// Innermost-first lookup.
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.entries.get(name).copied())
    }

    /// Lookup restricted to the innermost scope.
    pub fn find_in_current(&self, name: &str) -> Option<SymbolId> {
        self.scopes
            .last()
            .and_then(|scope| scope.entries.get(name).copied())
    }

    /// Freeze the innermost scope's declarations, in order, onto `owner`.
    pub fn chain_locals(&mut self, owner: SymbolId) {
        let order = self
            .scopes
            .last()
            .map(|scope| scope.order.clone())
            .unwrap_or_default();
        self.table.get_mut(owner).locals = order;
    }

    /// Variables declared so far in the innermost scope.
    pub fn current_var_count(&self) -> u32 {
        self.scopes.last().map(|scope| scope.n_vars).unwrap_or(0)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.table.get(id)
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        self.table.get_mut(id)
    }

    /// Consume the stack, keeping the arena.
    pub fn into_table(self) -> SymbolTable {
        self.table
    }
}
