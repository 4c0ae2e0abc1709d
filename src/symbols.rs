//! Symbols and the frozen symbol table.
//!
//! Symbols live in a single arena indexed by [`SymbolId`]. During analysis
//! the arena is owned by the scope stack; when analysis finishes it is
//! frozen into a read-only [`SymbolTable`] that travels with the
//! annotations, so the code generator never touches live scopes.

use crate::types::Type;

/// Index of a symbol in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// The program itself.
    Program,
    /// A named type (`int`, `char`, `bool`, declared classes).
    TypeAlias,
    Constant,
    Variable,
    /// A class member variable.
    Field,
    Method,
    /// Synthetic symbol denoting an indexed array element.
    ArrayElement,
}

/// One declared (or synthetic) entity.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub ty: Type,
    /// Declaration level: 0 global, 1 local/member. For methods this holds
    /// the formal-parameter count.
    pub level: u32,
    /// Variable slot within its frame, or a constant's literal value.
    pub adr: i32,
    /// 1-based formal-parameter position; 0 for everything else.
    pub fp_pos: u32,
    /// Ordered member declarations, frozen when the owning scope closes
    /// (methods: formals then locals; classes: fields then methods).
    pub locals: Vec<SymbolId>,
}

impl Symbol {
    pub(crate) fn new(kind: SymbolKind, name: impl Into<String>, ty: Type) -> Self {
        Self {
            kind,
            name: name.into(),
            ty,
            level: 0,
            adr: 0,
            fp_pos: 0,
            locals: Vec::new(),
        }
    }

    /// The formal parameters of a method, in declaration order.
    pub fn formals<'a>(&'a self, table: &'a SymbolTable) -> impl Iterator<Item = &'a Symbol> {
        self.locals
            .iter()
            .map(|&id| table.get(id))
            .filter(|sym| sym.fp_pos > 0)
    }
}

/// The immutable symbol arena produced by analysis.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub(crate) fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId::new(self.symbols.len());
        self.symbols.push(symbol);
        id
    }

    pub(crate) fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }
}
