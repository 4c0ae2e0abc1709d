//! Abstract syntax tree for the MicroJava source language.
//!
//! The tree is produced by the external parser and handed to the backend
//! already syntactically valid. Node kinds are closed sum types, so both
//! backend passes pattern-match exhaustively and the compiler guarantees
//! every construct is handled.
//!
//! Expressions, designators, and method declarations carry a [`NodeId`]
//! assigned by the parser through a [`NodeIdGen`]. The semantic pass keys
//! its type and symbol annotations on those ids; the tree itself is never
//! mutated.

/// Identity of an annotatable AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Allocator for [`NodeId`]s, owned by whoever builds the tree.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next fresh id.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

// ============================================================================
// Program and declarations
// ============================================================================

/// A whole compilation unit: `program Name { decls } { methods }`.
#[derive(Debug)]
pub struct Program {
    pub name: String,
    pub line: u32,
    pub decls: Vec<Decl>,
    pub methods: Vec<MethodDecl>,
}

/// Program-level declaration.
#[derive(Debug)]
pub enum Decl {
    Const(ConstDecl),
    Var(VarDecl),
    Class(ClassDecl),
}

/// `final Type name = literal, ...;`
#[derive(Debug)]
pub struct ConstDecl {
    pub ty: TypeRef,
    pub items: Vec<ConstItem>,
}

#[derive(Debug)]
pub struct ConstItem {
    pub name: String,
    pub value: Literal,
    pub line: u32,
}

/// `Type name[], other, ...;`
#[derive(Debug)]
pub struct VarDecl {
    pub ty: TypeRef,
    pub items: Vec<VarItem>,
}

#[derive(Debug)]
pub struct VarItem {
    pub name: String,
    pub is_array: bool,
    pub line: u32,
}

/// `class Name extends Base { fields { methods } }`
#[derive(Debug)]
pub struct ClassDecl {
    pub name: String,
    pub base: Option<TypeRef>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
    pub line: u32,
}

/// A method declaration with its formal parameters, local variables, and body.
///
/// `return_type` of `None` means a void method.
#[derive(Debug)]
pub struct MethodDecl {
    pub id: NodeId,
    pub name: String,
    pub return_type: Option<TypeRef>,
    pub params: Vec<Param>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub line: u32,
}

#[derive(Debug)]
pub struct Param {
    pub ty: TypeRef,
    pub name: String,
    pub is_array: bool,
    pub line: u32,
}

/// A type name written in the source; resolved by the semantic pass.
#[derive(Debug)]
pub struct TypeRef {
    pub name: String,
    pub line: u32,
}

/// A literal constant. `value()` gives the VM word the literal loads as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Int(i32),
    Char(char),
    Bool(bool),
}

impl Literal {
    pub fn value(self) -> i32 {
        match self {
            Literal::Int(v) => v,
            Literal::Char(c) => c as i32,
            Literal::Bool(b) => b as i32,
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug)]
pub enum Stmt {
    /// `designator = expr;`
    Assign {
        target: Designator,
        value: Expr,
        line: u32,
    },
    /// `designator++;`
    Inc { target: Designator, line: u32 },
    /// `designator--;`
    Dec { target: Designator, line: u32 },
    /// `designator(args);`, a call used as a statement.
    Call {
        callee: Designator,
        args: Vec<Expr>,
        line: u32,
    },
    If {
        cond: Condition,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        line: u32,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Condition,
        line: u32,
    },
    Break { line: u32 },
    Continue { line: u32 },
    Return { value: Option<Expr>, line: u32 },
    /// `read(designator);`
    Read { target: Designator, line: u32 },
    /// `print(expr)` or `print(expr, width)`.
    Print {
        value: Expr,
        width: Option<i32>,
        line: u32,
    },
    /// `yield expr;` supplies the enclosing switch expression's value.
    Yield { value: Expr, line: u32 },
    Block(Vec<Stmt>),
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug)]
pub struct Expr {
    pub id: NodeId,
    pub line: u32,
    pub kind: ExprKind,
}

#[derive(Debug)]
pub enum ExprKind {
    Literal(Literal),
    /// Load the value a designator denotes.
    Designator(Designator),
    /// `designator(args)` used as a value.
    Call {
        callee: Designator,
        args: Vec<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Unary minus.
    Neg(Box<Expr>),
    /// `new T` or `new T[len]`.
    New {
        ty: TypeRef,
        length: Option<Box<Expr>>,
    },
    /// `switch (selector) { case ...: stmts ... default: stmts }`
    Switch {
        selector: Box<Expr>,
        cases: Vec<SwitchCase>,
    },
}

impl Expr {
    pub fn new(ids: &mut NodeIdGen, line: u32, kind: ExprKind) -> Self {
        Self {
            id: ids.next_id(),
            line,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    /// Whether this is `+`/`-` rather than `*`/`/`/`%`.
    pub fn is_additive(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub)
    }
}

/// One branch of a switch expression.
#[derive(Debug)]
pub struct SwitchCase {
    pub label: CaseLabel,
    pub body: Vec<Stmt>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseLabel {
    Value(i32),
    Default,
}

// ============================================================================
// Designators
// ============================================================================

/// An addressable storage location: an identifier, possibly wrapped in
/// array-index accesses (`a`, `a[i]`, `a[i][j]`).
#[derive(Debug)]
pub struct Designator {
    pub id: NodeId,
    pub line: u32,
    pub kind: DesignatorKind,
}

#[derive(Debug)]
pub enum DesignatorKind {
    Ident(String),
    Index {
        base: Box<Designator>,
        index: Box<Expr>,
    },
}

impl Designator {
    pub fn ident(ids: &mut NodeIdGen, line: u32, name: impl Into<String>) -> Self {
        Self {
            id: ids.next_id(),
            line,
            kind: DesignatorKind::Ident(name.into()),
        }
    }

    pub fn index(ids: &mut NodeIdGen, line: u32, base: Designator, index: Expr) -> Self {
        Self {
            id: ids.next_id(),
            line,
            kind: DesignatorKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
        }
    }

    /// The identifier at the root of the index chain.
    pub fn root_name(&self) -> &str {
        match &self.kind {
            DesignatorKind::Ident(name) => name,
            DesignatorKind::Index { base, .. } => base.root_name(),
        }
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// A condition: a disjunction (`||`) of conjunctions (`&&`) of factors.
#[derive(Debug)]
pub struct Condition {
    pub terms: Vec<CondTerm>,
    pub line: u32,
}

/// A conjunction of condition factors.
#[derive(Debug)]
pub struct CondTerm {
    pub factors: Vec<CondFact>,
}

#[derive(Debug)]
pub struct CondFact {
    pub line: u32,
    pub kind: CondFactKind,
}

#[derive(Debug)]
pub enum CondFactKind {
    /// `lhs relop rhs`
    Rel {
        lhs: Expr,
        op: RelOp,
        rhs: Expr,
    },
    /// A bare boolean expression.
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    /// Ordering comparisons are illegal on reference types.
    pub fn is_ordering(self) -> bool {
        !matches!(self, RelOp::Eq | RelOp::Ne)
    }

    /// The complementary comparison, used to branch on failure.
    pub fn inverse(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Ne,
            RelOp::Ne => RelOp::Eq,
            RelOp::Lt => RelOp::Ge,
            RelOp::Le => RelOp::Gt,
            RelOp::Gt => RelOp::Le,
            RelOp::Ge => RelOp::Lt,
        }
    }
}
