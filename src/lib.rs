//! Backend of a MicroJava compiler: semantic analysis and bytecode
//! generation for a small imperative language targeting a stack VM.
//!
//! The crate takes a syntactically valid [`ast::Program`] (parsing is
//! external) and runs two passes over it:
//!
//! - **Analysis** ([`analyzer::analyze`]) resolves names through nested
//!   scopes, types every expression, and validates declarations, control
//!   flow, and the `main` entry point. It never fails: violations are
//!   collected as ordered [`Diagnostic`]s and analysis continues behind an
//!   error sentinel, so one mistake yields one message. The result is a
//!   frozen [`analyzer::Analysis`] of side-table annotations.
//! - **Generation** ([`codegen::generate`]) runs only when the analysis is
//!   clean and lowers the tree to a flat bytecode image: builtin method
//!   bodies first, then every method, with `main`'s entry offset and the
//!   global-slot count reported alongside.
//!
//! [`Compiler::compile`] chains the two.
//!
//! ```
//! use microjava_compiler::ast::{MethodDecl, NodeIdGen, Program};
//! use microjava_compiler::Compiler;
//!
//! let mut ids = NodeIdGen::new();
//! let program = Program {
//!     name: "Empty".into(),
//!     line: 1,
//!     decls: vec![],
//!     methods: vec![MethodDecl {
//!         id: ids.next_id(),
//!         name: "main".into(),
//!         return_type: None,
//!         params: vec![],
//!         locals: vec![],
//!         body: vec![],
//!         line: 2,
//!     }],
//! };
//!
//! let result = Compiler::compile(&program);
//! assert!(result.diagnostics.is_empty());
//! assert!(result.program.is_some());
//! ```

pub mod analyzer;
pub mod ast;
pub mod bytecode;
pub mod codegen;
pub mod error;
pub mod scope;
pub mod symbols;
pub mod types;

pub use codegen::CompiledProgram;
pub use error::{Diagnostic, SemanticError};
pub use types::Type;

/// The two-pass compilation pipeline.
pub struct Compiler;

impl Compiler {
    /// Analyze `program` and, if it is semantically valid, generate code.
    pub fn compile(program: &ast::Program) -> CompilationResult {
        let analysis = analyzer::analyze(program);
        if analysis.is_clean() {
            let compiled = codegen::generate(program, &analysis);
            CompilationResult {
                program: Some(compiled),
                diagnostics: Vec::new(),
            }
        } else {
            CompilationResult {
                program: None,
                diagnostics: analysis.diagnostics,
            }
        }
    }
}

/// Outcome of a compilation: either a program image or the diagnostics
/// that prevented one.
#[derive(Debug)]
pub struct CompilationResult {
    /// The code image; `None` whenever diagnostics are present.
    pub program: Option<CompiledProgram>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilationResult {
    pub fn is_success(&self) -> bool {
        self.program.is_some()
    }
}
