//! Semantic diagnostics.
//!
//! The analyzer never aborts: every violation becomes a [`Diagnostic`]
//! appended to an ordered list, and analysis continues with the `Error`
//! type sentinel so one mistake yields one message. A diagnostic pairs a
//! [`SemanticError`] with the 1-based source line it was reported on; line
//! 0 marks program-level checks (the `main` validation) that have no
//! meaningful source position.

use std::fmt;

use thiserror::Error;

/// A semantic violation, with the exact message the compiler reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------
    #[error("Identifier '{name}' already defined")]
    AlreadyDefined { name: String },
    #[error("Undeclared identifier '{name}'")]
    Undeclared { name: String },
    #[error("Type does not exist in the symbol table")]
    UnknownType,
    #[error("Identifier found is not a type")]
    NotAType,
    #[error("Actual constant is not of type {expected}")]
    ConstantTypeMismatch { expected: &'static str },
    #[error("Constant must be a builtin type")]
    ConstantNotBuiltin,
    #[error("Base class must be a class type")]
    BaseNotClass,

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------
    #[error("Assignment variable must be assignable")]
    NotAssignable,
    #[error("Type mismatch in assignment, expected '{expected}', found '{found}'")]
    AssignTypeMismatch { expected: String, found: String },
    #[error("Increment statement variable must be assignable")]
    IncNotAssignable,
    #[error("Increment variable must be of type int")]
    IncNotInt,
    #[error("Decrement statement variable must be assignable")]
    DecNotAssignable,
    #[error("Decrement variable must be of type int")]
    DecNotInt,
    #[error("Type mismatch between return type and expression in return")]
    ReturnTypeMismatch,
    #[error("empty return can only be placed in void functions")]
    EmptyReturnInNonVoid,
    #[error(
        "Function '{name}' param {position} type mismatch, expected '{expected}', found '{found}'"
    )]
    ParamTypeMismatch {
        name: String,
        position: u32,
        expected: String,
        found: String,
    },
    #[error("print argument must be of a builtin type")]
    PrintArgNotBuiltin,
    #[error("read argument must be of builtin type")]
    ReadArgNotBuiltin,
    #[error("read argument must be assignable")]
    ReadArgNotAssignable,
    #[error("break statement must not be outside of do-while")]
    BreakOutsideLoop,
    #[error("continue statement must not be outside of do-while")]
    ContinueOutsideLoop,
    #[error("yield statement must not be outside of switch")]
    YieldOutsideSwitch,

    // ------------------------------------------------------------------
    // Expressions and conditions
    // ------------------------------------------------------------------
    #[error("Invalid type for condition")]
    InvalidConditionType,
    #[error("Invalid types for || operator")]
    InvalidOrOperands,
    #[error("Invalid types for && operator")]
    InvalidAndOperands,
    #[error("Types in relational operation not compatible")]
    IncompatibleRelOperands,
    #[error("Operator cannot be applied to reference type")]
    OrderingOnReferenceType,
    #[error("Invalid types for addition operator")]
    InvalidAddOperands,
    #[error("Invalid types for multiplication operator")]
    InvalidMulOperands,
    #[error("Invalid type for unary -")]
    InvalidNegOperand,
    #[error("Indexing must be done on type array")]
    IndexingNonArray,
    #[error("Allocation size must be of type int")]
    AllocationSizeNotInt,

    // ------------------------------------------------------------------
    // Switch expressions
    // ------------------------------------------------------------------
    #[error("Missing default case")]
    MissingDefaultCase,
    #[error("Duplicate default case label")]
    DuplicateDefaultCase,
    #[error("Duplicate case label with value {value}")]
    DuplicateCaseLabel { value: i32 },
    #[error("Missing yield statement in switch")]
    MissingYield,
    #[error("Switch variable must be of type int")]
    SwitchSelectorNotInt,
    #[error("Different types in yield statements in switch")]
    MixedYieldTypes,

    // ------------------------------------------------------------------
    // Program-level
    // ------------------------------------------------------------------
    #[error("No main defined")]
    MissingMain,
    #[error("main must be defined as a method")]
    MainNotAMethod,
    #[error("main must not take formal params")]
    MainHasParams,
    #[error("main must be defined with type void")]
    MainNotVoid,
}

/// A reported violation together with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line; 0 for program-level checks.
    pub line: u32,
    pub error: SemanticError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if self.line > 0 {
            write!(f, " on line {}", self.line)?;
        }
        Ok(())
    }
}
