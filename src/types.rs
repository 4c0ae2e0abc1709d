//! Type descriptors used by both backend passes.
//!
//! MicroJava's type system is tiny: the three builtin scalars, arrays of any
//! type, and nominal classes. Two extra kinds carry bookkeeping through the
//! passes: [`Type::None`] is the void/untyped kind, and [`Type::Error`] is
//! the propagation sentinel recorded for ill-typed constructs. `Error`
//! spreads silently: a check with an `Error` operand records no diagnostic
//! and yields `Error` again, so one mistake produces one message.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A MicroJava type.
#[derive(Debug, Clone)]
pub enum Type {
    /// The void/untyped kind (void methods, the program symbol).
    None,
    Int,
    Char,
    Bool,
    /// Sentinel for constructs that already produced a diagnostic.
    Error,
    Array(Box<Type>),
    Class(Rc<ClassInfo>),
}

/// Shared descriptor of a declared class. Classes are nominal: two classes
/// are the same type only if they share the same descriptor allocation.
#[derive(Debug)]
pub struct ClassInfo {
    pub name: String,
    pub base: Option<Type>,
    /// Number of declared fields, fixed when the member scope closes.
    pub fields: Cell<u32>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>, base: Option<Type>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            base,
            fields: Cell::new(0),
        })
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::None, Type::None)
            | (Type::Int, Type::Int)
            | (Type::Char, Type::Char)
            | (Type::Bool, Type::Bool)
            | (Type::Error, Type::Error) => true,
            (Type::Array(a), Type::Array(b)) => a == b,
            (Type::Class(a), Type::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Type {
    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    /// One of the three scalar builtins.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Type::Int | Type::Char | Type::Bool)
    }

    /// Arrays and classes live on the heap and are compared by reference.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Array(_) | Type::Class(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Element type, for arrays.
    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Relaxed equivalence used by relational operators: equal types, or
    /// classes related by derivation in either direction.
    pub fn compatible_with(&self, other: &Type) -> bool {
        self == other || self.derives_from(other) || other.derives_from(self)
    }

    fn derives_from(&self, other: &Type) -> bool {
        let Type::Class(info) = self else {
            return false;
        };
        let mut base = info.base.clone();
        while let Some(ty) = base {
            if &ty == other {
                return true;
            }
            base = match &ty {
                Type::Class(info) => info.base.clone(),
                _ => None,
            };
        }
        false
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::None | Type::Error => write!(f, "none"),
            Type::Int => write!(f, "int"),
            Type::Char => write!(f, "char"),
            Type::Bool => write!(f, "bool"),
            Type::Array(elem) => write!(f, "Arr of {elem}"),
            Type::Class(info) => write!(f, "Class {}", info.name),
        }
    }
}
