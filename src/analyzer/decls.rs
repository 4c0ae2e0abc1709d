//! Declaration analysis: constants, variables, classes, and methods.

use std::rc::Rc;

use crate::ast::{ClassDecl, ConstDecl, Literal, MethodDecl, TypeRef, VarDecl};
use crate::error::SemanticError;
use crate::symbols::SymbolKind;
use crate::types::{ClassInfo, Type};

use super::{Analyzer, StmtCtx};

impl Analyzer {
    /// Resolve a written type name to its descriptor. Unknown or non-type
    /// names report and resolve to `Error`.
    pub(super) fn resolve_type(&mut self, type_ref: &TypeRef) -> Type {
        let Some(id) = self.scopes.find(&type_ref.name) else {
            self.report(type_ref.line, SemanticError::UnknownType);
            return Type::Error;
        };
        let (kind, ty) = {
            let sym = self.scopes.symbol(id);
            (sym.kind, sym.ty.clone())
        };
        if kind != SymbolKind::TypeAlias {
            self.report(type_ref.line, SemanticError::NotAType);
            return Type::Error;
        }
        ty
    }

    pub(super) fn const_decl(&mut self, decl: &ConstDecl) {
        let declared = self.resolve_type(&decl.ty);
        for item in &decl.items {
            // A clashing name keeps its first binding.
            if self.check_redeclaration(&item.name, item.line, 0, None, false) {
                continue;
            }
            match &declared {
                Type::Int | Type::Char | Type::Bool => {
                    let expected = match (&declared, item.value) {
                        (Type::Int, Literal::Int(_))
                        | (Type::Char, Literal::Char(_))
                        | (Type::Bool, Literal::Bool(_)) => None,
                        (Type::Int, _) => Some("int"),
                        (Type::Char, _) => Some("char"),
                        _ => Some("bool"),
                    };
                    if let Some(expected) = expected {
                        self.report(item.line, SemanticError::ConstantTypeMismatch { expected });
                    }
                }
                // An unresolved declared type was already reported.
                Type::Error => {}
                _ => self.report(item.line, SemanticError::ConstantNotBuiltin),
            }
            let id = self
                .scopes
                .insert(SymbolKind::Constant, &item.name, declared.clone());
            self.scopes.symbol_mut(id).adr = item.value.value();
        }
    }

    /// Declare a run of variables (globals, locals, or class fields) that
    /// share one written type.
    pub(super) fn var_decl(&mut self, decl: &VarDecl, level: u32, kind: SymbolKind) {
        let declared = self.resolve_type(&decl.ty);
        for item in &decl.items {
            if self.check_redeclaration(&item.name, item.line, level, None, false) {
                continue;
            }
            let ty = if item.is_array {
                Type::array_of(declared.clone())
            } else {
                declared.clone()
            };
            let id = self.scopes.insert(kind, &item.name, ty);
            self.scopes.symbol_mut(id).level = level;
        }
    }

    /// Declare a class: its type symbol enters the enclosing scope before
    /// the member scope opens, so members may refer to the class itself.
    pub(super) fn class_decl(&mut self, class: &ClassDecl) {
        self.check_redeclaration(&class.name, class.line, 0, None, false);

        let base = class.base.as_ref().and_then(|base_ref| {
            let ty = self.resolve_type(base_ref);
            match ty {
                Type::Class(_) => Some(ty),
                Type::Error => None,
                _ => {
                    self.report(base_ref.line, SemanticError::BaseNotClass);
                    None
                }
            }
        });

        let info = ClassInfo::new(class.name.clone(), base);
        let sym = self.scopes.insert(
            SymbolKind::TypeAlias,
            &class.name,
            Type::Class(Rc::clone(&info)),
        );

        self.scopes.open_scope();
        for field in &class.fields {
            self.var_decl(field, 1, SymbolKind::Field);
        }
        for method in &class.methods {
            self.method_decl(method);
        }
        info.fields.set(self.scopes.current_var_count());
        self.scopes.chain_locals(sym);
        self.scopes.close_scope();
    }

    pub(super) fn method_decl(&mut self, method: &MethodDecl) {
        let ret = match &method.return_type {
            Some(type_ref) => self.resolve_type(type_ref),
            None => Type::None,
        };
        self.check_redeclaration(&method.name, method.line, 0, Some(&ret), false);

        let sym = self
            .scopes
            .insert(SymbolKind::Method, &method.name, ret.clone());
        self.resolved.insert(method.id, sym);

        self.scopes.open_scope();
        for (position, param) in method.params.iter().enumerate() {
            let declared = self.resolve_type(&param.ty);
            self.check_redeclaration(&param.name, param.line, 1, None, true);
            let ty = if param.is_array {
                Type::array_of(declared)
            } else {
                declared
            };
            let id = self.scopes.insert(SymbolKind::Variable, &param.name, ty);
            let formal = self.scopes.symbol_mut(id);
            formal.level = 1;
            formal.fp_pos = position as u32 + 1;
        }
        self.scopes.symbol_mut(sym).level = method.params.len() as u32;

        for local in &method.locals {
            self.var_decl(local, 1, SymbolKind::Variable);
        }

        let mut ctx = StmtCtx {
            ret: &ret,
            loop_depth: 0,
            switch: None,
        };
        for stmt in &method.body {
            self.stmt(stmt, &mut ctx);
        }

        self.scopes.chain_locals(sym);
        self.scopes.close_scope();
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::analyze;
    use crate::ast::*;
    use crate::error::SemanticError;
    use crate::types::Type;

    fn type_ref(name: &str, line: u32) -> TypeRef {
        TypeRef {
            name: name.into(),
            line,
        }
    }

    fn main_method(ids: &mut NodeIdGen) -> MethodDecl {
        MethodDecl {
            id: ids.next_id(),
            name: "main".into(),
            return_type: None,
            params: vec![],
            locals: vec![],
            body: vec![],
            line: 10,
        }
    }

    fn errors(program: &Program) -> Vec<SemanticError> {
        analyze(program)
            .diagnostics
            .into_iter()
            .map(|d| d.error)
            .collect()
    }

    #[test]
    fn const_literal_must_match_declared_type() {
        let mut ids = NodeIdGen::new();
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![Decl::Const(ConstDecl {
                ty: type_ref("int", 2),
                items: vec![ConstItem {
                    name: "c".into(),
                    value: Literal::Char('x'),
                    line: 2,
                }],
            })],
            methods: vec![main_method(&mut ids)],
        };
        assert_eq!(
            errors(&program),
            vec![SemanticError::ConstantTypeMismatch { expected: "int" }]
        );
    }

    #[test]
    fn const_of_unknown_type_reports_once() {
        let mut ids = NodeIdGen::new();
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![Decl::Const(ConstDecl {
                ty: type_ref("missing", 2),
                items: vec![ConstItem {
                    name: "c".into(),
                    value: Literal::Int(1),
                    line: 2,
                }],
            })],
            methods: vec![main_method(&mut ids)],
        };
        assert_eq!(errors(&program), vec![SemanticError::UnknownType]);
    }

    #[test]
    fn const_of_class_type_is_rejected() {
        let mut ids = NodeIdGen::new();
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![
                Decl::Class(ClassDecl {
                    name: "C".into(),
                    base: None,
                    fields: vec![],
                    methods: vec![],
                    line: 2,
                }),
                Decl::Const(ConstDecl {
                    ty: type_ref("C", 3),
                    items: vec![ConstItem {
                        name: "c".into(),
                        value: Literal::Int(1),
                        line: 3,
                    }],
                }),
            ],
            methods: vec![main_method(&mut ids)],
        };
        assert_eq!(errors(&program), vec![SemanticError::ConstantNotBuiltin]);
    }

    #[test]
    fn variable_of_non_type_identifier() {
        let mut ids = NodeIdGen::new();
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![
                Decl::Var(VarDecl {
                    ty: type_ref("int", 2),
                    items: vec![VarItem {
                        name: "x".into(),
                        is_array: false,
                        line: 2,
                    }],
                }),
                Decl::Var(VarDecl {
                    ty: type_ref("x", 3),
                    items: vec![VarItem {
                        name: "y".into(),
                        is_array: false,
                        line: 3,
                    }],
                }),
            ],
            methods: vec![main_method(&mut ids)],
        };
        assert_eq!(errors(&program), vec![SemanticError::NotAType]);
    }

    #[test]
    fn redeclared_variable_keeps_the_first_binding() {
        // int x; char x; then x = 1: the clash reports once and later
        // uses still see the int binding, so the assignment is silent.
        let mut ids = NodeIdGen::new();
        let var = |ty: &str, line| {
            Decl::Var(VarDecl {
                ty: type_ref(ty, line),
                items: vec![VarItem {
                    name: "x".into(),
                    is_array: false,
                    line,
                }],
            })
        };
        let mut main = main_method(&mut ids);
        main.body = vec![Stmt::Assign {
            target: Designator::ident(&mut ids, 5, "x"),
            value: Expr::new(&mut ids, 5, ExprKind::Literal(Literal::Int(1))),
            line: 5,
        }];
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![var("int", 2), var("char", 3)],
            methods: vec![main],
        };
        let analysis = analyze(&program);
        let reported: Vec<_> = analysis.diagnostics.iter().map(|d| &d.error).collect();
        assert_eq!(
            reported,
            vec![&SemanticError::AlreadyDefined { name: "x".into() }]
        );
        // The skipped declaration consumes no global slot either.
        assert_eq!(analysis.global_slots, 1);
    }

    #[test]
    fn redeclared_constant_keeps_the_first_binding() {
        // const int c = 1; const char c = 'a'; then x = c stays int.
        let mut ids = NodeIdGen::new();
        let konst = |ty: &str, value, line| {
            Decl::Const(ConstDecl {
                ty: type_ref(ty, line),
                items: vec![ConstItem {
                    name: "c".into(),
                    value,
                    line,
                }],
            })
        };
        let mut main = main_method(&mut ids);
        let c = Designator::ident(&mut ids, 6, "c");
        main.body = vec![Stmt::Assign {
            target: Designator::ident(&mut ids, 6, "x"),
            value: Expr::new(&mut ids, 6, ExprKind::Designator(c)),
            line: 6,
        }];
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![
                Decl::Var(VarDecl {
                    ty: type_ref("int", 2),
                    items: vec![VarItem {
                        name: "x".into(),
                        is_array: false,
                        line: 2,
                    }],
                }),
                konst("int", Literal::Int(1), 3),
                konst("char", Literal::Char('a'), 4),
            ],
            methods: vec![main],
        };
        assert_eq!(
            errors(&program),
            vec![SemanticError::AlreadyDefined { name: "c".into() }]
        );
    }

    #[test]
    fn class_base_must_be_a_class() {
        let mut ids = NodeIdGen::new();
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![Decl::Class(ClassDecl {
                name: "C".into(),
                base: Some(type_ref("int", 2)),
                fields: vec![],
                methods: vec![],
                line: 2,
            })],
            methods: vec![main_method(&mut ids)],
        };
        assert_eq!(errors(&program), vec![SemanticError::BaseNotClass]);
    }

    #[test]
    fn class_extends_class_is_clean() {
        let mut ids = NodeIdGen::new();
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![
                Decl::Class(ClassDecl {
                    name: "Base".into(),
                    base: None,
                    fields: vec![VarDecl {
                        ty: type_ref("int", 3),
                        items: vec![VarItem {
                            name: "f".into(),
                            is_array: false,
                            line: 3,
                        }],
                    }],
                    methods: vec![],
                    line: 2,
                }),
                Decl::Class(ClassDecl {
                    name: "Derived".into(),
                    base: Some(type_ref("Base", 5)),
                    fields: vec![],
                    methods: vec![],
                    line: 5,
                }),
            ],
            methods: vec![main_method(&mut ids)],
        };
        assert_eq!(errors(&program), vec![]);
    }

    #[test]
    fn method_redeclaration_with_same_return_type_is_tolerated() {
        let mut ids = NodeIdGen::new();
        let method = |ids: &mut NodeIdGen, line| MethodDecl {
            id: ids.next_id(),
            name: "f".into(),
            return_type: None,
            params: vec![],
            locals: vec![],
            body: vec![],
            line,
        };
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![],
            methods: vec![
                method(&mut ids, 2),
                method(&mut ids, 3),
                main_method(&mut ids),
            ],
        };
        assert_eq!(errors(&program), vec![]);
    }

    #[test]
    fn method_redeclaration_with_different_return_type_is_reported() {
        let mut ids = NodeIdGen::new();
        let void_f = MethodDecl {
            id: ids.next_id(),
            name: "f".into(),
            return_type: None,
            params: vec![],
            locals: vec![],
            body: vec![],
            line: 2,
        };
        let int_f = MethodDecl {
            id: ids.next_id(),
            name: "f".into(),
            return_type: Some(type_ref("int", 3)),
            params: vec![],
            locals: vec![],
            body: vec![Stmt::Return {
                value: Some(Expr::new(
                    &mut ids,
                    3,
                    ExprKind::Literal(Literal::Int(0)),
                )),
                line: 3,
            }],
            line: 3,
        };
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![],
            methods: vec![void_f, int_f, main_method(&mut ids)],
        };
        assert_eq!(
            errors(&program),
            vec![SemanticError::AlreadyDefined { name: "f".into() }]
        );
    }

    #[test]
    fn param_slots_precede_local_slots() {
        let mut ids = NodeIdGen::new();
        let f = MethodDecl {
            id: ids.next_id(),
            name: "f".into(),
            return_type: None,
            params: vec![
                Param {
                    ty: type_ref("int", 2),
                    name: "a".into(),
                    is_array: false,
                    line: 2,
                },
                Param {
                    ty: type_ref("char", 2),
                    name: "b".into(),
                    is_array: false,
                    line: 2,
                },
            ],
            locals: vec![VarDecl {
                ty: type_ref("int", 3),
                items: vec![VarItem {
                    name: "tmp".into(),
                    is_array: false,
                    line: 3,
                }],
            }],
            body: vec![],
            line: 2,
        };
        let method_id = f.id;
        let program = Program {
            name: "P".into(),
            line: 1,
            decls: vec![],
            methods: vec![f, main_method(&mut ids)],
        };
        let analysis = analyze(&program);
        assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);

        let method = analysis.symbol_of(method_id).unwrap();
        assert_eq!(method.level, 2);
        let locals: Vec<_> = method
            .locals
            .iter()
            .map(|&id| analysis.symbols.get(id))
            .collect();
        assert_eq!(locals.len(), 3);
        assert_eq!((locals[0].adr, locals[0].fp_pos), (0, 1));
        assert_eq!((locals[1].adr, locals[1].fp_pos), (1, 2));
        assert_eq!((locals[2].adr, locals[2].fp_pos), (2, 0));
        assert_eq!(locals[1].ty, Type::Char);
    }
}
