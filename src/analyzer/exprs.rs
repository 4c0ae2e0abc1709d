//! Expression, designator, and condition analysis.
//!
//! Every expression node gets a type annotation, every designator a symbol
//! annotation, even on error paths: the `Error` sentinel and a detached
//! placeholder symbol keep the traversal total while suppressing cascade
//! diagnostics.

use crate::ast::{
    CondFact, CondFactKind, CondTerm, Condition, Designator, DesignatorKind, Expr, ExprKind,
    Literal, SwitchCase,
};
use crate::error::SemanticError;
use crate::symbols::{SymbolId, SymbolKind};
use crate::types::Type;

use super::{Analyzer, StmtCtx, SwitchFrame};

impl Analyzer {
    /// Type an expression, record the annotation, and return the type.
    pub(super) fn expr(&mut self, expr: &Expr, ctx: &mut StmtCtx) -> Type {
        let ty = match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Int(_) => Type::Int,
                Literal::Char(_) => Type::Char,
                Literal::Bool(_) => Type::Bool,
            },
            ExprKind::Designator(designator) => {
                let sym = self.designator(designator, ctx);
                self.scopes.symbol(sym).ty.clone()
            }
            ExprKind::Call { callee, args } => self.call(callee, args, expr.line, ctx),
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = self.expr(lhs, ctx);
                let rhs_ty = self.expr(rhs, ctx);
                if lhs_ty == Type::Int && rhs_ty == Type::Int {
                    Type::Int
                } else {
                    if !lhs_ty.is_error() && !rhs_ty.is_error() {
                        let error = if op.is_additive() {
                            SemanticError::InvalidAddOperands
                        } else {
                            SemanticError::InvalidMulOperands
                        };
                        self.report(expr.line, error);
                    }
                    Type::Error
                }
            }
            ExprKind::Neg(inner) => {
                let inner_ty = self.expr(inner, ctx);
                match inner_ty {
                    Type::Int => Type::Int,
                    Type::Error => Type::Error,
                    _ => {
                        self.report(expr.line, SemanticError::InvalidNegOperand);
                        Type::Error
                    }
                }
            }
            ExprKind::New { ty, length } => {
                let elem = self.resolve_type(ty);
                match length {
                    Some(length) => {
                        let length_ty = self.expr(length, ctx);
                        if length_ty != Type::Int && !length_ty.is_error() {
                            self.report(length.line, SemanticError::AllocationSizeNotInt);
                        }
                        Type::array_of(elem)
                    }
                    None => elem,
                }
            }
            ExprKind::Switch { selector, cases } => {
                self.switch_expr(expr.line, selector, cases, ctx)
            }
        };
        self.types.insert(expr.id, ty.clone());
        ty
    }

    /// Resolve a designator to a symbol and record the annotation. An
    /// undeclared name resolves to a detached `Error`-typed variable so
    /// later uses neither re-report nor cascade.
    pub(super) fn designator(&mut self, designator: &Designator, ctx: &mut StmtCtx) -> SymbolId {
        let sym = match &designator.kind {
            DesignatorKind::Ident(name) => match self.scopes.find(name) {
                Some(id) => id,
                None => {
                    self.report(
                        designator.line,
                        SemanticError::Undeclared { name: name.clone() },
                    );
                    self.scopes
                        .insert_detached(SymbolKind::Variable, name, Type::Error)
                }
            },
            DesignatorKind::Index { base, index } => {
                let base_sym = self.designator(base, ctx);
                let base_ty = self.scopes.symbol(base_sym).ty.clone();
                self.expr(index, ctx);
                let elem = match &base_ty {
                    Type::Array(elem) => (**elem).clone(),
                    Type::Error => Type::Error,
                    _ => {
                        self.report(designator.line, SemanticError::IndexingNonArray);
                        Type::Error
                    }
                };
                let name = designator.root_name();
                self.scopes
                    .insert_detached(SymbolKind::ArrayElement, name, elem)
            }
        };
        self.resolved.insert(designator.id, sym);
        sym
    }

    /// Whether a designator denotes a storage location.
    pub(super) fn is_assignable(&self, designator: &Designator) -> bool {
        let Some(&sym) = self.resolved.get(&designator.id) else {
            return false;
        };
        matches!(
            self.scopes.symbol(sym).kind,
            SymbolKind::Variable | SymbolKind::ArrayElement
        )
    }

    /// Type a call and check its arguments against the callee's formals.
    /// Argument types are collected per call site, so nested calls cannot
    /// interfere with each other.
    fn call(
        &mut self,
        callee: &Designator,
        args: &[Expr],
        line: u32,
        ctx: &mut StmtCtx,
    ) -> Type {
        let callee_sym = self.designator(callee, ctx);
        let result = self.scopes.symbol(callee_sym).ty.clone();
        let arg_types: Vec<Type> = args.iter().map(|arg| self.expr(arg, ctx)).collect();
        self.check_call(callee, &arg_types, line);
        result
    }

    pub(super) fn check_call(&mut self, callee: &Designator, arg_types: &[Type], line: u32) {
        let name = callee.root_name().to_string();
        let Some(id) = self.scopes.find(&name) else {
            return;
        };
        let (kind, formal_count) = {
            let sym = self.scopes.symbol(id);
            (sym.kind, sym.level)
        };
        if kind != SymbolKind::Method {
            return;
        }
        // When the counts disagree no per-position check is meaningful.
        if formal_count as usize != arg_types.len() {
            return;
        }
        let formals: Vec<(u32, Type)> = {
            let sym = self.scopes.symbol(id);
            sym.locals
                .iter()
                .map(|&local| self.scopes.symbol(local))
                .filter(|local| local.fp_pos > 0)
                .map(|local| (local.fp_pos, local.ty.clone()))
                .collect()
        };
        for (position, formal) in formals {
            let actual = &arg_types[(position - 1) as usize];
            if actual.is_error() || Self::param_matches(&formal, actual) {
                continue;
            }
            self.report(
                line,
                SemanticError::ParamTypeMismatch {
                    name: name.clone(),
                    position,
                    expected: formal.to_string(),
                    found: actual.to_string(),
                },
            );
        }
    }

    /// A formal of element type `None` (the builtin `len`) accepts any array.
    fn param_matches(formal: &Type, actual: &Type) -> bool {
        if formal == actual {
            return true;
        }
        matches!(
            (formal, actual),
            (Type::Array(elem), Type::Array(_)) if **elem == Type::None
        )
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    /// Fold a disjunction of conjunctions. Each `||` and `&&` boundary
    /// requires Bool operands and reports its own diagnostic; a condition
    /// that folds to a non-Bool scalar reports once at the end.
    pub(super) fn condition(&mut self, condition: &Condition, ctx: &mut StmtCtx) {
        let mut terms = condition.terms.iter();
        let Some(first) = terms.next() else {
            return;
        };
        let mut ty = self.cond_term(first, ctx);
        for term in terms {
            let rhs = self.cond_term(term, ctx);
            ty = if ty == Type::Bool && rhs == Type::Bool {
                Type::Bool
            } else {
                if !ty.is_error() && !rhs.is_error() {
                    self.report(condition.line, SemanticError::InvalidOrOperands);
                }
                Type::Error
            };
        }
        if ty != Type::Bool && !ty.is_error() {
            self.report(condition.line, SemanticError::InvalidConditionType);
        }
    }

    fn cond_term(&mut self, term: &CondTerm, ctx: &mut StmtCtx) -> Type {
        let mut factors = term.factors.iter();
        let Some(first) = factors.next() else {
            return Type::Error;
        };
        let mut ty = self.cond_fact(first, ctx);
        for factor in factors {
            let rhs = self.cond_fact(factor, ctx);
            ty = if ty == Type::Bool && rhs == Type::Bool {
                Type::Bool
            } else {
                if !ty.is_error() && !rhs.is_error() {
                    self.report(factor.line, SemanticError::InvalidAndOperands);
                }
                Type::Error
            };
        }
        ty
    }

    fn cond_fact(&mut self, factor: &CondFact, ctx: &mut StmtCtx) -> Type {
        match &factor.kind {
            // A bare expression's type flows into the folds unchecked;
            // the enclosing `&&`/`||` or the condition itself reports.
            CondFactKind::Expr(expr) => self.expr(expr, ctx),
            CondFactKind::Rel { lhs, op, rhs } => {
                let lhs_ty = self.expr(lhs, ctx);
                let rhs_ty = self.expr(rhs, ctx);
                if lhs_ty.is_error() || rhs_ty.is_error() {
                    return Type::Error;
                }
                if !lhs_ty.compatible_with(&rhs_ty) {
                    self.report(factor.line, SemanticError::IncompatibleRelOperands);
                    return Type::Error;
                }
                if (lhs_ty.is_reference() || rhs_ty.is_reference()) && op.is_ordering() {
                    self.report(factor.line, SemanticError::OrderingOnReferenceType);
                    return Type::Error;
                }
                Type::Bool
            }
        }
    }

    // ========================================================================
    // Switch expressions
    // ========================================================================

    fn switch_expr(
        &mut self,
        line: u32,
        selector: &Expr,
        cases: &[SwitchCase],
        ctx: &mut StmtCtx,
    ) -> Type {
        use crate::ast::CaseLabel;

        let selector_ty = self.expr(selector, ctx);
        let mut frame = SwitchFrame::default();

        for case in cases {
            match case.label {
                CaseLabel::Value(value) => {
                    if !frame.labels.insert(value) {
                        self.report(case.line, SemanticError::DuplicateCaseLabel { value });
                    }
                }
                CaseLabel::Default => {
                    frame.defaults += 1;
                    if frame.defaults > 1 {
                        self.report(case.line, SemanticError::DuplicateDefaultCase);
                    }
                }
            }
            let mut child = StmtCtx {
                ret: ctx.ret,
                loop_depth: ctx.loop_depth,
                switch: Some(&mut frame),
            };
            for stmt in &case.body {
                self.stmt(stmt, &mut child);
            }
        }

        if frame.defaults == 0 {
            self.report(line, SemanticError::MissingDefaultCase);
            return Type::Error;
        }
        if frame.yields.is_empty() {
            self.report(line, SemanticError::MissingYield);
            return Type::Error;
        }
        if selector_ty != Type::Int {
            if !selector_ty.is_error() {
                self.report(line, SemanticError::SwitchSelectorNotInt);
            }
            return Type::Error;
        }
        if frame.yields.iter().any(Type::is_error) {
            return Type::Error;
        }
        let first = frame.yields[0].clone();
        if frame.yields.iter().all(|ty| *ty == first) {
            first
        } else {
            self.report(line, SemanticError::MixedYieldTypes);
            Type::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::analyze;
    use crate::ast::*;
    use crate::error::SemanticError;
    use crate::types::Type;

    fn int_lit(ids: &mut NodeIdGen, v: i32) -> Expr {
        Expr::new(ids, 5, ExprKind::Literal(Literal::Int(v)))
    }

    fn char_lit(ids: &mut NodeIdGen, c: char) -> Expr {
        Expr::new(ids, 5, ExprKind::Literal(Literal::Char(c)))
    }

    fn var(ids: &mut NodeIdGen, name: &str) -> Expr {
        let designator = Designator::ident(ids, 5, name);
        Expr::new(ids, 5, ExprKind::Designator(designator))
    }

    fn binary(ids: &mut NodeIdGen, op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(
            ids,
            5,
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    fn int_var_decl(name: &str, is_array: bool) -> Decl {
        Decl::Var(VarDecl {
            ty: TypeRef {
                name: "int".into(),
                line: 2,
            },
            items: vec![VarItem {
                name: name.into(),
                is_array,
                line: 2,
            }],
        })
    }

    /// A program whose main assigns `expr` to int variable `x`.
    fn program_assigning(ids: &mut NodeIdGen, decls: Vec<Decl>, value: Expr) -> Program {
        let mut all_decls = vec![int_var_decl("x", false)];
        all_decls.extend(decls);
        Program {
            name: "P".into(),
            line: 1,
            decls: all_decls,
            methods: vec![MethodDecl {
                id: ids.next_id(),
                name: "main".into(),
                return_type: None,
                params: vec![],
                locals: vec![],
                body: vec![Stmt::Assign {
                    target: Designator::ident(ids, 5, "x"),
                    value,
                    line: 5,
                }],
                line: 4,
            }],
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
    fn addition_requires_int_operands() {
        let mut ids = NodeIdGen::new();
        let lhs = int_lit(&mut ids, 1);
        let rhs = char_lit(&mut ids, 'a');
        let value = binary(&mut ids, BinOp::Add, lhs, rhs);
        let program = program_assigning(&mut ids, vec![], value);
        assert_eq!(errors(&program), vec![SemanticError::InvalidAddOperands]);
    }

    #[test]
    fn error_operand_suppresses_cascades() {
        // (1 + 'a') * 2 reports the addition once; the multiplication and
        // the assignment stay silent.
        let mut ids = NodeIdGen::new();
        let lhs = int_lit(&mut ids, 1);
        let rhs = char_lit(&mut ids, 'a');
        let bad = binary(&mut ids, BinOp::Add, lhs, rhs);
        let two = int_lit(&mut ids, 2);
        let value = binary(&mut ids, BinOp::Mul, bad, two);
        let program = program_assigning(&mut ids, vec![], value);
        assert_eq!(errors(&program), vec![SemanticError::InvalidAddOperands]);
    }

    #[test]
    fn undeclared_identifier_reports_once() {
        let mut ids = NodeIdGen::new();
        let lhs = var(&mut ids, "missing");
        let rhs = int_lit(&mut ids, 1);
        let value = binary(&mut ids, BinOp::Add, lhs, rhs);
        let program = program_assigning(&mut ids, vec![], value);
        assert_eq!(
            errors(&program),
            vec![SemanticError::Undeclared {
                name: "missing".into()
            }]
        );
    }

    #[test]
    fn unary_minus_requires_int() {
        let mut ids = NodeIdGen::new();
        let inner = char_lit(&mut ids, 'a');
        let value = Expr::new(&mut ids, 5, ExprKind::Neg(Box::new(inner)));
        let program = program_assigning(&mut ids, vec![], value);
        assert_eq!(errors(&program), vec![SemanticError::InvalidNegOperand]);
    }

    #[test]
    fn indexing_non_array_is_reported() {
        let mut ids = NodeIdGen::new();
        let base = Designator::ident(&mut ids, 5, "x");
        let index = int_lit(&mut ids, 0);
        let target = Designator::index(&mut ids, 5, base, index);
        let value = Expr::new(&mut ids, 5, ExprKind::Designator(target));
        let program = program_assigning(&mut ids, vec![], value);
        assert_eq!(errors(&program), vec![SemanticError::IndexingNonArray]);
    }

    #[test]
    fn array_indexing_yields_element_type() {
        let mut ids = NodeIdGen::new();
        let base = Designator::ident(&mut ids, 5, "a");
        let index = int_lit(&mut ids, 0);
        let element = Designator::index(&mut ids, 5, base, index);
        let value = Expr::new(&mut ids, 5, ExprKind::Designator(element));
        let value_id = value.id;
        let program = program_assigning(&mut ids, vec![int_var_decl("a", true)], value);
        let analysis = analyze(&program);
        assert!(analysis.is_clean(), "{:?}", analysis.diagnostics);
        assert_eq!(analysis.type_of(value_id), Some(&Type::Int));
    }

    #[test]
    fn allocation_length_must_be_int() {
        let mut ids = NodeIdGen::new();
        let length = char_lit(&mut ids, 'a');
        let value = Expr::new(
            &mut ids,
            5,
            ExprKind::New {
                ty: TypeRef {
                    name: "int".into(),
                    line: 5,
                },
                length: Some(Box::new(length)),
            },
        );
        let program = program_assigning(&mut ids, vec![], value);
        // The allocation itself types as Arr of int, so the assignment
        // to int also mismatches.
        assert_eq!(
            errors(&program),
            vec![
                SemanticError::AllocationSizeNotInt,
                SemanticError::AssignTypeMismatch {
                    expected: "int".into(),
                    found: "Arr of int".into()
                }
            ]
        );
    }

    #[test]
    fn builtin_len_accepts_any_array_and_chr_checks_its_arg() {
        let mut ids = NodeIdGen::new();
        let arr_arg = var(&mut ids, "a");
        let len_callee = Designator::ident(&mut ids, 5, "len");
        let len_call = Expr::new(
            &mut ids,
            5,
            ExprKind::Call {
                callee: len_callee,
                args: vec![arr_arg],
            },
        );
        let program = program_assigning(&mut ids, vec![int_var_decl("a", true)], len_call);
        assert_eq!(errors(&program), vec![]);

        let mut ids = NodeIdGen::new();
        let chr_callee = Designator::ident(&mut ids, 5, "chr");
        let chr_arg = char_lit(&mut ids, 'a');
        let chr_call = Expr::new(
            &mut ids,
            5,
            ExprKind::Call {
                callee: chr_callee,
                args: vec![chr_arg],
            },
        );
        let program = program_assigning(&mut ids, vec![], chr_call);
        assert_eq!(
            errors(&program),
            vec![
                SemanticError::ParamTypeMismatch {
                    name: "chr".into(),
                    position: 1,
                    expected: "int".into(),
                    found: "char".into()
                },
                SemanticError::AssignTypeMismatch {
                    expected: "int".into(),
                    found: "char".into()
                }
            ]
        );
    }

    #[test]
    fn argument_count_mismatch_skips_position_checks() {
        let mut ids = NodeIdGen::new();
        let callee = Designator::ident(&mut ids, 5, "ord");
        let call = Expr::new(
            &mut ids,
            5,
            ExprKind::Call {
                callee,
                args: vec![],
            },
        );
        let program = program_assigning(&mut ids, vec![], call);
        // No per-position diagnostics; only the result type is used.
        assert_eq!(errors(&program), vec![]);
    }

    #[test]
    fn relational_operands_must_be_compatible() {
        let mut ids = NodeIdGen::new();
        let lhs = int_lit(&mut ids, 1);
        let rhs = char_lit(&mut ids, 'a');
        let program = if_program(&mut ids, CondFactKind::Rel {
            lhs,
            op: RelOp::Lt,
            rhs,
        });
        assert_eq!(
            errors(&program),
            vec![SemanticError::IncompatibleRelOperands]
        );
    }

    #[test]
    fn ordering_on_arrays_is_rejected() {
        let mut ids = NodeIdGen::new();
        let lhs = var(&mut ids, "a");
        let rhs = var(&mut ids, "a");
        let mut program = if_program(&mut ids, CondFactKind::Rel {
            lhs,
            op: RelOp::Lt,
            rhs,
        });
        program.decls.push(int_var_decl("a", true));
        assert_eq!(
            errors(&program),
            vec![SemanticError::OrderingOnReferenceType]
        );
    }

    #[test]
    fn equality_on_arrays_is_allowed() {
        let mut ids = NodeIdGen::new();
        let lhs = var(&mut ids, "a");
        let rhs = var(&mut ids, "a");
        let mut program = if_program(&mut ids, CondFactKind::Rel {
            lhs,
            op: RelOp::Eq,
            rhs,
        });
        program.decls.push(int_var_decl("a", true));
        assert_eq!(errors(&program), vec![]);
    }

    #[test]
    fn bare_condition_factor_must_be_bool() {
        let mut ids = NodeIdGen::new();
        let factor = CondFactKind::Expr(int_lit(&mut ids, 1));
        let program = if_program(&mut ids, factor);
        assert_eq!(errors(&program), vec![SemanticError::InvalidConditionType]);
    }

    #[test]
    fn or_operands_must_be_bool() {
        // 1 < 2 || 3: the second term is an int, so the disjunction
        // reports; the folded Error then stays silent.
        let mut ids = NodeIdGen::new();
        let lhs = int_lit(&mut ids, 1);
        let rhs = int_lit(&mut ids, 2);
        let bare = int_lit(&mut ids, 3);
        let cond = Condition {
            terms: vec![
                CondTerm {
                    factors: vec![CondFact {
                        line: 5,
                        kind: CondFactKind::Rel {
                            lhs,
                            op: RelOp::Lt,
                            rhs,
                        },
                    }],
                },
                CondTerm {
                    factors: vec![CondFact {
                        line: 5,
                        kind: CondFactKind::Expr(bare),
                    }],
                },
            ],
            line: 5,
        };
        let program = if_cond_program(&mut ids, cond);
        assert_eq!(errors(&program), vec![SemanticError::InvalidOrOperands]);
    }

    #[test]
    fn and_operands_must_be_bool() {
        // 1 < 2 && 3.
        let mut ids = NodeIdGen::new();
        let lhs = int_lit(&mut ids, 1);
        let rhs = int_lit(&mut ids, 2);
        let bare = int_lit(&mut ids, 3);
        let cond = Condition {
            terms: vec![CondTerm {
                factors: vec![
                    CondFact {
                        line: 5,
                        kind: CondFactKind::Rel {
                            lhs,
                            op: RelOp::Lt,
                            rhs,
                        },
                    },
                    CondFact {
                        line: 5,
                        kind: CondFactKind::Expr(bare),
                    },
                ],
            }],
            line: 5,
        };
        let program = if_cond_program(&mut ids, cond);
        assert_eq!(errors(&program), vec![SemanticError::InvalidAndOperands]);
    }

    #[test]
    fn error_term_suppresses_the_or_fold() {
        // missing || 1 < 2: only the undeclared name reports.
        let mut ids = NodeIdGen::new();
        let bad = var(&mut ids, "missing");
        let lhs = int_lit(&mut ids, 1);
        let rhs = int_lit(&mut ids, 2);
        let cond = Condition {
            terms: vec![
                CondTerm {
                    factors: vec![CondFact {
                        line: 5,
                        kind: CondFactKind::Expr(bad),
                    }],
                },
                CondTerm {
                    factors: vec![CondFact {
                        line: 5,
                        kind: CondFactKind::Rel {
                            lhs,
                            op: RelOp::Lt,
                            rhs,
                        },
                    }],
                },
            ],
            line: 5,
        };
        let program = if_cond_program(&mut ids, cond);
        assert_eq!(
            errors(&program),
            vec![SemanticError::Undeclared {
                name: "missing".into()
            }]
        );
    }

    /// A program whose main runs `if (<factor>) x = 1;`.
    fn if_program(ids: &mut NodeIdGen, factor: CondFactKind) -> Program {
        let cond = Condition {
            terms: vec![CondTerm {
                factors: vec![CondFact {
                    line: 5,
                    kind: factor,
                }],
            }],
            line: 5,
        };
        if_cond_program(ids, cond)
    }

    /// A program whose main runs `if (<cond>) x = 1;`.
    fn if_cond_program(ids: &mut NodeIdGen, cond: Condition) -> Program {
        let assign = Stmt::Assign {
            target: Designator::ident(ids, 6, "x"),
            value: int_lit(ids, 1),
            line: 6,
        };
        Program {
            name: "P".into(),
            line: 1,
            decls: vec![int_var_decl("x", false)],
            methods: vec![MethodDecl {
                id: ids.next_id(),
                name: "main".into(),
                return_type: None,
                params: vec![],
                locals: vec![],
                body: vec![Stmt::If {
                    cond,
                    then_branch: Box::new(assign),
                    else_branch: None,
                    line: 5,
                }],
                line: 4,
            }],
        }
    }
}
