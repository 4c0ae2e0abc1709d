//! Statement analysis.

use crate::ast::Stmt;
use crate::error::SemanticError;
use crate::types::Type;

use super::{Analyzer, StmtCtx};

impl Analyzer {
    pub(super) fn stmt(&mut self, stmt: &Stmt, ctx: &mut StmtCtx) {
        match stmt {
            Stmt::Assign {
                target,
                value,
                line,
            } => {
                let target_sym = self.designator(target, ctx);
                let target_ty = self.scopes.symbol(target_sym).ty.clone();
                let value_ty = self.expr(value, ctx);
                if !self.is_assignable(target) {
                    self.report(*line, SemanticError::NotAssignable);
                }
                if target_ty.is_error() || value_ty.is_error() {
                    return;
                }
                if target_ty != value_ty {
                    self.report(
                        *line,
                        SemanticError::AssignTypeMismatch {
                            expected: target_ty.to_string(),
                            found: value_ty.to_string(),
                        },
                    );
                }
            }

            Stmt::Inc { target, line } => {
                self.inc_dec(target, *line, ctx, true);
            }
            Stmt::Dec { target, line } => {
                self.inc_dec(target, *line, ctx, false);
            }

            Stmt::Call { callee, args, line } => {
                self.designator(callee, ctx);
                let arg_types: Vec<Type> =
                    args.iter().map(|arg| self.expr(arg, ctx)).collect();
                self.check_call(callee, &arg_types, *line);
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.condition(cond, ctx);
                self.stmt(then_branch, &mut ctx.reborrow());
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch, &mut ctx.reborrow());
                }
            }

            Stmt::DoWhile { body, cond, .. } => {
                {
                    let mut child = StmtCtx {
                        ret: ctx.ret,
                        loop_depth: ctx.loop_depth + 1,
                        switch: ctx.switch.as_deref_mut(),
                    };
                    self.stmt(body, &mut child);
                }
                self.condition(cond, ctx);
            }

            Stmt::Break { line } => {
                if ctx.loop_depth == 0 {
                    self.report(*line, SemanticError::BreakOutsideLoop);
                }
            }
            Stmt::Continue { line } => {
                if ctx.loop_depth == 0 {
                    self.report(*line, SemanticError::ContinueOutsideLoop);
                }
            }

            Stmt::Return { value, line } => match value {
                Some(value) => {
                    let value_ty = self.expr(value, ctx);
                    if !value_ty.is_error() && value_ty != *ctx.ret {
                        self.report(*line, SemanticError::ReturnTypeMismatch);
                    }
                }
                None => {
                    if *ctx.ret != Type::None {
                        self.report(*line, SemanticError::EmptyReturnInNonVoid);
                    }
                }
            },

            Stmt::Read { target, line } => {
                let sym = self.designator(target, ctx);
                let ty = self.scopes.symbol(sym).ty.clone();
                if !ty.is_builtin() && !ty.is_error() {
                    self.report(*line, SemanticError::ReadArgNotBuiltin);
                }
                if !self.is_assignable(target) {
                    self.report(*line, SemanticError::ReadArgNotAssignable);
                }
            }

            Stmt::Print { value, line, .. } => {
                let ty = self.expr(value, ctx);
                if !ty.is_builtin() && !ty.is_error() {
                    self.report(*line, SemanticError::PrintArgNotBuiltin);
                }
            }

            Stmt::Yield { value, line } => {
                let ty = self.expr(value, ctx);
                match &mut ctx.switch {
                    Some(frame) => frame.yields.push(ty),
                    None => self.report(*line, SemanticError::YieldOutsideSwitch),
                }
            }

            Stmt::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt, &mut ctx.reborrow());
                }
            }
        }
    }

    fn inc_dec(
        &mut self,
        target: &crate::ast::Designator,
        line: u32,
        ctx: &mut StmtCtx,
        is_inc: bool,
    ) {
        let sym = self.designator(target, ctx);
        let ty = self.scopes.symbol(sym).ty.clone();
        if !self.is_assignable(target) {
            self.report(
                line,
                if is_inc {
                    SemanticError::IncNotAssignable
                } else {
                    SemanticError::DecNotAssignable
                },
            );
        }
        if ty != Type::Int && !ty.is_error() {
            self.report(
                line,
                if is_inc {
                    SemanticError::IncNotInt
                } else {
                    SemanticError::DecNotInt
                },
            );
        }
    }
}
