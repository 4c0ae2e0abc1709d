//! Statement and control-flow generation.

use crate::ast::{CaseLabel, Designator, DesignatorKind, Expr, RelOp, Stmt, SwitchCase};
use crate::bytecode::{JumpLabel, OpCode};
use crate::types::Type;

use super::{CodeGenerator, FlowCtx, LoopLabels};

impl CodeGenerator<'_> {
    pub(super) fn stmt(&mut self, stmt: &Stmt, ctx: &mut FlowCtx) {
        match stmt {
            Stmt::Assign { target, value, .. } => match &target.kind {
                DesignatorKind::Ident(_) => {
                    self.expr(value, ctx);
                    let sym = self.sym_of(target.id).clone();
                    self.store(&sym);
                }
                DesignatorKind::Index { base, index } => {
                    // Element stores expect array, index, value.
                    self.designator_value(base, ctx);
                    self.expr(index, ctx);
                    self.expr(value, ctx);
                    let sym = self.sym_of(target.id).clone();
                    self.store(&sym);
                }
            },

            Stmt::Inc { target, .. } => self.inc_dec(target, OpCode::Add, ctx),
            Stmt::Dec { target, .. } => self.inc_dec(target, OpCode::Sub, ctx),

            Stmt::Call { callee, args, .. } => {
                for arg in args {
                    self.expr(arg, ctx);
                }
                let (name, ret) = {
                    let sym = self.sym_of(callee.id);
                    (sym.name.clone(), sym.ty.clone())
                };
                self.call(&name);
                if ret != Type::None {
                    self.code.put(OpCode::Pop);
                }
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let mut neg = Vec::new();
                let mut pos = Vec::new();
                self.condition(cond, &mut neg, &mut pos, ctx);
                // True branches of earlier terms land on the then branch.
                for label in pos.drain(..) {
                    self.code.fixup(label);
                }
                self.stmt(then_branch, &mut ctx.reborrow());
                match else_branch {
                    Some(else_branch) => {
                        let skip_else = self.code.emit_jump(OpCode::Jmp);
                        for label in neg.drain(..) {
                            self.code.fixup(label);
                        }
                        self.stmt(else_branch, &mut ctx.reborrow());
                        self.code.fixup(skip_else);
                    }
                    None => {
                        for label in neg.drain(..) {
                            self.code.fixup(label);
                        }
                    }
                }
            }

            Stmt::DoWhile { body, cond, .. } => {
                let body_start = self.code.pc();
                let mut labels = LoopLabels::default();
                {
                    let mut child = FlowCtx {
                        loop_labels: Some(&mut labels),
                        yields: ctx.yields.as_deref_mut(),
                    };
                    self.stmt(body, &mut child);
                }
                // continue re-tests the condition.
                for label in labels.continues.drain(..) {
                    self.code.fixup(label);
                }
                let mut neg = Vec::new();
                let mut pos = Vec::new();
                self.condition(cond, &mut neg, &mut pos, ctx);
                for label in pos.drain(..) {
                    self.code.fixup(label);
                }
                self.code.put_jump(body_start);
                for label in labels.breaks.drain(..) {
                    self.code.fixup(label);
                }
                for label in neg.drain(..) {
                    self.code.fixup(label);
                }
            }

            Stmt::Break { .. } => match &mut ctx.loop_labels {
                Some(labels) => {
                    let label = self.code.emit_jump(OpCode::Jmp);
                    labels.breaks.push(label);
                }
                None => unreachable!("break outside a loop survived analysis"),
            },
            Stmt::Continue { .. } => match &mut ctx.loop_labels {
                Some(labels) => {
                    let label = self.code.emit_jump(OpCode::Jmp);
                    labels.continues.push(label);
                }
                None => unreachable!("continue outside a loop survived analysis"),
            },

            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.expr(value, ctx);
                }
                self.code.put(OpCode::Exit);
                self.code.put(OpCode::Return);
            }

            Stmt::Read { target, .. } => {
                let sym = self.sym_of(target.id).clone();
                if let DesignatorKind::Index { base, index } = &target.kind {
                    self.designator_value(base, ctx);
                    self.expr(index, ctx);
                }
                self.code.put(if sym.ty == Type::Char {
                    OpCode::BRead
                } else {
                    OpCode::Read
                });
                self.store(&sym);
            }

            Stmt::Print { value, width, .. } => {
                self.expr(value, ctx);
                let is_char = *self.type_of(value.id) == Type::Char;
                let width = width.unwrap_or(if is_char { 1 } else { 5 });
                self.code.load_const(width);
                self.code.put(if is_char {
                    OpCode::BPrint
                } else {
                    OpCode::Print
                });
            }

            Stmt::Yield { value, .. } => {
                self.expr(value, ctx);
                match &mut ctx.yields {
                    Some(yields) => {
                        let label = self.code.emit_jump(OpCode::Jmp);
                        yields.push(label);
                    }
                    None => unreachable!("yield outside a switch survived analysis"),
                }
            }

            Stmt::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt, &mut ctx.reborrow());
                }
            }
        }
    }

    /// `++`/`--`. Element targets duplicate the array/index pair instead of
    /// re-evaluating the index expression.
    fn inc_dec(&mut self, target: &Designator, op: OpCode, ctx: &mut FlowCtx) {
        let sym = self.sym_of(target.id).clone();
        match &target.kind {
            DesignatorKind::Ident(_) => {
                self.load(&sym);
                self.code.load_const(1);
                self.code.put(op);
                self.store(&sym);
            }
            DesignatorKind::Index { base, index } => {
                self.designator_value(base, ctx);
                self.expr(index, ctx);
                self.code.put(OpCode::Dup2);
                self.code.put(Self::array_load(&sym.ty));
                self.code.load_const(1);
                self.code.put(op);
                self.store(&sym);
            }
        }
    }

    /// A switch expression: the selector stays on the stack while the case
    /// comparisons run; the matching branch pops it and its yield carries
    /// the result to the common exit.
    pub(super) fn switch(&mut self, selector: &Expr, cases: &[SwitchCase], ctx: &mut FlowCtx) {
        self.expr(selector, ctx);
        let mut yields: Vec<JumpLabel> = Vec::new();
        let mut open_case: Option<JumpLabel> = None;

        for case in cases {
            // A failed comparison falls through to the next case.
            if let Some(label) = open_case.take() {
                self.code.fixup(label);
            }
            match case.label {
                CaseLabel::Value(value) => {
                    self.code.put(OpCode::Dup);
                    self.code.load_const(value);
                    open_case = Some(self.code.emit_false_jump(RelOp::Eq));
                    self.code.put(OpCode::Pop);
                }
                CaseLabel::Default => self.code.put(OpCode::Pop),
            }
            let mut child = FlowCtx {
                loop_labels: ctx.loop_labels.as_deref_mut(),
                yields: Some(&mut yields),
            };
            for stmt in &case.body {
                self.stmt(stmt, &mut child);
            }
        }

        // A trailing non-default case still needs its exit.
        if let Some(label) = open_case {
            self.code.fixup(label);
        }
        for label in yields {
            self.code.fixup(label);
        }
    }
}
