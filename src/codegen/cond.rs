//! Condition generation with short-circuit branch lists.
//!
//! A condition is compiled without materializing a boolean: every factor
//! appends a "false" branch to `neg`, and each `||` boundary appends a
//! "true" branch to `pos` before retargeting the accumulated `neg` labels
//! at the next term. The caller decides where the two lists finally land
//! (then/else branch, loop back-edge, loop exit).

use crate::ast::{CondFact, CondFactKind, Condition, RelOp};
use crate::bytecode::{JumpLabel, OpCode};

use super::{CodeGenerator, FlowCtx};

impl CodeGenerator<'_> {
    pub(super) fn condition(
        &mut self,
        condition: &Condition,
        neg: &mut Vec<JumpLabel>,
        pos: &mut Vec<JumpLabel>,
        ctx: &mut FlowCtx,
    ) {
        for (index, term) in condition.terms.iter().enumerate() {
            for factor in &term.factors {
                self.cond_fact(factor, neg, ctx);
            }
            let last = index + 1 == condition.terms.len();
            if !last {
                // All factors held: the whole condition is true.
                pos.push(self.code.emit_jump(OpCode::Jmp));
                // A failed factor retries the next term here.
                for label in neg.drain(..) {
                    self.code.fixup(label);
                }
            }
        }
    }

    fn cond_fact(&mut self, factor: &CondFact, neg: &mut Vec<JumpLabel>, ctx: &mut FlowCtx) {
        match &factor.kind {
            CondFactKind::Rel { lhs, op, rhs } => {
                self.expr(lhs, ctx);
                self.expr(rhs, ctx);
                neg.push(self.code.emit_false_jump(*op));
            }
            CondFactKind::Expr(expr) => {
                // A bare boolean is true when non-zero.
                self.expr(expr, ctx);
                self.code.load_const(0);
                neg.push(self.code.emit_false_jump(RelOp::Ne));
            }
        }
    }
}
