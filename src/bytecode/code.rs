//! The flat bytecode buffer and its emission helpers.
//!
//! [`CodeBuffer`] grows append-only; `pc()` is always the offset of the
//! next byte. Forward branches are emitted with a placeholder operand and
//! a [`JumpLabel`] remembering where the operand lives; once the target
//! address is known, [`CodeBuffer::fixup`] overwrites the placeholder with
//! the displacement. Backward branches know their target up front and go
//! through [`CodeBuffer::put_jump`].
//!
//! All displacements are relative to the *opcode* byte of the branch, and
//! all multi-byte operands are big-endian.

use crate::ast::RelOp;
use crate::bytecode::OpCode;

/// Position of a 2-byte branch operand awaiting [`CodeBuffer::fixup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLabel(usize);

impl JumpLabel {
    /// Byte offset of the operand within the buffer.
    pub fn offset(self) -> usize {
        self.0
    }
}

/// An append-only bytecode buffer.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    code: Vec<u8>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the next byte to be emitted.
    pub fn pc(&self) -> usize {
        self.code.len()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.code
    }

    // ========================================================================
    // Emission
    // ========================================================================

    pub fn put(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    pub fn put1(&mut self, byte: u8) {
        self.code.push(byte);
    }

    pub fn put2(&mut self, value: i16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put4(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Push a constant, preferring the one-byte encodings.
    pub fn load_const(&mut self, value: i32) {
        match value {
            -1 => self.put(OpCode::ConstM1),
            0 => self.put(OpCode::Const0),
            1 => self.put(OpCode::Const1),
            2 => self.put(OpCode::Const2),
            3 => self.put(OpCode::Const3),
            4 => self.put(OpCode::Const4),
            5 => self.put(OpCode::Const5),
            _ => {
                self.put(OpCode::Const);
                self.put4(value);
            }
        }
    }

    /// Push local slot `slot`, using the implicit-operand forms for 0..=3.
    pub fn load_local(&mut self, slot: u32) {
        match slot {
            0 => self.put(OpCode::Load0),
            1 => self.put(OpCode::Load1),
            2 => self.put(OpCode::Load2),
            3 => self.put(OpCode::Load3),
            _ => {
                self.put(OpCode::Load);
                self.put1(slot as u8);
            }
        }
    }

    /// Pop into local slot `slot`, using the implicit-operand forms for 0..=3.
    pub fn store_local(&mut self, slot: u32) {
        match slot {
            0 => self.put(OpCode::Store0),
            1 => self.put(OpCode::Store1),
            2 => self.put(OpCode::Store2),
            3 => self.put(OpCode::Store3),
            _ => {
                self.put(OpCode::Store);
                self.put1(slot as u8);
            }
        }
    }

    // ========================================================================
    // Branches
    // ========================================================================

    /// Emit a branch with a placeholder operand, to be patched later.
    pub fn emit_jump(&mut self, op: OpCode) -> JumpLabel {
        self.put(op);
        let label = JumpLabel(self.pc());
        self.put2(0);
        label
    }

    /// Emit the branch taken when `op` does *not* hold: the comparison is
    /// inverted so straight-line code continues on success.
    pub fn emit_false_jump(&mut self, op: RelOp) -> JumpLabel {
        self.emit_jump(Self::cond_jump(op.inverse()))
    }

    /// Emit an unconditional branch to a known (backward) target.
    pub fn put_jump(&mut self, target: usize) {
        let displacement = target as i64 - self.pc() as i64;
        self.put(OpCode::Jmp);
        self.put2(Self::narrow(displacement));
    }

    /// Emit a call to a known method entry point.
    pub fn put_call(&mut self, target: usize) {
        let displacement = target as i64 - self.pc() as i64;
        self.put(OpCode::Call);
        self.put2(Self::narrow(displacement));
    }

    /// Patch `label`'s placeholder so the branch lands on the current pc.
    pub fn fixup(&mut self, label: JumpLabel) {
        // Displacement is relative to the opcode byte, one before the operand.
        let displacement = Self::narrow(self.pc() as i64 - label.0 as i64 + 1);
        self.code[label.0..label.0 + 2].copy_from_slice(&displacement.to_be_bytes());
    }

    /// The conditional branch taken when `op` holds.
    pub fn cond_jump(op: RelOp) -> OpCode {
        match op {
            RelOp::Eq => OpCode::Jeq,
            RelOp::Ne => OpCode::Jne,
            RelOp::Lt => OpCode::Jlt,
            RelOp::Le => OpCode::Jle,
            RelOp::Gt => OpCode::Jgt,
            RelOp::Ge => OpCode::Jge,
        }
    }

    fn narrow(displacement: i64) -> i16 {
        assert!(
            i16::try_from(displacement).is_ok(),
            "branch displacement {displacement} exceeds 16 bits"
        );
        displacement as i16
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Decode the opcode at `pc`.
    pub fn op_at(&self, pc: usize) -> Option<OpCode> {
        self.code.get(pc).copied().and_then(OpCode::from_u8)
    }

    pub fn byte_at(&self, pc: usize) -> u8 {
        self.code[pc]
    }

    /// The big-endian 2-byte operand starting at `pc`.
    pub fn i16_at(&self, pc: usize) -> i16 {
        i16::from_be_bytes([self.code[pc], self.code[pc + 1]])
    }

    /// The big-endian 4-byte operand starting at `pc`.
    pub fn i32_at(&self, pc: usize) -> i32 {
        i32::from_be_bytes([
            self.code[pc],
            self.code[pc + 1],
            self.code[pc + 2],
            self.code[pc + 3],
        ])
    }

    /// Decode the opcode sequence from `start` to the end of the buffer,
    /// skipping operands. Panics on an undecodable byte.
    pub fn opcodes_from(&self, start: usize) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut pc = start;
        while pc < self.code.len() {
            let op = match OpCode::from_u8(self.code[pc]) {
                Some(op) => op,
                None => panic!("invalid opcode byte {:#04x} at pc {}", self.code[pc], pc),
            };
            ops.push(op);
            pc += 1 + op.operand_size();
        }
        ops
    }

    /// Decode the whole buffer's opcode sequence.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.opcodes_from(0)
    }

    /// Assert the buffer decodes to exactly `expected` from `start`.
    #[track_caller]
    pub fn assert_opcodes(&self, start: usize, expected: &[OpCode]) {
        let actual = self.opcodes_from(start);
        assert_eq!(
            actual, expected,
            "opcode mismatch from pc {start}: {actual:?} != {expected:?}"
        );
    }
}
