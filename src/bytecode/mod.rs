//! Bytecode representation: the instruction set and the emission buffer.

mod code;
mod opcode;

pub use code::{CodeBuffer, JumpLabel};
pub use opcode::OpCode;
