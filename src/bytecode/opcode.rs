//! The virtual machine instruction set.
//!
//! All instructions operate on a single expression stack of 32-bit words.
//! Opcodes are one byte; operands are big-endian and either 1, 2, or 4
//! bytes wide. Branch and call operands are signed displacements relative
//! to the address of the opcode byte. Discriminants start at 1 so a zeroed
//! byte never decodes as an instruction.

/// A bytecode instruction opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // Constants
    /// Push a 4-byte constant.
    Const = 1,
    ConstM1,
    Const0,
    Const1,
    Const2,
    Const3,
    Const4,
    Const5,

    // Local and global variables
    /// Push local slot *b*.
    Load,
    Load0,
    Load1,
    Load2,
    Load3,
    /// Pop into local slot *b*.
    Store,
    Store0,
    Store1,
    Store2,
    Store3,
    /// Push global slot *s*.
    GetStatic,
    /// Pop into global slot *s*.
    PutStatic,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,

    // Objects and arrays
    /// Allocate an object of *s* fields.
    New,
    /// Pop a length and allocate an array; the 1-byte operand is the
    /// element stride tag (1 for word elements, 0 for byte elements).
    NewArray,
    /// Push `arr[i]` (word element).
    ALoad,
    /// Pop a value into `arr[i]` (word element).
    AStore,
    /// Push `arr[i]` (byte element).
    BALoad,
    /// Pop a value into `arr[i]` (byte element).
    BAStore,
    /// Replace an array reference by its length.
    ArrayLength,

    // Stack
    Pop,
    Dup,
    /// Duplicate the top two words, preserving order.
    Dup2,

    // Control flow
    Jmp,
    /// Pop two words and branch if the comparison holds.
    Jeq,
    Jne,
    Jlt,
    Jle,
    Jgt,
    Jge,

    // Methods
    /// Call the method at the pc-relative displacement.
    Call,
    Return,
    /// Open a frame: *b1* formals, *b2* total slots. The VM moves the
    /// topmost *b1* words into the new frame's first slots.
    Enter,
    Exit,
    /// Abort execution with error code *b*.
    Trap,

    // I/O
    /// Read an integer word from standard input.
    Read,
    /// Print the word below the top, padded to the width on top.
    Print,
    /// Read a single character.
    BRead,
    /// Print a single character, padded.
    BPrint,
}

impl OpCode {
    /// Decode a byte, if it names an instruction.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        if byte >= OpCode::Const as u8 && byte <= OpCode::BPrint as u8 {
            // Safety: OpCode is repr(u8) with contiguous discriminants
            // from Const to BPrint, and `byte` is within that range.
            Some(unsafe { std::mem::transmute::<u8, OpCode>(byte) })
        } else {
            None
        }
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_size(self) -> usize {
        match self {
            OpCode::Const => 4,
            OpCode::GetStatic
            | OpCode::PutStatic
            | OpCode::New
            | OpCode::Jmp
            | OpCode::Jeq
            | OpCode::Jne
            | OpCode::Jlt
            | OpCode::Jle
            | OpCode::Jgt
            | OpCode::Jge
            | OpCode::Call
            | OpCode::Enter => 2,
            OpCode::Load | OpCode::Store | OpCode::NewArray | OpCode::Trap => 1,
            _ => 0,
        }
    }

    /// Mnemonic for disassembly and test output.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Const => "const",
            OpCode::ConstM1 => "const_m1",
            OpCode::Const0 => "const_0",
            OpCode::Const1 => "const_1",
            OpCode::Const2 => "const_2",
            OpCode::Const3 => "const_3",
            OpCode::Const4 => "const_4",
            OpCode::Const5 => "const_5",
            OpCode::Load => "load",
            OpCode::Load0 => "load_0",
            OpCode::Load1 => "load_1",
            OpCode::Load2 => "load_2",
            OpCode::Load3 => "load_3",
            OpCode::Store => "store",
            OpCode::Store0 => "store_0",
            OpCode::Store1 => "store_1",
            OpCode::Store2 => "store_2",
            OpCode::Store3 => "store_3",
            OpCode::GetStatic => "getstatic",
            OpCode::PutStatic => "putstatic",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Rem => "rem",
            OpCode::Neg => "neg",
            OpCode::New => "new",
            OpCode::NewArray => "newarray",
            OpCode::ALoad => "aload",
            OpCode::AStore => "astore",
            OpCode::BALoad => "baload",
            OpCode::BAStore => "bastore",
            OpCode::ArrayLength => "arraylength",
            OpCode::Pop => "pop",
            OpCode::Dup => "dup",
            OpCode::Dup2 => "dup2",
            OpCode::Jmp => "jmp",
            OpCode::Jeq => "jeq",
            OpCode::Jne => "jne",
            OpCode::Jlt => "jlt",
            OpCode::Jle => "jle",
            OpCode::Jgt => "jgt",
            OpCode::Jge => "jge",
            OpCode::Call => "call",
            OpCode::Return => "return",
            OpCode::Enter => "enter",
            OpCode::Exit => "exit",
            OpCode::Trap => "trap",
            OpCode::Read => "read",
            OpCode::Print => "print",
            OpCode::BRead => "bread",
            OpCode::BPrint => "bprint",
        }
    }
}
