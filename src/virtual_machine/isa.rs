//! Instruction set definitions.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! mnemonic table and invokes a callback macro for code generation, so the
//! assembler and the static ISA checks read the same list.
//!
//! This module generates:
//! - The payload-free [`Opcode`] enum with mnemonic lookup
//! - [`OperandKind`] describing the operand each mnemonic consumes
//!
//! [`Instruction`] is the decoded form stored in a
//! [`Program`](super::program::Program): each variant carries only the
//! payload it needs.

use std::fmt;

/// Invokes a callback macro with the complete opcode definition list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Stack
            // =========================
            /// push <int> ; push a signed 32-bit literal
            Push, "push" => Int,
            /// pop ; discard the top value
            Pop, "pop" => None,
            // =========================
            // Integer arithmetic
            // =========================
            /// add ; a = pop, b = pop, push a + b
            Add, "add" => None,
            /// sub ; a = pop, b = pop, push a - b
            Sub, "sub" => None,
            /// mul ; a = pop, b = pop, push a * b
            Mul, "mul" => None,
            /// div ; a = pop, b = pop, push a / b (trap on b == 0)
            Div, "div" => None,
            /// mod ; a = pop, b = pop, push a % b (trap on b == 0)
            Mod, "mod" => None,
            // =========================
            // Output and control flow
            // =========================
            /// print ; write the top value without removing it
            Print, "print" => None,
            /// jmp <label> ; continue at the label
            Jump, "jmp" => Label,
            /// exit ; stop execution
            Exit, "exit" => None,
        }
    };
}

/// Operand consumed by a mnemonic.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    /// No operand.
    None,
    /// Decimal `i32` literal.
    Int,
    /// Label name.
    Label,
}

impl OperandKind {
    /// Operand description used in assembler diagnostics.
    pub const fn describe(&self) -> &'static str {
        match self {
            OperandKind::None => "no operand",
            OperandKind::Int => "an integer operand",
            OperandKind::Label => "a label operand",
        }
    }
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident, $mnemonic:literal => $kind:ident
        ),* $(,)?
    ) => {
        /// Instruction kind without its operand.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// Every opcode in table order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            /// Looks up an opcode by its assembly mnemonic (case-sensitive).
            pub fn from_mnemonic(name: &str) -> Option<Self> {
                match name {
                    $( $mnemonic => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the operand this opcode expects in source.
            pub const fn operand(&self) -> OperandKind {
                match self {
                    $( Opcode::$name => OperandKind::$kind, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

/// A decoded instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    Push(i32),
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Print,
    /// Jump to a label, looked up in the program's label table when executed.
    Jump(String),
    Exit,
}

impl Instruction {
    pub const fn opcode(&self) -> Opcode {
        match self {
            Instruction::Push(_) => Opcode::Push,
            Instruction::Pop => Opcode::Pop,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::Mul => Opcode::Mul,
            Instruction::Div => Opcode::Div,
            Instruction::Mod => Opcode::Mod,
            Instruction::Print => Opcode::Print,
            Instruction::Jump(_) => Opcode::Jump,
            Instruction::Exit => Opcode::Exit,
        }
    }

    pub const fn mnemonic(&self) -> &'static str {
        self.opcode().mnemonic()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(value) => write!(f, "{} {value}", self.mnemonic()),
            Instruction::Jump(target) => write!(f, "{} {target}", self.mnemonic()),
            other => f.write_str(other.mnemonic()),
        }
    }
}
