//! Stack-based bytecode virtual machine.
//!
//! Program text is assembled into a [`program::Program`] and executed by a
//! [`vm::VM`] against an operand stack of signed 32-bit integers.
//!
//! # Architecture
//!
//! - **Operand stack**: 256 `i32` slots, LIFO; overflow and underflow are fatal
//! - **Code segment**: at most 256 decoded [`isa::Instruction`]s
//! - **Labels**: names bound to instruction indices, used by `jmp` and `global`
//! - **Execution model**: fetch at the program counter, advance, dispatch; stops
//!   on `exit`, past the last instruction, or on the first error
//!
//! # Modules
//!
//! - [`assembler`]: Tokenizing, label collection and diagnostics
//! - [`errors`]: Assembly and execution error types
//! - [`isa`]: Mnemonic table and instruction definitions
//! - [`output`]: Sinks for the `print` instruction
//! - [`program`]: Assembled program and label table
//! - [`vm`]: Execution engine and step budget

pub mod assembler;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod output;
pub mod program;
pub mod vm;
