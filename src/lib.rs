//! masm library.
//!
//! Assembles and runs programs for a small stack-based bytecode machine.
//!
//! ```
//! use masm::virtual_machine::assembler::assemble_source;
//! use masm::virtual_machine::output::BufferOutput;
//! use masm::virtual_machine::vm::VM;
//!
//! let program = assemble_source("push 3 push 4 add print exit").unwrap();
//! let mut out = BufferOutput::new();
//! VM::new(program).run(&mut out).unwrap();
//! assert_eq!(out.values, [7]);
//! ```

pub mod utils;
pub mod virtual_machine;
