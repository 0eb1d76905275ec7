//! Execution engine.
//!
//! The VM owns a [`Program`] and an operand stack of 256 `i32` slots and runs
//! a fetch-decode-execute loop over the program counter. Add, sub and mul
//! wrap on overflow; div and mod use truncating integer division and trap on
//! a zero operand.

mod budget;
mod stack;

pub use stack::STACK_CAPACITY;

use crate::virtual_machine::assembler::Strictness;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::output::Output;
use crate::virtual_machine::program::Program;
use crate::{debug, warn};
use budget::StepBudget;
use stack::OperandStack;

/// Execution configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmConfig {
    /// Strict runs fail on jumps to undeclared labels, lenient runs fall through.
    pub strictness: Strictness,
    /// Maximum number of instructions to execute. `None` runs until `exit`.
    pub step_limit: Option<u64>,
}

/// Why execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// An `exit` instruction ran.
    Exit,
    /// The program counter moved past the last instruction.
    EndOfProgram,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt {
    pub reason: HaltReason,
    /// Instructions executed, including the final `exit`.
    pub steps: u64,
}

/// Stack bytecode virtual machine.
pub struct VM {
    /// Program being executed; never modified.
    program: Program,
    /// Operand stack.
    stack: OperandStack,
    /// Index of the next instruction to fetch.
    pc: usize,
    budget: StepBudget,
    strictness: Strictness,
}

impl VM {
    /// Creates a VM with the default configuration.
    pub fn new(program: Program) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: Program, config: VmConfig) -> Self {
        Self {
            program,
            stack: OperandStack::new(),
            pc: 0,
            budget: StepBudget::new(config.step_limit),
            strictness: config.strictness,
        }
    }

    /// Runs the program from its entry point until it halts.
    ///
    /// Returns [`VMError::EntryPointNotFound`] without executing anything if
    /// the declared entry label does not exist. Any other error stops the
    /// loop at the failing instruction, leaving the stack as it was at the
    /// fault: operands a binary instruction already popped are not restored.
    pub fn run<O: Output>(&mut self, out: &mut O) -> Result<Halt, VMError> {
        self.pc = self.program.start_index()?;
        self.stack.clear();
        self.budget.reset();
        debug!("starting execution at instruction {}", self.pc);

        loop {
            if let Some(reason) = self.step(out)? {
                let halt = Halt {
                    reason,
                    steps: self.budget.used(),
                };
                debug!("halted ({:?}) after {} steps", halt.reason, halt.steps);
                return Ok(halt);
            }
        }
    }

    /// Fetches, advances the program counter and dispatches one instruction.
    fn step<O: Output>(&mut self, out: &mut O) -> Result<Option<HaltReason>, VMError> {
        let at = self.pc;
        let Some(instruction) = self.program.instructions().get(at) else {
            return Ok(Some(HaltReason::EndOfProgram));
        };
        self.budget.charge()?;
        self.pc += 1;

        let instr = instruction.mnemonic();
        match instruction {
            Instruction::Push(value) => self.stack.push(*value, instr, at)?,
            Instruction::Pop => {
                self.stack.pop(instr, at)?;
            }
            Instruction::Add => self.stack.binary(instr, at, |a, b| Ok(a.wrapping_add(b)))?,
            Instruction::Sub => self.stack.binary(instr, at, |a, b| Ok(a.wrapping_sub(b)))?,
            Instruction::Mul => self.stack.binary(instr, at, |a, b| Ok(a.wrapping_mul(b)))?,
            Instruction::Div => self.stack.binary(instr, at, |a, b| {
                check_division(a, b, instr, at)?;
                Ok(a.wrapping_div(b))
            })?,
            Instruction::Mod => self.stack.binary(instr, at, |a, b| {
                check_division(a, b, instr, at)?;
                Ok(a.wrapping_rem(b))
            })?,
            Instruction::Print => out.print(self.stack.peek(instr, at)?)?,
            Instruction::Jump(target) => match self.program.labels().resolve(target) {
                Some(index) => self.pc = index,
                None if self.strictness == Strictness::Strict => {
                    return Err(VMError::UndefinedLabel {
                        label: target.clone(),
                    });
                }
                None => warn!("jump at {at} to undeclared label `{target}` falls through"),
            },
            Instruction::Exit => return Ok(Some(HaltReason::Exit)),
        }
        Ok(None)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Operand stack contents from bottom to top.
    pub fn stack(&self) -> &[i32] {
        self.stack.as_slice()
    }

    /// Index of the next instruction to fetch.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Instructions executed by the current or last run.
    pub fn steps(&self) -> u64 {
        self.budget.used()
    }
}

/// `div` and `mod` trap when either popped operand is zero.
///
/// The divisor is `b`, the second value popped. A zero dividend `a` on top of
/// the stack also traps, so `push 9 push 0 div` is rejected even though its
/// divisor is 9. This means `0 / 5` is a fault rather than `0`.
fn check_division(a: i32, b: i32, instr: &'static str, pc: usize) -> Result<(), VMError> {
    if a == 0 || b == 0 {
        return Err(VMError::DivisionByZero {
            instruction: instr,
            pc,
        });
    }
    Ok(())
}
