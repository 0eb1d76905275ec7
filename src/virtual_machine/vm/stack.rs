use crate::virtual_machine::errors::VMError;

/// Number of slots in the operand stack.
pub const STACK_CAPACITY: usize = 256;

/// Fixed-capacity LIFO stack of `i32` operands.
///
/// Every access takes the executing instruction's mnemonic and index so
/// faults can name the failing operation.
#[derive(Debug, Clone)]
pub(super) struct OperandStack {
    slots: Vec<i32>,
}

impl OperandStack {
    pub(super) fn new() -> Self {
        Self {
            slots: Vec::with_capacity(STACK_CAPACITY),
        }
    }

    /// Pushes `value`.
    ///
    /// Returns [`VMError::StackOverflow`] if the stack is full.
    pub(super) fn push(&mut self, value: i32, instr: &'static str, pc: usize) -> Result<(), VMError> {
        if self.slots.len() >= STACK_CAPACITY {
            return Err(VMError::StackOverflow {
                instruction: instr,
                pc,
                capacity: STACK_CAPACITY,
            });
        }
        self.slots.push(value);
        Ok(())
    }

    /// Removes and returns the top value.
    ///
    /// Returns [`VMError::StackUnderflow`] if the stack is empty.
    pub(super) fn pop(&mut self, instr: &'static str, pc: usize) -> Result<i32, VMError> {
        self.slots.pop().ok_or(VMError::StackUnderflow {
            instruction: instr,
            pc,
        })
    }

    /// Returns the top value without removing it.
    pub(super) fn peek(&self, instr: &'static str, pc: usize) -> Result<i32, VMError> {
        self.slots.last().copied().ok_or(VMError::StackUnderflow {
            instruction: instr,
            pc,
        })
    }

    /// Pops `a` (top) then `b` and pushes `op(a, b)`.
    pub(super) fn binary<F>(&mut self, instr: &'static str, pc: usize, op: F) -> Result<(), VMError>
    where
        F: FnOnce(i32, i32) -> Result<i32, VMError>,
    {
        let a = self.pop(instr, pc)?;
        let b = self.pop(instr, pc)?;
        self.push(op(a, b)?, instr, pc)
    }

    /// Values from bottom to top.
    pub(super) fn as_slice(&self) -> &[i32] {
        &self.slots
    }

    pub(super) fn clear(&mut self) {
        self.slots.clear();
    }
}
