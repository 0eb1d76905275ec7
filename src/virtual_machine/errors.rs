use masm_derive::Error;

/// Errors that can occur during assembly or execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    /// Source text does not form a valid program.
    #[error("{line}:{column}: {message}")]
    MalformedProgram {
        line: usize,
        column: usize,
        message: String,
    },
    /// Label declared more than once.
    #[error("{line}:{column}: duplicate label `{label}`")]
    DuplicateLabel {
        label: String,
        line: usize,
        column: usize,
    },
    /// Jump to a label that is never declared.
    #[error("undefined label `{label}`")]
    UndefinedLabel { label: String },
    /// Program has more instructions than the code segment holds.
    #[error("program exceeds {capacity} instructions")]
    CapacityExceeded { capacity: usize },
    /// `global` names a label that does not exist.
    #[error("entry point label `{label}` not found")]
    EntryPointNotFound { label: String },
    /// Pop or read on an empty stack.
    #[error("stack underflow in `{instruction}` at {pc}")]
    StackUnderflow { instruction: &'static str, pc: usize },
    /// Push onto a full stack.
    #[error("stack overflow in `{instruction}` at {pc} (capacity {capacity})")]
    StackOverflow {
        instruction: &'static str,
        pc: usize,
        capacity: usize,
    },
    /// `div` or `mod` with a zero operand.
    #[error("division by zero in `{instruction}` at {pc}")]
    DivisionByZero { instruction: &'static str, pc: usize },
    /// Execution used up its configured step budget.
    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },
    /// Program source could not be read.
    #[error("cannot read {path}: {source}")]
    IoError { path: String, source: String },
}

impl VMError {
    /// Process exit code reported by the CLI for this error.
    pub const fn exit_code(&self) -> i32 {
        match self {
            VMError::IoError { .. } => 2,
            VMError::MalformedProgram { .. } | VMError::DuplicateLabel { .. } => 3,
            VMError::UndefinedLabel { .. } => 4,
            VMError::CapacityExceeded { .. } => 5,
            VMError::EntryPointNotFound { .. } => 6,
            VMError::StackUnderflow { .. } => 7,
            VMError::StackOverflow { .. } => 8,
            VMError::DivisionByZero { .. } => 9,
            VMError::StepLimitExceeded { .. } => 10,
        }
    }

    /// Source position `(line, column)` for errors raised while assembling.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            VMError::MalformedProgram { line, column, .. }
            | VMError::DuplicateLabel { line, column, .. } => Some((*line, *column)),
            _ => None,
        }
    }
}
