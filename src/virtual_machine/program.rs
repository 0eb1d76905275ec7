//! Assembled program representation.
//!
//! A [`Program`] is the immutable output of the assembler: the decoded
//! instruction sequence, the [`LabelTable`] and the optional entry point
//! declared with `global`.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use std::collections::HashMap;
use std::fmt;

/// Maximum number of instructions in a program.
pub const MAX_INSTRUCTIONS: usize = 256;

/// Label names bound to instruction indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
    entries: HashMap<String, usize>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `index`.
    ///
    /// Returns `false` and keeps the existing binding if `name` is already
    /// defined.
    pub fn define(&mut self, name: impl Into<String>, index: usize) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, index);
        true
    }

    /// Returns the instruction index bound to `name`.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, index)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, index)| (name.as_str(), *index))
    }
}

/// Assembled program ready for execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: LabelTable,
    entry_point: Option<String>,
}

impl Program {
    /// Creates a program from its parts.
    ///
    /// Returns [`VMError::CapacityExceeded`] if `instructions` holds more than
    /// [`MAX_INSTRUCTIONS`] entries.
    pub fn new(
        instructions: Vec<Instruction>,
        labels: LabelTable,
        entry_point: Option<String>,
    ) -> Result<Self, VMError> {
        if instructions.len() > MAX_INSTRUCTIONS {
            return Err(VMError::CapacityExceeded {
                capacity: MAX_INSTRUCTIONS,
            });
        }
        Ok(Self {
            instructions,
            labels,
            entry_point,
        })
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Label declared with `global`, if any.
    pub fn entry_point(&self) -> Option<&str> {
        self.entry_point.as_deref()
    }

    /// Index of the first instruction to execute.
    ///
    /// This is the entry point label's index when one is declared, `0`
    /// otherwise.
    pub fn start_index(&self) -> Result<usize, VMError> {
        match &self.entry_point {
            None => Ok(0),
            Some(label) => {
                self.labels
                    .resolve(label)
                    .ok_or_else(|| VMError::EntryPointNotFound {
                        label: label.clone(),
                    })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Indexed listing with label markers, one instruction per line.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut by_index: Vec<(usize, &str)> = self.labels.iter().map(|(n, i)| (i, n)).collect();
        by_index.sort();

        if let Some(entry) = &self.entry_point {
            writeln!(f, "global {entry}")?;
        }

        let mut pending = by_index.iter().peekable();
        for (index, instruction) in self.instructions.iter().enumerate() {
            while let Some((_, name)) = pending.next_if(|(at, _)| *at == index) {
                writeln!(f, "{name}:")?;
            }
            writeln!(f, "{index:>4}  {instruction}")?;
        }
        for (_, name) in pending {
            writeln!(f, "{name}:")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_table_keeps_first_definition() {
        let mut labels = LabelTable::new();
        assert!(labels.define("start", 2));
        assert!(!labels.define("start", 7));
        assert_eq!(labels.resolve("start"), Some(2));
        assert_eq!(labels.resolve("missing"), None);
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn program_rejects_too_many_instructions() {
        let ok = vec![Instruction::Pop; MAX_INSTRUCTIONS];
        assert!(Program::new(ok, LabelTable::new(), None).is_ok());

        let too_many = vec![Instruction::Pop; MAX_INSTRUCTIONS + 1];
        assert_eq!(
            Program::new(too_many, LabelTable::new(), None),
            Err(VMError::CapacityExceeded {
                capacity: MAX_INSTRUCTIONS
            })
        );
    }

    #[test]
    fn start_index_defaults_to_zero() {
        let program = Program::new(vec![Instruction::Exit], LabelTable::new(), None).unwrap();
        assert_eq!(program.start_index(), Ok(0));
    }

    #[test]
    fn start_index_resolves_entry_point() {
        let mut labels = LabelTable::new();
        labels.define("main", 1);
        let program = Program::new(
            vec![Instruction::Push(1), Instruction::Exit],
            labels.clone(),
            Some("main".into()),
        )
        .unwrap();
        assert_eq!(program.start_index(), Ok(1));

        let program = Program::new(vec![Instruction::Exit], labels, Some("other".into())).unwrap();
        assert_eq!(
            program.start_index(),
            Err(VMError::EntryPointNotFound {
                label: "other".into()
            })
        );
    }

    #[test]
    fn listing_marks_labels() {
        let mut labels = LabelTable::new();
        labels.define("top", 0);
        labels.define("end", 2);
        let program = Program::new(
            vec![Instruction::Push(3), Instruction::Jump("top".into())],
            labels,
            Some("top".into()),
        )
        .unwrap();
        assert_eq!(
            program.to_string(),
            "global top\ntop:\n   0  push 3\n   1  jmp top\nend:\n"
        );
    }
}
