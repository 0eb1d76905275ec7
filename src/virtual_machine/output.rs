//! Output sinks for the `print` instruction.
//!
//! The [`Output`] trait is the VM's only side channel: each call receives one
//! value. [`WriterOutput`] writes newline-terminated decimals to any
//! [`io::Write`], [`BufferOutput`] collects values in memory.

use crate::virtual_machine::errors::VMError;
use std::io::{self, Write};

/// Receives values printed by a running program.
pub trait Output {
    /// Emits one value.
    fn print(&mut self, value: i32) -> Result<(), VMError>;
}

/// Writes each value as a decimal line to the wrapped writer.
pub struct WriterOutput<W: Write> {
    writer: W,
    name: &'static str,
}

impl<W: Write> WriterOutput<W> {
    /// Wraps `writer`; `name` identifies it in I/O errors.
    pub fn new(writer: W, name: &'static str) -> Self {
        Self { writer, name }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterOutput<io::Stdout> {
    /// Sink for the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), "<stdout>")
    }
}

impl<W: Write> Output for WriterOutput<W> {
    fn print(&mut self, value: i32) -> Result<(), VMError> {
        writeln!(self.writer, "{value}")
            .and_then(|_| self.writer.flush())
            .map_err(|e| VMError::IoError {
                path: self.name.to_string(),
                source: e.to_string(),
            })
    }
}

/// Collects printed values in order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferOutput {
    pub values: Vec<i32>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Output for BufferOutput {
    fn print(&mut self, value: i32) -> Result<(), VMError> {
        self.values.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_output_emits_decimal_lines() {
        let mut out = WriterOutput::new(Vec::new(), "<buffer>");
        out.print(7).unwrap();
        out.print(-42).unwrap();
        assert_eq!(out.into_inner(), b"7\n-42\n");
    }

    #[test]
    fn buffer_output_records_in_order() {
        let mut out = BufferOutput::new();
        out.print(1).unwrap();
        out.print(2).unwrap();
        assert_eq!(out.values, [1, 2]);
    }
}
