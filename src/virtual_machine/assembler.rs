//! Assembly language parser.
//!
//! Converts program text into a [`Program`] in one left-to-right pass.
//!
//! # Syntax
//!
//! ```text
//! global start
//! start:
//!     push 10
//!     push 3
//!     sub
//!     print
//!     exit
//! ```
//!
//! - Tokens are separated by spaces, tabs or newlines
//! - Mnemonics are lowercase (e.g. `push`, `jmp`)
//! - Integer literals are decimal `i32`, optionally negative
//! - A token ending in `:` declares a label at the index of the next instruction
//! - `global <label>` declares the entry point
//! - `exit` ends assembly; anything after it is ignored

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, Opcode};
use crate::virtual_machine::program::{LabelTable, MAX_INSTRUCTIONS, Program};
use crate::{debug, warn};
use std::fmt::Write;
use std::fs;
use std::path::Path;

const LABEL_SUFFIX: char = ':';
const DIRECTIVE_GLOBAL: &str = "global";

/// How the assembler and VM treat questionable input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Unknown mnemonics, duplicate labels and undeclared jump targets are errors.
    #[default]
    Strict,
    /// Unknown tokens are skipped, the first label definition wins and jumps
    /// to undeclared labels fall through. Each case is logged as a warning.
    Lenient,
}

/// Assembler configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AsmOptions {
    pub strictness: Strictness,
}

impl AsmOptions {
    pub const fn lenient() -> Self {
        Self {
            strictness: Strictness::Lenient,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    text: &'a str,
    /// 1-based line number.
    line: usize,
    /// 1-based column in the line.
    column: usize,
}

impl Token<'_> {
    fn malformed(&self, message: impl Into<String>) -> VMError {
        VMError::MalformedProgram {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }
}

/// Splits source into whitespace-separated tokens with their positions.
///
/// A trailing `\r` is treated as whitespace so CRLF files tokenize the same
/// way as LF files.
fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        let mut start: Option<usize> = None;
        for (i, c) in line.char_indices() {
            let blank = matches!(c, ' ' | '\t' | '\r');
            match (start, blank) {
                (None, false) => start = Some(i),
                (Some(s), true) => {
                    out.push(token_at(line, line_no, s, i));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            out.push(token_at(line, line_no, s, line.len()));
        }
    }
    out
}

fn token_at(line: &str, line_no: usize, start: usize, end: usize) -> Token<'_> {
    Token {
        text: &line[start..end],
        line: line_no + 1,
        column: line[..start].chars().count() + 1,
    }
}

/// Checks if a token is a label definition (ends with `:`)
fn is_label_def(tok: &str) -> bool {
    tok.ends_with(LABEL_SUFFIX) && tok.len() > 1
}

/// Extracts the label name from a label definition token.
fn label_name(tok: &str) -> &str {
    &tok[..tok.len() - 1]
}

/// Parse a decimal i32 literal.
fn parse_i32(tok: &Token) -> Result<i32, VMError> {
    tok.text
        .parse::<i32>()
        .map_err(|_| tok.malformed(format!("invalid integer literal `{}`", tok.text)))
}

/// Pulls the operand token following `owner`.
fn expect_operand<'a, I>(tokens: &mut I, owner: &Token, what: &str) -> Result<Token<'a>, VMError>
where
    I: Iterator<Item = Token<'a>>,
{
    tokens
        .next()
        .ok_or_else(|| owner.malformed(format!("`{}` expects {what}", owner.text)))
}

/// Accumulates assembler output during the pass.
struct AsmContext {
    options: AsmOptions,
    instructions: Vec<Instruction>,
    labels: LabelTable,
    entry_point: Option<String>,
}

impl AsmContext {
    fn new(options: AsmOptions) -> Self {
        Self {
            options,
            instructions: Vec::new(),
            labels: LabelTable::new(),
            entry_point: None,
        }
    }

    fn strict(&self) -> bool {
        self.options.strictness == Strictness::Strict
    }

    fn emit(&mut self, instruction: Instruction) -> Result<(), VMError> {
        if self.instructions.len() >= MAX_INSTRUCTIONS {
            return Err(VMError::CapacityExceeded {
                capacity: MAX_INSTRUCTIONS,
            });
        }
        self.instructions.push(instruction);
        Ok(())
    }

    /// Registers a label at the index the next instruction will occupy.
    fn define_label(&mut self, tok: &Token) -> Result<(), VMError> {
        let name = label_name(tok.text);
        if self.labels.define(name, self.instructions.len()) {
            return Ok(());
        }
        if self.strict() {
            return Err(VMError::DuplicateLabel {
                label: name.to_string(),
                line: tok.line,
                column: tok.column,
            });
        }
        warn!(
            "{}:{}: label `{name}` already defined, keeping the first definition",
            tok.line, tok.column
        );
        Ok(())
    }

    fn parse_instruction<'a, I>(
        &self,
        opcode: Opcode,
        tok: &Token,
        tokens: &mut I,
    ) -> Result<Instruction, VMError>
    where
        I: Iterator<Item = Token<'a>>,
    {
        let what = opcode.operand().describe();
        Ok(match opcode {
            Opcode::Push => {
                let operand = expect_operand(tokens, tok, what)?;
                Instruction::Push(parse_i32(&operand)?)
            }
            Opcode::Jump => {
                let operand = expect_operand(tokens, tok, what)?;
                if self.strict() && operand.text.ends_with(LABEL_SUFFIX) {
                    return Err(operand.malformed(format!(
                        "jump target `{}` must not end with `{LABEL_SUFFIX}`",
                        operand.text
                    )));
                }
                Instruction::Jump(operand.text.to_string())
            }
            Opcode::Pop => Instruction::Pop,
            Opcode::Add => Instruction::Add,
            Opcode::Sub => Instruction::Sub,
            Opcode::Mul => Instruction::Mul,
            Opcode::Div => Instruction::Div,
            Opcode::Mod => Instruction::Mod,
            Opcode::Print => Instruction::Print,
            Opcode::Exit => Instruction::Exit,
        })
    }

    /// Checks that every jump names a declared label.
    fn check_jump_targets(&self) -> Result<(), VMError> {
        for instruction in &self.instructions {
            if let Instruction::Jump(target) = instruction
                && !self.labels.contains(target)
            {
                if self.strict() {
                    return Err(VMError::UndefinedLabel {
                        label: target.clone(),
                    });
                }
                warn!("jump target `{target}` is never declared; the jump will fall through");
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Program, VMError> {
        self.check_jump_targets()?;
        Program::new(self.instructions, self.labels, self.entry_point)
    }
}

/// Assemble a source string with the default (strict) options.
pub fn assemble_source(source: &str) -> Result<Program, VMError> {
    assemble_source_with(source, AsmOptions::default())
}

/// Assemble a source string into a [`Program`].
///
/// Labels may be declared before or after the jumps that reference them: the
/// label table is complete once the pass ends and is only consulted
/// afterwards.
pub fn assemble_source_with(source: &str, options: AsmOptions) -> Result<Program, VMError> {
    let mut ctx = AsmContext::new(options);
    let mut tokens = tokenize(source).into_iter();

    while let Some(tok) = tokens.next() {
        if tok.text == DIRECTIVE_GLOBAL {
            let label = expect_operand(&mut tokens, &tok, "an entry point label")?;
            ctx.entry_point = Some(label.text.to_string());
            continue;
        }

        if let Some(opcode) = Opcode::from_mnemonic(tok.text) {
            let instruction = ctx.parse_instruction(opcode, &tok, &mut tokens)?;
            ctx.emit(instruction)?;
            if opcode == Opcode::Exit {
                break;
            }
            continue;
        }

        if is_label_def(tok.text) {
            ctx.define_label(&tok)?;
            continue;
        }

        if ctx.strict() {
            return Err(tok.malformed(format!("unknown instruction `{}`", tok.text)));
        }
        warn!(
            "{}:{}: skipping unknown token `{}`",
            tok.line, tok.column, tok.text
        );
    }

    let program = ctx.finish()?;
    debug!(
        "assembled {} instructions, {} labels, entry point {}",
        program.len(),
        program.labels().len(),
        program.entry_point().unwrap_or("<none>")
    );
    Ok(program)
}

/// Formats a compiler-style diagnostic for an assembly error.
///
/// Returns `None` for errors without a source position.
pub fn render_diagnostic(file: &str, source: &str, err: &VMError) -> Option<String> {
    let (line, column) = err.location()?;
    let message = match err {
        VMError::MalformedProgram { message, .. } => message.clone(),
        VMError::DuplicateLabel { label, .. } => format!("duplicate label `{label}`"),
        other => other.to_string(),
    };

    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{column}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(column.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "  | {}^", underline);
    }

    Some(diag)
}

/// Assemble a program file, printing a diagnostic to stderr on failure.
pub fn assemble_file<P: AsRef<Path>>(path: P, options: AsmOptions) -> Result<Program, VMError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| VMError::IoError {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;

    let result = assemble_source_with(&source, options);
    if let Err(err) = &result
        && let Some(diag) = render_diagnostic(&path.display().to_string(), &source, err)
    {
        eprintln!("{}", diag.trim_end());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source).iter().map(|t| t.text).collect()
    }

    #[test]
    fn tokenize_splits_on_all_whitespace() {
        assert_eq!(
            texts("push 3\n\tpush  4\r\nadd"),
            ["push", "3", "push", "4", "add"]
        );
        assert!(texts("  \n\t\n").is_empty());
    }

    #[test]
    fn tokenize_tracks_positions() {
        let tokens = tokenize("global main\n  main: push 1");
        let positions: Vec<_> = tokens.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(positions, [(1, 1), (1, 8), (2, 3), (2, 9), (2, 14)]);
    }

    #[test]
    fn assemble_empty_source() {
        let program = assemble_source("").unwrap();
        assert!(program.is_empty());
        assert!(program.labels().is_empty());
        assert_eq!(program.entry_point(), None);
    }

    #[test]
    fn assemble_every_mnemonic() {
        let program =
            assemble_source("push -12 pop add sub mul div mod print l: jmp l exit").unwrap();
        assert_eq!(
            program.instructions(),
            [
                Instruction::Push(-12),
                Instruction::Pop,
                Instruction::Add,
                Instruction::Sub,
                Instruction::Mul,
                Instruction::Div,
                Instruction::Mod,
                Instruction::Print,
                Instruction::Jump("l".into()),
                Instruction::Exit,
            ]
        );
    }

    #[test]
    fn label_binds_next_instruction_index() {
        let program = assemble_source("push 1\nhere:\npush 2\nthere:").unwrap();
        assert_eq!(program.labels().resolve("here"), Some(1));
        assert_eq!(program.labels().resolve("there"), Some(2));
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn forward_and_backward_jumps_resolve() {
        let program = assemble_source("top: jmp bottom\nbottom: jmp top").unwrap();
        assert_eq!(program.labels().resolve("top"), Some(0));
        assert_eq!(program.labels().resolve("bottom"), Some(1));
    }

    #[test]
    fn global_sets_entry_point_without_emitting() {
        let program = assemble_source("global start\npush 1\nstart: print").unwrap();
        assert_eq!(program.entry_point(), Some("start"));
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn exit_stops_assembly() {
        let program = assemble_source("push 1\nexit\npush 2 bogus ??? jmp").unwrap();
        assert_eq!(program.instructions(), [Instruction::Push(1), Instruction::Exit]);
    }

    #[test]
    fn missing_operands_are_malformed() {
        for source in ["push", "print\njmp", "global"] {
            let err = assemble_source(source).unwrap_err();
            assert!(
                matches!(err, VMError::MalformedProgram { ref message, .. } if message.contains("expects")),
                "{source:?}: {err:?}"
            );
        }
    }

    #[test]
    fn missing_operand_is_malformed_even_when_lenient() {
        let err = assemble_source_with("push 1 push", AsmOptions::lenient()).unwrap_err();
        assert!(matches!(
            err,
            VMError::MalformedProgram {
                line: 1,
                column: 8,
                ..
            }
        ));
    }

    #[test]
    fn invalid_integer_literal() {
        for source in ["push x", "push 2147483648", "push 1.5"] {
            assert!(matches!(
                assemble_source(source),
                Err(VMError::MalformedProgram { .. })
            ));
        }
        let program = assemble_source("push -2147483648").unwrap();
        assert_eq!(program.instructions(), [Instruction::Push(i32::MIN)]);
    }

    #[test]
    fn unknown_mnemonic_strict_vs_lenient() {
        let err = assemble_source("push 1\nfrobnicate").unwrap_err();
        assert_eq!(
            err,
            VMError::MalformedProgram {
                line: 2,
                column: 1,
                message: "unknown instruction `frobnicate`".into(),
            }
        );

        let program = assemble_source_with("push 1 frobnicate print", AsmOptions::lenient()).unwrap();
        assert_eq!(program.instructions(), [Instruction::Push(1), Instruction::Print]);
    }

    #[test]
    fn bare_colon_is_not_a_label() {
        assert!(!is_label_def(":"));
        assert!(is_label_def("a:"));
        assert!(matches!(
            assemble_source(":"),
            Err(VMError::MalformedProgram { .. })
        ));
    }

    #[test]
    fn duplicate_label_strict_vs_lenient() {
        let source = "dup: push 1\ndup: push 2";
        assert_eq!(
            assemble_source(source).unwrap_err(),
            VMError::DuplicateLabel {
                label: "dup".into(),
                line: 2,
                column: 1,
            }
        );

        let program = assemble_source_with(source, AsmOptions::lenient()).unwrap();
        assert_eq!(program.labels().resolve("dup"), Some(0));
    }

    #[test]
    fn undefined_jump_target_strict_vs_lenient() {
        assert_eq!(
            assemble_source("jmp nowhere").unwrap_err(),
            VMError::UndefinedLabel {
                label: "nowhere".into()
            }
        );

        let program = assemble_source_with("jmp nowhere", AsmOptions::lenient()).unwrap();
        assert_eq!(program.instructions(), [Instruction::Jump("nowhere".into())]);
    }

    #[test]
    fn jump_target_with_colon_is_rejected_when_strict() {
        assert!(matches!(
            assemble_source("a: jmp a:"),
            Err(VMError::MalformedProgram { .. })
        ));
    }

    #[test]
    fn undeclared_entry_point_is_left_to_the_vm() {
        let program = assemble_source("global missing push 1").unwrap();
        assert_eq!(program.entry_point(), Some("missing"));
    }

    #[test]
    fn capacity_boundary() {
        let exact = "pop\n".repeat(MAX_INSTRUCTIONS);
        assert_eq!(assemble_source(&exact).unwrap().len(), MAX_INSTRUCTIONS);

        let over = "pop\n".repeat(MAX_INSTRUCTIONS + 1);
        assert_eq!(
            assemble_source(&over).unwrap_err(),
            VMError::CapacityExceeded {
                capacity: MAX_INSTRUCTIONS
            }
        );
    }

    #[test]
    fn labels_and_directives_do_not_count_toward_capacity() {
        let mut source = String::from("global a\n");
        for i in 0..MAX_INSTRUCTIONS {
            source.push_str(&format!("l{i}: push {i}\n"));
        }
        source.push_str("a:\n");
        let program = assemble_source(&source).unwrap();
        assert_eq!(program.len(), MAX_INSTRUCTIONS);
        assert_eq!(program.labels().resolve("a"), Some(MAX_INSTRUCTIONS));
    }

    #[test]
    fn assembling_twice_is_identical() {
        let source = "global s\njmp e\npush 99\ne: push 1\ns: print\nexit";
        assert_eq!(assemble_source(source), assemble_source(source));
    }

    #[test]
    fn diagnostic_points_at_token() {
        let source = "push 1\n  push oops\n";
        let err = assemble_source(source).unwrap_err();
        let diag = render_diagnostic("prog.masm", source, &err).unwrap();
        assert_eq!(
            diag,
            "error: invalid integer literal `oops`\n --> prog.masm:2:8\n  |\n   2 |   push oops\n  |        ^\n"
        );
    }

    #[test]
    fn no_diagnostic_without_location() {
        let err = VMError::UndefinedLabel { label: "x".into() };
        assert!(render_diagnostic("f", "jmp x", &err).is_none());
    }

    #[test]
    fn assemble_missing_file() {
        let err = assemble_file("/definitely/not/here.masm", AsmOptions::default()).unwrap_err();
        assert!(matches!(err, VMError::IoError { ref path, .. } if path.ends_with("here.masm")));
    }
}
