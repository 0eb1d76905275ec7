//! Stack bytecode assembler and interpreter CLI.
//!
//! Assembles a program file and runs it, printing each `print`ed value to
//! stdout. Diagnostics and logs go to stderr.
//!
//! # Usage
//! ```text
//! masm [program.masm] [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program.masm`: Program to run (defaults to `test.masm`)
//!
//! # Exit status
//! `0` on success, `1` on usage errors, and a distinct code per error kind
//! otherwise (see `VMError::exit_code`).

use masm::utils::log::{self, Level};
use masm::virtual_machine::assembler::{AsmOptions, Strictness, assemble_file};
use masm::virtual_machine::errors::VMError;
use masm::virtual_machine::output::WriterOutput;
use masm::virtual_machine::vm::{VM, VmConfig};
use masm::{error, info};
use std::env;
use std::process;
use std::sync::atomic::Ordering;

const DEFAULT_PROGRAM: &str = "test.masm";
const LOG_ENV: &str = "MASM_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Check,
    List,
}

#[derive(Debug, PartialEq, Eq)]
struct CliOptions {
    path: String,
    mode: Mode,
    strictness: Strictness,
    step_limit: Option<u64>,
    level: Option<Level>,
    timestamps: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            path: DEFAULT_PROGRAM.to_string(),
            mode: Mode::Run,
            strictness: Strictness::Strict,
            step_limit: None,
            level: None,
            timestamps: true,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Execute(CliOptions),
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut opts = CliOptions::default();
    let mut path: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--lenient" => opts.strictness = Strictness::Lenient,
            "--check" => opts.mode = Mode::Check,
            "--list" => opts.mode = Mode::List,
            "--quiet" | "-q" => opts.level = Some(Level::Error),
            "--verbose" | "-v" => opts.level = Some(Level::Debug),
            "--no-timestamps" => opts.timestamps = false,
            k @ "--max-steps" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("{k} requires an argument"))?;
                let limit = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid step limit: '{value}' is not a valid number"))?;
                if limit == 0 {
                    return Err("Step limit must be greater than 0".to_string());
                }
                opts.step_limit = Some(limit);
            }
            other if other.starts_with('-') => {
                return Err(format!("Unexpected argument: {other}"));
            }
            other => {
                if path.is_some() {
                    return Err(format!("Unexpected argument: {other}"));
                }
                path = Some(other.to_string());
            }
        }
        i += 1;
    }

    if let Some(path) = path {
        opts.path = path;
    }
    Ok(Command::Execute(opts))
}

fn configure_logging(opts: &CliOptions) {
    let from_env = env::var(LOG_ENV).ok().and_then(|v| match v.parse::<Level>() {
        Ok(level) => Some(level),
        Err(e) => {
            error!("{LOG_ENV}: {e}");
            None
        }
    });
    if let Some(level) = opts.level.or(from_env) {
        log::set_level(level);
    }
    log::SHOW_TIMESTAMP.store(opts.timestamps, Ordering::Relaxed);
}

fn execute(opts: &CliOptions) -> Result<(), VMError> {
    let asm_options = AsmOptions {
        strictness: opts.strictness,
    };
    let program = assemble_file(&opts.path, asm_options)?;

    match opts.mode {
        Mode::Check => {
            info!(
                "{}: {} instructions, {} labels, entry point {}",
                opts.path,
                program.len(),
                program.labels().len(),
                program.entry_point().unwrap_or("<none>")
            );
        }
        Mode::List => print!("{program}"),
        Mode::Run => {
            let config = VmConfig {
                strictness: opts.strictness,
                step_limit: opts.step_limit,
            };
            let mut vm = VM::with_config(program, config);
            vm.run(&mut WriterOutput::stdout())?;
        }
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program_name = args.first().map(String::as_str).unwrap_or("masm");

    let opts = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(Command::Help) => {
            print_usage(program_name);
            return;
        }
        Ok(Command::Execute(opts)) => opts,
        Err(message) => {
            error!("{message}");
            print_usage(program_name);
            process::exit(1);
        }
    };

    configure_logging(&opts);

    if let Err(e) = execute(&opts) {
        if !already_reported(&e) {
            error!("{e}");
        }
        process::exit(e.exit_code());
    }
}

/// Errors with a source position were already printed as a diagnostic by
/// `assemble_file`.
fn already_reported(err: &VMError) -> bool {
    err.location().is_some()
}

const USAGE: &str = "\
Stack bytecode interpreter

USAGE:
    {program} [program.masm] [OPTIONS]

ARGS:
    <program.masm>    Program to assemble and run (defaults to test.masm)

OPTIONS:
    --check              Assemble only and print a summary
    --list               Print the assembled instruction listing
    --lenient            Skip unknown tokens and let unresolved jumps fall through
    --max-steps <n>      Stop with an error after n executed instructions
    -v, --verbose        Log debug messages
    -q, --quiet          Log errors only
    --no-timestamps      Omit timestamps from log lines
    -h, --help           Print this help message

ENVIRONMENT:
    MASM_LOG             Log level (debug, info, warn, error) when no flag is given
";

fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
