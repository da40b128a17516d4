//! A tiny, embeddable shell-like command runner.
//!
//! Lines are tokenized ([`lexer`]), classified into assignments or commands
//! ([`parser`]) and executed ([`executor`]) either by one of the built-ins
//! ([`builtin`]) or as a child process ([`external`]) whose stdout and stderr are
//! forwarded into caller-supplied streams.
//!
//! The main entry point is [`Interpreter`], which runs a read loop over any
//! [`std::io::BufRead`] and keeps the environment and the last exit code between lines.

pub mod builtin;
pub mod command;
pub mod env;
pub mod executor;
pub mod external;
mod interpreter;
pub mod lexer;
pub mod parser;

pub use command::{ExecOutcome, ExitCode, IoStreams};
pub use env::Environment;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{DEFAULT_PROMPT, Interpreter, ShellConfig};
