use crate::builtin::{Builtins, Dispatch};
use crate::command::{ExecOutcome, ExitCode, IoStreams};
use crate::env::Environment;
use crate::external;
use crate::parser::ParsedLine;
use std::io::Write;

/// Routes a classified line to assignment handling, a built-in or an external program.
#[derive(Default)]
pub struct Executor {
    builtins: Builtins,
}

impl Executor {
    /// Create an executor with a custom built-in dispatcher.
    pub fn new(builtins: Builtins) -> Self {
        Self { builtins }
    }

    /// Executes a parsed line.
    ///
    /// Parse errors are reported on `io.err` with exit code 2. Assignments change
    /// `env`. Commands go to the built-ins first and, if none matches, are run as
    /// an external program with a fresh snapshot of `env`.
    pub fn execute(
        &self,
        parsed: &ParsedLine,
        env: &mut Environment,
        io: &mut IoStreams<'_>,
        last_exit_code: ExitCode,
    ) -> ExecOutcome {
        match parsed {
            ParsedLine::ParseError(msg) => {
                if let Err(e) = writeln!(io.err, "parse error: {}", msg) {
                    log::warn!("failed to report parse error: {e}");
                }
                ExecOutcome::code(2)
            }
            ParsedLine::Empty => ExecOutcome::code(0),
            ParsedLine::Assignment { name, value } => {
                env.set(name.as_str(), value.clone());
                ExecOutcome::code(0)
            }
            ParsedLine::Command(argv) => {
                match self.builtins.run_if_builtin(argv, io, last_exit_code) {
                    Dispatch::Handled(outcome) => outcome,
                    Dispatch::NotRecognized => external::run(argv, &env.snapshot(), io),
                }
            }
        }
    }
}
