use std::ffi::{OsStr, OsString};
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Result of executing one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    /// Exit code of the line; becomes the "last exit code" for the next one.
    pub exit_code: ExitCode,
    /// When true, the read loop stops after this line.
    pub terminate: bool,
}

impl ExecOutcome {
    /// Outcome that lets the read loop continue.
    pub fn code(exit_code: ExitCode) -> Self {
        Self {
            exit_code,
            terminate: false,
        }
    }

    /// Outcome that stops the read loop.
    pub fn exit(exit_code: ExitCode) -> Self {
        Self {
            exit_code,
            terminate: true,
        }
    }
}

/// Output and error streams a command writes to.
///
/// Both are `Send` so the external runner can drain a child's pipes into them
/// from worker threads.
pub struct IoStreams<'a> {
    /// Command standard output.
    pub out: &'a mut (dyn Write + Send),
    /// Command standard error.
    pub err: &'a mut (dyn Write + Send),
}

impl<'a> IoStreams<'a> {
    /// Bundle the output and error sinks for one command.
    pub fn new(out: &'a mut (dyn Write + Send), err: &'a mut (dyn Write + Send)) -> Self {
        Self { out, err }
    }
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// Failures are reported on `io.err` and folded into the returned exit code.
    fn execute(self: Box<Self>, io: &mut IoStreams<'_>, last_exit_code: ExitCode) -> ExecOutcome;
}

/// Factory that tries to create a command from its argv.
///
/// Returns `None` when the factory doesn't recognize `argv[0]`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &OsStr, args: &[OsString]) -> Option<Box<dyn ExecutableCommand>>;
}
