use crate::command::{CommandFactory, ExecOutcome, ExecutableCommand, ExitCode, IoStreams};
use crate::lexer::is_blank;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors a built-in can fail with. Each maps to a fixed exit code.
#[derive(Debug, Error)]
pub enum BuiltinError {
    /// Wrong number or shape of arguments.
    #[error("{0}")]
    Usage(String),
    /// A file named on the command line could not be opened or read.
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Any other runtime failure, e.g. writing to the output stream.
    #[error(transparent)]
    System(#[from] io::Error),
}

impl BuiltinError {
    /// Usage errors exit with 2, runtime failures with 1.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            BuiltinError::Usage(_) => 2,
            BuiltinError::Io { .. } | BuiltinError::System(_) => 1,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        BuiltinError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins validate their own arguments in [`BuiltinCommand::from_args`] and are
/// executed directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "echo" or "cat".
    fn name() -> &'static str;

    /// Builds the command from the arguments following its name.
    fn from_args(args: &[OsString]) -> Result<Self, BuiltinError>;

    /// Executes the command using provided IO streams.
    ///
    /// `last_exit_code` is the exit code of the previous line.
    fn execute(
        self,
        io: &mut IoStreams<'_>,
        last_exit_code: ExitCode,
    ) -> Result<ExecOutcome, BuiltinError>;
}

fn report(name: &str, err: &BuiltinError, io: &mut IoStreams<'_>) -> ExecOutcome {
    if let Err(e) = writeln!(io.err, "{}: {}", name, err) {
        log::warn!("{name}: failed to report error: {e}");
    }
    ExecOutcome::code(err.exit_code())
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, io: &mut IoStreams<'_>, last_exit_code: ExitCode) -> ExecOutcome {
        match <T as BuiltinCommand>::execute(*self, io, last_exit_code) {
            Ok(x) => x,
            Err(e) => report(T::name(), &e, io),
        }
    }
}

struct InvalidArgs {
    name: &'static str,
    error: BuiltinError,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, io: &mut IoStreams<'_>, _last_exit_code: ExitCode) -> ExecOutcome {
        report(self.name, &self.error, io)
    }
}

/// Factory allows creating instances of a [`BuiltinCommand`] by name.
pub(crate) struct Factory<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &OsStr, args: &[OsString]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(args) {
                Ok(cmd) => Box::new(cmd),
                Err(error) => Box::new(InvalidArgs {
                    name: T::name(),
                    error,
                }),
            })
        } else {
            None
        }
    }
}

/// Outcome of offering a command to the built-in dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The command was a built-in and has run.
    Handled(ExecOutcome),
    /// No built-in has this name; the caller should run it externally.
    NotRecognized,
}

/// Dispatcher over a fixed list of built-in command factories.
pub struct Builtins {
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Builtins {
    /// Create a dispatcher with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { commands }
    }

    /// Runs `argv` in-process if `argv[0]` names a built-in.
    pub fn run_if_builtin(
        &self,
        argv: &[OsString],
        io: &mut IoStreams<'_>,
        last_exit_code: ExitCode,
    ) -> Dispatch {
        let Some((name, args)) = argv.split_first() else {
            return Dispatch::NotRecognized;
        };
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(name, args) {
                log::debug!("running builtin {name:?}");
                return Dispatch::Handled(cmd.execute(io, last_exit_code));
            }
        }
        Dispatch::NotRecognized
    }
}

impl Default for Builtins {
    /// The built-ins `echo`, `pwd`, `cat`, `wc` and `exit`.
    fn default() -> Self {
        Self::new(vec![
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cat>::default()),
            Box::new(Factory::<Wc>::default()),
            Box::new(Factory::<Exit>::default()),
        ])
    }
}

fn single_path(args: &[OsString]) -> Result<PathBuf, BuiltinError> {
    match args {
        [path] => Ok(PathBuf::from(path)),
        _ => Err(BuiltinError::Usage(
            "expected exactly one file argument".to_string(),
        )),
    }
}

/// Write the arguments to standard output, separated by spaces, followed by a newline.
pub(crate) struct Echo {
    args: Vec<OsString>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn from_args(args: &[OsString]) -> Result<Self, BuiltinError> {
        Ok(Echo {
            args: args.to_vec(),
        })
    }

    // Arguments are written as raw bytes.
    fn execute(
        self,
        io: &mut IoStreams<'_>,
        _last_exit_code: ExitCode,
    ) -> Result<ExecOutcome, BuiltinError> {
        let line = self.args.join(OsStr::new(" "));
        io.out.write_all(line.as_encoded_bytes())?;
        io.out.write_all(b"\n")?;
        io.out.flush()?;
        Ok(ExecOutcome::code(0))
    }
}

/// Print the current working directory to standard output.
pub(crate) struct Pwd;

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    // Extra arguments are ignored.
    fn from_args(_args: &[OsString]) -> Result<Self, BuiltinError> {
        Ok(Pwd)
    }

    fn execute(
        self,
        io: &mut IoStreams<'_>,
        _last_exit_code: ExitCode,
    ) -> Result<ExecOutcome, BuiltinError> {
        let cwd = std::env::current_dir()?;
        io.out.write_all(cwd.as_os_str().as_encoded_bytes())?;
        io.out.write_all(b"\n")?;
        io.out.flush()?;
        Ok(ExecOutcome::code(0))
    }
}

/// Print a file to stdout, byte for byte.
pub(crate) struct Cat {
    path: PathBuf,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn from_args(args: &[OsString]) -> Result<Self, BuiltinError> {
        single_path(args).map(|path| Cat { path })
    }

    fn execute(
        self,
        io: &mut IoStreams<'_>,
        _last_exit_code: ExitCode,
    ) -> Result<ExecOutcome, BuiltinError> {
        let mut f = File::open(&self.path).map_err(|e| BuiltinError::io(&self.path, e))?;
        io::copy(&mut f, &mut *io.out).map_err(|e| BuiltinError::io(&self.path, e))?;
        io.out.flush()?;
        Ok(ExecOutcome::code(0))
    }
}

/// Line, word and byte counts of one input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Counts {
    lines: u64,
    words: u64,
    bytes: u64,
}

impl Counts {
    /// Counts `reader` to the end. Words are runs of non-whitespace bytes.
    fn read_from(reader: &mut dyn Read) -> io::Result<Counts> {
        let mut counts = Counts::default();
        let mut in_word = false;
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            counts.bytes += n as u64;
            for &b in &buf[..n] {
                if b == b'\n' {
                    counts.lines += 1;
                }
                if is_blank(b) {
                    in_word = false;
                } else if !in_word {
                    in_word = true;
                    counts.words += 1;
                }
            }
        }
        Ok(counts)
    }
}

/// Count lines, words and bytes of a file.
pub(crate) struct Wc {
    path: PathBuf,
}

impl BuiltinCommand for Wc {
    fn name() -> &'static str {
        "wc"
    }

    fn from_args(args: &[OsString]) -> Result<Self, BuiltinError> {
        single_path(args).map(|path| Wc { path })
    }

    fn execute(
        self,
        io: &mut IoStreams<'_>,
        _last_exit_code: ExitCode,
    ) -> Result<ExecOutcome, BuiltinError> {
        let mut f = File::open(&self.path).map_err(|e| BuiltinError::io(&self.path, e))?;
        let counts = Counts::read_from(&mut f).map_err(|e| BuiltinError::io(&self.path, e))?;
        writeln!(io.out, "{} {} {}", counts.lines, counts.words, counts.bytes)?;
        Ok(ExecOutcome::code(0))
    }
}

/// Exit the shell.
///
/// Without an argument the shell exits with the previous line's exit code.
pub(crate) struct Exit {
    code: Option<OsString>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    // More than one argument is a usage error that does not stop the shell.
    fn from_args(args: &[OsString]) -> Result<Self, BuiltinError> {
        match args {
            [] => Ok(Exit { code: None }),
            [code] => Ok(Exit {
                code: Some(code.clone()),
            }),
            _ => Err(BuiltinError::Usage("too many arguments".to_string())),
        }
    }

    fn execute(
        self,
        io: &mut IoStreams<'_>,
        last_exit_code: ExitCode,
    ) -> Result<ExecOutcome, BuiltinError> {
        let Some(arg) = self.code else {
            return Ok(ExecOutcome::exit(last_exit_code));
        };
        match arg.to_str().and_then(|s| s.parse::<ExitCode>().ok()) {
            Some(code) => Ok(ExecOutcome::exit(code)),
            None => {
                let arg = arg.to_string_lossy();
                if let Err(e) = writeln!(io.err, "exit: {}: numeric argument required", arg) {
                    log::warn!("exit: failed to report error: {e}");
                }
                Ok(ExecOutcome::exit(2))
            }
        }
    }
}
