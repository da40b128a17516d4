use crate::command::{ExecOutcome, ExitCode, IoStreams};
use crate::env::Environment;
use crate::executor::Executor;
use crate::parser;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Prompt printed before each line in an interactive session.
pub const DEFAULT_PROMPT: &str = "> ";

/// Settings of the read loop.
#[derive(Debug, Clone, Default)]
pub struct ShellConfig {
    /// Printed (and flushed) to the output stream before each line. `None` disables it.
    pub prompt: Option<String>,
}

impl ShellConfig {
    /// Configuration for an interactive session using `prompt`.
    pub fn interactive(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
        }
    }
}

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter owns the [`Environment`] and the exit code of the last line,
/// and feeds input lines through the parser and the [`Executor`] one at a time.
///
/// Example
/// ```
/// use minish::{Environment, Interpreter, IoStreams, ShellConfig};
/// let mut sh = Interpreter::new(Environment::new(), ShellConfig::default());
/// let mut out: Vec<u8> = Vec::new();
/// let mut err: Vec<u8> = Vec::new();
/// let code = sh
///     .run(&b"echo hello world\nexit 3\n"[..], &mut IoStreams::new(&mut out, &mut err))
///     .unwrap();
/// assert_eq!(code, 3);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    executor: Executor,
    config: ShellConfig,
    last_exit_code: ExitCode,
}

impl Interpreter {
    /// Create an interpreter with the default built-ins.
    pub fn new(env: Environment, config: ShellConfig) -> Self {
        Self::with_executor(env, Executor::default(), config)
    }

    /// Create an interpreter with a custom executor.
    pub fn with_executor(env: Environment, executor: Executor, config: ShellConfig) -> Self {
        Self {
            env,
            executor,
            config,
            last_exit_code: 0,
        }
    }

    /// Exit code of the most recently executed line (0 before any line ran).
    pub fn last_exit_code(&self) -> ExitCode {
        self.last_exit_code
    }

    /// Variables as they are after the lines run so far.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Parse and execute a single line, remembering its exit code.
    ///
    /// The line is taken as raw bytes, without its line terminator.
    pub fn run_line(&mut self, line: impl AsRef<[u8]>, io: &mut IoStreams<'_>) -> ExecOutcome {
        let parsed = parser::parse_line(line);
        let outcome = self
            .executor
            .execute(&parsed, &mut self.env, io, self.last_exit_code);
        self.last_exit_code = outcome.exit_code;
        outcome
    }

    /// Read-Eval-Print Loop.
    ///
    /// Runs lines from `input` until `exit` or end of input and returns the exit
    /// code the shell should terminate with. Only failures to read the input or
    /// to print the prompt are returned as errors.
    pub fn run<R: BufRead>(&mut self, mut input: R, io: &mut IoStreams<'_>) -> Result<ExitCode> {
        let mut buf = Vec::new();
        loop {
            if let Some(prompt) = &self.config.prompt {
                io.out
                    .write_all(prompt.as_bytes())
                    .and_then(|_| io.out.flush())
                    .context("failed to print prompt")?;
            }

            buf.clear();
            let n = input
                .read_until(b'\n', &mut buf)
                .context("failed to read input line")?;
            if n == 0 {
                log::debug!("end of input, exiting with {}", self.last_exit_code);
                return Ok(self.last_exit_code);
            }

            let outcome = self.run_line(strip_line_ending(&buf), io);
            if outcome.terminate {
                return Ok(outcome.exit_code);
            }
        }
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_script(script: &str, config: ShellConfig) -> (ExitCode, String, String) {
        let mut sh = Interpreter::new(Environment::new(), config);
        let mut out: Vec<u8> = Vec::new();
        let mut err: Vec<u8> = Vec::new();
        let code = sh
            .run(
                Cursor::new(script.as_bytes().to_vec()),
                &mut IoStreams::new(&mut out, &mut err),
            )
            .unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_echo_then_exit_code() {
        let (code, out, _) = run_script("echo hi\nexit 5\n", ShellConfig::default());
        assert_eq!(code, 5);
        assert_eq!(out, "hi\n");
    }

    #[test]
    fn test_lines_after_exit_are_not_run() {
        let (code, out, _) = run_script("exit 1\necho never\n", ShellConfig::default());
        assert_eq!(code, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_eof_returns_last_exit_code() {
        let (code, _, _) = run_script("cat\n", ShellConfig::default());
        assert_eq!(code, 2);
        let (code, _, _) = run_script("", ShellConfig::default());
        assert_eq!(code, 0);
    }

    #[test]
    fn test_last_line_without_newline() {
        let (code, out, _) = run_script("echo a\necho b", ShellConfig::default());
        assert_eq!(code, 0);
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn test_exit_without_args_uses_previous_code() {
        let (code, _, _) = run_script("wc\nexit\n", ShellConfig::default());
        assert_eq!(code, 2);
    }

    #[test]
    fn test_exit_with_too_many_args_keeps_running() {
        let (code, out, err) = run_script("exit 1 2\necho still here\n", ShellConfig::default());
        assert_eq!(code, 0);
        assert_eq!(out, "still here\n");
        assert!(err.contains("too many arguments"));
    }

    #[test]
    fn test_non_numeric_exit_stops() {
        let (code, out, _) = run_script("exit abc\necho never\n", ShellConfig::default());
        assert_eq!(code, 2);
        assert!(out.is_empty());
    }

    #[test]
    fn test_parse_error_does_not_stop_loop() {
        let (code, out, err) = run_script("echo 'broken\necho fine\n", ShellConfig::default());
        assert_eq!(code, 0);
        assert_eq!(out, "fine\n");
        assert!(err.contains("Unterminated quote"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let (code, out, _) = run_script("echo hi\r\nexit 4\r\n", ShellConfig::default());
        assert_eq!(code, 4);
        assert_eq!(out, "hi\n");
    }

    #[test]
    fn test_prompt_printed_before_each_line() {
        let (_, out, _) = run_script("echo a\n", ShellConfig::interactive("$ "));
        // One prompt for the line, one before hitting end of input.
        assert_eq!(out, "$ a\n$ ");
    }

    #[test]
    fn test_run_line_tracks_last_exit_code() {
        let mut sh = Interpreter::new(Environment::default(), ShellConfig::default());
        let mut out: Vec<u8> = Vec::new();
        let mut err: Vec<u8> = Vec::new();
        let mut io = IoStreams::new(&mut out, &mut err);
        assert_eq!(sh.run_line("cat", &mut io), ExecOutcome::code(2));
        assert_eq!(sh.last_exit_code(), 2);
        assert_eq!(sh.run_line("FOO=bar", &mut io), ExecOutcome::code(0));
        assert_eq!(sh.last_exit_code(), 0);
        assert_eq!(sh.env().get("FOO"), Some(std::ffi::OsStr::new("bar")));
        assert_eq!(sh.run_line("exit", &mut io), ExecOutcome::exit(0));
    }

    #[test]
    fn test_non_utf8_bytes_pass_through() {
        let mut sh = Interpreter::new(Environment::default(), ShellConfig::default());
        let mut out: Vec<u8> = Vec::new();
        let mut err: Vec<u8> = Vec::new();
        let code = sh
            .run(
                Cursor::new(b"echo a\xffb 'caf\xe9'\n".to_vec()),
                &mut IoStreams::new(&mut out, &mut err),
            )
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(out, b"a\xffb caf\xe9\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_argument_reaches_child_unchanged() {
        let mut sh = Interpreter::new(
            Environment::from_vars([("PATH", "/bin:/usr/bin")]),
            ShellConfig::default(),
        );
        let mut out: Vec<u8> = Vec::new();
        let mut err: Vec<u8> = Vec::new();
        let code = sh
            .run(
                Cursor::new(b"printf '%s' caf\xe9\n".to_vec()),
                &mut IoStreams::new(&mut out, &mut err),
            )
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(out, b"caf\xe9");
    }

    #[cfg(unix)]
    #[test]
    fn test_nul_in_assignment_does_not_break_later_commands() {
        let mut sh = Interpreter::new(
            Environment::from_vars([("PATH", "/bin:/usr/bin")]),
            ShellConfig::default(),
        );
        let mut out: Vec<u8> = Vec::new();
        let mut err: Vec<u8> = Vec::new();
        let code = sh
            .run(
                Cursor::new(b"X=a\x00b\nsh -c 'echo ok; printf %s \"$X\"'\n".to_vec()),
                &mut IoStreams::new(&mut out, &mut err),
            )
            .unwrap();
        assert_eq!(code, 0, "stderr: {}", String::from_utf8_lossy(&err));
        assert_eq!(out, b"ok\na");
        assert!(err.is_empty());
    }
}
