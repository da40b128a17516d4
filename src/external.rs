//! Running programs that are not built-ins.
//!
//! The child's stdout and stderr are piped back into the caller's streams by two
//! drain threads while the calling thread waits for the child to terminate.

use crate::command::{ExecOutcome, ExitCode, IoStreams};
use crate::lexer::os_word;
use parking_lot::Mutex;
use std::ffi::{OsStr, OsString};
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

const PIPE_CHUNK_SIZE: usize = 4096;

/// Exit code used when a program cannot be started.
pub const SPAWN_FAILURE_CODE: ExitCode = 127;

/// Runs `argv` as a child process and forwards its output into `io`.
///
/// The child sees only the variables in `env_snapshot` (`NAME=VALUE` entries);
/// `argv[0]` is looked up with the snapshot's `PATH`. A value containing a NUL
/// byte is passed cut at the first NUL. The call blocks until the child has
/// exited and all of its output has been written to `io`.
///
/// Exit codes: the child's own status on normal exit, `128 + N` when killed by
/// signal `N`, and [`SPAWN_FAILURE_CODE`] when it could not be started or waited on.
pub fn run(argv: &[OsString], env_snapshot: &[OsString], io: &mut IoStreams<'_>) -> ExecOutcome {
    let Some((program, args)) = argv.split_first() else {
        return ExecOutcome::code(2);
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .env_clear()
        .envs(env_snapshot.iter().filter_map(|entry| child_var(entry)))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            log::debug!("failed to spawn {program:?}: {e}");
            let program = program.to_string_lossy();
            let reported = if e.kind() == io::ErrorKind::NotFound {
                writeln!(io.err, "{}: command not found", program)
            } else {
                writeln!(io.err, "{}: {}", program, e)
            };
            if let Err(e) = reported.and_then(|_| io.err.flush()) {
                log::warn!("failed to report spawn error: {e}");
            }
            return ExecOutcome::code(SPAWN_FAILURE_CODE);
        }
    };
    log::debug!("spawned {program:?} as pid {}", child.id());

    // Taking the pipes leaves the parent holding only the read ends.
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        log::warn!("child {} was spawned without output pipes", child.id());
        reap(&mut child);
        return ExecOutcome::code(SPAWN_FAILURE_CODE);
    };

    let out = Mutex::new(&mut *io.out);
    let err = Mutex::new(&mut *io.err);

    let status = thread::scope(|s| {
        let out_drain = s.spawn(|| drain(stdout, &out, "stdout"));
        let err_drain = s.spawn(|| drain(stderr, &err, "stderr"));

        let status = child.wait();
        if let Err(e) = &status {
            log::warn!("waiting for child {} failed: {e}", child.id());
            // The drains only finish once the child's pipes close.
            reap(&mut child);
        }

        join_drain(out_drain, "stdout");
        join_drain(err_drain, "stderr");
        status
    });

    let exit_code = match status {
        Ok(status) => exit_code_of(status),
        Err(_) => SPAWN_FAILURE_CODE,
    };
    log::debug!("{program:?} finished with exit code {exit_code}");
    ExecOutcome::code(exit_code)
}

/// Splits a `NAME=VALUE` snapshot entry into the pair handed to the child.
///
/// The OS can't carry a NUL inside a value, so the value ends at the first one.
fn child_var(entry: &OsStr) -> Option<(OsString, OsString)> {
    let bytes = entry.as_encoded_bytes();
    let eq = bytes.iter().position(|&b| b == b'=')?;
    let (name, value) = (&bytes[..eq], &bytes[eq + 1..]);
    if name.is_empty() || name.contains(&0) {
        log::debug!("not passing malformed variable {entry:?}");
        return None;
    }
    let value = match value.iter().position(|&b| b == 0) {
        Some(nul) => {
            log::debug!("value of {entry:?} cut at NUL byte");
            &value[..nul]
        }
        None => value,
    };
    Some((os_word(name.to_vec()), os_word(value.to_vec())))
}

/// Copies `pipe` into `sink` until end of stream, one chunk at a time.
///
/// The lock is only held while a chunk is written, never while reading.
/// Returns the number of bytes forwarded.
fn drain<R: Read, W: Write>(mut pipe: R, sink: &Mutex<W>, label: &str) -> u64 {
    let mut buf = [0u8; PIPE_CHUNK_SIZE];
    let mut forwarded = 0u64;
    let mut sink_failed = false;
    loop {
        let n = match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("{label}: pipe read failed: {e}");
                break;
            }
        };
        if sink_failed {
            // Keep reading so the child never blocks on a full pipe.
            continue;
        }
        let written = {
            let mut sink = sink.lock();
            sink.write_all(&buf[..n]).and_then(|_| sink.flush())
        };
        match written {
            Ok(()) => forwarded += n as u64,
            Err(e) => {
                log::warn!("{label}: forwarding child output failed, discarding the rest: {e}");
                sink_failed = true;
            }
        }
    }
    forwarded
}

fn join_drain(handle: thread::ScopedJoinHandle<'_, u64>, label: &str) {
    match handle.join() {
        Ok(bytes) => log::debug!("{label}: forwarded {bytes} bytes"),
        Err(_) => log::warn!("{label}: drain thread panicked"),
    }
}

fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("kill of child {} failed: {e}", child.id());
    }
    if let Err(e) = child.wait() {
        log::warn!("reaping child {} failed: {e}", child.id());
    }
}

fn exit_code_of(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    match exit_status.signal() {
        Some(signal) => 128 + signal,
        None => SPAWN_FAILURE_CODE,
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    SPAWN_FAILURE_CODE
}
