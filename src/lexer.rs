//! Lexical analysis (tokenization) of a single command line.
//!
//! The lexer splits a line into argv-style words. Single and double quotes group
//! characters into one word and are dropped from the result; there are no escape
//! sequences and no substitutions.
//!
//! Lines are treated as raw bytes. Only ASCII quotes and whitespace are special, so
//! any other byte (including invalid UTF-8) ends up in a word unchanged.

use std::ffi::OsString;
use thiserror::Error;

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("Unterminated quote")]
    UnfinishedQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Normal,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM<'a> {
    input: std::slice::Iter<'a, u8>,
    state: LexingState,
    buffer: Vec<u8>,
    // Set once a word has started, even if nothing was collected yet (`""`).
    in_word: bool,
}

impl<'a> LexingFSM<'a> {
    /// Creates a new instance of the lexical analysis Finite State Machine.
    ///
    /// # Arguments
    /// * `line` - The input bytes to be lexed.
    fn new(line: &'a [u8]) -> Self {
        LexingFSM {
            input: line.iter(),
            state: LexingState::Normal,
            buffer: Vec::new(),
            in_word: false,
        }
    }

    /// Performs lexical analysis on the input and returns the list of words.
    ///
    /// # Returns
    /// A `Result<Vec<OsString>, LexingError>`: the words on success, or a `LexingError`
    /// if a quote is left open. No partial result is returned on error.
    fn make_tokens(mut self) -> Result<Vec<OsString>, LexingError> {
        let mut out = Vec::new();

        while let Some(&byte) = self.input.next() {
            match self.state {
                LexingState::Normal => self.handle_normal(byte, &mut out),
                LexingState::ReadingSingleQuote => self.handle_quoted(byte, b'\''),
                LexingState::ReadingDoubleQuote => self.handle_quoted(byte, b'"'),
            }
        }

        if self.state != LexingState::Normal {
            return Err(LexingError::UnfinishedQuote);
        }

        self.finalize_word(&mut out);
        Ok(out)
    }

    fn handle_normal(&mut self, byte: u8, out: &mut Vec<OsString>) {
        match byte {
            b'\'' => {
                self.state = LexingState::ReadingSingleQuote;
                self.in_word = true;
            }
            b'"' => {
                self.state = LexingState::ReadingDoubleQuote;
                self.in_word = true;
            }
            b if is_blank(b) => self.finalize_word(out),
            b => {
                self.buffer.push(b);
                self.in_word = true;
            }
        }
    }

    // The closing quote returns to Normal but keeps the word open, so `'a'"b"` is `ab`.
    fn handle_quoted(&mut self, byte: u8, closing: u8) {
        if byte == closing {
            self.state = LexingState::Normal;
        } else {
            self.buffer.push(byte);
        }
    }

    fn finalize_word(&mut self, out: &mut Vec<OsString>) {
        if self.in_word {
            out.push(os_word(std::mem::take(&mut self.buffer)));
            self.in_word = false;
        }
    }
}

/// Whitespace as classified by the C locale: space, `\t`, `\n`, `\v`, `\f` and `\r`.
pub(crate) fn is_blank(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == 0x0b
}

/// Turns the raw bytes of a word into an OS string without altering them.
#[cfg(unix)]
pub(crate) fn os_word(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

/// Turns the raw bytes of a word into an OS string. Invalid UTF-8 is replaced.
#[cfg(not(unix))]
pub(crate) fn os_word(bytes: Vec<u8>) -> OsString {
    match String::from_utf8(bytes) {
        Ok(word) => word.into(),
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned().into(),
    }
}

/// The main entry point function to perform lexical analysis.
///
/// Creates and runs the finite state machine to tokenize the input line.
///
/// # Arguments
/// * `line` - The bytes of one line, without its line terminator.
///
/// # Returns
/// `Result<Vec<OsString>, LexingError>`: the words of the line, or
/// [`LexingError::UnfinishedQuote`] if a quote is never closed.
pub fn tokenize(line: &[u8]) -> Result<Vec<OsString>, LexingError> {
    LexingFSM::new(line).make_tokens()
}
