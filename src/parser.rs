use crate::lexer::{self, os_word};
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid")
});

/// A classified input line.
///
/// Represents what a single line asks the shell to do. A line is either
/// malformed, blank, a single variable assignment or a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// The line could not be tokenized. Contains a human-readable message.
    ParseError(String),

    /// The line is empty or consists of whitespace only.
    Empty,

    /// A **variable assignment** statement in the form `name=value`.
    ///
    /// Only produced for a line made of exactly one word whose part before the
    /// first `=` is a valid variable name.
    Assignment {
        /// The name of the variable being assigned.
        name: String,
        /// Everything after the first `=`, byte for byte. May be empty or contain more `=`.
        value: OsString,
    },

    /// A **simple command**: `argv[0]` is the command name, the rest are its arguments.
    /// Never empty.
    Command(Vec<OsString>),
}

/// Checks that `name` is a valid environment variable name: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

fn split_assignment(word: &OsStr) -> Option<(String, OsString)> {
    let bytes = word.as_encoded_bytes();
    let eq = bytes.iter().position(|&b| b == b'=')?;
    let name = std::str::from_utf8(&bytes[..eq]).ok()?;
    is_valid_name(name).then(|| (name.to_string(), os_word(bytes[eq + 1..].to_vec())))
}

/// Classifies a list of words produced by the lexer.
///
/// * no words → [`ParsedLine::Empty`]
/// * one `NAME=VALUE` word with a valid name → [`ParsedLine::Assignment`]
/// * anything else → [`ParsedLine::Command`] with the words unchanged, so `1BAD=xx`
///   or `FOO=bar cmd` are commands.
pub fn classify(tokens: Vec<OsString>) -> ParsedLine {
    if tokens.is_empty() {
        return ParsedLine::Empty;
    }

    if let [word] = tokens.as_slice() {
        if let Some((name, value)) = split_assignment(word) {
            return ParsedLine::Assignment { name, value };
        }
    }

    ParsedLine::Command(tokens)
}

/// Tokenizes and classifies a raw input line.
///
/// Lexing failures are not returned as `Err`: they become [`ParsedLine::ParseError`]
/// so the caller handles every line the same way.
pub fn parse_line(line: impl AsRef<[u8]>) -> ParsedLine {
    let line = line.as_ref();
    let parsed = match lexer::tokenize(line) {
        Ok(tokens) => classify(tokens),
        Err(e) => ParsedLine::ParseError(e.to_string()),
    };
    log::debug!("parsed {:?} as {parsed:?}", String::from_utf8_lossy(line));
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> ParsedLine {
        ParsedLine::Command(words.iter().map(OsString::from).collect())
    }

    fn assignment(name: &str, value: &str) -> ParsedLine {
        ParsedLine::Assignment {
            name: name.to_string(),
            value: value.into(),
        }
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("FOO"));
        assert!(is_valid_name("_"));
        assert!(is_valid_name("_a1"));
        assert!(is_valid_name("lower_CASE_9"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1BAD"));
        assert!(!is_valid_name("A-B"));
        assert!(!is_valid_name("A B"));
        assert!(!is_valid_name("ÄBC"));
    }

    #[test]
    fn test_assignment() {
        assert_eq!(parse_line("FOO=bar"), assignment("FOO", "bar"));
    }

    #[test]
    fn test_assignment_empty_value() {
        assert_eq!(parse_line("FOO="), assignment("FOO", ""));
    }

    #[test]
    fn test_assignment_value_keeps_extra_equals() {
        assert_eq!(parse_line("OPTS=a=b=c"), assignment("OPTS", "a=b=c"));
    }

    #[test]
    fn test_assignment_with_quoted_value() {
        assert_eq!(parse_line("GREETING='hello world'"), assignment("GREETING", "hello world"));
    }

    #[test]
    fn test_invalid_name_is_command() {
        assert_eq!(parse_line("1BAD=xx"), argv(&["1BAD=xx"]));
        assert_eq!(parse_line("=value"), argv(&["=value"]));
    }

    #[test]
    fn test_assignment_with_other_words_is_command() {
        assert_eq!(parse_line("FOO=bar env"), argv(&["FOO=bar", "env"]));
        assert_eq!(parse_line("env FOO=bar"), argv(&["env", "FOO=bar"]));
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_line(""), ParsedLine::Empty);
        assert_eq!(parse_line("   \t"), ParsedLine::Empty);
        assert_eq!(classify(Vec::new()), ParsedLine::Empty);
    }

    #[test]
    fn test_empty_quoted_word_is_command() {
        assert_eq!(parse_line("\"\""), argv(&[""]));
    }

    #[test]
    fn test_lexing_error_becomes_parse_error() {
        match parse_line("echo 'oops") {
            ParsedLine::ParseError(msg) => assert!(msg.contains("Unterminated")),
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_assignment_value_keeps_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;
        match parse_line(b"RAW=caf\xe9\x00x") {
            ParsedLine::Assignment { name, value } => {
                assert_eq!(name, "RAW");
                assert_eq!(value.as_bytes(), b"caf\xe9\x00x");
            }
            other => panic!("Expected Assignment, got {:?}", other),
        }
    }
}
