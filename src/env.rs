use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::{OsStr, OsString};

/// User-level view of the process environment used by the interpreter.
///
/// The variables are captured from the host process once, in [`Environment::new`],
/// and never read from the OS again. Assignments only change this map; child
/// processes receive a copy through [`Environment::snapshot`].
///
/// Values are kept as raw OS strings so bytes assigned on the command line reach
/// child processes unchanged.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, OsString>,
}

impl Environment {
    /// Capture the current process environment into a new `Environment` instance.
    ///
    /// Entries whose name is empty or not valid Unicode are skipped.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars_os() {
            match k.into_string() {
                Ok(k) if k.is_empty() => log::debug!("skipping host variable with an empty name"),
                Ok(k) => {
                    vars.insert(k, v);
                }
                Err(k) => log::debug!("skipping host variable {k:?}: name is not valid Unicode"),
            }
        }
        Self { vars }
    }

    /// Build an environment from explicit pairs, without looking at the host process.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OsString>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Get the value of a variable.
    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(key).map(OsString::as_os_str)
    }

    /// Set or override a variable. The name is not validated here.
    pub fn set(&mut self, key: impl Into<String>, val: impl Into<OsString>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Returns a copy of all variables as `NAME=VALUE` entries, sorted by name.
    pub fn snapshot(&self) -> Vec<OsString> {
        let mut entries: Vec<(&String, &OsString)> = self.vars.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(k, v)| {
                let mut entry = OsString::with_capacity(k.len() + 1 + v.len());
                entry.push(k);
                entry.push("=");
                entry.push(v);
                entry
            })
            .collect()
    }
}
