// src/command.rs

//! The command to supervise: program, arguments, working directory and
//! environment overrides.
//!
//! Arguments are handed to the OS as separate tokens, never through a
//! shell, so no quoting is applied. [`Command::parse`] exists for callers
//! that hold a single command line (config files, CLI strings).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{ProcwardError, Result};
use crate::os::OsFamily;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    env_clear: bool,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
            env_clear: false,
        }
    }

    /// Split a command line into tokens.
    ///
    /// Whitespace separates tokens; single or double quotes group text
    /// (quotes are removed, no escapes inside single quotes, `\"` and `\\`
    /// inside double quotes). There is no variable or glob expansion.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens = tokenize(line)?;
        let mut iter = tokens.into_iter();
        let program = iter
            .next()
            .ok_or_else(|| ProcwardError::ConfigError("empty command line".to_string()))?;
        Ok(Self::new(program).args(iter))
    }

    /// Command that runs `<base>.<ext>` through the family's script
    /// interpreter, e.g. `sh tests/scripts/sleep.sh`.
    pub fn script(base: impl AsRef<Path>, family: OsFamily) -> Self {
        let script = base.as_ref().with_extension(family.script_extension());
        let (interpreter, leading) = family.script_interpreter();
        Self::new(interpreter)
            .args(leading.iter().copied())
            .arg(script.to_string_lossy())
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Start the child with an empty environment plus the overrides.
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn get_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn is_env_cleared(&self) -> bool {
        self.env_clear
    }

    /// Program followed by arguments.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    /// Check the invariants that must hold before launching.
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(ProcwardError::ConfigError(
                "command program must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the tokio command. Stdio is left for the caller to wire.
    pub fn to_tokio_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        if self.env_clear {
            cmd.env_clear();
        }
        cmd.envs(&self.env);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in self.tokens() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            if token.is_empty() || token.contains(char::is_whitespace) {
                write!(f, "\"{}\"", token.replace('"', "\\\""))?;
            } else {
                f.write_str(token)?;
            }
        }
        Ok(())
    }
}

fn tokenize(line: &str) -> Result<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_token = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_token = true;
            }
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, '\\') => match chars.next() {
                Some(next @ ('"' | '\\')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            (_, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote != Quote::None {
        return Err(ProcwardError::ConfigError(format!(
            "unterminated quote in command line: {line}"
        )));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
