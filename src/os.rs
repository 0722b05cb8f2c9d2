// src/os.rs

//! Operating-system family detection.
//!
//! This is a plain function of the compile target. Anything that behaves
//! differently per platform (script resolution, shell wrappers) takes an
//! [`OsFamily`] argument instead of looking it up itself, so tests can ask
//! for the other family's behaviour on any host.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Unix,
    Windows,
}

impl OsFamily {
    /// Family of the platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Unix
        }
    }

    /// File extension used for shell scripts on this family.
    pub fn script_extension(self) -> &'static str {
        match self {
            OsFamily::Unix => "sh",
            OsFamily::Windows => "bat",
        }
    }

    /// Interpreter (program + leading args) that runs a script file.
    pub fn script_interpreter(self) -> (&'static str, &'static [&'static str]) {
        match self {
            OsFamily::Unix => ("sh", &[]),
            OsFamily::Windows => ("cmd", &["/C"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_matches_target() {
        let expected = if cfg!(windows) { OsFamily::Windows } else { OsFamily::Unix };
        assert_eq!(OsFamily::current(), expected);
    }

    #[test]
    fn script_extension_per_family() {
        assert_eq!(OsFamily::Unix.script_extension(), "sh");
        assert_eq!(OsFamily::Windows.script_extension(), "bat");
    }
}
