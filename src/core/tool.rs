//! Scoped invocation of external toolchain utilities.
//!
//! A [`ToolInvocation`] is a command-line pattern plus named byte buffers.
//! Every buffer is materialized as its own uniquely named temporary file and
//! every `{name}` placeholder in the pattern is replaced by that file's path.
//! Outputs the tool writes are declared as empty buffers and read back by
//! name from the returned [`ToolResults`].
//!
//! Temporary files are owned by the invocation and then by its results;
//! they are removed when those are dropped, on success and on every error
//! path alike.
//!
//! ```ignore
//! let results = ToolInvocation::new(["or1k-linux-strip", "--strip-debug", "{library}", "-o", "{output}"])
//!     .input("library", image)
//!     .output("output")
//!     .run()?;
//! let stripped = results.read("output")?;
//! ```

use super::error::{BackendError, BackendResult};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

/// One pending external command.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pattern: Vec<String>,
    files: Vec<(String, Vec<u8>)>,
}

impl ToolInvocation {
    pub fn new<I, S>(pattern: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pattern: pattern.into_iter().map(Into::into).collect(),
            files: Vec::new(),
        }
    }

    /// Materialize `data` as a temporary file substituted for `{name}`.
    pub fn input(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.push((name.into(), data.into()));
        self
    }

    /// Declare an empty temporary file for the tool to write into.
    pub fn output(self, name: impl Into<String>) -> Self {
        self.input(name, Vec::new())
    }

    pub fn program(&self) -> &str {
        self.pattern.first().map(String::as_str).unwrap_or_default()
    }

    /// Run the command to completion and capture its output.
    ///
    /// Fails with [`BackendError::ToolInvocation`] when the tool exits
    /// unsuccessfully, carrying its standard error.
    pub fn run(self) -> BackendResult<ToolResults> {
        let program = self.program().to_string();
        if program.is_empty() {
            return Err(BackendError::ToolSpawn {
                program,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
            });
        }

        let mut files = HashMap::with_capacity(self.files.len());
        for (name, data) in self.files {
            let mut file = tempfile::Builder::new().prefix("firmlink-").tempfile()?;
            file.write_all(&data)?;
            file.flush()?;
            files.insert(name, file);
        }

        let cmdline: Vec<String> = self
            .pattern
            .iter()
            .map(|argument| substitute(argument, &files))
            .collect();
        log::debug!("running {}", cmdline.join(" "));

        let output = Command::new(&cmdline[0])
            .args(&cmdline[1..])
            .stdin(Stdio::null())
            .output()
            .map_err(|source| BackendError::ToolSpawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            log::debug!("{} exited with {}", program, output.status);
            return Err(BackendError::ToolInvocation {
                program,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(ToolResults {
            files,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

fn substitute(argument: &str, files: &HashMap<String, NamedTempFile>) -> String {
    files.iter().fold(argument.to_string(), |acc, (name, file)| {
        acc.replace(
            &format!("{{{name}}}"),
            &file.path().to_string_lossy(),
        )
    })
}

/// Captured results of a successful invocation.
///
/// Holds the temporary files alive; dropping it removes them.
#[derive(Debug)]
pub struct ToolResults {
    files: HashMap<String, NamedTempFile>,
    stdout: String,
}

impl ToolResults {
    /// Standard output of the tool, decoded as UTF-8.
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Path of the temporary file bound to `name`.
    pub fn path(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(NamedTempFile::path)
    }

    /// Current contents of the temporary file bound to `name`.
    pub fn read(&self, name: &str) -> BackendResult<Vec<u8>> {
        let path = self.path(name).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no temporary file named {name}"),
            )
        })?;
        Ok(fs::read(path)?)
    }
}
