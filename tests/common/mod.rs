//! Recorded stand-ins for the external toolchain.
//!
//! Each tool is a small shell script installed as `<triple>-<tool>` in a
//! temporary directory; targets built by [`FakeToolchain::target`] resolve
//! their tools there. Scripts record their arguments, one per line, in
//! `<tool>.args` next to themselves.

#![allow(dead_code)]

use firmlink::{BackendConfig, Target, TargetKind};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

/// Serializes tests that install and execute scripts. Executing a script
/// while another thread's fork still holds its write descriptor fails with
/// ETXTBSY.
static EXEC_LOCK: Mutex<()> = Mutex::new(());

pub struct FakeToolchain {
    dir: TempDir,
    kind: TargetKind,
    _guard: MutexGuard<'static, ()>,
}

impl FakeToolchain {
    pub fn new(kind: TargetKind) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let guard = EXEC_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Self {
            dir: tempfile::tempdir().unwrap(),
            kind,
            _guard: guard,
        }
    }

    /// Install `body` as the script for `tool`. `$ARGS` in the body expands
    /// to the argument record path.
    pub fn install(&self, tool: &str, body: &str) {
        let triple = kind_triple(self.kind);
        let path = self.dir.path().join(format!("{triple}-{tool}"));
        let args = self.args_path(tool);
        let script = format!(
            "#!/bin/sh\nARGS='{}'\nprintf '%s\\n' \"$@\" > \"$ARGS\"\n{}\n",
            args.display(),
            body
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn args_path(&self, tool: &str) -> PathBuf {
        self.dir.path().join(format!("{tool}.args"))
    }

    /// Arguments of the last run of `tool`.
    pub fn recorded_args(&self, tool: &str) -> Vec<String> {
        fs::read_to_string(self.args_path(tool))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn was_run(&self, tool: &str) -> bool {
        self.args_path(tool).exists()
    }

    pub fn config(&self) -> BackendConfig {
        BackendConfig::default().with_tool_dir(self.dir.path())
    }

    pub fn target(&self) -> Target {
        Target::with_config(self.kind, self.config())
    }
}

fn kind_triple(kind: TargetKind) -> String {
    kind.spec().triple.into_owned()
}
