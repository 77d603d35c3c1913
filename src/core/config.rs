//! Backend configuration.
//!
//! Every pipeline checkpoint can be dumped for inspection. Each dump switch
//! is tri-state and read from its own environment variable:
//!
//! - unset: no dump
//! - empty: dump into a freshly created temporary file
//! - any other value: dump into `<value><suffix>`
//!
//! The external toolchain is looked up on `PATH` unless a toolchain
//! directory is configured.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

pub const DUMP_SIG_VAR: &str = "FIRMLINK_DUMP_SIG";
pub const DUMP_IR_VAR: &str = "FIRMLINK_DUMP_IR";
pub const DUMP_UNOPT_LLVM_VAR: &str = "FIRMLINK_DUMP_UNOPT_LLVM";
pub const DUMP_LLVM_VAR: &str = "FIRMLINK_DUMP_LLVM";
pub const DUMP_ASM_VAR: &str = "FIRMLINK_DUMP_ASM";
pub const DUMP_ELF_VAR: &str = "FIRMLINK_DUMP_ELF";
pub const TOOLCHAIN_DIR_VAR: &str = "FIRMLINK_TOOLCHAIN_DIR";

/// Where a single diagnostic artifact should go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DumpTarget {
    #[default]
    Disabled,
    /// A new, uniquely named temporary file that is kept after writing.
    TempFile,
    /// An explicit path prefix; the artifact suffix is appended to it.
    Prefix(PathBuf),
}

impl DumpTarget {
    /// Interpret the value of a dump switch.
    pub fn from_value(value: Option<OsString>) -> Self {
        match value {
            None => DumpTarget::Disabled,
            Some(v) if v.is_empty() => DumpTarget::TempFile,
            Some(v) => DumpTarget::Prefix(PathBuf::from(v)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, DumpTarget::Disabled)
    }
}

/// Dump switches for each pipeline checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpConfig {
    /// Module signature, before lowering.
    pub signature: DumpTarget,
    /// Front-end IR, before lowering.
    pub ir: DumpTarget,
    /// LLVM IR as generated, before optimization.
    pub unoptimized_llvm: DumpTarget,
    /// LLVM IR after the optimization pipeline.
    pub optimized_llvm: DumpTarget,
    pub assembly: DumpTarget,
    /// Linked shared image.
    pub image: DumpTarget,
}

impl DumpConfig {
    pub fn from_env() -> Self {
        let read = |name: &str| DumpTarget::from_value(env::var_os(name));
        Self {
            signature: read(DUMP_SIG_VAR),
            ir: read(DUMP_IR_VAR),
            unoptimized_llvm: read(DUMP_UNOPT_LLVM_VAR),
            optimized_llvm: read(DUMP_LLVM_VAR),
            assembly: read(DUMP_ASM_VAR),
            image: read(DUMP_ELF_VAR),
        }
    }
}

/// Configuration shared by every stage of one build session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub dumps: DumpConfig,
    /// Directory holding `<triple>-<tool>` executables. `None` means `PATH`.
    pub tool_dir: Option<PathBuf>,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self {
            dumps: DumpConfig::from_env(),
            tool_dir: env::var_os(TOOLCHAIN_DIR_VAR)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_tool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tool_dir = Some(dir.into());
        self
    }

    pub fn with_dumps(mut self, dumps: DumpConfig) -> Self {
        self.dumps = dumps;
        self
    }
}
