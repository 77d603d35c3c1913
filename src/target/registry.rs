//! Fixed per-architecture target configurations.

use crate::core::BackendError;
use inkwell::targets::TargetMachine;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Static facts about one target architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    /// LLVM target triple, e.g. `or1k-linux`.
    pub triple: Cow<'static, str>,
    /// LLVM data layout; empty means the target machine's default.
    pub data_layout: &'static str,
    /// CPU features, enabled in this order.
    pub features: &'static [&'static str],
    /// Name of the runtime's `printf`-like formatting entry point.
    pub print_function: &'static str,
}

const OR1K: TargetSpec = TargetSpec {
    triple: Cow::Borrowed("or1k-linux"),
    data_layout: "E-m:e-p:32:32-i8:8:8-i16:16:16-i64:32:32-\
                  f64:32:32-v64:32:32-v128:32:32-a0:0:32-n32",
    features: &["mul", "div", "ffl1", "cmov", "addc"],
    print_function: "core_log",
};

const RISCV32: TargetSpec = TargetSpec {
    triple: Cow::Borrowed("riscv32-unknown-linux"),
    data_layout: "e-m:e-p:32:32-i64:64-n32-S128",
    features: &["m", "a"],
    print_function: "core_log",
};

/// The closed set of supported targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Whatever machine the build runs on.
    Native,
    /// OpenRISC 1000 soft CPU.
    Or1k,
    /// 32-bit RISC-V soft CPU.
    Riscv32,
}

impl TargetKind {
    pub const ALL: [TargetKind; 3] = [TargetKind::Native, TargetKind::Or1k, TargetKind::Riscv32];

    pub fn spec(self) -> TargetSpec {
        match self {
            TargetKind::Native => TargetSpec {
                triple: Cow::Owned(
                    TargetMachine::get_default_triple()
                        .as_str()
                        .to_string_lossy()
                        .into_owned(),
                ),
                data_layout: "",
                features: &[],
                print_function: "printf",
            },
            TargetKind::Or1k => OR1K,
            TargetKind::Riscv32 => RISCV32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetKind::Native => "native",
            TargetKind::Or1k => "or1k",
            TargetKind::Riscv32 => "riscv32",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| BackendError::UnknownTarget(s.to_string()))
    }
}
