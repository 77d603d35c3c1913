//! firmlink - kernel backend driver for embedded control targets.
//!
//! firmlink takes modules produced by a kernel front-end, lowers them to
//! LLVM IR, verifies and optimizes them, emits relocatable objects and links
//! them into a shared image with the target's external toolchain. After a
//! crash it maps raw return addresses in that image back to source
//! locations, inlined frames included.
//!
//! # Primary Usage
//!
//! ```ignore
//! use firmlink::{LlvmTextModule, NativeModule, Target, TargetKind};
//!
//! let target = Target::new(TargetKind::Or1k);
//! let module = LlvmTextModule::from_file("kernel.ll")?;
//! let image = target.compile_and_link(&[&module as &dyn NativeModule])?;
//!
//! for frame in target.symbolize(&image, &[0x4000_1234])? {
//!     println!("{frame}");
//! }
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Configuration, errors, diagnostic dumps, tool invocation
//! - [`target`] - Target registry and the compile/link/symbolize pipeline
//! - [`module`] - The boundary to the front-end

pub mod core;
pub mod module;
pub mod target;

pub use core::{
    BackendConfig, BackendError, BackendResult, DumpConfig, DumpContent, DumpTarget,
    ToolInvocation, ToolResults,
};
pub use module::{LlvmTextModule, NativeModule};
pub use target::{
    init, BacktraceEntry, CompiledObject, LinkedImage, Target, TargetKind, TargetSpec,
    UNKNOWN_COLUMN,
};
