// This module serves as the hub for firmlink's shared infrastructure, the pieces every
// pipeline stage leans on regardless of target architecture: configuration (dump switches
// and toolchain location read from the environment), the error taxonomy, lazy diagnostic
// dumps of intermediate artifacts, and scoped invocation of external toolchain utilities
// whose temporary input and output files never outlive the invocation.

//! Core firmlink infrastructure.
//!
//! # Key Components
//!
//! ## Configuration (`config`)
//! - Tri-state dump switches per pipeline checkpoint
//! - Optional toolchain directory override
//!
//! ## Diagnostic Dumps (`dump`)
//! - Lazily evaluated text or binary content
//! - Temporary or explicitly named output files
//!
//! ## Tool Invocation (`tool`)
//! - Named in-memory buffers materialized as temporary files
//! - Captured standard output and standard error
//! - Guaranteed cleanup on every exit path

pub mod config;
pub mod dump;
pub mod error;
pub mod tool;

pub use config::{BackendConfig, DumpConfig, DumpTarget};
pub use dump::{dump, DumpContent};
pub use error::{BackendError, BackendResult};
pub use tool::{ToolInvocation, ToolResults};
