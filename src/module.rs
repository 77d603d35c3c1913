//! The boundary to the front-end.
//!
//! The backend never looks inside a module; it only asks it for its
//! diagnostic views and for LLVM IR built in the target's context.

use crate::core::{BackendError, BackendResult};
use crate::target::Target;
use inkwell::memory_buffer::MemoryBuffer;
use inkwell::module::Module;
use inkwell::targets::{TargetData, TargetTriple};
use std::fs;
use std::io;
use std::path::Path;

/// A front-end module ready to be lowered for a [`Target`].
pub trait NativeModule {
    /// Module name, used for LLVM module identifiers and logs.
    fn name(&self) -> &str;

    /// Human-readable signature of the module's entry points.
    fn signature(&self) -> String;

    /// Textual form of the module before lowering.
    fn ir_text(&self) -> String;

    /// Lower the module into LLVM IR owned by `target`'s context.
    fn build_llvm_ir<'ctx>(&self, target: &'ctx Target) -> BackendResult<Module<'ctx>>;
}

/// A module already expressed as textual LLVM IR.
#[derive(Debug, Clone)]
pub struct LlvmTextModule {
    name: String,
    source: String,
}

impl LlvmTextModule {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());
        Ok(Self::new(name, fs::read_to_string(path)?))
    }
}

impl NativeModule for LlvmTextModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> String {
        self.source
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("define ") || line.starts_with("declare "))
            .map(|line| line.trim_end_matches('{').trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn ir_text(&self) -> String {
        self.source.clone()
    }

    fn build_llvm_ir<'ctx>(&self, target: &'ctx Target) -> BackendResult<Module<'ctx>> {
        let buffer = MemoryBuffer::create_from_memory_range_copy(self.source.as_bytes(), &self.name);
        let module = target
            .context()
            .create_module_from_ir(buffer)
            .map_err(|e| BackendError::llvm("IR parsing", e))?;

        module.set_triple(&TargetTriple::create(target.triple()));
        if !target.data_layout().is_empty() {
            module.set_data_layout(&TargetData::create(target.data_layout()).get_data_layout());
        }
        Ok(module)
    }
}
