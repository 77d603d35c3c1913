// This module provides Target, the description of the environment kernels are deployed to,
// together with the whole build pipeline that runs against it. A Target pairs the static
// facts of one architecture (triple, data layout, CPU features, print function) with an
// owned LLVM context for the build session. The pipeline lowers front-end modules into
// that context, re-parses and verifies the generated IR (dumping it unconditionally when it
// is broken), runs a fixed optimization pipeline, emits relocatable objects through an LLVM
// target machine, and hands objects to the external linker and stripper. Crash addresses
// from a linked image are resolved back to source with the external addr2line, including
// inlined frames, and symbol names are demangled with c++filt. Every stage either returns
// a well-formed artifact or a typed BackendError; diagnostic dumps land on disk before any
// error propagates.

//! Targets and the compile / link / symbolize pipeline.
//!
//! ```ignore
//! use firmlink::{LlvmTextModule, NativeModule, Target, TargetKind};
//!
//! let target = Target::new(TargetKind::Or1k);
//! let module = LlvmTextModule::from_file("kernel.ll")?;
//! let image = target.compile_and_link(&[&module as &dyn NativeModule])?;
//! let image = target.strip(&image)?;
//! ```

pub mod artifact;
pub mod pipeline;
pub mod registry;
pub mod symbolize;

pub use artifact::{CompiledObject, LinkedImage};
pub use registry::{TargetKind, TargetSpec};
pub use symbolize::{BacktraceEntry, UNKNOWN_COLUMN};

use crate::core::{dump, BackendConfig, BackendError, BackendResult, DumpTarget, ToolInvocation};
use crate::module::NativeModule;
use inkwell::context::Context;
use inkwell::memory_buffer::MemoryBuffer;
use inkwell::module::Module;
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target as LlvmTarget, TargetMachine,
    TargetTriple,
};
use inkwell::OptimizationLevel;
use std::ffi::{c_char, c_int, CString};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize LLVM for every target this crate can build for.
///
/// Runs once per process; later calls return immediately. [`Target`]
/// construction calls it, so calling it explicitly is only needed when
/// LLVM is used before the first target is created.
pub fn init() {
    INIT.call_once(|| {
        LlvmTarget::initialize_all(&InitializationConfig::default());

        let threshold = match CString::new(pipeline::inline_threshold_option()) {
            Ok(option) => option,
            Err(e) => {
                log::warn!("inline threshold not applied: {e}");
                return;
            }
        };
        let argv: [*const c_char; 2] = [c"firmlink".as_ptr(), threshold.as_ptr()];
        // SAFETY: argv holds two valid NUL-terminated strings that outlive
        // the call, and option parsing is serialized by INIT.
        unsafe {
            llvm_sys::support::LLVMParseCommandLineOptions(
                argv.len() as c_int,
                argv.as_ptr(),
                c"firmlink backend".as_ptr(),
            );
        }
        log::debug!(
            "LLVM initialized, inline threshold {}",
            pipeline::INLINE_THRESHOLD
        );
    });
}

/// A build environment for one architecture.
///
/// Static facts never change after construction. The LLVM context lives as
/// long as the target; modules returned by [`Target::compile`] borrow it.
pub struct Target {
    kind: TargetKind,
    spec: TargetSpec,
    context: Context,
    config: BackendConfig,
}

impl Target {
    /// Create a target configured from the environment.
    pub fn new(kind: TargetKind) -> Self {
        Self::with_config(kind, BackendConfig::from_env())
    }

    pub fn with_config(kind: TargetKind, config: BackendConfig) -> Self {
        init();
        Self {
            kind,
            spec: kind.spec(),
            context: Context::create(),
            config,
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn triple(&self) -> &str {
        &self.spec.triple
    }

    pub fn data_layout(&self) -> &str {
        self.spec.data_layout
    }

    pub fn features(&self) -> &[&'static str] {
        self.spec.features
    }

    pub fn print_function(&self) -> &str {
        self.spec.print_function
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Command name of a toolchain utility for this target, e.g. `or1k-linux-ld`.
    pub fn tool(&self, name: &str) -> String {
        let program = format!("{}-{}", self.triple(), name);
        match &self.config.tool_dir {
            Some(dir) => dir.join(program).to_string_lossy().into_owned(),
            None => program,
        }
    }

    pub fn target_machine(&self) -> BackendResult<TargetMachine> {
        let triple = TargetTriple::create(self.triple());
        let target = LlvmTarget::from_triple(&triple)
            .map_err(|e| BackendError::llvm("target lookup", e))?;

        let features = self
            .features()
            .iter()
            .map(|feature| format!("+{feature}"))
            .collect::<Vec<_>>()
            .join(",");

        let machine = target
            .create_target_machine(
                &triple,
                "",
                &features,
                OptimizationLevel::Default,
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| {
                BackendError::llvm(
                    "target machine creation",
                    format!("no target machine for {}", self.triple()),
                )
            })?;
        machine.set_asm_verbosity(true);
        Ok(machine)
    }

    /// Lower, verify and optimize one module.
    ///
    /// Generated IR is printed and re-parsed before verification so that the
    /// optimizer only ever sees IR that round-trips through LLVM's parser.
    /// Broken IR is always dumped to a temporary file.
    pub fn compile(&self, module: &dyn NativeModule) -> BackendResult<Module<'_>> {
        let dumps = &self.config.dumps;
        log::debug!("compiling {} for {}", module.name(), self.triple());

        dump(&dumps.signature, "Module signature", "_sig.txt", || {
            Ok(module.signature())
        })?;
        dump(&dumps.ir, "Kernel IR", ".txt", || Ok(module.ir_text()))?;

        let generated = module.build_llvm_ir(self)?;
        let generated_text = generated.print_to_string().to_string();

        let parsed = match self.parse_and_verify(&generated_text, module.name()) {
            Ok(parsed) => parsed,
            Err(reason) => {
                let dump_path = dump(&DumpTarget::TempFile, "LLVM IR (broken)", ".ll", || {
                    Ok(generated_text.as_str())
                })
                .unwrap_or_else(|e| {
                    log::warn!("cannot dump broken LLVM IR: {e}");
                    None
                });
                return Err(BackendError::Verification {
                    reason,
                    dump: dump_path,
                });
            }
        };

        dump(&dumps.unoptimized_llvm, "LLVM IR (generated)", "_unopt.ll", || {
            Ok(parsed.print_to_string().to_string())
        })?;

        self.optimize(&parsed)?;

        dump(&dumps.optimized_llvm, "LLVM IR (optimized)", ".ll", || {
            Ok(parsed.print_to_string().to_string())
        })?;

        Ok(parsed)
    }

    fn parse_and_verify(&self, text: &str, name: &str) -> Result<Module<'_>, String> {
        let buffer = MemoryBuffer::create_from_memory_range_copy(text.as_bytes(), name);
        let parsed = self
            .context
            .create_module_from_ir(buffer)
            .map_err(|e| e.to_string())?;
        parsed.verify().map_err(|e| e.to_string())?;
        Ok(parsed)
    }

    /// Run the fixed optimization pipeline over `module` in place.
    pub fn optimize(&self, module: &Module<'_>) -> BackendResult<()> {
        let machine = self.target_machine()?;
        if module.get_data_layout().as_str().to_bytes().is_empty() {
            module.set_data_layout(&machine.get_target_data().get_data_layout());
        }

        let passes = pipeline::pass_pipeline();
        log::debug!("running passes: {passes}");
        module
            .run_passes(&passes, &machine, PassBuilderOptions::create())
            .map_err(|e| BackendError::llvm("optimization", e))
    }

    /// Emit a relocatable object for an optimized module.
    pub fn assemble(&self, module: &Module<'_>) -> BackendResult<CompiledObject> {
        let machine = self.target_machine()?;

        dump(&self.config.dumps.assembly, "Assembly", ".s", || {
            machine
                .write_to_memory_buffer(module, FileType::Assembly)
                .map(|buffer| String::from_utf8_lossy(buffer.as_slice()).into_owned())
                .map_err(|e| BackendError::llvm("assembly emission", e))
        })?;

        let buffer = machine
            .write_to_memory_buffer(module, FileType::Object)
            .map_err(|e| BackendError::llvm("object emission", e))?;
        let bytes = buffer.as_slice().to_vec();
        object::File::parse(&*bytes).map_err(|e| BackendError::MalformedObject(e.to_string()))?;

        log::debug!("emitted {} byte object for {}", bytes.len(), self.triple());
        Ok(CompiledObject::from(bytes))
    }

    /// Link relocatable objects into one shared image.
    pub fn link(&self, objects: &[CompiledObject]) -> BackendResult<LinkedImage> {
        let mut pattern = vec![
            self.tool("ld"),
            "-shared".to_string(),
            "--eh-frame-hdr".to_string(),
        ];
        pattern.extend((0..objects.len()).map(|index| format!("{{obj{index}}}")));
        pattern.extend(["-o".to_string(), "{output}".to_string()]);

        let invocation = objects.iter().enumerate().fold(
            ToolInvocation::new(pattern).output("output"),
            |invocation, (index, object)| invocation.input(format!("obj{index}"), object.as_bytes()),
        );
        let results = invocation.run()?;
        let image = LinkedImage::from(results.read("output")?);

        dump(&self.config.dumps.image, "Shared library", ".elf", || {
            Ok(image.as_bytes())
        })?;

        Ok(image)
    }

    pub fn compile_and_link(&self, modules: &[&dyn NativeModule]) -> BackendResult<LinkedImage> {
        let objects = modules
            .iter()
            .map(|module| {
                let compiled = self.compile(*module)?;
                self.assemble(&compiled)
            })
            .collect::<BackendResult<Vec<_>>>()?;
        self.link(&objects)
    }

    /// Remove debug information from a linked image.
    pub fn strip(&self, image: &LinkedImage) -> BackendResult<LinkedImage> {
        let results = ToolInvocation::new([
            self.tool("strip"),
            "--strip-debug".to_string(),
            "{library}".to_string(),
            "-o".to_string(),
            "{output}".to_string(),
        ])
        .input("library", image.as_bytes())
        .output("output")
        .run()?;
        Ok(LinkedImage::from(results.read("output")?))
    }

    /// Resolve return addresses in `image` to source locations.
    ///
    /// Entries are ordered innermost frame first; frames inlined at an
    /// address follow the frame that inlines them and share its address.
    pub fn symbolize(
        &self,
        image: &LinkedImage,
        addresses: &[u64],
    ) -> BackendResult<Vec<BacktraceEntry>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let mut pattern = vec![
            self.tool("addr2line"),
            "--addresses".to_string(),
            "--functions".to_string(),
            "--inlines".to_string(),
            "--demangle".to_string(),
            "--exe={library}".to_string(),
        ];
        pattern.extend(symbolize::lookup_addresses(addresses));

        let results = ToolInvocation::new(pattern)
            .input("library", image.as_bytes())
            .run()?;
        symbolize::parse_resolver_output(results.stdout())
    }

    /// Demangle symbol names, preserving length and order.
    pub fn demangle<S: AsRef<str>>(&self, names: &[S]) -> BackendResult<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        // "--" keeps names such as "-[Foo bar]" from being read as options.
        let pattern = [self.tool("c++filt"), "--".to_string()]
            .into_iter()
            .chain(names.iter().map(|name| name.as_ref().to_string()));
        let results = ToolInvocation::new(pattern).run()?;

        let stdout = results.stdout();
        let demangled: Vec<String> = stdout
            .strip_suffix('\n')
            .unwrap_or(stdout)
            .split('\n')
            .map(str::to_string)
            .collect();
        if demangled.len() != names.len() {
            return Err(BackendError::malformed(
                demangled.len(),
                format!("expected {} demangled names, got {}", names.len(), demangled.len()),
            ));
        }
        Ok(demangled)
    }
}
