//! End-to-end tests of the compile pipeline for the host target.

mod common;

use common::FakeToolchain;
use firmlink::{
    BackendConfig, BackendError, BackendResult, DumpConfig, DumpTarget, LlvmTextModule,
    NativeModule, Target, TargetKind,
};
use inkwell::module::Module;
use object::{File, Object};
use std::fs;

const ADD_MODULE: &str = r#"
define i32 @add(i32 %a, i32 %b) {
entry:
  %sum = add i32 %a, %b
  ret i32 %sum
}
"#;

const INLINE_MODULE: &str = r#"
define internal i32 @square(i32 %x) {
entry:
  %r = mul i32 %x, %x
  ret i32 %r
}

define i32 @kernel(i32 %y) {
entry:
  %r = call i32 @square(i32 %y)
  ret i32 %r
}
"#;

fn native_target() -> Target {
    let _ = env_logger::builder().is_test(true).try_init();
    Target::with_config(TargetKind::Native, BackendConfig::default())
}

/// Produces a function that returns nothing from an `i32` function.
struct BrokenModule;

impl NativeModule for BrokenModule {
    fn name(&self) -> &str {
        "broken"
    }

    fn signature(&self) -> String {
        "define i32 @broken()".to_string()
    }

    fn ir_text(&self) -> String {
        String::new()
    }

    fn build_llvm_ir<'ctx>(&self, target: &'ctx Target) -> BackendResult<Module<'ctx>> {
        let context = target.context();
        let module = context.create_module("broken");
        let i32_type = context.i32_type();
        let function = module.add_function("broken", i32_type.fn_type(&[], false), None);
        let entry = context.append_basic_block(function, "entry");
        let builder = context.create_builder();
        builder.position_at_end(entry);
        builder.build_return(None).unwrap();
        Ok(module)
    }
}

#[test]
fn test_compile_and_assemble_native_object() {
    let target = native_target();
    let module = LlvmTextModule::new("add", ADD_MODULE);

    let compiled = target.compile(&module).unwrap();
    assert!(compiled.get_function("add").is_some());

    let object = target.assemble(&compiled).unwrap();
    let file = File::parse(object.as_bytes()).unwrap();
    assert!(file.section_by_name(".text").is_some());
    assert!(file.symbol_by_name("add").is_some());
}

#[test]
fn test_optimizer_inlines_internal_helpers() {
    let target = native_target();
    let module = LlvmTextModule::new("inline", INLINE_MODULE);

    let compiled = target.compile(&module).unwrap();
    let text = compiled.print_to_string().to_string();
    assert!(compiled.get_function("kernel").is_some());
    assert!(!text.contains("call "), "call survived optimization:\n{text}");
    assert!(!text.contains("@square"), "dead helper survived:\n{text}");
}

#[test]
fn test_generated_module_carries_target_triple() {
    let target = native_target();
    let module = LlvmTextModule::new("add", ADD_MODULE);

    let compiled = target.compile(&module).unwrap();
    assert_eq!(
        compiled.get_triple().as_str().to_string_lossy(),
        target.triple()
    );
}

#[test]
fn test_verification_failure_dumps_broken_ir() {
    let target = native_target();

    let err = target.compile(&BrokenModule).unwrap_err();
    let dump = match err {
        BackendError::Verification { dump, .. } => dump,
        other => panic!("expected verification error, got {other:?}"),
    };

    let path = dump.expect("broken IR should always be dumped");
    assert!(path.to_string_lossy().ends_with(".ll"));
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("@broken"));
    fs::remove_file(path).unwrap();
}

#[test]
fn test_unparsable_input_is_an_llvm_error() {
    let target = native_target();
    let module = LlvmTextModule::new("garbage", "this is not llvm ir");

    let err = target.compile(&module).unwrap_err();
    assert!(matches!(err, BackendError::Llvm { stage: "IR parsing", .. }));
}

#[test]
fn test_pipeline_checkpoints_are_dumped() {
    let dump_dir = tempfile::tempdir().unwrap();
    let prefix = |name: &str| DumpTarget::Prefix(dump_dir.path().join(name));
    let config = BackendConfig::default().with_dumps(DumpConfig {
        signature: prefix("kernel"),
        ir: prefix("kernel"),
        unoptimized_llvm: prefix("kernel"),
        optimized_llvm: prefix("kernel"),
        assembly: prefix("kernel"),
        image: DumpTarget::Disabled,
    });
    let target = Target::with_config(TargetKind::Native, config);
    let module = LlvmTextModule::new("inline", INLINE_MODULE);

    let compiled = target.compile(&module).unwrap();
    target.assemble(&compiled).unwrap();

    let read = |suffix: &str| fs::read_to_string(dump_dir.path().join(format!("kernel{suffix}"))).unwrap();
    assert_eq!(
        read("_sig.txt"),
        "define internal i32 @square(i32 %x)\ndefine i32 @kernel(i32 %y)"
    );
    assert_eq!(read(".txt"), INLINE_MODULE);
    assert!(read("_unopt.ll").contains("call i32 @square"));
    assert!(!read(".ll").contains("@square"));
    assert!(!read(".s").is_empty());
}

#[test]
fn test_compile_and_link_hands_objects_to_linker() {
    let toolchain = FakeToolchain::new(TargetKind::Native);
    toolchain.install(
        "ld",
        r#"for a in "$@"; do last="$a"; done
cat "$3" > "$last""#,
    );
    let target = toolchain.target();

    let add = LlvmTextModule::new("add", ADD_MODULE);
    let kernel = LlvmTextModule::new("inline", INLINE_MODULE);
    let image = target.compile_and_link(&[&add, &kernel]).unwrap();

    // The fake linker copies the first object through unchanged.
    let file = File::parse(image.as_bytes()).unwrap();
    assert!(file.symbol_by_name("add").is_some());

    let args = toolchain.recorded_args("ld");
    assert_eq!(args.len(), 6);
    assert_eq!(&args[..2], ["-shared", "--eh-frame-hdr"]);
}
