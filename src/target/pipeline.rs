//! The fixed module optimization pipeline.
//!
//! Order matters: the output of each group feeds the next, and the whole
//! pipeline runs exactly once over a verified module. Target data layout and
//! target transform info come from the target machine handed to
//! `Module::run_passes`; the inliner threshold is pinned during
//! [`crate::init`]. Alias analysis (basic-aa, tbaa) is supplied by LLVM's
//! default AA pipeline, which the pass builder registers for every pass that
//! queries it.

/// Inliner cost threshold.
pub const INLINE_THRESHOLD: u32 = 275;

/// The LLVM command-line option that applies [`INLINE_THRESHOLD`].
pub fn inline_threshold_option() -> String {
    format!("-inline-threshold={INLINE_THRESHOLD}")
}

const ANALYSES: &[&str] = &["function(require<targetir>)"];

/// Clean up after code generation and expose as much as possible to LLVM.
const CLEANUP: &[&str] = &[
    "constmerge",
    "function(simplifycfg)",
    "function(instcombine)",
    "function(sroa)",
    "function(dce)",
    "cgscc(function-attrs)",
    "globalopt",
];

const OPTIMIZE: &[&str] = &[
    "cgscc(inline)",
    "ipsccp",
    "function(instcombine)",
    "function(gvn)",
    "function(simplifycfg)",
    "function(loop-mssa(licm))",
];

const FINAL_CLEANUP: &[&str] = &["deadargelim", "globaldce"];

/// Pass groups in the order they run.
pub fn stages() -> impl Iterator<Item = &'static str> {
    [ANALYSES, CLEANUP, OPTIMIZE, FINAL_CLEANUP]
        .into_iter()
        .flatten()
        .copied()
}

/// The pipeline as a new-pass-manager pipeline description.
pub fn pass_pipeline() -> String {
    stages().collect::<Vec<_>>().join(",")
}
