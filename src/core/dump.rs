//! Diagnostic dumps of intermediate artifacts.
//!
//! Content is produced lazily: the closure only runs when the dump target is
//! enabled, so printing a large module costs nothing in normal builds.

use super::config::DumpTarget;
use super::error::BackendResult;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Text or binary payload of a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl DumpContent {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            DumpContent::Text(text) => text.into_bytes(),
            DumpContent::Bytes(bytes) => bytes,
        }
    }
}

impl From<String> for DumpContent {
    fn from(text: String) -> Self {
        DumpContent::Text(text)
    }
}

impl From<&str> for DumpContent {
    fn from(text: &str) -> Self {
        DumpContent::Text(text.to_string())
    }
}

impl From<Vec<u8>> for DumpContent {
    fn from(bytes: Vec<u8>) -> Self {
        DumpContent::Bytes(bytes)
    }
}

impl From<&[u8]> for DumpContent {
    fn from(bytes: &[u8]) -> Self {
        DumpContent::Bytes(bytes.to_vec())
    }
}

/// Write one artifact if `target` asks for it.
///
/// Returns the path written, or `None` when dumping is disabled. `kind` is a
/// human-readable label used in the log; `suffix` is appended to explicit
/// prefixes and used as the extension of temporary files.
pub fn dump<C, F>(
    target: &DumpTarget,
    kind: &str,
    suffix: &str,
    content: F,
) -> BackendResult<Option<PathBuf>>
where
    C: Into<DumpContent>,
    F: FnOnce() -> BackendResult<C>,
{
    if !target.is_enabled() {
        return Ok(None);
    }

    log::info!("====== {} DUMP ======", kind.to_uppercase());
    let bytes = content()?.into().into_bytes();

    let path = match target {
        DumpTarget::Disabled => return Ok(None),
        DumpTarget::TempFile => {
            let (mut file, path) = tempfile::Builder::new()
                .prefix("firmlink-")
                .suffix(suffix)
                .tempfile()?
                .keep()
                .map_err(|e| e.error)?;
            file.write_all(&bytes)?;
            path
        }
        DumpTarget::Prefix(prefix) => {
            let mut path = prefix.clone().into_os_string();
            path.push(suffix);
            let path = PathBuf::from(path);
            File::create(&path)?.write_all(&bytes)?;
            path
        }
    };

    log::info!("{} dumped as {}", kind, path.display());
    Ok(Some(path))
}
