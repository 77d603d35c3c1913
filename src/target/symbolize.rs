//! Backtrace reconstruction from `addr2line` output.
//!
//! The resolver is run with `--addresses --functions --inlines`, which prints
//! one record per frame:
//!
//! ```text
//! 0x00001003        <- root frame: address
//! inner             <- function
//! util.h:4          <- location
//! outer             <- inlined caller: function, no address
//! main.c:10         <- location
//! ```

use crate::core::{BackendError, BackendResult};
use std::fmt;

/// Column reported for every frame; `addr2line` cannot provide one.
pub const UNKNOWN_COLUMN: i64 = -1;

/// Filenames the resolver prints for frames without a source position.
const UNRESOLVED_FILENAMES: &[&str] = &["??", "<synthesized>"];

/// One symbolized frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktraceEntry {
    pub filename: String,
    pub line: u32,
    pub column: i64,
    pub function: String,
    /// The return address as reported by the caller, not the adjusted one.
    pub address: u64,
}

impl fmt::Display for BacktraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{} ({:#x})",
            self.function, self.filename, self.line, self.address
        )
    }
}

/// Turn return addresses into lookup addresses inside the call instruction.
pub fn lookup_addresses(addresses: &[u64]) -> Vec<String> {
    addresses
        .iter()
        .map(|address| format!("{:#x}", address.wrapping_sub(1)))
        .collect()
}

/// Parse resolver output into backtrace entries.
///
/// Frames located in `??` or `<synthesized>` are dropped, so the result may
/// be shorter than the list of addresses that was resolved.
pub fn parse_resolver_output(output: &str) -> BackendResult<Vec<BacktraceEntry>> {
    let output = output.trim_end();
    if output.is_empty() {
        return Ok(Vec::new());
    }

    let mut lines = output.split('\n').enumerate().map(|(idx, line)| (idx + 1, line));
    let mut backtrace: Vec<BacktraceEntry> = Vec::new();

    while let Some((lineno, address_or_function)) = lines.next() {
        let (address, function) = match address_or_function.strip_prefix("0x") {
            Some(hex) => {
                let adjusted = u64::from_str_radix(hex, 16).map_err(|e| {
                    BackendError::malformed(lineno, format!("bad address {address_or_function:?}: {e}"))
                })?;
                let address = adjusted.wrapping_add(1);
                let (_, function) = lines
                    .next()
                    .ok_or_else(|| BackendError::malformed(lineno, "missing function name"))?;
                (address, function)
            }
            None => {
                // Inlined frames belong to the most recently emitted entry.
                let address = backtrace.last().map(|entry| entry.address).ok_or_else(|| {
                    BackendError::malformed(lineno, "inlined frame before any emitted entry")
                })?;
                (address, address_or_function)
            }
        };

        let (lineno, location) = lines
            .next()
            .ok_or_else(|| BackendError::malformed(lineno, "missing location"))?;
        let (filename, line) = parse_location(lineno, location)?;
        if UNRESOLVED_FILENAMES.contains(&filename) {
            continue;
        }

        backtrace.push(BacktraceEntry {
            filename: filename.to_string(),
            line,
            column: UNKNOWN_COLUMN,
            function: function.to_string(),
            address,
        });
    }

    Ok(backtrace)
}

fn parse_location(lineno: usize, location: &str) -> BackendResult<(&str, u32)> {
    // addr2line appends " (discriminator N)" for some locations.
    let location = match location.find(" (discriminator ") {
        Some(pos) => &location[..pos],
        None => location,
    };
    let (filename, line) = location
        .rsplit_once(':')
        .ok_or_else(|| BackendError::malformed(lineno, format!("bad location {location:?}")))?;
    let line = match line {
        "?" => 0,
        line => line.parse().map_err(|e| {
            BackendError::malformed(lineno, format!("bad line number {line:?}: {e}"))
        })?,
    };
    Ok((filename, line))
}
