//! Index command.

use crate::cache::{IdentityIndex, IndexRow};
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::store::Store;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct IndexResult {
    count: usize,
    entries: Vec<IndexRow>,
}

/// Print every synced file keyed by identity and kind.
pub fn run<S: Store + ?Sized>(store: &S, output: &Output) -> Result<ExitCode> {
    let index = IdentityIndex::build(store)?;
    output.print(&IndexResult {
        count: index.len(),
        entries: index.rows(),
    })?;
    Ok(ExitCode::Success)
}
