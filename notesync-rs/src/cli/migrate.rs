//! Migrate command.

use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::migrate::SchemaMigrator;
use crate::store::Store;

/// Run the schema migration and print its report.
pub fn run<S: Store + ?Sized>(store: &mut S, dry_run: bool, output: &Output) -> Result<ExitCode> {
    let report = SchemaMigrator::new().dry_run(dry_run).migrate(store)?;
    output.print(&report)?;

    if dry_run && report.migrated > 0 {
        output.info(&format!("{} file(s) would be migrated", report.migrated));
    }

    if report.failed > 0 {
        Ok(ExitCode::MigrationIssues)
    } else {
        Ok(ExitCode::Success)
    }
}
