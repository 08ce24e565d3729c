//! Legacy single-direction column names.
//!
//! Older consumers read `coordinated`, `coordinated_buyers` and the
//! `coord_*` spans. They always mirror the Buy tuple, which is all-default
//! when the Buy pass did not run.

use crate::broadcast::write_columns;
use insider_core::{FlagColumns, FlagSet, Result, Table};

/// Write the legacy aliases of the Buy columns.
pub fn write_legacy_columns(table: &mut Table, flags: &[FlagSet]) -> Result<()> {
    write_columns(table, FlagColumns::LEGACY, flags.iter().map(|f| &f.buy))
}
