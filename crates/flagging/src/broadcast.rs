//! Fan-out of group verdicts onto table rows.
//!
//! Two passes: [`broadcast`] copies each group's verdict onto the per-row
//! [`FlagSet`]s through the membership index, then [`write_direction_columns`]
//! materialises one direction's tuple as table columns.

use insider_core::{Cell, Direction, FlagColumns, FlagSet, GroupKey, GroupVerdict, Result, Table};
use std::collections::BTreeMap;

/// Copy verdicts onto member rows for one direction.
///
/// Rows outside every evaluated group keep their current (default) tuple.
/// Returns the number of rows that received a matched verdict.
pub fn broadcast(
    flags: &mut [FlagSet],
    direction: Direction,
    membership: &BTreeMap<GroupKey, Vec<usize>>,
    verdicts: &BTreeMap<GroupKey, GroupVerdict>,
) -> usize {
    let mut flagged = 0;
    for (key, verdict) in verdicts {
        let Some(rows) = membership.get(key) else {
            continue;
        };
        for &row in rows {
            let Some(flag) = flags.get_mut(row) else {
                continue;
            };
            *flag.get_mut(direction) = verdict.clone();
            if verdict.matched {
                flagged += 1;
            }
        }
    }
    flagged
}

/// Write the five flag columns of one direction.
pub fn write_direction_columns(table: &mut Table, direction: Direction, flags: &[FlagSet]) -> Result<()> {
    write_columns(table, direction.columns(), flags.iter().map(|f| f.get(direction)))
}

/// Write a verdict per row under the given column names, overwriting existing
/// columns of the same name.
pub(crate) fn write_columns<'a>(
    table: &mut Table,
    names: FlagColumns,
    verdicts: impl Iterator<Item = &'a GroupVerdict>,
) -> Result<()> {
    let verdicts: Vec<&GroupVerdict> = verdicts.collect();
    table.set_column(names.coordinated, verdicts.iter().map(|v| Cell::Bool(v.matched)).collect())?;
    table.set_column(
        names.parties,
        verdicts.iter().map(|v| Cell::Int(i64::from(v.distinct_parties))).collect(),
    )?;
    table.set_column(names.span_abs, verdicts.iter().map(|v| Cell::Float(v.span_abs)).collect())?;
    table.set_column(names.span_pct, verdicts.iter().map(|v| Cell::Float(v.span_pct)).collect())?;
    table.set_column(names.basis, verdicts.iter().map(|v| Cell::Text(v.basis.clone())).collect())?;
    Ok(())
}

/// Read one direction's tuple back from the table (test and audit helper).
pub fn read_verdict(table: &Table, names: FlagColumns, row: usize) -> Option<GroupVerdict> {
    let cell = |name: &str| table.column_index(name).and_then(|c| table.cell(row, c));
    let float = |name: &str| match cell(name)? {
        Cell::Float(x) => Some(*x),
        Cell::Int(i) => Some(*i as f64),
        _ => None,
    };
    Some(GroupVerdict {
        matched: matches!(cell(names.coordinated)?, Cell::Bool(true)),
        distinct_parties: match cell(names.parties)? {
            Cell::Int(i) => u32::try_from(*i).ok()?,
            _ => return None,
        },
        span_abs: float(names.span_abs)?,
        span_pct: float(names.span_pct)?,
        basis: cell(names.basis)?.as_text().unwrap_or_default(),
    })
}
