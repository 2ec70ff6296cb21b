//! Rebuilding one-to-many aggregates from a flat join
//!
//! A join returns one row per child, each repeating its parent's columns.
//! [`group_by_parent`] cuts that row list into one slice per parent so the
//! caller can build the parent from the first row and one child per row.

use crate::core::error::{MapperError, Result};
use crate::core::value::{DatabaseRow, DatabaseValue};

/// Value of a named column
///
/// # Errors
///
/// `ColumnNotFound` when the row has no such column.
pub fn column<'a>(row: &'a DatabaseRow, name: &str) -> Result<&'a DatabaseValue> {
    row.get(name)
        .ok_or_else(|| MapperError::ColumnNotFound(name.to_string()))
}

/// Group consecutive rows sharing `parent_key` and finalize each group
///
/// Rows must already be sorted by `parent_key`. One group is produced per
/// contiguous run of equal keys, in input order; nothing is sorted here. Debug
/// builds panic when a key reappears after its run ended.
///
/// ```
/// use rust_data_mapper::mapper::join::group_by_parent;
/// use rust_data_mapper::{DatabaseRow, DatabaseValue};
///
/// let row = |id: i64, child: &str| -> DatabaseRow {
///     [("id".to_string(), DatabaseValue::Long(id)), ("child".to_string(), child.into())]
///         .into_iter()
///         .collect()
/// };
/// let rows = vec![row(1, "A"), row(1, "B"), row(2, "C")];
///
/// let groups = group_by_parent(&rows, "id", |group| {
///     Ok(group.iter().map(|r| r["child"].to_string()).collect::<Vec<_>>())
/// })?;
/// assert_eq!(groups, vec![vec!["A", "B"], vec!["C"]]);
/// # Ok::<(), rust_data_mapper::MapperError>(())
/// ```
///
/// # Errors
///
/// `ColumnNotFound` when a row lacks `parent_key`, or the first error of `finalize`.
pub fn group_by_parent<P, F>(rows: &[DatabaseRow], parent_key: &str, mut finalize: F) -> Result<Vec<P>>
where
    F: FnMut(&[DatabaseRow]) -> Result<P>,
{
    let mut parents = Vec::new();
    let Some(first) = rows.first() else {
        return Ok(parents);
    };

    let mut current = column(first, parent_key)?;
    let mut start = 0;
    #[cfg(debug_assertions)]
    let mut finished = std::collections::HashSet::new();

    for (index, row) in rows.iter().enumerate().skip(1) {
        let id = column(row, parent_key)?;
        if id == current {
            continue;
        }

        parents.push(finalize(&rows[start..index])?);

        #[cfg(debug_assertions)]
        {
            finished.insert(current.to_string());
            assert!(
                !finished.contains(&id.to_string()),
                "rows are not sorted by '{}': {} appears in two separate runs",
                parent_key,
                id
            );
        }

        start = index;
        current = id;
    }

    parents.push(finalize(&rows[start..])?);
    Ok(parents)
}
