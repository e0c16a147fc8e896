use tracing::debug;

use crate::error::{DictionaryError, Result};
use crate::model::{Cell, RawSheet, VariableRecord};
use crate::schema::{CANONICAL_COLUMNS, canonical_header};

/// Transposes a field-per-row worksheet into canonical variable records.
///
/// The first column of `sheet` holds field labels (`[Table Name]`,
/// `Variable Label`, `Type`, `CDISC Notes`, ...) and every further column
/// declares one variable. Each such column becomes a record, in worksheet
/// order. Columns without a `[Table Name]` value are structurally empty slots
/// and are dropped.
pub fn transpose_sheet(sheet: &RawSheet) -> Result<Vec<VariableRecord>> {
    let positions = resolve_canonical_rows(sheet)?;
    let [variable_row, label_row, type_row, comment_row] = positions;

    let mut records = Vec::new();
    for column in 1..sheet.width() {
        let Some(variable) = sheet.cell(variable_row, column) else {
            debug!(sheet = %sheet.name, column, "dropping unlabeled column");
            continue;
        };

        records.push(VariableRecord {
            variable: variable.to_string(),
            label: owned(sheet, label_row, column),
            data_type: owned(sheet, type_row, column),
            comment: owned(sheet, comment_row, column),
        });
    }

    Ok(records)
}

/// Finds the worksheet row holding each canonical column, in
/// [`CANONICAL_COLUMNS`] order. The first occurrence of a label wins.
fn resolve_canonical_rows(sheet: &RawSheet) -> Result<[usize; 4]> {
    let mut positions: [Option<usize>; 4] = [None; 4];

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let Some(label) = row.first().and_then(|cell| cell.as_deref()) else {
            continue;
        };
        let Some(canonical) = canonical_header(label) else {
            continue;
        };
        if let Some(slot) = CANONICAL_COLUMNS
            .iter()
            .position(|name| *name == canonical)
        {
            positions[slot].get_or_insert(row_idx);
        }
    }

    let mut resolved = [0usize; 4];
    for (slot, position) in positions.iter().enumerate() {
        resolved[slot] = position.ok_or_else(|| DictionaryError::MissingColumn {
            sheet: sheet.name.clone(),
            column: CANONICAL_COLUMNS[slot].to_string(),
        })?;
    }
    Ok(resolved)
}

fn owned(sheet: &RawSheet, row: usize, column: usize) -> Cell {
    sheet.cell(row, column).map(str::to_string)
}
