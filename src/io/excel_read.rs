use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::error::{DictionaryError, Result};
use crate::model::{Cell, RawSheet, StudyWorkbook, normalize_text};

/// Loads every sheet of a study workbook, in workbook order.
///
/// Sheets are padded so that row and column zero correspond to cell `A1`.
/// Blank, whitespace-only and error cells become empty cells.
pub fn read_workbook(path: &Path) -> Result<StudyWorkbook> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = read_sheet(&mut workbook, &name)?;
        let sheet = range_to_sheet(&name, &range);
        debug!(
            sheet = %name,
            rows = sheet.rows.len(),
            columns = sheet.width(),
            "loaded sheet"
        );
        sheets.push(sheet);
    }

    Ok(StudyWorkbook::new(path.to_string_lossy(), sheets))
}

fn read_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| DictionaryError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(DictionaryError::from)?;
    Ok(range)
}

fn range_to_sheet(name: &str, range: &Range<DataType>) -> RawSheet {
    // Blank rows above the used range carry nothing, so the sheet starts at
    // its first populated row. Leading columns keep their positions.
    let Some((_, start_col)) = range.start() else {
        return RawSheet::new(name, Vec::new());
    };

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for row in range.rows() {
        let mut cells: Vec<Cell> = vec![None; start_col as usize];
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }

    RawSheet::new(name, rows)
}

fn data_to_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::String(value) => normalize_text(value),
        DataType::Float(value) => Some(value.to_string()),
        DataType::Int(value) => Some(value.to_string()),
        DataType::Bool(value) => Some(value.to_string()),
        DataType::Empty | DataType::Error(_) => None,
        other => normalize_text(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_use_their_display_form() {
        assert_eq!(data_to_cell(&DataType::Float(1.0)), Some("1".into()));
        assert_eq!(data_to_cell(&DataType::Float(2.5)), Some("2.5".into()));
        assert_eq!(data_to_cell(&DataType::Int(7)), Some("7".into()));
    }

    #[test]
    fn blank_cells_are_empty() {
        assert_eq!(data_to_cell(&DataType::Empty), None);
        assert_eq!(data_to_cell(&DataType::String("   ".into())), None);
        assert_eq!(
            data_to_cell(&DataType::String("Age".into())),
            Some("Age".into())
        );
    }
}
