use std::collections::HashSet;
use std::path::Path;

use rust_xlsxwriter::{Format, Table, TableColumn, Workbook, Worksheet};

use crate::consolidate::ConsolidatedDictionary;
use crate::error::Result;
use crate::model::NamedTable;

/// Name of the leading worksheet listing every rendered table.
pub const CONTENTS_SHEET: &str = "Contents";

const MAX_SHEET_NAME: usize = 31;

/// Renders the consolidated dictionary as an Excel workbook: a contents sheet
/// followed by one worksheet per variable table and per subcategory table.
pub fn write_dictionary(
    path: &Path,
    dictionary: &ConsolidatedDictionary,
    title: &str,
) -> Result<()> {
    let mut sheet_names = SheetNameRegistry::default();
    sheet_names.claim(CONTENTS_SHEET.to_string());

    let sections: Vec<(&str, &NamedTable, String)> = dictionary
        .variables
        .iter()
        .map(|table| ("Variables", table))
        .chain(
            dictionary
                .subcategories
                .iter()
                .map(|table| ("Subcategories", table)),
        )
        .map(|(kind, table)| (kind, table, sheet_names.assign(&table.name)))
        .collect();

    let heading = Format::new().set_bold().set_font_size(14);
    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let contents = workbook.add_worksheet();
    contents.set_name(CONTENTS_SHEET)?;
    contents.write_string_with_format(0, 0, title, &heading)?;
    for (col_idx, header) in ["Kind", "Table", "Sheet", "Rows"].iter().enumerate() {
        contents.write_string_with_format(2, col_idx as u16, *header, &bold)?;
    }
    for (idx, (kind, table, sheet_name)) in sections.iter().enumerate() {
        let row = (idx + 3) as u32;
        contents.write_string(row, 0, *kind)?;
        contents.write_string(row, 1, &table.name)?;
        contents.write_string(row, 2, sheet_name)?;
        contents.write_number(row, 3, table.table.len() as f64)?;
    }
    contents.autofit();

    for (_, table, sheet_name) in &sections {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;
        worksheet.write_string_with_format(0, 0, &table.name, &heading)?;
        write_table(worksheet, table, 1)?;
        worksheet.autofit();
    }

    workbook.save(path)?;
    Ok(())
}

/// Writes the header row at `header_row` followed by the data rows, wrapped in
/// a filterable Excel table.
fn write_table(worksheet: &mut Worksheet, named: &NamedTable, header_row: u32) -> Result<()> {
    let table = &named.table;
    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet.write_string(header_row, col_idx as u16, header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                worksheet.write_string(header_row + 1 + row_idx as u32, col_idx as u16, value)?;
            }
        }
    }

    let columns: Vec<TableColumn> = table
        .columns
        .iter()
        .map(|header| TableColumn::new().set_header(header))
        .collect();
    let mut excel_table = Table::new();
    excel_table.set_autofilter(true).set_columns(&columns);

    let col_end = (table.columns.len() as u16).saturating_sub(1);
    let row_end = header_row + table.rows.len().max(1) as u32;
    worksheet.add_table(header_row, 0, row_end, col_end, &excel_table)?;
    Ok(())
}

/// Hands out unique, Excel-compatible worksheet names.
#[derive(Debug, Default)]
struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    fn claim(&mut self, name: String) {
        self.used.insert(name.to_lowercase());
    }

    fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let prefix: String = base
                .chars()
                .take(MAX_SHEET_NAME - suffix.len())
                .collect();
            let candidate = format!("{prefix}{suffix}");
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Replaces characters Excel forbids in sheet names and enforces the length
/// limit.
fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']', '\'', '"'];
    let sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "Sheet".to_string();
    }
    sanitized.chars().take(MAX_SHEET_NAME).collect()
}
