use serde::{Deserialize, Serialize};

/// A single worksheet cell. Blank cells are `None`; the reader never hands the
/// core an empty or whitespace-only string.
pub type Cell = Option<String>;

/// Short code identifying one contributing study.
pub type StudyCode = String;

/// A named rectangular worksheet as loaded from a study workbook. Row zero
/// holds the column headers: the first worksheet row with any content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    /// Creates a sheet from already normalised rows. Leading rows without any
    /// content are discarded so that row zero is the header row.
    pub fn new(name: impl Into<String>, mut rows: Vec<Vec<Cell>>) -> Self {
        let leading_blank = rows
            .iter()
            .take_while(|row| row.iter().all(Option::is_none))
            .count();
        rows.drain(..leading_blank);
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Builds a sheet from string literals, treating blank strings as empty
    /// cells. Mostly useful for fixtures.
    pub fn from_strings(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|value| normalize_text(value)).collect())
            .collect();
        Self::new(name, rows)
    }

    /// Number of columns spanned by the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Returns the text held at the given position, if any.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
    }

    /// Header row of the sheet.
    pub fn headers(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of the first column whose header equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers()
            .iter()
            .position(|header| header.as_deref() == Some(name))
    }
}

/// One study's workbook: its identifier, derived study code and sheets in
/// workbook order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudyWorkbook {
    pub source: String,
    pub study: StudyCode,
    pub sheets: Vec<RawSheet>,
}

impl StudyWorkbook {
    /// Creates a workbook, deriving the study code from `source`.
    pub fn new(source: impl Into<String>, sheets: Vec<RawSheet>) -> Self {
        let source = source.into();
        let study = study_code(&source);
        Self {
            source,
            study,
            sheets,
        }
    }
}

/// One declared variable of a worksheet in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecord {
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "Label")]
    pub label: Cell,
    #[serde(rename = "Type")]
    pub data_type: Cell,
    #[serde(rename = "Comment")]
    pub comment: Cell,
}

impl VariableRecord {
    /// Converts the record into a working-table row tagged with `study`.
    pub fn into_row(self, study: &str) -> Vec<Cell> {
        vec![
            Some(self.variable),
            self.label,
            self.data_type,
            self.comment,
            Some(study.to_string()),
        ]
    }
}

/// A table with named columns and nullable text cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates an empty table with the given columns.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; it must have one cell per column.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Returns the value of `column` in the given row.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    /// Finds the first row whose `key_column` equals `key`.
    pub fn find_row(&self, key_column: &str, key: &str) -> Option<&[Cell]> {
        let index = self.column_index(key_column)?;
        self.rows
            .iter()
            .find(|row| row.get(index).and_then(|cell| cell.as_deref()) == Some(key))
            .map(Vec::as_slice)
    }

    /// Iterates over the values of one column.
    pub fn column_values<'a>(
        &'a self,
        column: &str,
    ) -> impl Iterator<Item = Option<&'a str>> + use<'a> {
        let index = self.column_index(column);
        self.rows.iter().map(move |row| {
            index
                .and_then(|index| row.get(index))
                .and_then(|cell| cell.as_deref())
        })
    }
}

/// A table together with the name it is published under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedTable {
    pub name: String,
    pub table: Table,
}

/// Normalises a text value into a [`Cell`]: blank text becomes `None`.
pub fn normalize_text(value: &str) -> Cell {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Derives the study code from a workbook identifier such as a path or URI:
/// the file name up to its first `.`.
pub fn study_code(identifier: &str) -> StudyCode {
    let file_name = identifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(identifier);
    file_name.split('.').next().unwrap_or(file_name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn study_code_strips_directories_and_extension() {
        assert_eq!(study_code("data/in/BPCFRD.xlsx"), "BPCFRD");
        assert_eq!(study_code("C:\\studies\\STRONG.xlsx"), "STRONG");
        assert_eq!(study_code("https://host/share/ALPHA.v2.xlsx"), "ALPHA");
        assert_eq!(study_code("BETA"), "BETA");
    }

    #[test]
    fn raw_sheet_treats_blank_strings_as_empty_cells() {
        let sheet = RawSheet::from_strings("DM", &[&["[Table Name]", "AGE", " "]]);
        assert_eq!(sheet.cell(0, 1), Some("AGE"));
        assert_eq!(sheet.cell(0, 2), None);
        assert_eq!(sheet.cell(4, 0), None);
        assert_eq!(sheet.column_index("AGE"), Some(1));
        assert_eq!(sheet.width(), 3);
    }

    #[test]
    fn leading_blank_rows_do_not_become_the_header() {
        let sheet = RawSheet::from_strings(
            "DM",
            &[&["", "", ""], &[" "], &["[Table Name]", "AGE", "SEX"], &["", "", ""]],
        );
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.cell(0, 0), Some("[Table Name]"));
        assert_eq!(sheet.column_index("SEX"), Some(2));

        let blank = RawSheet::from_strings("ReadMe", &[&[""], &[""]]);
        assert!(blank.rows.is_empty());
        assert!(blank.headers().is_empty());
    }

    #[test]
    fn table_lookups_use_column_names() {
        let mut table = Table::with_columns(vec!["Subvariable".into(), "Study".into()]);
        table.push_row(vec![Some("CHEMISTRY".into()), Some("ALPHA".into())]);
        table.push_row(vec![Some("URINALYSIS".into()), None]);

        assert_eq!(table.value(0, "Study"), Some("ALPHA"));
        assert_eq!(table.value(1, "Study"), None);
        assert!(table.find_row("Subvariable", "URINALYSIS").is_some());
        assert!(table.find_row("Subvariable", "HEMATOLOGY").is_none());
        let keys: Vec<_> = table.column_values("Subvariable").collect();
        assert_eq!(keys, vec![Some("CHEMISTRY"), Some("URINALYSIS")]);
    }
}
