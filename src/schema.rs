//! Canonical column names, worksheet header aliases and the declarative merge
//! policy applied to every consolidated table.

use serde::{Deserialize, Serialize};

use crate::error::{DictionaryError, Result};
use crate::model::Table;

pub const VARIABLE: &str = "Variable";
pub const LABEL: &str = "Label";
pub const TYPE: &str = "Type";
pub const COMMENT: &str = "Comment";
pub const STUDY: &str = "Study";
pub const SUBVARIABLE: &str = "Subvariable";

/// Columns of the canonical variable table, in output order.
pub const CANONICAL_COLUMNS: [&str; 4] = [VARIABLE, LABEL, TYPE, COMMENT];

/// Worksheet field labels recognised as aliases of canonical columns.
pub const HEADER_ALIASES: [(&str, &str); 3] = [
    ("[Table Name]", VARIABLE),
    ("Variable Label", LABEL),
    ("CDISC Notes", COMMENT),
];

/// Separator used when folding several values into one cell.
pub const JOIN_SEPARATOR: &str = ", ";

/// Resolves a worksheet field label to its canonical column name.
pub fn canonical_header(label: &str) -> Option<&'static str> {
    let label = label.trim();
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == label)
        .map(|(_, canonical)| *canonical)
        .or_else(|| CANONICAL_COLUMNS.iter().copied().find(|name| *name == label))
}

/// How the values of one column are folded when rows share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// The grouping key; exactly one per schema.
    Key,
    /// Sorted distinct non-null values joined with [`JOIN_SEPARATOR`].
    JoinSortedUnique,
    /// Value of the first row in the group; later differences are reported.
    KeepFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub strategy: MergeStrategy,
}

impl ColumnSpec {
    fn new(name: &str, strategy: MergeStrategy) -> Self {
        Self {
            name: name.to_string(),
            strategy,
        }
    }
}

/// Ordered column layout of a consolidated table with the merge strategy of
/// every column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Schema of the per-sheet variable tables.
    pub fn variables() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new(VARIABLE, MergeStrategy::Key),
                ColumnSpec::new(LABEL, MergeStrategy::JoinSortedUnique),
                ColumnSpec::new(TYPE, MergeStrategy::JoinSortedUnique),
                ColumnSpec::new(COMMENT, MergeStrategy::JoinSortedUnique),
                ColumnSpec::new(STUDY, MergeStrategy::JoinSortedUnique),
            ],
        }
    }

    /// Schema of the per-category subcategory tables.
    pub fn subcategories() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new(SUBVARIABLE, MergeStrategy::Key),
                ColumnSpec::new(STUDY, MergeStrategy::JoinSortedUnique),
            ],
        }
    }

    /// Replaces the strategy of a non-key column. The study column always
    /// folds into the union of contributing studies.
    pub fn with_strategy(mut self, column: &str, strategy: MergeStrategy) -> Result<Self> {
        if strategy == MergeStrategy::Key {
            return Err(DictionaryError::InvalidConfig(format!(
                "column '{column}' cannot become the merge key"
            )));
        }
        if column == STUDY {
            return Err(DictionaryError::InvalidConfig(format!(
                "the merge strategy of '{STUDY}' is fixed"
            )));
        }
        let spec = self
            .columns
            .iter_mut()
            .find(|spec| spec.name == column)
            .ok_or_else(|| DictionaryError::InvalidConfig(format!("unknown column '{column}'")))?;
        if spec.strategy == MergeStrategy::Key {
            return Err(DictionaryError::InvalidConfig(format!(
                "key column '{column}' cannot be overridden"
            )));
        }
        spec.strategy = strategy;
        Ok(self)
    }

    /// Column specifications in output order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Output column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|spec| spec.name.clone()).collect()
    }

    /// Merge strategy declared for `column`, if the schema has it.
    pub fn strategy(&self, column: &str) -> Option<MergeStrategy> {
        self.columns
            .iter()
            .find(|spec| spec.name == column)
            .map(|spec| spec.strategy)
    }

    /// Position of the key column.
    pub fn key_index(&self) -> usize {
        self.columns
            .iter()
            .position(|spec| spec.strategy == MergeStrategy::Key)
            .unwrap_or(0)
    }

    pub fn key_name(&self) -> &str {
        &self.columns[self.key_index()].name
    }

    /// Creates an empty table laid out according to this schema.
    pub fn empty_table(&self) -> Table {
        Table::with_columns(self.column_names())
    }
}
