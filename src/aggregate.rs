use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{DictionaryError, Result};
use crate::model::{Cell, Table};
use crate::schema::{JOIN_SEPARATOR, MergeStrategy, TableSchema};

/// Non-fatal finding raised while merging rows that share a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeWarning {
    /// A keep-first column holds different values across the merged rows.
    HeterogeneousValue {
        key: String,
        column: String,
        kept: Cell,
        conflicting: Cell,
    },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeWarning::HeterogeneousValue {
                key,
                column,
                kept,
                conflicting,
            } => write!(
                f,
                "'{key}' has differing {column} values: kept {}, ignored {}",
                display_cell(kept),
                display_cell(conflicting)
            ),
        }
    }
}

fn display_cell(cell: &Cell) -> String {
    match cell {
        Some(value) => format!("'{value}'"),
        None => "<empty>".to_string(),
    }
}

/// A merged table along with the warnings produced while merging it.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub table: Table,
    pub warnings: Vec<MergeWarning>,
}

/// Groups the rows of `table` by the schema key and folds every group into a
/// single row following the per-column merge strategies.
///
/// Output rows are ordered by key. Rows without a key are dropped.
pub fn aggregate(table: Table, schema: &TableSchema) -> Result<Aggregated> {
    let expected = schema.column_names();
    if table.columns != expected {
        return Err(DictionaryError::SchemaMismatch {
            expected,
            found: table.columns,
        });
    }

    let key_index = schema.key_index();
    let mut groups: BTreeMap<String, Vec<ColumnState>> = BTreeMap::new();

    for row in table.rows {
        let Some(Some(key)) = row.get(key_index).cloned() else {
            continue;
        };
        match groups.get_mut(&key) {
            Some(states) => {
                for (state, cell) in states.iter_mut().zip(row) {
                    state.absorb(cell);
                }
            }
            None => {
                let states = schema
                    .columns()
                    .iter()
                    .zip(row)
                    .map(|(spec, cell)| ColumnState::start(spec.strategy, cell))
                    .collect();
                groups.insert(key, states);
            }
        }
    }

    let mut merged = Table::with_columns(expected);
    let mut warnings = Vec::new();
    for (key, states) in groups {
        let mut cells = Vec::with_capacity(states.len());
        for (spec, state) in schema.columns().iter().zip(states) {
            cells.push(state.finish(&key, &spec.name, &mut warnings));
        }
        merged.push_row(cells);
    }

    Ok(Aggregated {
        table: merged,
        warnings,
    })
}

enum ColumnState {
    Key(Cell),
    Join(BTreeSet<String>),
    First {
        value: Cell,
        conflicts: BTreeSet<Cell>,
    },
}

impl ColumnState {
    fn start(strategy: MergeStrategy, cell: Cell) -> Self {
        match strategy {
            MergeStrategy::Key => ColumnState::Key(cell),
            MergeStrategy::JoinSortedUnique => ColumnState::Join(cell.into_iter().collect()),
            MergeStrategy::KeepFirst => ColumnState::First {
                value: cell,
                conflicts: BTreeSet::new(),
            },
        }
    }

    fn absorb(&mut self, cell: Cell) {
        match self {
            ColumnState::Key(_) => {}
            ColumnState::Join(values) => values.extend(cell),
            ColumnState::First { value, conflicts } => {
                if *value != cell {
                    conflicts.insert(cell);
                }
            }
        }
    }

    fn finish(self, key: &str, column: &str, warnings: &mut Vec<MergeWarning>) -> Cell {
        match self {
            ColumnState::Key(cell) => cell,
            ColumnState::Join(values) => {
                if values.is_empty() {
                    None
                } else {
                    Some(values.into_iter().collect::<Vec<_>>().join(JOIN_SEPARATOR))
                }
            }
            ColumnState::First { value, conflicts } => {
                warnings.extend(conflicts.into_iter().map(|conflicting| {
                    MergeWarning::HeterogeneousValue {
                        key: key.to_string(),
                        column: column.to_string(),
                        kept: value.clone(),
                        conflicting,
                    }
                }));
                value
            }
        }
    }
}
