use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DictionaryError, Result};
use crate::model::RawSheet;

/// Distinct values observed for one category-of-interest column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryValues {
    pub category: String,
    pub values: Vec<String>,
}

/// Result of scanning a worksheet for category-of-interest columns, in the
/// configured category order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubcategoryScan {
    pub categories: Vec<CategoryValues>,
}

/// How the values found in a sheet are attributed to categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionPolicy {
    /// Every category column keeps its own value set.
    #[default]
    PerCategory,
    /// The first category present receives every later marker and value.
    FoldIntoFirst,
}

impl SubcategoryScan {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Flat `[category, value, .., category, value, ..]` sequence.
    pub fn marker_sequence(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|entry| std::iter::once(&entry.category).chain(entry.values.iter()))
            .cloned()
            .collect()
    }

    /// Splits the scan into per-category value lists according to `policy`.
    pub fn attribute(self, policy: AttributionPolicy) -> Vec<CategoryValues> {
        match policy {
            AttributionPolicy::PerCategory => self.categories,
            AttributionPolicy::FoldIntoFirst => {
                let mut sequence = self.marker_sequence().into_iter();
                match sequence.next() {
                    Some(category) => vec![CategoryValues {
                        category,
                        values: sequence.collect(),
                    }],
                    None => Vec::new(),
                }
            }
        }
    }
}

/// Collects the distinct values of every category column present in `sheet`.
///
/// Only rows strictly below the first row whose first cell contains `marker`
/// are considered; everything above it is worksheet metadata.
pub fn extract_subcategories(
    sheet: &RawSheet,
    category_columns: &[String],
    marker: &str,
) -> Result<SubcategoryScan> {
    let boundary = find_boundary(sheet, marker)?;

    let mut scan = SubcategoryScan::default();
    for category in category_columns {
        let Some(column) = sheet.column_index(category) else {
            continue;
        };

        let mut seen = HashSet::new();
        let values = sheet.rows[boundary + 1..]
            .iter()
            .filter_map(|row| row.get(column).and_then(|cell| cell.as_deref()))
            .filter(|value| seen.insert(*value))
            .map(str::to_string)
            .collect();

        scan.categories.push(CategoryValues {
            category: category.clone(),
            values,
        });
    }

    Ok(scan)
}

/// Index of the boundary row. The header row is never a candidate.
fn find_boundary(sheet: &RawSheet, marker: &str) -> Result<usize> {
    sheet
        .rows
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| {
            row.first()
                .and_then(|cell| cell.as_deref())
                .is_some_and(|label| label.contains(marker))
        })
        .map(|(index, _)| index)
        .ok_or_else(|| DictionaryError::MissingBoundaryMarker {
            sheet: sheet.name.clone(),
            marker: marker.to_string(),
        })
}
