use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DictionaryError, Result};
use crate::schema::{MergeStrategy, TableSchema};
use crate::subcategory::AttributionPolicy;

/// Tunables of one consolidation run. Every field falls back to its default
/// when absent from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsolidationConfig {
    /// Sheets that are never processed.
    pub excluded_sheets: BTreeSet<String>,
    /// Sheets additionally scanned for category-of-interest columns.
    pub subcategory_sheets: BTreeSet<String>,
    /// Category-of-interest column names, in scan order.
    pub category_columns: Vec<String>,
    /// Text identifying the row that ends the metadata block of a sheet.
    pub boundary_marker: String,
    pub attribution: AttributionPolicy,
    /// Per-column merge strategy overrides for the variable tables.
    pub merge_strategies: BTreeMap<String, MergeStrategy>,
    /// Title of the rendered dictionary.
    pub title: String,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            excluded_sheets: strings(&["ReadMe", "Variables", "Datasets", "DR"]),
            subcategory_sheets: strings(&["LB", "QS", "VS"]),
            category_columns: ["LBSCAT", "QSCAT", "VSTEST"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            boundary_marker: "Significant Digits".to_string(),
            attribution: AttributionPolicy::default(),
            merge_strategies: BTreeMap::new(),
            title: "Data Dictionary for CF Studies".to_string(),
        }
    }
}

fn strings(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl ConsolidationConfig {
    /// Loads and validates a JSON configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DictionaryError::MissingInput(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for contradictions.
    pub fn validate(&self) -> Result<()> {
        if self.boundary_marker.trim().is_empty() {
            return Err(DictionaryError::InvalidConfig(
                "boundary_marker must not be empty".into(),
            ));
        }
        if let Some(sheet) = self
            .subcategory_sheets
            .intersection(&self.excluded_sheets)
            .next()
        {
            return Err(DictionaryError::InvalidConfig(format!(
                "sheet '{sheet}' is both excluded and subcategory-bearing"
            )));
        }
        self.variable_schema()?;
        Ok(())
    }

    pub fn is_excluded(&self, sheet: &str) -> bool {
        self.excluded_sheets.contains(sheet)
    }

    pub fn has_subcategories(&self, sheet: &str) -> bool {
        self.subcategory_sheets.contains(sheet)
    }

    /// Variable table schema with the configured strategy overrides applied.
    pub fn variable_schema(&self) -> Result<TableSchema> {
        self.merge_strategies
            .iter()
            .try_fold(TableSchema::variables(), |schema, (column, strategy)| {
                schema.with_strategy(column, *strategy)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TYPE;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let config: ConsolidationConfig = serde_json::from_str(
            r#"{ "excluded_sheets": ["ReadMe"], "attribution": "fold_into_first" }"#,
        )
        .unwrap();

        assert_eq!(config.excluded_sheets, strings(&["ReadMe"]));
        assert_eq!(config.attribution, AttributionPolicy::FoldIntoFirst);
        assert_eq!(config.subcategory_sheets, strings(&["LB", "QS", "VS"]));
        assert_eq!(config.boundary_marker, "Significant Digits");
    }

    #[test]
    fn strategy_overrides_reach_the_variable_schema() {
        let config: ConsolidationConfig =
            serde_json::from_str(r#"{ "merge_strategies": { "Type": "keep_first" } }"#).unwrap();
        let schema = config.variable_schema().unwrap();
        assert_eq!(schema.strategy(TYPE), Some(MergeStrategy::KeepFirst));
    }

    #[test]
    fn contradictory_configurations_are_rejected() {
        let mut config = ConsolidationConfig::default();
        config.excluded_sheets.insert("LB".into());
        assert!(matches!(
            config.validate(),
            Err(DictionaryError::InvalidConfig(_))
        ));

        let mut config = ConsolidationConfig::default();
        config
            .merge_strategies
            .insert("Study".into(), MergeStrategy::KeepFirst);
        assert!(config.validate().is_err());

        let config = ConsolidationConfig {
            boundary_marker: " ".into(),
            ..ConsolidationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<ConsolidationConfig>(r#"{ "excluded": [] }"#);
        assert!(result.is_err());
    }
}
