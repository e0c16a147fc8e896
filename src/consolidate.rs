//! Cross-study consolidation: per-workbook extraction followed by a single
//! merge pass over the accumulated working tables.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::aggregate::{MergeWarning, aggregate};
use crate::config::ConsolidationConfig;
use crate::error::Result;
use crate::model::{NamedTable, StudyCode, StudyWorkbook, Table, VariableRecord};
use crate::schema::TableSchema;
use crate::subcategory::{CategoryValues, extract_subcategories};
use crate::transpose::transpose_sheet;

/// Everything one workbook contributes, before any cross-study merging.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyExtraction {
    pub source: String,
    pub study: StudyCode,
    /// Canonical records per processed sheet, in workbook order.
    pub sheets: Vec<(String, Vec<VariableRecord>)>,
    /// Category values found in subcategory-bearing sheets.
    pub categories: Vec<CategoryValues>,
}

/// Runs the transposer and, where configured, the subcategory extractor over
/// every non-excluded sheet of `workbook`.
pub fn extract_workbook(
    workbook: &StudyWorkbook,
    config: &ConsolidationConfig,
) -> Result<StudyExtraction> {
    let mut extraction = StudyExtraction {
        source: workbook.source.clone(),
        study: workbook.study.clone(),
        sheets: Vec::new(),
        categories: Vec::new(),
    };

    for sheet in &workbook.sheets {
        if config.is_excluded(&sheet.name) {
            debug!(study = %workbook.study, sheet = %sheet.name, "skipping excluded sheet");
            continue;
        }

        if config.has_subcategories(&sheet.name) {
            let scan = extract_subcategories(
                sheet,
                &config.category_columns,
                &config.boundary_marker,
            )
            .map_err(|error| error.in_workbook(&workbook.source))?;
            if scan.is_empty() {
                warn!(
                    study = %workbook.study,
                    sheet = %sheet.name,
                    "sheet has none of the category columns"
                );
            }
            extraction
                .categories
                .extend(scan.attribute(config.attribution));
        }

        let records =
            transpose_sheet(sheet).map_err(|error| error.in_workbook(&workbook.source))?;
        debug!(
            study = %workbook.study,
            sheet = %sheet.name,
            variables = records.len(),
            "transposed sheet"
        );
        extraction.sheets.push((sheet.name.clone(), records));
    }

    Ok(extraction)
}

/// A merge warning together with the table it was raised for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedWarning {
    pub table: String,
    pub warning: MergeWarning,
}

impl fmt::Display for ScopedWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.table, self.warning)
    }
}

/// Final product of a consolidation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsolidatedDictionary {
    /// One merged variable table per sheet name, keyed by `Variable`.
    pub variables: Vec<NamedTable>,
    /// One merged subcategory table per category column, keyed by `Subvariable`.
    pub subcategories: Vec<NamedTable>,
    pub warnings: Vec<ScopedWarning>,
}

impl ConsolidatedDictionary {
    /// Merged variable table for a sheet name.
    pub fn variable_table(&self, sheet: &str) -> Option<&Table> {
        find_table(&self.variables, sheet)
    }

    /// Merged subcategory table for a category column.
    pub fn subcategory_table(&self, category: &str) -> Option<&Table> {
        find_table(&self.subcategories, category)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.subcategories.is_empty()
    }
}

fn find_table<'a>(tables: &'a [NamedTable], name: &str) -> Option<&'a Table> {
    tables
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| &entry.table)
}

/// Working tables keyed by name, remembering first-encounter order.
#[derive(Debug, Default)]
struct WorkingTables {
    order: Vec<String>,
    tables: HashMap<String, Table>,
}

impl WorkingTables {
    fn table_mut(&mut self, name: &str, schema: &TableSchema) -> &mut Table {
        if !self.tables.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| schema.empty_table())
    }

    fn merge(
        mut self,
        schema: &TableSchema,
        warnings: &mut Vec<ScopedWarning>,
    ) -> Result<Vec<NamedTable>> {
        let mut merged = Vec::with_capacity(self.order.len());
        for name in self.order {
            let Some(table) = self.tables.remove(&name) else {
                continue;
            };
            let aggregated = aggregate(table, schema)?;
            for warning in aggregated.warnings {
                warn!(table = %name, "{warning}");
                warnings.push(ScopedWarning {
                    table: name.clone(),
                    warning,
                });
            }
            merged.push(NamedTable {
                name,
                table: aggregated.table,
            });
        }
        Ok(merged)
    }
}

/// Accumulator owned by one consolidation run. Rows are appended per study
/// and merged once in [`Consolidator::finish`].
#[derive(Debug)]
pub struct Consolidator<'a> {
    config: &'a ConsolidationConfig,
    variable_schema: TableSchema,
    subcategory_schema: TableSchema,
    variables: WorkingTables,
    subcategories: WorkingTables,
    studies: usize,
}

impl<'a> Consolidator<'a> {
    pub fn new(config: &'a ConsolidationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            variable_schema: config.variable_schema()?,
            subcategory_schema: TableSchema::subcategories(),
            variables: WorkingTables::default(),
            subcategories: WorkingTables::default(),
            studies: 0,
        })
    }

    /// Extracts and absorbs one workbook.
    pub fn add_workbook(&mut self, workbook: &StudyWorkbook) -> Result<()> {
        let extraction = extract_workbook(workbook, self.config)?;
        self.absorb(extraction);
        Ok(())
    }

    /// Appends the rows of one study's extraction, tagged with its study code.
    pub fn absorb(&mut self, extraction: StudyExtraction) {
        let study = extraction.study;

        for (sheet, records) in extraction.sheets {
            let table = self.variables.table_mut(&sheet, &self.variable_schema);
            for record in records {
                table.push_row(record.into_row(&study));
            }
        }

        for entry in extraction.categories {
            let table = self
                .subcategories
                .table_mut(&entry.category, &self.subcategory_schema);
            for value in entry.values {
                table.push_row(vec![Some(value), Some(study.clone())]);
            }
        }

        self.studies += 1;
    }

    /// Merges every working table and returns the consolidated dictionary.
    pub fn finish(self) -> Result<ConsolidatedDictionary> {
        let mut warnings = Vec::new();
        let variables = self.variables.merge(&self.variable_schema, &mut warnings)?;
        let subcategories = self
            .subcategories
            .merge(&self.subcategory_schema, &mut warnings)?;

        info!(
            studies = self.studies,
            sheets = variables.len(),
            categories = subcategories.len(),
            warnings = warnings.len(),
            "consolidation finished"
        );

        Ok(ConsolidatedDictionary {
            variables,
            subcategories,
            warnings,
        })
    }
}

/// Consolidates in-memory workbooks in the given order.
pub fn consolidate(
    workbooks: &[StudyWorkbook],
    config: &ConsolidationConfig,
) -> Result<ConsolidatedDictionary> {
    let mut consolidator = Consolidator::new(config)?;
    for workbook in workbooks {
        consolidator.add_workbook(workbook)?;
    }
    consolidator.finish()
}
