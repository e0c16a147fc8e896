use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::ConsolidationConfig;
use crate::consolidate::{ConsolidatedDictionary, Consolidator, StudyExtraction, extract_workbook};
use crate::error::{DictionaryError, Result};
use crate::io::{excel_read, excel_write, json};

/// Reads and consolidates the given study workbooks.
///
/// Workbooks are loaded and extracted in parallel; the merge runs once all of
/// them succeeded. The first failing workbook aborts the run.
#[instrument(level = "info", skip_all, fields(inputs = inputs.len()))]
pub fn consolidate_files(
    inputs: &[PathBuf],
    config: &ConsolidationConfig,
) -> Result<ConsolidatedDictionary> {
    if let Some(missing) = inputs.iter().find(|path| !path.exists()) {
        return Err(DictionaryError::MissingInput(missing.clone()));
    }
    if inputs.is_empty() {
        warn!("no workbooks supplied; the dictionary will be empty");
    }

    let mut consolidator = Consolidator::new(config)?;

    let extractions = inputs
        .par_iter()
        .map(|path| extract_file(path, config))
        .collect::<Result<Vec<_>>>()?;

    for extraction in extractions {
        consolidator.absorb(extraction);
    }
    consolidator.finish()
}

#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
fn extract_file(path: &Path, config: &ConsolidationConfig) -> Result<StudyExtraction> {
    let workbook = excel_read::read_workbook(path)
        .map_err(|error| error.in_workbook(path.to_string_lossy()))?;
    info!(
        study = %workbook.study,
        sheet_count = workbook.sheets.len(),
        "read study workbook"
    );
    extract_workbook(&workbook, config)
}

/// Renders the dictionary to an Excel workbook and, optionally, to JSON.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn write_outputs(
    dictionary: &ConsolidatedDictionary,
    output: &Path,
    json_output: Option<&Path>,
    title: &str,
) -> Result<()> {
    excel_write::write_dictionary(output, dictionary, title)?;
    debug!(
        variable_tables = dictionary.variables.len(),
        subcategory_tables = dictionary.subcategories.len(),
        "dictionary workbook written"
    );
    if let Some(path) = json_output {
        json::write_dictionary_json(path, dictionary)?;
        debug!(path = %path.display(), "dictionary JSON written");
    }
    Ok(())
}
