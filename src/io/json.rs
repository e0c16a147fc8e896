use std::fs;
use std::path::Path;

use serde_json::{Map, Value, json};

use crate::consolidate::ConsolidatedDictionary;
use crate::error::Result;
use crate::model::{NamedTable, Table};

/// Converts the dictionary into its JSON representation.
pub fn dictionary_to_json(dictionary: &ConsolidatedDictionary) -> Value {
    let variables: Vec<Value> = dictionary.variables.iter().map(named_table_to_json).collect();
    let subcategories: Vec<Value> = dictionary
        .subcategories
        .iter()
        .map(named_table_to_json)
        .collect();
    json!({
        "variables": variables,
        "subcategories": subcategories,
        "warnings": dictionary
            .warnings
            .iter()
            .map(|warning| Value::String(warning.to_string()))
            .collect::<Vec<_>>(),
    })
}

/// Writes the dictionary as pretty-printed JSON.
pub fn write_dictionary_json(path: &Path, dictionary: &ConsolidatedDictionary) -> Result<()> {
    let json = dictionary_to_json(dictionary);
    let json_string = serde_json::to_string_pretty(&json)?;
    fs::write(path, json_string)?;
    Ok(())
}

fn named_table_to_json(named: &NamedTable) -> Value {
    json!({
        "name": named.name,
        "columns": named.table.columns,
        "records": table_records(&named.table),
    })
}

fn table_records(table: &Table) -> Vec<Value> {
    table
        .rows
        .iter()
        .map(|row| {
            let record: Map<String, Value> = table
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| {
                    let value = cell.clone().map(Value::String).unwrap_or(Value::Null);
                    (column.clone(), value)
                })
                .collect();
            Value::Object(record)
        })
        .collect()
}
