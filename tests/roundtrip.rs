use std::fs;
use std::path::{Path, PathBuf};

use calamine::{DataType, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::Workbook;
use study_dictionary::io::excel_read;
use study_dictionary::pipeline;
use study_dictionary::schema::{COMMENT, STUDY};
use study_dictionary::{ConsolidationConfig, DictionaryError};
use tempfile::tempdir;

type SheetSpec<'a> = (&'a str, Vec<Vec<&'a str>>);

/// Writes a study workbook; cells that parse as numbers are stored as numbers.
fn write_study(path: &Path, sheets: &[SheetSpec<'_>]) {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("sheet named");
        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let (row_idx, col_idx) = (row_idx as u32, col_idx as u16);
                match value.parse::<f64>() {
                    Ok(number) => worksheet.write_number(row_idx, col_idx, number),
                    Err(_) => worksheet.write_string(row_idx, col_idx, *value),
                }
                .expect("cell written");
            }
        }
    }
    workbook.save(path).expect("study workbook saved");
}

fn readme() -> SheetSpec<'static> {
    ("ReadMe", vec![vec!["Study variable definitions"]])
}

fn demographics(extra: &'static str) -> SheetSpec<'static> {
    (
        "DM",
        vec![
            vec!["[Table Name]", "AGE", "", extra],
            vec!["Variable Label", "Age", "unused slot", "Extra"],
            vec!["Type", "Num", "Char", "Char"],
            vec!["CDISC Notes", "1", "", ""],
        ],
    )
}

fn laboratory(categories: &[&'static str]) -> SheetSpec<'static> {
    let mut rows = vec![
        vec!["[Table Name]", "LBSCAT"],
        vec!["Variable Label", "Lab Subcategory"],
        vec!["Type", "Char"],
        vec!["CDISC Notes", ""],
        vec!["Significant Digits", ""],
    ];
    rows.extend(categories.iter().map(|category| vec!["", *category]));
    ("LB", rows)
}

fn study_files(dir: &Path) -> Vec<PathBuf> {
    let alpha = dir.join("ALPHA.xlsx");
    let beta = dir.join("BETA.xlsx");
    write_study(
        &alpha,
        &[
            readme(),
            demographics("SEX"),
            laboratory(&["CHEMISTRY", "HEMATOLOGY"]),
        ],
    );
    write_study(
        &beta,
        &[
            demographics("RACE"),
            laboratory(&["HEMATOLOGY", "URINALYSIS"]),
        ],
    );
    vec![alpha, beta]
}

fn cell_text(range: &calamine::Range<DataType>, row: u32, col: u32) -> String {
    match range.get_value((row, col)) {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[test]
fn reader_loads_every_sheet_in_workbook_order() {
    let temp_dir = tempdir().expect("temporary directory");
    let files = study_files(temp_dir.path());

    let workbook = excel_read::read_workbook(&files[0]).expect("workbook read");

    assert_eq!(workbook.study, "ALPHA");
    let names: Vec<_> = workbook.sheets.iter().map(|sheet| sheet.name.as_str()).collect();
    assert_eq!(names, vec!["ReadMe", "DM", "LB"]);
    let dm = &workbook.sheets[1];
    assert_eq!(dm.cell(0, 0), Some("[Table Name]"));
    assert_eq!(dm.cell(0, 2), None);
    assert_eq!(dm.cell(3, 1), Some("1"));
}

#[test]
fn consolidates_files_and_renders_the_dictionary() {
    let temp_dir = tempdir().expect("temporary directory");
    let files = study_files(temp_dir.path());

    let config = ConsolidationConfig::default();
    let dictionary = pipeline::consolidate_files(&files, &config).expect("consolidated");

    let dm = dictionary.variable_table("DM").expect("DM table");
    let keys: Vec<_> = dm.column_values("Variable").flatten().collect();
    assert_eq!(keys, vec!["AGE", "RACE", "SEX"]);
    assert_eq!(dm.value(0, STUDY), Some("ALPHA, BETA"));
    assert_eq!(dm.value(0, COMMENT), Some("1"));
    assert_eq!(dm.value(1, STUDY), Some("BETA"));

    let lbscat = dictionary.subcategory_table("LBSCAT").expect("LBSCAT table");
    assert_eq!(lbscat.value(1, "Subvariable"), Some("HEMATOLOGY"));
    assert_eq!(lbscat.value(1, STUDY), Some("ALPHA, BETA"));

    let output = temp_dir.path().join("dictionary.xlsx");
    let json_output = temp_dir.path().join("dictionary.json");
    pipeline::write_outputs(&dictionary, &output, Some(json_output.as_path()), &config.title)
        .expect("outputs written");

    let mut rendered: Xlsx<_> = open_workbook(&output).expect("rendered workbook opened");
    assert_eq!(
        rendered.sheet_names().to_owned(),
        vec!["Contents", "DM", "LB", "LBSCAT"]
    );

    let contents = rendered
        .worksheet_range("Contents")
        .expect("contents sheet")
        .expect("contents range");
    assert_eq!(cell_text(&contents, 0, 0), config.title);
    assert_eq!(cell_text(&contents, 3, 1), "DM");
    assert_eq!(cell_text(&contents, 5, 0), "Subcategories");
    assert_eq!(cell_text(&contents, 5, 3), "3");

    let dm_sheet = rendered
        .worksheet_range("DM")
        .expect("DM sheet")
        .expect("DM range");
    assert_eq!(cell_text(&dm_sheet, 0, 0), "DM");
    assert_eq!(cell_text(&dm_sheet, 1, 4), "Study");
    assert_eq!(cell_text(&dm_sheet, 2, 0), "AGE");
    assert_eq!(cell_text(&dm_sheet, 2, 4), "ALPHA, BETA");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_output).expect("JSON read"))
            .expect("JSON parsed");
    assert_eq!(json["variables"][0]["name"], "DM");
    assert_eq!(json["subcategories"][0]["records"][2]["Subvariable"], "URINALYSIS");
    assert_eq!(json["subcategories"][0]["records"][2]["Study"], "BETA");
}

#[test]
fn sheets_starting_below_the_first_row_are_consolidated() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("GAMMA.xlsx");
    write_study(
        &path,
        &[(
            "DM",
            vec![
                vec!["", "", ""],
                vec!["[Table Name]", "AGE", "SEX"],
                vec!["Variable Label", "Age", "Sex"],
                vec!["Type", "Num", "Char"],
                vec!["CDISC Notes", "", ""],
            ],
        )],
    );

    let workbook = excel_read::read_workbook(&path).expect("workbook read");
    assert_eq!(workbook.sheets[0].cell(0, 0), Some("[Table Name]"));

    let dictionary = pipeline::consolidate_files(&[path], &ConsolidationConfig::default())
        .expect("consolidated");
    let dm = dictionary.variable_table("DM").expect("DM table");
    let keys: Vec<_> = dm.column_values("Variable").flatten().collect();
    assert_eq!(keys, vec!["AGE", "SEX"]);
    assert_eq!(dm.value(1, STUDY), Some("GAMMA"));
}

#[test]
fn missing_input_is_reported_before_reading() {
    let temp_dir = tempdir().expect("temporary directory");
    let mut files = study_files(temp_dir.path());
    files.push(temp_dir.path().join("GAMMA.xlsx"));

    let error = pipeline::consolidate_files(&files, &ConsolidationConfig::default())
        .expect_err("missing workbook");

    assert!(matches!(error, DictionaryError::MissingInput(path) if path.ends_with("GAMMA.xlsx")));
}

#[test]
fn empty_input_renders_an_empty_dictionary() {
    let temp_dir = tempdir().expect("temporary directory");
    let config = ConsolidationConfig::default();

    let dictionary = pipeline::consolidate_files(&[], &config).expect("consolidated");
    assert!(dictionary.is_empty());

    let output = temp_dir.path().join("empty.xlsx");
    pipeline::write_outputs(&dictionary, &output, None, &config.title).expect("written");

    let rendered: Xlsx<_> = open_workbook(&output).expect("rendered workbook opened");
    assert_eq!(rendered.sheet_names().to_owned(), vec!["Contents"]);
}

#[test]
fn configuration_files_change_the_processed_sheets() {
    let temp_dir = tempdir().expect("temporary directory");
    let files = study_files(temp_dir.path());
    let config_path = temp_dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{ "excluded_sheets": ["ReadMe", "LB"], "subcategory_sheets": [] }"#,
    )
    .expect("config written");

    let config = ConsolidationConfig::from_path(&config_path).expect("config loaded");
    let dictionary = pipeline::consolidate_files(&files, &config).expect("consolidated");

    assert!(dictionary.variable_table("LB").is_none());
    assert!(dictionary.subcategories.is_empty());
    assert!(dictionary.variable_table("DM").is_some());
}
