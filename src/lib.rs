//! Core library for the study-dictionary command line application.
//!
//! The library consolidates per-study variable-definition workbooks into one
//! data dictionary plus a dictionary of subcategory values for selected
//! categorical variables. Responsibilities are kept narrow: the worksheet
//! transposer lives in [`transpose`], subcategory scanning in
//! [`subcategory`], the merge-by-key policy in [`aggregate`] and [`schema`],
//! the cross-study engine in [`consolidate`], workbook IO adapters under
//! [`io`], and the file-level orchestration in [`pipeline`].

pub mod aggregate;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod subcategory;
pub mod transpose;

pub use config::ConsolidationConfig;
pub use consolidate::{ConsolidatedDictionary, Consolidator, consolidate};
pub use error::{DictionaryError, Result};
