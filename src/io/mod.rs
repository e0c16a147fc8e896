//! Adapters between study workbooks on disk and the in-memory model.

pub mod excel_read;
pub mod excel_write;
pub mod json;
