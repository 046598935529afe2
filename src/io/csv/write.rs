//! CSV writing operations.

use std::path::Path;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::CsvWriter};

use crate::common::write_atomic;

/// Write a DataFrame to a CSV file, replacing any previous file atomically.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    write_atomic(path, |w| {
        CsvWriter::new(w)
            .finish(df)
            .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
    })
}
