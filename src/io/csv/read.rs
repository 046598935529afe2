//! Delimited text reading operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result, anyhow};
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReadOptions, StringChunked}};

/// Reads a delimited text file with a header row into a Polars DataFrame.
/// Every column is read as text so codes keep their leading zeros and
/// locale-formatted numbers reach the caller untouched.
pub(crate) fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open delimited file: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|po| po.with_separator(separator))
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read delimited file from {:?}", path))
}

/// A raw table read as text, with lookups by (trimmed) header name.
pub(crate) struct TextTable {
    name: String,
    df: DataFrame,
}

impl TextTable {
    pub(crate) fn read(path: &Path, separator: char) -> Result<Self> {
        let separator = u8::try_from(separator)
            .map_err(|_| anyhow!("[io::csv::read] Separator {separator:?} is not a single byte"))?;
        let name = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, df: read_delimited(path, separator)? })
    }

    /// File name, used to label diagnostics.
    #[inline] pub(crate) fn name(&self) -> &str { &self.name }

    #[inline] pub(crate) fn height(&self) -> usize { self.df.height() }

    /// 1-based line number of data row `row` (the header is line 1).
    #[inline] pub(crate) fn line(row: usize) -> usize { row + 2 }

    fn header(&self, name: &str) -> Option<&str> {
        self.df.get_column_names().into_iter()
            .map(|n| n.as_str())
            .find(|n| n.trim_start_matches('\u{feff}').trim() == name)
    }

    pub(crate) fn has_column(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Column `name` as text cells.
    pub(crate) fn column(&self, name: &str) -> Result<&StringChunked> {
        let header = self.header(name)
            .ok_or_else(|| anyhow!("[io::csv::read] {} has no column `{name}`", self.name))?;
        self.df.column(header)?.str()
            .with_context(|| format!("[io::csv::read] Column `{name}` of {} is not text", self.name))
    }
}
