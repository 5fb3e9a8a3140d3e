use std::io::Cursor;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::CsvReader};

/// Read DataFrame from CSV bytes (header row, inferred schema).
pub(crate) fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
    CsvReader::new(Cursor::new(bytes))
        .finish()
        .context("[io::csv] Failed to read CSV from bytes")
}
