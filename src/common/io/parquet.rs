use std::io::Cursor;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::{ParquetReader, ParquetWriter}};

/// Read Parquet from bytes.
pub(crate) fn read_parquet_bytes(bytes: &[u8]) -> Result<DataFrame> {
    ParquetReader::new(Cursor::new(bytes))
        .finish()
        .context("[io::parquet] Failed to read Parquet from bytes")
}

/// Write Parquet into bytes.
pub(crate) fn write_parquet_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ParquetWriter::new(&mut out)
        .finish(&mut df.clone())
        .context("[io::parquet] Failed to write Parquet to bytes")?;
    Ok(out)
}
