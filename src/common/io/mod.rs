mod archive;
mod csv;
mod geojson;
mod json;
mod parquet;

pub(crate) use archive::*;
pub(crate) use csv::*;
pub(crate) use geojson::*;
pub(crate) use json::*;
pub(crate) use parquet::*;
