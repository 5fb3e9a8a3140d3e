use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::Result;
use log::info;
use polars::prelude::DataFrame;

use crate::common::{extract_first_matching, is_zip, read_csv_bytes, read_parquet_bytes};
use crate::error::PipelineError;
use crate::geom::FeatureCollection;
use crate::label::{DictOrientation, LabelDictionary};

const PARQUET_MAGIC: &[u8] = b"PAR1";

/// Read-only access to raw payloads by location: a path, a URL, or an
/// in-memory key. Failures are [`PipelineError::Download`].
pub trait Source: Send + Sync {
    fn get(&self, what: &'static str, location: &str) -> Result<Arc<[u8]>>;
}

/// Files on disk; relative locations resolve against `root`.
#[derive(Debug, Clone, Default)]
pub struct DiskSource {
    root: Option<PathBuf>,
}

impl DiskSource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: Some(root.into()) } }

    fn full(&self, location: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(location),
            None => PathBuf::from(location),
        }
    }
}

impl Source for DiskSource {
    fn get(&self, what: &'static str, location: &str) -> Result<Arc<[u8]>> {
        let path = self.full(location);
        let bytes = std::fs::read(&path)
            .map_err(|e| PipelineError::download(what, path.display().to_string(), e))?;
        Ok(Arc::from(bytes))
    }
}

/// Blocking HTTP(S) downloads.
#[cfg(feature = "download")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSource;

#[cfg(feature = "download")]
impl Source for HttpSource {
    fn get(&self, what: &'static str, location: &str) -> Result<Arc<[u8]>> {
        info!("[source] downloading {what} from {location}");
        Ok(Arc::from(crate::common::download_bytes(what, location)?))
    }
}

/// URLs go over HTTP, anything else is read from disk.
#[derive(Debug, Clone, Default)]
pub struct RoutedSource {
    disk: DiskSource,
}

impl RoutedSource {
    pub fn new(disk: DiskSource) -> Self { Self { disk } }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[cfg(feature = "download")]
fn fetch_url(what: &'static str, location: &str) -> Result<Arc<[u8]>> {
    HttpSource.get(what, location)
}

#[cfg(not(feature = "download"))]
fn fetch_url(what: &'static str, location: &str) -> Result<Arc<[u8]>> {
    Err(PipelineError::download(what, location, "built without the `download` feature").into())
}

impl Source for RoutedSource {
    fn get(&self, what: &'static str, location: &str) -> Result<Arc<[u8]>> {
        if is_url(location) { fetch_url(what, location) } else { self.disk.get(what, location) }
    }
}

/// In-memory payloads keyed by location.
#[derive(Debug, Default, Clone)]
pub struct MemSource {
    pub(crate) files: HashMap<String, Arc<[u8]>>,
}

impl MemSource {
    pub fn new(files: HashMap<String, Arc<[u8]>>) -> Self { Self { files } }

    pub fn put(&mut self, location: impl Into<String>, bytes: &[u8]) {
        self.files.insert(location.into(), Arc::from(bytes.to_vec()));
    }
}

impl Source for MemSource {
    fn get(&self, what: &'static str, location: &str) -> Result<Arc<[u8]>> {
        self.files.get(location).cloned()
            .ok_or_else(|| PipelineError::download(what, location, "no such in-memory file").into())
    }
}

/// Observation table: parquet (by magic bytes) or CSV, optionally zipped.
pub fn load_metadata(source: &dyn Source, location: &str) -> Result<DataFrame> {
    let raw = source.get("metadata", location)?;
    let bytes: Vec<u8> = if is_zip(&raw) {
        extract_first_matching(&raw, &[".parquet", ".csv"])
            .map_err(|e| PipelineError::download("metadata", location, format!("{e:#}")))?
    } else {
        raw.to_vec()
    };

    let df = if bytes.starts_with(PARQUET_MAGIC) { read_parquet_bytes(&bytes) } else { read_csv_bytes(&bytes) }
        .map_err(|e| PipelineError::download("metadata", location, format!("{e:#}")))?;
    info!("[source] metadata: {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

/// Geometry collection from GeoJSON, optionally zipped.
pub fn load_geometry(source: &dyn Source, location: &str) -> Result<FeatureCollection> {
    let raw = source.get("geometry", location)?;
    let bytes: Vec<u8> = if is_zip(&raw) {
        extract_first_matching(&raw, &[".geojson", ".json"])
            .map_err(|e| PipelineError::download("geometry", location, format!("{e:#}")))?
    } else {
        raw.to_vec()
    };

    let collection = FeatureCollection::from_geojson_bytes(&bytes)
        .map_err(|e| PipelineError::download("geometry", location, format!("{e:#}")))?;
    info!("[source] geometry: {} features", collection.len());
    Ok(collection)
}

/// Label dictionary from a flat JSON object.
pub fn load_labels(source: &dyn Source, location: &str, orientation: DictOrientation) -> Result<LabelDictionary> {
    let bytes = source.get("labels", location)?;
    let dictionary = LabelDictionary::from_json_bytes(&bytes, orientation)
        .map_err(|e| PipelineError::download("labels", location, format!("{e:#}")))?;
    info!("[source] labels: {} fields", dictionary.len());
    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use polars::prelude::*;
    use ::zip::{ZipWriter, write::SimpleFileOptions};

    use super::*;
    use crate::common::write_parquet_bytes;

    const GEOJSON: &str = r#"{"type": "Feature", "properties": {"nom": "Ain"},
        "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}"#;

    fn zipped(name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn missing_payload_is_a_download_error() {
        let err = load_geometry(&MemSource::default(), "nowhere.geojson").unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Download { what: "geometry", .. })));

        let err = DiskSource::default().get("metadata", "/definitely/not/here.parquet").unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Download { .. })));
    }

    #[test]
    fn geometry_plain_and_zipped() {
        let mut source = MemSource::default();
        source.put("d.geojson", GEOJSON.as_bytes());
        source.put("c.geojson.zip", &zipped("c.geojson", GEOJSON.as_bytes()));
        assert_eq!(load_geometry(&source, "d.geojson").unwrap().len(), 1);
        assert_eq!(load_geometry(&source, "c.geojson.zip").unwrap().len(), 1);
    }

    #[test]
    fn metadata_sniffs_parquet_and_csv() {
        let df = DataFrame::new(vec![
            Column::new("name_dept".into(), ["Ain", "Aisne"]),
            Column::new("prob_volt".into(), [0.1, 0.2]),
        ]).unwrap();

        let mut source = MemSource::default();
        source.put("m.parquet", &write_parquet_bytes(&df).unwrap());
        source.put("m.csv", b"name_dept,prob_volt\nAin,0.1\nAisne,0.2\n");

        for location in ["m.parquet", "m.csv"] {
            let loaded = load_metadata(&source, location).unwrap();
            assert_eq!(loaded.shape(), (2, 2));
            assert_eq!(loaded.column("prob_volt").unwrap().f64().unwrap().get(1), Some(0.2));
        }
    }

    #[test]
    fn labels_and_disk_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("translate.json"), r#"{"Probability to vote": "prob_volt"}"#).unwrap();
        let source = RoutedSource::new(DiskSource::new(dir.path()));
        let dict = load_labels(&source, "translate.json", DictOrientation::LabelToCode).unwrap();
        assert_eq!(dict.label("prob_volt"), Some("Probability to vote"));
    }
}
