use std::io::{Cursor, Read};

use anyhow::{Context, Result, bail};
use zip::ZipArchive;

/// True if `bytes` starts with the zip local-file-header magic.
pub(crate) fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

/// Extract the first archive entry whose name ends with one of `extensions`.
pub(crate) fn extract_first_matching(bytes: &[u8], extensions: &[&str]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .context("[io::archive] Failed to read zip archive")?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)
            .with_context(|| format!("[io::archive] Failed to open entry {i}"))?;
        let name = entry.name().to_ascii_lowercase();
        if entry.is_dir() || !extensions.iter().any(|ext| name.ends_with(ext)) { continue }

        let mut out = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut out)
            .with_context(|| format!("[io::archive] Failed to extract {}", entry.name()))?;
        return Ok(out);
    }
    bail!("[io::archive] No entry matching {extensions:?} in archive")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::{ZipWriter, write::SimpleFileOptions};

    use super::*;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_first_geojson_entry() {
        let bytes = archive(&[("README.txt", b"hello"), ("data/communes.GeoJSON", b"{}")]);
        assert!(is_zip(&bytes));
        assert_eq!(extract_first_matching(&bytes, &[".geojson", ".json"]).unwrap(), b"{}");
    }

    #[test]
    fn missing_entry_is_an_error() {
        let bytes = archive(&[("README.txt", b"hello")]);
        assert!(extract_first_matching(&bytes, &[".geojson"]).is_err());
        assert!(!is_zip(b"{\"type\":\"FeatureCollection\"}"));
    }
}
