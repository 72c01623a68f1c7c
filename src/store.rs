use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File, create_dir_all};
use std::io::{BufReader, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;

// Fixed blob name inside the data directory. The whole dataset collection
// lives under this one key.
const STORE_FILE: &str = "datasets.json";

/// Disk-backed store for the dataset collection: one JSON array under a
/// fixed name. Read once at startup, overwritten wholesale on each mutation.
/// Last write wins; a single process is assumed.
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    /// Open a store rooted at `dir`, creating the directory and an empty
    /// blob on first use.
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            create_dir_all(dir)?;
        }

        let path = dir.join(STORE_FILE);
        if !path.exists() {
            let mut file = File::create(&path)?;
            file.write_all(b"[]")?;
        }

        Ok(DatasetStore { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole dataset array from disk.
    pub fn load(&self) -> Result<Vec<Dataset>, String> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(_) => return Err("Failed to open dataset store".to_string()),
        };

        let mut contents = String::new();
        if file.read_to_string(&mut contents).is_err() {
            return Err("Failed to read dataset store".to_string());
        }

        match serde_json::from_str(&contents) {
            Ok(datasets) => Ok(datasets),
            Err(e) => {
                log::warn!("dataset store at {:?} is unreadable: {}", self.path, e);
                Err("Failed to parse dataset store".to_string())
            }
        }
    }

    /// Overwrite the blob with the given array.
    pub fn save(&self, datasets: &[Dataset]) -> Result<(), String> {
        let json = match serde_json::to_string_pretty(datasets) {
            Ok(json) => json,
            Err(_) => return Err("Failed to serialize datasets".to_string()),
        };

        if fs::write(&self.path, json.as_bytes()).is_err() {
            return Err("Failed to write dataset store".to_string());
        }

        Ok(())
    }
}

/// Serialize a single dataset to a gzip-compressed JSON archive, suitable
/// for download and later re-import.
pub fn archive_dataset(dataset: &Dataset) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());

    serde_json::to_writer(&mut encoder, dataset)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    encoder.finish()
}

/// Reconstruct a dataset from a gzip-compressed JSON archive.
pub fn unarchive_dataset(buffer: &[u8]) -> std::io::Result<Dataset> {
    let cursor = Cursor::new(buffer);
    let decoder = GzDecoder::new(cursor);
    let reader = BufReader::new(decoder);

    let dataset: Dataset = serde_json::from_reader(reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CellValue, Row};

    fn sample_dataset(name: &str) -> Dataset {
        let mut row = Row::new();
        row.insert("region".to_string(), CellValue::Text("east".to_string()));
        row.insert("amount".to_string(), CellValue::Number(10.0));
        Dataset::new(
            name,
            vec!["region".to_string(), "amount".to_string()],
            vec![row],
            "tester",
        )
    }

    #[test]
    fn fresh_store_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::open(dir.path()).unwrap();

        let datasets = vec![sample_dataset("a"), sample_dataset("b")];
        store.save(&datasets).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, datasets[0].id);
        assert_eq!(loaded[0].created_at, datasets[0].created_at);
        assert_eq!(loaded[1].name, "b");
        assert_eq!(
            loaded[0].rows[0].get("amount"),
            Some(&CellValue::Number(10.0))
        );
    }

    #[test]
    fn save_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::open(dir.path()).unwrap();

        store.save(&[sample_dataset("a"), sample_dataset("b")]).unwrap();
        store.save(&[sample_dataset("c")]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "c");
    }

    #[test]
    fn reopening_keeps_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DatasetStore::open(dir.path()).unwrap();
            store.save(&[sample_dataset("a")]).unwrap();
        }
        let store = DatasetStore::open(dir.path()).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn archive_round_trips_a_dataset() {
        let dataset = sample_dataset("archived");
        let bytes = archive_dataset(&dataset).unwrap();
        let back = unarchive_dataset(&bytes).unwrap();
        assert_eq!(back.id, dataset.id);
        assert_eq!(back.name, "archived");
        assert_eq!(back.created_at, dataset.created_at);
        assert_eq!(back.rows.len(), 1);
    }

    #[test]
    fn unarchive_rejects_garbage() {
        assert!(unarchive_dataset(b"not a gzip archive").is_err());
    }
}
