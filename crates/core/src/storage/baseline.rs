use crate::domain::item::{Item, Snapshot};
use anyhow::Context;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub trait SnapshotStore: Send + Sync {
    /// `None` means no run ever persisted a snapshot; an empty snapshot is `Some`.
    fn load(&self) -> anyhow::Result<Option<Snapshot>>;

    fn save(&self, snapshot: &Snapshot) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct CsvBaselineStore {
    path: PathBuf,
}

impl CsvBaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "baseline.csv".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for CsvBaselineStore {
    fn load(&self) -> anyhow::Result<Option<Snapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read baseline {}", self.path.display()))
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(Snapshot::default()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes.as_slice());

        let columns: Vec<String> = reader
            .headers()
            .with_context(|| format!("failed to read baseline header {}", self.path.display()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut unique = HashSet::new();
        for column in &columns {
            anyhow::ensure!(
                unique.insert(column.as_str()),
                "baseline {} has duplicate column {column}",
                self.path.display()
            );
        }

        let mut items = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("baseline {} row {} is malformed", self.path.display(), idx + 1)
            })?;
            items.push(Item::from_fields(
                columns
                    .iter()
                    .zip(record.iter())
                    .map(|(c, v)| (c.clone(), v.to_string())),
            ));
        }

        Ok(Some(Snapshot::new(columns, items)))
    }

    fn save(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create baseline dir {}", parent.display()))?;
        }

        let tmp = self.temp_path();
        {
            let file = fs::File::create(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;

            // A snapshot without columns is stored as an empty file.
            if !snapshot.columns.is_empty() {
                let mut writer = csv::Writer::from_writer(file);
                writer
                    .write_record(&snapshot.columns)
                    .context("failed to write baseline header")?;
                for item in &snapshot.items {
                    writer
                        .write_record(snapshot.columns.iter().map(|c| item.get(c).unwrap_or("")))
                        .context("failed to write baseline row")?;
                }
                writer.flush().context("failed to flush baseline")?;
            }
        }

        fs::rename(&tmp, &self.path).with_context(|| {
            format!(
                "failed to replace baseline {} with {}",
                self.path.display(),
                tmp.display()
            )
        })?;

        tracing::debug!(
            path = %self.path.display(),
            items = snapshot.len(),
            "baseline saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::{KEY_COLUMN, PROFIT_COLUMN, RATE_OF_RETURN_COLUMN};

    fn columns() -> Vec<String> {
        vec![
            KEY_COLUMN.to_string(),
            RATE_OF_RETURN_COLUMN.to_string(),
            PROFIT_COLUMN.to_string(),
        ]
    }

    fn item(key: &str, rate: &str, profit: &str) -> Item {
        Item::from_fields([
            (KEY_COLUMN, key),
            (RATE_OF_RETURN_COLUMN, rate),
            (PROFIT_COLUMN, profit),
        ])
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvBaselineStore::new(dir.path().join("baseline.csv"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn saved_snapshot_loads_back_equal() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvBaselineStore::new(dir.path().join("state").join("baseline.csv"));
        let snapshot = Snapshot::new(
            columns(),
            vec![item("6901 鑽石投資", "45.2", "13560"), item("7705, 三商", "", "")],
        );

        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn header_only_file_is_an_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvBaselineStore::new(dir.path().join("baseline.csv"));
        store.save(&Snapshot::new(columns(), vec![])).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.columns, columns());
    }

    #[test]
    fn zero_byte_file_is_an_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvBaselineStore::new(dir.path().join("baseline.csv"));
        store.save(&Snapshot::default()).unwrap();

        assert_eq!(fs::metadata(store.path()).unwrap().len(), 0);
        assert_eq!(store.load().unwrap(), Some(Snapshot::default()));
    }

    #[test]
    fn tolerates_bom_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.csv");
        fs::write(&path, "\u{feff}股票代號 名稱,獲利\n6901 鑽石投資,13560\n").unwrap();

        let loaded = CsvBaselineStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.columns, vec![KEY_COLUMN, PROFIT_COLUMN]);
        assert_eq!(loaded.items[0].key(), "6901 鑽石投資");
        assert_eq!(loaded.items[0].profit(), Some(13_560.0));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.csv");
        fs::write(&path, "a,b\n1,2,3\n").unwrap();

        assert!(CsvBaselineStore::new(&path).load().is_err());
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvBaselineStore::new(dir.path().join("baseline.csv"));
        store
            .save(&Snapshot::new(columns(), vec![item("A", "30", ""), item("B", "30", "")]))
            .unwrap();
        let next = Snapshot::new(columns(), vec![item("C", "", "20000")]);
        store.save(&next).unwrap();

        assert_eq!(store.load().unwrap(), Some(next));
    }
}
