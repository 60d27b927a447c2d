use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::capture::snapshot::ContentSnapshot;
use crate::core::rows::{MarkedRowSet, Row};
use crate::core::store::RowStore;

/// Marker state filename inside the store directory
const MARKERS_FILE: &str = "markers.json";
/// Current schema version
pub const SCHEMA_VERSION: u8 = 1;

/// On-disk layout of the marker state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerFile {
    /// Schema version
    pub version: u8,
    /// When the file was last written (RFC 3339)
    pub updated_at: String,
    /// Marked rows per path
    #[serde(default)]
    pub rows: BTreeMap<String, Vec<Row>>,
    /// Last reconciled content per path
    #[serde(default)]
    pub snapshots: BTreeMap<String, ContentSnapshot>,
}

/// Same layout with values left unparsed, so one bad entry cannot poison the rest
#[derive(Debug, Default, Deserialize)]
struct RawMarkerFile {
    #[serde(default)]
    rows: BTreeMap<String, Value>,
    #[serde(default)]
    snapshots: BTreeMap<String, Value>,
}

/// Everything restored from disk
#[derive(Debug, Default)]
pub struct LoadedMarkers {
    pub rows: RowStore,
    pub snapshots: BTreeMap<String, ContentSnapshot>,
    /// Paths whose stored rows were malformed and reset to empty
    pub repaired: Vec<String>,
}

/// Project-scoped persistence of marked rows
pub struct MarkerStore {
    dir: PathBuf,
}

impl MarkerStore {
    /// Create a store keeping its state under `dir`
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Path of the marker file
    pub fn path(&self) -> PathBuf {
        self.dir.join(MARKERS_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Load marker state, repairing malformed entries
    ///
    /// Entries whose rows are not a sequence of non-negative integers are
    /// reset to empty with a warning, and the normalized state is written back
    /// so the repair happens once.
    pub fn load(&self) -> Result<LoadedMarkers> {
        let path = self.path();
        if !path.exists() {
            return Ok(LoadedMarkers::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read marker file")?;

        let (raw, file_damaged) = match serde_json::from_str::<RawMarkerFile>(&content) {
            Ok(raw) => (raw, false),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "marker file is unreadable, starting empty");
                (RawMarkerFile::default(), true)
            }
        };

        let mut loaded = LoadedMarkers::default();
        let mut needs_rewrite = file_damaged;

        for (file, value) in raw.rows {
            match normalize_rows(&value) {
                Some((rows, canonical)) => {
                    needs_rewrite |= !canonical;
                    loaded.rows.replace_rows(&file, rows);
                }
                None => {
                    warn!(path = %file, value = %value, "malformed marks reset to empty");
                    loaded.rows.replace_rows(&file, MarkedRowSet::new());
                    loaded.repaired.push(file);
                    needs_rewrite = true;
                }
            }
        }

        for (file, value) in raw.snapshots {
            match serde_json::from_value::<ContentSnapshot>(value) {
                Ok(snapshot) => {
                    loaded.snapshots.insert(file, snapshot);
                }
                Err(e) => {
                    debug!(path = %file, error = %e, "dropping unreadable snapshot");
                    needs_rewrite = true;
                }
            }
        }

        if needs_rewrite {
            self.save(&loaded.rows, &loaded.snapshots)
                .context("Failed to write repaired marker file")?;
        }

        Ok(loaded)
    }

    /// Save marker state; paths with no marks are not written
    pub fn save(
        &self,
        rows: &RowStore,
        snapshots: &BTreeMap<String, ContentSnapshot>,
    ) -> Result<()> {
        let marked = rows.to_map();
        let file = MarkerFile {
            version: SCHEMA_VERSION,
            updated_at: Utc::now().to_rfc3339(),
            snapshots: snapshots
                .iter()
                .filter(|(path, _)| marked.contains_key(path.as_str()))
                .map(|(path, snapshot)| (path.clone(), snapshot.clone()))
                .collect(),
            rows: marked,
        };

        fs::create_dir_all(&self.dir).context("Failed to create marker directory")?;

        let content =
            serde_json::to_string_pretty(&file).context("Failed to serialize marker state")?;

        // Write then rename so readers never see a partial file
        let tmp = self.dir.join(format!("{MARKERS_FILE}.tmp"));
        fs::write(&tmp, content).context("Failed to write marker file")?;
        fs::rename(&tmp, self.path()).context("Failed to replace marker file")?;
        Ok(())
    }

    /// Delete the marker file
    pub fn delete(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path).context("Failed to delete marker file")?;
        }
        Ok(())
    }
}

/// Parse a stored value into rows
///
/// Returns the rows and whether the value was already canonical (strictly
/// ascending); `None` if the value is not a sequence of non-negative integers.
fn normalize_rows(value: &Value) -> Option<(MarkedRowSet, bool)> {
    let items = value.as_array()?;
    let rows = items
        .iter()
        .map(|item| item.as_u64().and_then(|n| Row::try_from(n).ok()))
        .collect::<Option<Vec<Row>>>()?;

    let canonical = rows.windows(2).all(|pair| pair[0] < pair[1]);
    Some((rows.into_iter().collect(), canonical))
}
