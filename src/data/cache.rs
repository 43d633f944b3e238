use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::DataSourceError;

use super::loader::load_file;
use super::model::BaseTable;

// ---------------------------------------------------------------------------
// DatasetCache – the table is read once and held until an explicit reload
// ---------------------------------------------------------------------------

/// Session-long holder of the loaded [`BaseTable`].
#[derive(Debug, Clone)]
pub struct DatasetCache {
    path: PathBuf,
    table: Arc<BaseTable>,
    /// Source modification time observed at the last successful load.
    modified: Option<SystemTime>,
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl DatasetCache {
    /// Load `path` once.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DataSourceError> {
        let path = path.into();
        let modified = modified_time(&path);
        let table = load_file(&path)?;
        log::info!("Loaded {} months from {}", table.len(), path.display());
        Ok(Self {
            path,
            table: Arc::new(table),
            modified,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared handle to the cached table; never touches the source.
    pub fn table(&self) -> Arc<BaseTable> {
        Arc::clone(&self.table)
    }

    /// Whether the source changed on disk since the last successful load.
    pub fn is_stale(&self) -> bool {
        let current = modified_time(&self.path);
        current.is_some() && current != self.modified
    }

    /// Re-read the source. On failure the previous table is kept.
    pub fn reload(&mut self) -> Result<(), DataSourceError> {
        let modified = modified_time(&self.path);
        let table = load_file(&self.path)?;
        log::info!(
            "Reloaded {}: {} → {} months",
            self.path.display(),
            self.table.len(),
            table.len()
        );
        self.table = Arc::new(table);
        self.modified = modified;
        Ok(())
    }
}
