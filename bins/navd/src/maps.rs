//! File-backed map provider.
//!
//! Maps live as JSON grid messages in a directory, one file per id
//! (`map_<id>.json`). This stands in for a networked map store; the
//! generator only sees the [`MapProvider`] trait.

use mapserver::{MapProvider, MapServerError};
use std::path::PathBuf;
use tracing::info;
use types::GridMsg;

pub struct FileMapProvider {
    map_dir: PathBuf,
}

impl FileMapProvider {
    pub fn new(map_dir: impl Into<PathBuf>) -> Self {
        Self {
            map_dir: map_dir.into(),
        }
    }
}

impl MapProvider for FileMapProvider {
    fn get_map(&self, id: i8) -> Result<GridMsg, MapServerError> {
        let path = self.map_dir.join(format!("map_{}.json", id));
        let content = std::fs::read_to_string(&path)
            .map_err(|e| MapServerError::Provider(format!("{}: {}", path.display(), e)))?;
        let msg: GridMsg = serde_json::from_str(&content)
            .map_err(|e| MapServerError::Provider(format!("{}: {}", path.display(), e)))?;
        info!(
            map = id,
            width = msg.width,
            height = msg.height,
            "Loaded map from disk"
        );
        Ok(msg)
    }
}
