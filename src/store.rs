//! Persistence collaborators: schedule config and grid rows.
//!
//! Every failure surfaces as `PersistenceUnavailable`; callers keep their
//! local state and may retry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SchedulerError};
use crate::export::PanelRow;
use crate::schedule::ScheduleConfig;

pub trait ScheduleConfigStore {
    fn load(&self) -> Result<ScheduleConfig>;
    fn save(&self, config: &ScheduleConfig) -> Result<()>;
}

pub trait GridStore {
    fn load_all(&self) -> Result<Vec<PanelRow>>;
    /// Replaces every stored row (last write wins)
    fn replace_all(&self, rows: &[PanelRow]) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

const SCHEDULE_FILE: &str = "schedule.json";
const PANELS_FILE: &str = "panels.json";

/// JSON files under one data directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    default_schedule: ScheduleConfig,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            default_schedule: ScheduleConfig::default(),
        }
    }

    /// Schedule returned by `load` before anything has been saved
    pub fn with_default_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.default_schedule = schedule;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| SchedulerError::PersistenceUnavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Writes through a temp file so a failed write leaves the old file intact
    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));
        fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "Saved");
        Ok(())
    }
}

impl ScheduleConfigStore for JsonFileStore {
    fn load(&self) -> Result<ScheduleConfig> {
        Ok(self
            .read_json(SCHEDULE_FILE)?
            .unwrap_or_else(|| self.default_schedule.clone()))
    }

    fn save(&self, config: &ScheduleConfig) -> Result<()> {
        self.write_json(SCHEDULE_FILE, config)
    }
}

impl GridStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<PanelRow>> {
        let mut rows: Vec<PanelRow> = self.read_json(PANELS_FILE)?.unwrap_or_default();
        rows.sort_by_key(|r| r.panel);
        Ok(rows)
    }

    fn replace_all(&self, rows: &[PanelRow]) -> Result<()> {
        self.write_json(PANELS_FILE, rows)
    }

    fn clear(&self) -> Result<()> {
        self.write_json::<[PanelRow]>(PANELS_FILE, &[])
    }
}

/// Process-local store, used in tests and when no data directory is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: Mutex<Option<ScheduleConfig>>,
    rows: Mutex<Vec<PanelRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> SchedulerError {
    SchedulerError::PersistenceUnavailable("store lock poisoned".to_string())
}

impl ScheduleConfigStore for MemoryStore {
    fn load(&self) -> Result<ScheduleConfig> {
        Ok(self.config.lock().map_err(poisoned)?.clone().unwrap_or_default())
    }

    fn save(&self, config: &ScheduleConfig) -> Result<()> {
        *self.config.lock().map_err(poisoned)? = Some(config.clone());
        Ok(())
    }
}

impl GridStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<PanelRow>> {
        Ok(self.rows.lock().map_err(poisoned)?.clone())
    }

    fn replace_all(&self, rows: &[PanelRow]) -> Result<()> {
        *self.rows.lock().map_err(poisoned)? = rows.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.rows.lock().map_err(poisoned)?.clear();
        Ok(())
    }
}
