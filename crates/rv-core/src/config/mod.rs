//! Application configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::SortSpec;
use crate::ReportError;

/// Top-level settings, read from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Preference file; in-memory storage when unset
    pub storage_path: Option<PathBuf>,

    /// SQLite database serving reports that have a table mapping
    pub remote_database: Option<PathBuf>,

    /// SQLite database receiving a copy of preference writes
    pub mirror_database: Option<PathBuf>,

    pub sample: SampleSettings,

    pub view: ViewSettings,

    pub export: ExportSettings,
}

/// Generated local data set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSettings {
    pub row_count: usize,
    pub seed: u64,
}

/// Table view defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub default_page_size: usize,
    pub page_size_options: Vec<usize>,
    pub default_sort: SortSpec,
}

/// Export destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            storage_path: None,
            remote_database: None,
            mirror_database: None,
            sample: SampleSettings::default(),
            view: ViewSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            row_count: 250,
            seed: 42,
        }
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            page_size_options: vec![10, 20, 50, 100],
            default_sort: SortSpec::desc("date"),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.view.default_page_size == 0 {
            return Err(ReportError::Validation("view.default_page_size must be positive".to_string()));
        }
        if self.view.page_size_options.iter().any(|&n| n == 0) {
            return Err(ReportError::Validation("view.page_size_options must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.sample.row_count, 250);
        assert_eq!(settings.view.default_page_size, 10);
        assert_eq!(settings.view.default_sort.direction, Direction::Desc);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "view": { "default_page_size": 20 }, "remote_database": "hr.db" }"#).unwrap();

        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings.view.default_page_size, 20);
        assert_eq!(settings.view.page_size_options, vec![10, 20, 50, 100]);
        assert_eq!(settings.remote_database, Some(PathBuf::from("hr.db")));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "view": { "default_page_size": 0 } }"#).unwrap();
        assert!(matches!(AppSettings::load(&path), Err(ReportError::Validation(_))));
    }
}
