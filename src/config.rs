//! Data directory layout.

use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "POGO_DATA_DIR";

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Where every dataset of a run lives, relative to one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Paths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Reads `POGO_DATA_DIR`, falling back to `data`.
    pub fn from_env() -> Self {
        std::env::var(DATA_DIR_ENV)
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(Self::new)
            .unwrap_or_default()
    }

    /// Base input and unified output.
    pub fn events(&self) -> PathBuf {
        self.data_dir.join("events.min.json")
    }

    /// Detail documents written by the detail scrapers.
    pub fn details(&self) -> PathBuf {
        self.data_dir.join("temp")
    }

    pub fn event_types(&self) -> PathBuf {
        self.data_dir.join("eventTypes")
    }

    pub fn run_log(&self) -> PathBuf {
        self.data_dir.join("runs.csv")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = Paths::new("/srv/pogo");

        assert_eq!(paths.events(), Path::new("/srv/pogo/events.min.json"));
        assert_eq!(paths.details(), Path::new("/srv/pogo/temp"));
        assert_eq!(paths.event_types(), Path::new("/srv/pogo/eventTypes"));
        assert_eq!(paths.run_log(), Path::new("/srv/pogo/runs.csv"));
    }

    #[test]
    fn test_default_is_data() {
        assert_eq!(Paths::default().data_dir(), Path::new("data"));
    }
}
