//! INI file configuration adapter.

use crate::domain::error::RiskboardError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::{Path, PathBuf};

pub struct FileConfigAdapter {
    config: Ini,
    /// Directory relative paths in the file resolve against.
    base_dir: PathBuf,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RiskboardError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| RiskboardError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self { config, base_dir })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self {
            config,
            base_dir: PathBuf::new(),
        })
    }

    /// Path value resolved against the config file's directory.
    pub fn get_path(&self, section: &str, key: &str, default: &str) -> PathBuf {
        let raw = PathBuf::from(self.get_string_or(section, key, default));
        if raw.is_absolute() {
            raw
        } else {
            self.base_dir.join(raw)
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}
