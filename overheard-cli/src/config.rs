use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "overheard";
const JOBS_FILE: &str = "config.yaml";

/// Where the CLI keeps its state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jobs_path: PathBuf,
}

impl AppConfig {
    /// Use `explicit` when given, otherwise the per-user default location.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let jobs_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::default_jobs_path()?,
        };
        Ok(Self { jobs_path })
    }

    pub fn default_jobs_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(JOBS_FILE))
            .ok_or(AppError::NoConfigDir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let config = AppConfig::load(Some(Path::new("/srv/radio/jobs.yaml"))).unwrap();
        assert_eq!(config.jobs_path, PathBuf::from("/srv/radio/jobs.yaml"));
    }

    #[test]
    fn test_default_path_layout() {
        if let Ok(path) = AppConfig::default_jobs_path() {
            assert!(path.ends_with("overheard/config.yaml"));
        }
    }
}
