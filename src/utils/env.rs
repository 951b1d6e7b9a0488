// src/utils/env.rs
use log::{info, warn};
use std::path::{Path, PathBuf};

const ENV_PATHS: [&str; 3] = [".env", ".env.local", "../.env"];

/// What `load_env` did. Loading happens before the logger exists (so `.env`
/// can set `RUST_LOG`); call [`EnvLoad::log`] once logging is up.
#[derive(Debug, Default)]
pub struct EnvLoad {
    pub loaded: Option<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

impl EnvLoad {
    pub fn log(&self) {
        for (path, e) in &self.failures {
            warn!("Failed to load environment from {}: {}", path.display(), e);
        }
        match &self.loaded {
            Some(path) => info!("Loaded environment variables from {}", path.display()),
            None => info!("No .env file found, using environment variables from system"),
        }
    }
}

/// Loads the first `.env` file found. Variables already set in the process
/// environment win over values from the file.
pub fn load_env() -> EnvLoad {
    load_env_from(ENV_PATHS.iter().map(Path::new))
}

pub fn load_env_from<'a>(candidates: impl IntoIterator<Item = &'a Path>) -> EnvLoad {
    let mut outcome = EnvLoad::default();
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match dotenv::from_path(path) {
            Ok(()) => {
                outcome.loaded = Some(path.to_path_buf());
                break;
            }
            Err(e) => outcome.failures.push((path.to_path_buf(), e.to_string())),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_existing_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(".env");
        let local = dir.path().join(".env.local");
        let parent = dir.path().join("parent.env");
        std::fs::write(&local, "WILDFIRE_ENV_TEST_LOCAL=local\n").unwrap();
        std::fs::write(&parent, "WILDFIRE_ENV_TEST_PARENT=parent\n").unwrap();

        let outcome = load_env_from([missing.as_path(), local.as_path(), parent.as_path()]);
        assert_eq!(outcome.loaded, Some(local));
        assert!(outcome.failures.is_empty());
        assert_eq!(std::env::var("WILDFIRE_ENV_TEST_LOCAL").unwrap(), "local");
        assert!(std::env::var("WILDFIRE_ENV_TEST_PARENT").is_err());
        outcome.log();

        std::env::remove_var("WILDFIRE_ENV_TEST_LOCAL");
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = load_env_from([dir.path().join(".env").as_path()]);
        assert!(outcome.loaded.is_none());
        assert!(outcome.failures.is_empty());
    }
}
