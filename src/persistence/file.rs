//! JSON file profile store

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PersistenceError;
use crate::persistence::{check_version, Profile, ProfileStore};

/// Profiles larger than this are rejected as corrupt
const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Stores the profile as pretty-printed JSON at a fixed path
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonFileStore {
    fn load_profile(&self) -> Result<Profile, PersistenceError> {
        if !self.path.exists() {
            debug!("No profile at {}, starting fresh", self.path.display());
            return Ok(Profile::default());
        }

        let metadata = fs::metadata(&self.path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(PersistenceError::TooLarge(metadata.len()));
        }

        let contents = fs::read_to_string(&self.path)?;
        let profile: Profile = serde_json::from_str(&contents)?;
        check_version(&profile)?;

        debug!("Loaded profile from {} ({} coins)", self.path.display(), profile.coins);
        Ok(profile)
    }

    fn save_profile(&self, profile: &Profile) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(profile)?;

        // Write then rename so a crash never leaves a truncated profile
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Saved profile to {}", self.path.display());
        Ok(())
    }
}
