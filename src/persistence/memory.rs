//! In-memory profile store

use parking_lot::Mutex;

use crate::error::PersistenceError;
use crate::persistence::{Profile, ProfileStore};

/// Keeps the profile in memory. Counts saves; can be told to fail writes.
#[derive(Default)]
pub struct MemoryStore {
    profile: Mutex<Option<Profile>>,
    saves: Mutex<u64>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile: Mutex::new(Some(profile)),
            ..Default::default()
        }
    }

    /// Last saved (or seeded) profile
    pub fn current(&self) -> Option<Profile> {
        self.profile.lock().clone()
    }

    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }
}

impl ProfileStore for MemoryStore {
    fn load_profile(&self) -> Result<Profile, PersistenceError> {
        Ok(self.profile.lock().clone().unwrap_or_default())
    }

    fn save_profile(&self, profile: &Profile) -> Result<(), PersistenceError> {
        if *self.fail_writes.lock() {
            return Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "write rejected",
            )));
        }
        *self.profile.lock() = Some(profile.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_loads_default() {
        let store = MemoryStore::new();
        assert_eq!(store.load_profile().unwrap(), Profile::default());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_save_replaces() {
        let store = MemoryStore::new();
        let mut p = Profile::default();
        p.coins = 5;
        store.save_profile(&p).unwrap();
        p.coins = 9;
        store.save_profile(&p).unwrap();
        assert_eq!(store.load_profile().unwrap().coins, 9);
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn test_failing_writes() {
        let store = MemoryStore::with_profile(Profile::default());
        store.set_fail_writes(true);
        assert!(store.save_profile(&Profile::default()).is_err());
        assert_eq!(store.save_count(), 0);
    }
}
