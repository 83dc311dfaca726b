//! File-backed persistence for the profile and lesson history.
//!
//! One JSON file per record under the data directory. Reads never fail the
//! caller: a missing file means a fresh start and a corrupt file is treated
//! the same after a warning, so damaged state can never wedge sign-in.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::chat::History;
use crate::config::Config;
use crate::profile::UserProfile;

const PROFILE_KEY: &str = "tb_user";
const HISTORY_KEY: &str = "tb_history";

pub struct StateStore {
    dir: PathBuf,
    // Serializes writers; readers tolerate whatever is on disk.
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn open(config: &Config) -> Result<Self> {
        Self::at(config.data_dir())
    }

    pub fn at(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read record");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt record, starting fresh");
                None
            }
        }
    }

    /// Write-rename so a crash mid-write never leaves a torn record.
    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let _guard = self.write_lock.lock();
        let path = self.path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let json = serde_json::to_string_pretty(value).context("Failed to serialize record")?;
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!(path = %path.display(), "record saved");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    pub fn load_profile(&self) -> Option<UserProfile> {
        self.read(PROFILE_KEY)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.write(PROFILE_KEY, profile)
    }

    pub fn clear_profile(&self) -> Result<()> {
        self.remove(PROFILE_KEY)
    }

    pub fn load_history(&self) -> History {
        self.read(HISTORY_KEY).unwrap_or_default()
    }

    pub fn save_history(&self, history: &History) -> Result<()> {
        self.write(HISTORY_KEY, history)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.remove(HISTORY_KEY)
    }
}
