use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use relay_core::sort_contacts;
use relay_logging::{relay_info, relay_warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode contacts: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Last harvest result as the host UI reads it back.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoredContacts {
    pub contacts: Vec<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Persistence collaborator for harvested contacts.
pub trait ContactStore: Send {
    fn save(&self, contacts: &[String], synced_at: DateTime<Utc>) -> Result<(), PersistError>;

    /// Missing or unreadable data reads as empty.
    fn load(&self) -> Result<StoredContacts, PersistError>;
}

/// Unordered document written by earlier releases.
#[derive(Deserialize)]
struct LegacyContacts {
    friends_list: BTreeSet<String>,
    #[serde(default)]
    sync_time: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Current(StoredContacts),
    Legacy(LegacyContacts),
}

/// JSON file store with atomic replacement.
#[derive(Debug, Clone)]
pub struct FileContactStore {
    path: PathBuf,
}

impl FileContactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, stored: &StoredContacts) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(stored)?;
        write_atomically(&self.path, &json)
    }
}

impl ContactStore for FileContactStore {
    fn save(&self, contacts: &[String], synced_at: DateTime<Utc>) -> Result<(), PersistError> {
        self.write(&StoredContacts {
            contacts: contacts.to_vec(),
            synced_at: Some(synced_at),
        })?;
        relay_info!("saved {} contacts to {:?}", contacts.len(), self.path);
        Ok(())
    }

    fn load(&self) -> Result<StoredContacts, PersistError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoredContacts::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<OnDisk>(&text) {
            Ok(OnDisk::Current(stored)) => Ok(stored),
            Ok(OnDisk::Legacy(legacy)) => {
                let mut contacts: Vec<String> = legacy.friends_list.into_iter().collect();
                sort_contacts(&mut contacts);
                let stored = StoredContacts {
                    contacts,
                    synced_at: legacy
                        .sync_time
                        .and_then(DateTime::<Utc>::from_timestamp_millis),
                };
                relay_info!("upgrading legacy contact list {:?}", self.path);
                self.write(&stored)?;
                Ok(stored)
            }
            Err(e) => {
                relay_warn!("dropping unreadable contact list {:?}: {e}", self.path);
                fs::remove_file(&self.path)?;
                Ok(StoredContacts::default())
            }
        }
    }
}

/// Writes `content` to a temp file beside `target`, then renames it into place.
pub fn write_atomically(target: &Path, content: &str) -> Result<(), PersistError> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}

/// Human-readable age of the last sync, as shown next to the contact list.
pub fn describe_sync_age(synced_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - synced_at).num_minutes().max(0);
    match minutes {
        0 => "just now".to_string(),
        1..=59 => format!("{minutes} minutes ago"),
        _ => format!("{} hours ago", minutes / 60),
    }
}
