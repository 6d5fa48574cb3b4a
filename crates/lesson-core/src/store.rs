//! Persistent per-user learning state.
//!
//! Files live under the configured data directory, one directory per user
//! named by a hash of the user id to avoid filesystem issues:
//!
//! ```text
//! <data_dir>/current_user.toml
//! <data_dir>/<sha256(user id)>/known_words.json       { lessonId: [word, ...] }
//! <data_dir>/<sha256(user id)>/completed_lessons.json [lessonId, ...]
//! ```
//!
//! Writes are plain overwrites, so concurrent views follow last-write-wins.

use crate::auth::AuthUser;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

pub const DEFAULT_DATA_DIR: &str = ".cache";

/// Set of normalized words a user marked as known in one lesson.
pub type KnownWords = BTreeSet<String>;

pub trait ProgressStore: Send + Sync {
    fn load_known(&self, user_id: &str, lesson_id: &str) -> Result<KnownWords>;
    fn save_known(&self, user_id: &str, lesson_id: &str, words: &KnownWords) -> Result<()>;
    fn load_completed(&self, user_id: &str) -> Result<BTreeSet<String>>;
    fn save_completed(&self, user_id: &str, lessons: &BTreeSet<String>) -> Result<()>;
    fn load_current_user(&self) -> Result<Option<AuthUser>>;
    fn save_current_user(&self, user: Option<&AuthUser>) -> Result<()>;
}

/// File-backed store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    root: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct CurrentUserEntry {
    user: AuthUser,
}

impl FileProgressStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(user_id.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.root.join(hash)
    }

    fn known_words_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join("known_words.json")
    }

    fn completed_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join("completed_lessons.json")
    }

    fn current_user_path(&self) -> PathBuf {
        self.root.join("current_user.toml")
    }

    fn load_known_map(&self, user_id: &str) -> Result<BTreeMap<String, KnownWords>> {
        read_json_or_default(&self.known_words_path(user_id))
    }
}

impl ProgressStore for FileProgressStore {
    fn load_known(&self, user_id: &str, lesson_id: &str) -> Result<KnownWords> {
        let mut all = self.load_known_map(user_id)?;
        Ok(all.remove(lesson_id).unwrap_or_default())
    }

    fn save_known(&self, user_id: &str, lesson_id: &str, words: &KnownWords) -> Result<()> {
        let mut all = self.load_known_map(user_id)?;
        all.insert(lesson_id.to_string(), words.clone());
        let path = self.known_words_path(user_id);
        write_json(&path, &all)?;
        debug!(path = %path.display(), lesson = lesson_id, count = words.len(), "Saved known words");
        Ok(())
    }

    fn load_completed(&self, user_id: &str) -> Result<BTreeSet<String>> {
        read_json_or_default(&self.completed_path(user_id))
    }

    fn save_completed(&self, user_id: &str, lessons: &BTreeSet<String>) -> Result<()> {
        write_json(&self.completed_path(user_id), lessons)
    }

    fn load_current_user(&self) -> Result<Option<AuthUser>> {
        let path = self.current_user_path();
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("Reading {}", path.display()));
            }
        };
        let entry: CurrentUserEntry =
            toml::from_str(&data).with_context(|| format!("Parsing {}", path.display()))?;
        Ok(Some(entry.user))
    }

    fn save_current_user(&self, user: Option<&AuthUser>) -> Result<()> {
        let path = self.current_user_path();
        match user {
            Some(user) => {
                let entry = CurrentUserEntry { user: user.clone() };
                let contents = toml::to_string(&entry).context("Serializing current user")?;
                ensure_parent(&path)?;
                fs::write(&path, contents).with_context(|| format!("Writing {}", path.display()))
            }
            None => match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err).with_context(|| format!("Removing {}", path.display())),
            },
        }
    }
}

/// Read a JSON file, treating a missing file as empty. A file that no longer
/// parses is renamed to `<name>.corrupt` and replaced by an empty value, so
/// later writes are not blocked by it.
fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => return Err(err).with_context(|| format!("Reading {}", path.display())),
    };
    match serde_json::from_str(&data) {
        Ok(value) => Ok(value),
        Err(err) => {
            let aside = corrupt_path(path);
            fs::rename(path, &aside).with_context(|| {
                format!("Moving unreadable {} to {}", path.display(), aside.display())
            })?;
            warn!(
                path = %path.display(),
                moved_to = %aside.display(),
                "Progress file was unreadable; starting fresh: {err}"
            );
            Ok(T::default())
        }
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string(value).context("Serializing progress")?;
    ensure_parent(path)?;
    fs::write(path, contents).with_context(|| format!("Writing {}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating directory {}", parent.display()))?;
    }
    Ok(())
}

/// In-process store. Counts writes so callers can assert on persistence.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    known: Mutex<HashMap<(String, String), KnownWords>>,
    completed: Mutex<HashMap<String, BTreeSet<String>>>,
    current_user: Mutex<Option<AuthUser>>,
    writes: AtomicUsize,
}

impl MemoryProgressStore {
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::AcqRel);
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load_known(&self, user_id: &str, lesson_id: &str) -> Result<KnownWords> {
        let key = (user_id.to_string(), lesson_id.to_string());
        Ok(self.known.lock().get(&key).cloned().unwrap_or_default())
    }

    fn save_known(&self, user_id: &str, lesson_id: &str, words: &KnownWords) -> Result<()> {
        let key = (user_id.to_string(), lesson_id.to_string());
        self.known.lock().insert(key, words.clone());
        self.record_write();
        Ok(())
    }

    fn load_completed(&self, user_id: &str) -> Result<BTreeSet<String>> {
        Ok(self.completed.lock().get(user_id).cloned().unwrap_or_default())
    }

    fn save_completed(&self, user_id: &str, lessons: &BTreeSet<String>) -> Result<()> {
        self.completed
            .lock()
            .insert(user_id.to_string(), lessons.clone());
        self.record_write();
        Ok(())
    }

    fn load_current_user(&self) -> Result<Option<AuthUser>> {
        Ok(self.current_user.lock().clone())
    }

    fn save_current_user(&self, user: Option<&AuthUser>) -> Result<()> {
        *self.current_user.lock() = user.cloned();
        self.record_write();
        Ok(())
    }
}
