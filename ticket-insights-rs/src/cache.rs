//! Key-based result cache on the local filesystem
//!
//! One record per file, pretty-printed JSON. `ResultCache` stores
//! `{root}/{key}.json`; `DatedCache` nests by date as
//! `{root}/{YYYY-MM}/{DD}/{key}.json`, with the key passed through
//! [`encode_key`] so any id maps to a single file under the root. There is no locking: concurrent writers
//! of the same key race and the last write wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Outcome of a cache read that distinguishes corrupt entries from absent ones
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    /// A file exists for the key but does not decode
    Corrupt(String),
}

impl<T> CacheLookup<T> {
    /// The record on a hit; misses and corrupt entries are both absence
    pub fn into_option(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss | CacheLookup::Corrupt(_) => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// File name stem for `key`.
///
/// Keys are arbitrary ids, so `%`, `.`, path separators and control
/// characters are percent-encoded. The result never contains a separator or
/// `..` and distinct keys map to distinct names.
pub fn encode_key(key: &str) -> Result<String> {
    if key.trim().is_empty() {
        return Err(PipelineError::validation("cache key must not be empty"));
    }

    let mut encoded = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            '%' | '.' | '/' | '\\' => encoded.push_str(&format!("%{:02X}", ch as u32)),
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    encoded.push_str(&format!("%{:02X}", byte));
                }
            }
            c => encoded.push(c),
        }
    }
    Ok(encoded)
}

/// Flat cache: `{root}/{key}.json`
#[derive(Debug, Clone)]
pub struct ResultCache {
    root: PathBuf,
}

impl ResultCache {
    /// Open a cache rooted at `root`, creating the directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            PipelineError::cache(format!("cannot create cache dir {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(format!("{}.json", encode_key(key)?)))
    }

    /// Whether a file exists for `key`
    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.is_file())
    }

    /// Read `key`, treating a corrupt entry as absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        Ok(self.lookup(key)?.into_option())
    }

    /// Read `key`, distinguishing hit, miss and corrupt
    pub fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<CacheLookup<T>> {
        read_record(&self.path_for(key)?)
    }

    /// Persist `record` under `key`, replacing any previous entry
    pub fn save<T: Serialize>(&self, key: &str, record: &T) -> Result<PathBuf> {
        let path = self.path_for(key)?;
        write_record(&path, record)?;
        Ok(path)
    }
}

/// Date-partitioned cache: `{root}/{YYYY-MM}/{DD}/{key}.json`
#[derive(Debug, Clone)]
pub struct DatedCache {
    root: PathBuf,
}

impl DatedCache {
    /// Open a cache rooted at `root`, creating the directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            PipelineError::cache(format!("cannot create cache dir {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all entries for `date`
    pub fn dir_for(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(date.format("%Y-%m").to_string())
            .join(date.format("%d").to_string())
    }

    /// File backing `(date, key)`
    pub fn path_for(&self, date: NaiveDate, key: &str) -> Result<PathBuf> {
        Ok(self.dir_for(date).join(format!("{}.json", encode_key(key)?)))
    }

    pub fn exists(&self, date: NaiveDate, key: &str) -> Result<bool> {
        Ok(self.path_for(date, key)?.is_file())
    }

    pub fn get<T: DeserializeOwned>(&self, date: NaiveDate, key: &str) -> Result<Option<T>> {
        Ok(self.lookup(date, key)?.into_option())
    }

    pub fn lookup<T: DeserializeOwned>(&self, date: NaiveDate, key: &str) -> Result<CacheLookup<T>> {
        read_record(&self.path_for(date, key)?)
    }

    /// Persist `record`, creating the month and day directories as needed
    pub fn save<T: Serialize>(&self, date: NaiveDate, key: &str, record: &T) -> Result<PathBuf> {
        let path = self.path_for(date, key)?;
        write_record(&path, record)?;
        Ok(path)
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<CacheLookup<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheLookup::Miss),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            let reason = format!("not valid UTF-8: {}", e);
            log::warn!("Ignoring cache entry {}: {}", path.display(), reason);
            return Ok(CacheLookup::Corrupt(reason));
        }
        Err(e) => {
            return Err(PipelineError::cache(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    match serde_json::from_str::<T>(&text) {
        Ok(record) => Ok(CacheLookup::Hit(record)),
        Err(e) => {
            log::warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
            Ok(CacheLookup::Corrupt(e.to_string()))
        }
    }
}

fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            PipelineError::cache(format!("cannot create {}: {}", parent.display(), e))
        })?;
    }

    let body = serde_json::to_string_pretty(record)?;
    fs::write(path, body)
        .map_err(|e| PipelineError::cache(format!("cannot write {}: {}", path.display(), e)))?;

    log::debug!("Cached {}", path.display());
    Ok(())
}
