// src/sequence/mod.rs
//
// Per-year file sequence, persisted as a JSON array in a single store file.
// One `SequenceStore` per process; every generated file consumes exactly one
// increment. A failed generation after `increment` leaves the sequence
// consumed — the downstream consumer tolerates gaps, not duplicates.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::Mutex,
};
use tracing::{info, warn};

/// Base tag of every file identifier.
pub const FILE_TAG: &str = "IRMEQS";

/// One persisted counter per calendar year. `sequence` never decreases
/// within a year once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSequence {
    pub year: i32,
    pub sequence: u64,
    pub last_updated_timestamp: String,
}

/// Counter store with an injected file path. Load-modify-persist runs under
/// a mutex so two callers in the same process can never mint the same
/// sequence number.
pub struct SequenceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SequenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating store directory {:?}", parent))?;
            }
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Current counter for `year`; created at zero and persisted when the
    /// year has no entry yet.
    pub fn current(&self, year: i32) -> Result<YearSequence> {
        let _guard = self.lock.lock().unwrap();
        let mut entries = self.load();
        if let Some(entry) = entries.iter().find(|e| e.year == year) {
            return Ok(entry.clone());
        }
        let created = YearSequence {
            year,
            sequence: 0,
            last_updated_timestamp: Utc::now().to_rfc3339(),
        };
        entries.push(created.clone());
        self.save(entries)?;
        info!(year, "created sequence entry");
        Ok(created)
    }

    /// The only mutator: bump the year's sequence by one and persist.
    /// Called exactly once per file produced, *before* any record is built.
    pub fn increment(&self, year: i32) -> Result<YearSequence> {
        let _guard = self.lock.lock().unwrap();
        let mut entries = self.load();
        let entry = match entries.iter_mut().find(|e| e.year == year) {
            Some(entry) => {
                entry.sequence += 1;
                entry.last_updated_timestamp = Utc::now().to_rfc3339();
                entry.clone()
            }
            None => {
                let created = YearSequence {
                    year,
                    sequence: 1,
                    last_updated_timestamp: Utc::now().to_rfc3339(),
                };
                entries.push(created.clone());
                created
            }
        };
        self.save(entries)?;
        info!(year, sequence = entry.sequence, "incremented sequence");
        Ok(entry)
    }

    /// Administrative reset: drop the year's entry. The next `current` or
    /// `increment` recreates it from zero.
    pub fn reset(&self, year: i32) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let mut entries = self.load();
        entries.retain(|e| e.year != year);
        self.save(entries)?;
        warn!(year, "sequence reset");
        Ok(())
    }

    /// All persisted entries, newest year first.
    pub fn all(&self) -> Vec<YearSequence> {
        let _guard = self.lock.lock().unwrap();
        self.load()
    }

    fn load(&self) -> Vec<YearSequence> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<Vec<YearSequence>>(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                // A mangled store starts over from empty rather than
                // blocking every generation.
                warn!(path = %self.path.display(), %err, "unreadable sequence store, starting empty");
                Vec::new()
            }
        }
    }

    fn save(&self, mut entries: Vec<YearSequence>) -> Result<()> {
        entries.sort_by(|a, b| b.year.cmp(&a.year));
        let json = serde_json::to_string_pretty(&entries).context("serializing sequence store")?;

        // Write to a sibling temp file, then rename over the store so a
        // crash mid-write never leaves a half-written JSON array.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("writing sequence store {:?}", tmp_path))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("renaming {:?} to {:?}", tmp_path, self.path))?;
        Ok(())
    }
}

/// 20-character file identifier: base tag + 4-digit year + 2-digit month +
/// 8-digit zero-padded sequence.
pub fn file_identifier(entry: &YearSequence, month: u32) -> String {
    format!("{}{:04}{:02}{:08}", FILE_TAG, entry.year, month, entry.sequence)
}

/// Output file name: the identifier plus the fixed `.TXT` suffix.
pub fn file_name(entry: &YearSequence, month: u32) -> String {
    format!("{}.TXT", file_identifier(entry, month))
}
