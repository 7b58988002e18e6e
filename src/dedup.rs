// XRP Tax Tracker
// Written in 2024 by
//   Andrew Poelstra <tradetracker@wpsoftware.net>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! Processed-File Ledger
//!
//! Keeps track of which record files have already been turned into CSV rows,
//! so that re-running the export over a growing directory only outputs the
//! new transactions.
//!
//! The set is stored on disk as a sorted JSON array of filenames. It is
//! rewritten after every file, so an interrupted run loses at most the file
//! it was working on. Nothing here is thread-safe and no locks are taken;
//! do not run two exports against the same state file.
//!

use crate::file;
use anyhow::Context;
use log::info;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The set of already-processed record files
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DedupLedger {
    path: PathBuf,
    seen: BTreeSet<String>,
}

impl DedupLedger {
    /// Creates a new empty ledger which will be persisted to `path`
    ///
    /// Does not touch the filesystem; call [DedupLedger::load] to read an
    /// existing ledger.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        DedupLedger {
            path: path.into(),
            seen: BTreeSet::new(),
        }
    }

    /// Loads the ledger from disk
    ///
    /// A missing or empty file is treated as an empty set.
    pub fn load<P: Into<PathBuf>>(path: P) -> anyhow::Result<Self> {
        let mut ret = DedupLedger::new(path);
        let name = ret.path.to_string_lossy().into_owned();
        if let Some(contents) = file::read_optional(&ret.path)? {
            if !contents.trim().is_empty() {
                ret.seen = serde_json::from_str(&contents)
                    .with_context(|| format!("parsing processed-file list {name}"))?;
            }
        }
        info!("Loaded {} processed files from {}.", ret.seen.len(), name);
        Ok(ret)
    }

    /// Writes the ledger to disk, replacing whatever was there
    pub fn persist(&self) -> anyhow::Result<()> {
        let data = serde_json::to_vec(&self.seen).context("encoding processed-file list")?;
        file::write_atomic(&self.path, &data, "(processed-file list)")
    }

    /// Whether a file has already been processed
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Marks a file as processed. Returns false if it already was.
    ///
    /// Does not persist the change.
    pub fn record(&mut self, id: &str) -> bool {
        self.seen.insert(id.to_owned())
    }

    /// Number of processed files
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no files have been processed
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Accessor for the on-disk location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let ledger = DedupLedger::load(&path).unwrap();
        assert!(ledger.is_empty());

        fs::write(&path, "").unwrap();
        let ledger = DedupLedger::load(&path).unwrap();
        assert!(ledger.is_empty());

        // Empty set round-trips
        ledger.persist().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        let reloaded = DedupLedger::load(&path).unwrap();
        assert_eq!(reloaded, ledger);
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let mut ledger = DedupLedger::new(&path);
        for n in 0..25 {
            assert!(ledger.record(&format!("tx{n:03}.json")));
        }
        assert!(!ledger.record("tx007.json"));
        assert_eq!(ledger.len(), 25);
        ledger.persist().unwrap();

        let reloaded = DedupLedger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 25);
        assert!(reloaded.contains("tx000.json"));
        assert!(reloaded.contains("tx024.json"));
        assert!(!reloaded.contains("tx025.json"));
        assert_eq!(reloaded, ledger);
        assert_eq!(reloaded.path(), path.as_path());
    }

    #[test]
    fn corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        fs::write(&path, "{not json").unwrap();
        assert!(DedupLedger::load(&path).is_err());
    }
}
