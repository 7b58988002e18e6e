// XRP Tax Tracker
// Written in 2023 by
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

//! Files
//!
//! Wrappers around [std::fs] which basically just provide better
//! logging/error messages, and never leave a half-written state file
//! behind.
//!

use anyhow::Context;
use log::debug;
use std::io::Write as _;
use std::{fs, io, path::Path};

/// Replaces the contents of a file in one step
///
/// The data is written to a temporary file next to the target, synced, and
/// then renamed over the target, so a crash leaves either the old contents
/// or the new ones.
pub fn write_atomic(path: &Path, data: &[u8], reason: &str) -> anyhow::Result<()> {
    let name = path.to_string_lossy();
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    debug!("Writing {} bytes to {} {}.", data.len(), name, reason);
    let mut file = fs::File::create(tmp_path)
        .with_context(|| format!("creating {}", tmp_path.to_string_lossy()))?;
    file.write_all(data)
        .with_context(|| format!("writing {}", tmp_path.to_string_lossy()))?;
    file.sync_all()
        .with_context(|| format!("syncing {}", tmp_path.to_string_lossy()))?;
    drop(file);
    fs::rename(tmp_path, path)
        .with_context(|| format!("renaming {} to {name}", tmp_path.to_string_lossy()))?;
    Ok(())
}

/// Reads a file into a string, returning `None` if it does not exist
pub fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.to_string_lossy())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");

        assert_eq!(read_optional(&path).unwrap(), None);
        write_atomic(&path, b"first", "for test").unwrap();
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("first"));
        write_atomic(&path, b"second", "for test").unwrap();
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("second"));

        // No temporary file is left lying around
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
