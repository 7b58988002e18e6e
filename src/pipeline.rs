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

//! CSV Export
//!
//! Reads a directory of transaction records (one `tx` reply per file, as
//! saved by `walk -d`), classifies every record not already processed, and
//! prints the resulting rows in time order.
//!
//! Records which cannot be reported are listed on the error stream and
//! marked as processed. Records which cannot be read, or whose balances do
//! not add up, are logged and left unprocessed so they will be retried on
//! the next run.
//!

use crate::aggregate::ChronoAggregator;
use crate::classify::Classifier;
use crate::dedup::DedupLedger;
use crate::format::Formatter;
use crate::ledger::{Account, TxResponse};
use anyhow::Context as _;
use log::{debug, info, warn};
use std::io::Write;
use std::{fs, path::Path};

/// Counts of what happened during a run
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Summary {
    /// Files already processed by an earlier run
    pub skipped: usize,
    /// Rows output
    pub rows: usize,
    /// Errors reported on the error stream
    pub reported: usize,
    /// Files which could not be processed and will be retried
    pub failed: usize,
}

/// The CSV export pipeline
pub struct Pipeline {
    account: Account,
    classifier: Classifier,
    formatter: Box<dyn Formatter>,
    print_urls: bool,
}

impl Pipeline {
    /// Constructs a new pipeline for the given account
    pub fn new(account: Account, classifier: Classifier, formatter: Box<dyn Formatter>) -> Self {
        Pipeline {
            account,
            classifier,
            formatter,
            print_urls: false,
        }
    }

    /// Whether to add a column linking each row to a block explorer
    pub fn with_urls(mut self, print_urls: bool) -> Self {
        self.print_urls = print_urls;
        self
    }

    /// Lists the record files in a directory, in filename order
    fn record_files(dir: &Path) -> anyhow::Result<Vec<String>> {
        let dir_name = dir.to_string_lossy();
        let mut names = vec![];
        for entry in fs::read_dir(dir).with_context(|| format!("listing {dir_name}"))? {
            let entry = entry.with_context(|| format!("listing {dir_name}"))?;
            let file_type = entry
                .file_type()
                .with_context(|| format!("reading {}", entry.path().to_string_lossy()))?;
            if !file_type.is_file() {
                debug!("Ignoring non-file {}.", entry.path().to_string_lossy());
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!("Ignoring non-UTF8 filename {}.", name.to_string_lossy()),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Runs the export over `dir`
    ///
    /// CSV goes to `out` and the sorted list of unreportable records goes to
    /// `err`. The processed-file ledger is persisted after every file.
    pub fn run<W: Write, E: Write>(
        &self,
        dir: &Path,
        ledger: &mut DedupLedger,
        mut out: W,
        mut err: E,
    ) -> anyhow::Result<Summary> {
        let mut summary = Summary::default();
        let mut rows = ChronoAggregator::new();
        let mut errors = vec![];

        for name in Self::record_files(dir)? {
            if ledger.contains(&name) {
                summary.skipped += 1;
                continue;
            }
            let path = dir.join(&name);
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!("Skipping unreadable record {}: {}", path.to_string_lossy(), e);
                    summary.failed += 1;
                    continue;
                }
            };
            let tx = match serde_json::from_str::<TxResponse>(&contents) {
                Ok(resp) => resp.result,
                Err(e) => {
                    warn!("Skipping malformed record {}: {}", name, e);
                    summary.failed += 1;
                    continue;
                }
            };

            match self.classifier.classify(&tx, &self.account) {
                Ok(row) => {
                    debug!("{}: {}", name, row);
                    rows.push(row);
                }
                Err(e) if e.is_deferred() => {
                    debug!("{}: {}", name, e);
                    errors.push(e.to_string());
                }
                Err(e) => {
                    warn!("Skipping {}: {}", name, e);
                    summary.failed += 1;
                    continue;
                }
            }
            ledger.record(&name);
            ledger.persist()?;
        }

        let header = if self.print_urls {
            writeln!(out, "{},URL", self.formatter.header())
        } else {
            writeln!(out, "{}", self.formatter.header())
        };
        header.context("writing CSV header")?;
        for row in &rows {
            match self.formatter.format(row) {
                Ok(line) => {
                    let res = if self.print_urls {
                        writeln!(out, "{},{}", line, row.tx_hash.explorer_url())
                    } else {
                        writeln!(out, "{line}")
                    };
                    res.context("writing CSV row")?;
                    summary.rows += 1;
                }
                Err(e) => errors.push(e.to_string()),
            }
        }
        out.flush().context("flushing CSV output")?;

        errors.sort();
        for e in &errors {
            writeln!(err, "{e}").context("writing error list")?;
        }
        summary.reported = errors.len();

        info!(
            "Output {} {} rows for {} ({} already processed, {} reported, {} failed).",
            summary.rows,
            self.formatter.name(),
            self.account,
            summary.skipped,
            summary.reported,
            summary.failed,
        );
        debug!(
            "Threshold for bulk transfers is {}.",
            self.classifier.config().bulk_transfer_threshold()
        );
        Ok(summary)
    }
}
