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

//! Output Formats
//!
//! Every piece of tax software wants its CSV laid out differently. Each
//! supported layout ("dialect") is a [Formatter], selected by name on the
//! command line.
//!

use crate::ledger::TxHash;
use crate::row::{Action, ClassifiedRow};
use std::fmt;

mod bitcoin_tax;
mod cointracker;

pub use self::bitcoin_tax::BitcoinTax;
pub use self::cointracker::CoinTracker;

/// A row which the selected dialect has no way to express
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Error {
    pub dialect: &'static str,
    pub action: Action,
    pub hash: TxHash,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "not implemented: {} row in {} format, hash: {}",
            self.action, self.dialect, self.hash,
        )
    }
}

impl std::error::Error for Error {}

/// A CSV dialect
pub trait Formatter {
    /// The name used to select this dialect
    fn name(&self) -> &'static str;

    /// The header line, without a trailing newline
    fn header(&self) -> String;

    /// Formats a single row, without a trailing newline
    fn format(&self, row: &ClassifiedRow) -> Result<String, Error>;

    /// Helper to construct an error for a row this dialect cannot express
    fn unsupported(&self, row: &ClassifiedRow) -> Error {
        Error {
            dialect: self.name(),
            action: row.action,
            hash: row.tx_hash.clone(),
        }
    }
}

/// Master list of supported dialects
static DIALECTS: &[(&str, fn() -> Box<dyn Formatter>)] = &[
    ("bitcoin.tax", bitcoin_tax),
    ("cointracker.io", cointracker),
];

fn bitcoin_tax() -> Box<dyn Formatter> {
    Box::new(BitcoinTax)
}

fn cointracker() -> Box<dyn Formatter> {
    Box::new(CoinTracker)
}

/// Looks up a dialect by name
pub fn dialect(name: &str) -> Option<Box<dyn Formatter>> {
    DIALECTS
        .iter()
        .find(|(dname, _)| *dname == name)
        .map(|(_, ctor)| ctor())
}

/// The names of all supported dialects
pub fn dialect_names() -> impl Iterator<Item = &'static str> {
    DIALECTS.iter().map(|(name, _)| *name)
}
