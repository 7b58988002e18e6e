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

//! Classified Rows
//!
//! A single taxable event, ready to be printed by one of the output formats.
//!

use crate::ledger::TxHash;
use crate::units::{Amount, Currency, UtcTime};
use std::fmt;

/// What kind of event a row is
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
pub enum Action {
    #[default]
    Unknown,
    Buy,
    Sell,
    Fee,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Action::Unknown => f.write_str("UNKNOWN"),
            Action::Buy => f.write_str("BUY"),
            Action::Sell => f.write_str("SELL"),
            Action::Fee => f.write_str("FEE"),
        }
    }
}

/// A classified transaction
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ClassifiedRow {
    pub timestamp: UtcTime,
    pub action: Action,
    /// The asset that was bought or sold
    pub symbol: Currency,
    /// Amount of `symbol` that changed hands. Never negative.
    pub volume: Amount,
    /// The currency the trade was priced in, if there was one
    pub counter_currency: Option<Currency>,
    /// Units of the counter currency per unit of `symbol`. Never negative.
    pub price: Amount,
    /// Total amount of the counter currency that changed hands. Never negative.
    pub proceeds: Amount,
    /// Fee paid by our account. Zero if somebody else submitted the transaction.
    pub fee: Amount,
    pub source_label: String,
    pub tx_hash: TxHash,
}

impl ClassifiedRow {
    /// The currency the fee was paid in
    pub fn fee_currency(&self) -> &Currency {
        self.fee.currency()
    }
}

impl fmt::Display for ClassifiedRow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {} {}", self.timestamp, self.tx_hash, self.action, self.volume)?;
        if let Some(ref counter) = self.counter_currency {
            write!(f, " @ {} {counter}", self.price.value().normalize())?;
        }
        if !self.fee.is_zero() {
            write!(f, " (fee {})", self.fee)?;
        }
        Ok(())
    }
}
