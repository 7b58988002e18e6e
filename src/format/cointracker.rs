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

//! cointracker.io
//!
//! Lists every trade as a received side and a sent side. Either side may be
//! empty, e.g. for a deposit.
//!

use super::{Error, Formatter};
use crate::csv::{CsvPrinter, UsDateTime};
use crate::row::{Action, ClassifiedRow};
use crate::units::{Amount, Currency};

/// The cointracker.io transaction import format
pub struct CoinTracker;

/// One side of a trade, or nothing if the amount is zero
fn side(amount: &Amount) -> (Option<&Amount>, Option<&Currency>) {
    if amount.is_zero() {
        (None, None)
    } else {
        (Some(amount), Some(amount.currency()))
    }
}

impl Formatter for CoinTracker {
    fn name(&self) -> &'static str {
        "cointracker.io"
    }

    fn header(&self) -> String {
        "Date,Received Quantity,Received Currency,Sent Quantity,Sent Currency".into()
    }

    fn format(&self, row: &ClassifiedRow) -> Result<String, Error> {
        let (received, sent) = match row.action {
            Action::Buy => (side(&row.volume), side(&row.proceeds)),
            Action::Sell => (side(&row.proceeds), side(&row.volume)),
            Action::Fee | Action::Unknown => return Err(self.unsupported(row)),
        };
        Ok(CsvPrinter((
            UsDateTime(row.timestamp),
            received.0,
            received.1,
            sent.0,
            sent.1,
        ))
        .to_string())
    }
}
