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

//! bitcoin.tax
//!
//! Columns are, in order:
//!   * Date (date and time as YYYY-MM-DD HH:mm:ss Z)
//!   * Source (an exchange name, or in our case the ledger)
//!   * Action (BUY, SELL or FEE)
//!   * Symbol (the coin traded)
//!   * Volume (number of coins traded, empty for FEE)
//!   * Currency (what the coin was priced in)
//!   * Price (price per coin in Currency, empty for FEE)
//!   * Fee (any additional costs of the trade)
//!   * FeeCurrency (currency of fee if different than Currency)
//!

use super::{Error, Formatter};
use crate::csv::{CsvPrinter, DateTimeOffset};
use crate::row::{Action, ClassifiedRow};
use crate::units::Amount;

/// The bitcoin.tax trade import format
pub struct BitcoinTax;

impl Formatter for BitcoinTax {
    fn name(&self) -> &'static str {
        "bitcoin.tax"
    }

    fn header(&self) -> String {
        "Date,Source,Action,Symbol,Volume,Currency,Price,Fee,FeeCurrency".into()
    }

    fn format(&self, row: &ClassifiedRow) -> Result<String, Error> {
        let date = DateTimeOffset(row.timestamp);
        let line = match row.action {
            Action::Unknown => return Err(self.unsupported(row)),
            Action::Fee => CsvPrinter((
                date,
                &row.source_label,
                row.action,
                &row.symbol,
                None::<Amount>,
                row.counter_currency.as_ref(),
                None::<Amount>,
                &row.fee,
                None::<Amount>,
            ))
            .to_string(),
            Action::Buy | Action::Sell => CsvPrinter((
                date,
                &row.source_label,
                row.action,
                &row.symbol,
                &row.volume,
                // With no counter currency the price is a zero native amount
                row.counter_currency.as_ref().unwrap_or(row.price.currency()),
                &row.price,
                &row.fee,
                row.fee_currency(),
            ))
            .to_string(),
        };
        Ok(line)
    }
}
