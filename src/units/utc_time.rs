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

//! UTC Time
//!
//! UTC timestamps. This is a thin wrapper around `chrono::DateTime<chrono::offset::Utc>`.
//!
//! The ledger does not use UNIX time. Its timestamps count seconds since the
//! "ledger epoch" of 2000-01-01 00:00:00 UTC.
//!

use chrono::offset::Utc;
use chrono::DateTime;
use core::fmt;
use serde::Deserialize;

/// Offset of the ledger epoch from the UNIX epoch, in seconds
const LEDGER_EPOCH_UNIX: i64 = 946_684_800;

/// A timestamp fixed to the UTC timezone. This is a thin wrapper around
/// `chrono::DateTime<Utc>`. If you find you need conversions from other
/// timezones please add an explicit conversion function.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct UtcTime {
    inner: DateTime<Utc>,
}

impl UtcTime {
    /// Converts a number of seconds since the ledger epoch
    pub fn from_ledger_seconds(n: u32) -> Self {
        // Every u32 offset from 2000 is representable by chrono
        let inner = chrono::DateTime::from_timestamp(LEDGER_EPOCH_UNIX + i64::from(n), 0)
            .unwrap_or_default();
        UtcTime { inner }
    }

    /// Creates an object which can be given to a formatter
    pub fn format<'s>(&self, s: &'s str) -> impl fmt::Display + 's {
        self.inner.format(s)
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// Serde helper for the `date` field of ledger transactions
pub mod serde_ledger_seconds {
    use super::*;

    use serde::Deserializer;

    pub fn deserialize<'de, D>(deser: D) -> Result<UtcTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n: u32 = Deserialize::deserialize(deser)?;
        Ok(UtcTime::from_ledger_seconds(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_epoch() {
        let t = UtcTime::from_ledger_seconds(1);
        assert_eq!(t.format("%F %T").to_string(), "2000-01-01 00:00:01");
        assert!(t < UtcTime::from_ledger_seconds(2));

        let t = UtcTime::from_ledger_seconds(568_598_400);
        assert_eq!(t.format("%F %T %z").to_string(), "2018-01-07 00:00:00 +0000");
    }

    #[test]
    fn deserialize() {
        #[derive(Deserialize)]
        struct Tx {
            #[serde(with = "serde_ledger_seconds")]
            date: UtcTime,
        }
        let tx: Tx = serde_json::from_str("{\"date\":0}").unwrap();
        assert_eq!(tx.date.to_string(), "2000-01-01 00:00:00 UTC");
    }
}
