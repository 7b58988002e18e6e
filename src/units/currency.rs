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

//! Currencies
//!
//! Currency codes as they appear on the ledger. The native asset is XRP and
//! has no issuer; everything else is an issued currency ("IOU") identified
//! either by a three-letter code or by 40 hex digits.
//!

use serde::{Deserialize, Deserializer};
use std::{fmt, str};

/// The code used for the ledger's native asset
pub const NATIVE_CODE: &str = "XRP";

/// A currency code
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Currency(String);

impl Currency {
    /// The ledger's native asset
    pub fn native() -> Self {
        Currency(NATIVE_CODE.into())
    }

    /// A well-known three-letter code. Not validated, so only use this with
    /// literal codes.
    pub fn from_static(code: &'static str) -> Self {
        Currency(code.into())
    }

    /// Whether this is the ledger's native asset
    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_CODE
    }

    /// The code exactly as it appears on the ledger
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl str::FromStr for Currency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let standard = s.len() == 3 && s.chars().all(|c| c.is_ascii_alphanumeric());
        let nonstandard = s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit());
        if standard || nonstandard {
            Ok(Currency(s.to_string()))
        } else {
            Err(format!("malformed currency code {s}"))
        }
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deser: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deser)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.len() == 40 {
            // Non-standard codes are usually ASCII, zero-padded on the right
            if let Ok(bytes) = hex::decode(&self.0) {
                let trimmed: Vec<u8> = bytes.into_iter().filter(|b| *b != 0).collect();
                if !trimmed.is_empty() && trimmed.iter().all(|b| b.is_ascii_graphic()) {
                    return f.write_str(&String::from_utf8_lossy(&trimmed));
                }
            }
        }
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_codes() {
        assert!("USD".parse::<Currency>().is_ok());
        assert!(Currency::native().is_native());
        assert!(!"USD".parse::<Currency>().unwrap().is_native());
        assert!("US".parse::<Currency>().is_err());
        assert!("U$D".parse::<Currency>().is_err());
        assert!("534F4C4F00000000000000000000000000000000"
            .parse::<Currency>()
            .is_ok());
    }

    #[test]
    fn display_nonstandard() {
        let solo: Currency = "534F4C4F00000000000000000000000000000000".parse().unwrap();
        assert_eq!(solo.to_string(), "SOLO");
        let binary: Currency = "0000000000000000000000000000000000000001".parse().unwrap();
        assert_eq!(binary.to_string(), "0000000000000000000000000000000000000001");
        assert_eq!(Currency::native().to_string(), "XRP");
    }
}
