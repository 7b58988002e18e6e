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

//! Classification Configuration
//!
//! Parses the (optional) configuration file which sets the policy used to
//! turn balance changes into tax events. Every field has a default, so an
//! empty JSON object `{}` is a valid configuration.
//!
//! The bulk transfer threshold and the related-accounts list are heuristics.
//! They exist to keep transfers between one's own wallets out of the tax
//! export, and the right values depend entirely on the user's situation.
//!

use crate::ledger::Account;
use crate::units::{Amount, Currency};
use anyhow::Context;
use serde::Deserialize;
use std::{fs, io, path};

/// The main configuration structure
///
/// Changing the defaults will change the output for existing record
/// directories. Be careful.
#[derive(Clone, PartialEq, Eq, Deserialize, Debug)]
#[serde(default)]
pub struct Configuration {
    /// The ledger's native asset. Always XRP in practice.
    native_currency: Currency,
    /// The fiat currency trades are priced in when XRP is not involved
    reference_fiat: Currency,
    /// A fiat currency which is never treated as a tradeable asset against
    /// the reference fiat
    excluded_fiat: Currency,
    /// Incoming XRP transfers at or above this size (encoded in drops, like
    /// every other XRP amount on the ledger) are assumed to be bulk transfers
    /// rather than purchases
    bulk_transfer_threshold: Amount,
    /// Accounts belonging to the same person, payments to or from which are
    /// not taxable events
    related_accounts: Vec<Account>,
    /// Value of the "source" column for those formats which have one
    source_label: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            native_currency: Currency::native(),
            reference_fiat: Currency::from_static("USD"),
            excluded_fiat: Currency::from_static("CNY"),
            bulk_transfer_threshold: Amount::from_drops(580_000_000_000),
            related_accounts: vec![],
            source_label: "XRP Ledger".into(),
        }
    }
}

impl Configuration {
    /// Reads the configuration from a JSON file
    pub fn load<P: AsRef<path::Path>>(filepath: P) -> Result<Self, anyhow::Error> {
        let filename = filepath.as_ref().to_string_lossy();
        let fh = fs::File::open(filepath.as_ref())
            .with_context(|| format!("opening configuration {filename}"))?;
        let bf = io::BufReader::new(fh);
        serde_json::from_reader(bf).with_context(|| format!("parsing configuration {filename}"))
    }

    /// Accessor for the native currency
    pub fn native_currency(&self) -> &Currency {
        &self.native_currency
    }

    /// Accessor for the reference fiat currency
    pub fn reference_fiat(&self) -> &Currency {
        &self.reference_fiat
    }

    /// Accessor for the excluded fiat currency
    pub fn excluded_fiat(&self) -> &Currency {
        &self.excluded_fiat
    }

    /// Accessor for the bulk transfer threshold
    pub fn bulk_transfer_threshold(&self) -> &Amount {
        &self.bulk_transfer_threshold
    }

    /// Accessor for the list of related accounts
    pub fn related_accounts(&self) -> &[Account] {
        &self.related_accounts
    }

    /// Accessor for the source label
    pub fn source_label(&self) -> &str {
        &self.source_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn defaults() {
        let config: Configuration = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Configuration::default());
        assert!(config.native_currency().is_native());
        assert_eq!(config.reference_fiat().as_str(), "USD");
        assert_eq!(config.excluded_fiat().as_str(), "CNY");
        assert_eq!(
            config.bulk_transfer_threshold().value(),
            rust_decimal::Decimal::new(580_000, 0)
        );
        assert!(config.related_accounts().is_empty());
        assert_eq!(config.source_label(), "XRP Ledger");
    }

    #[test]
    fn load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut fh = fs::File::create(&path).unwrap();
        write!(
            fh,
            r#"{{
                "bulk_transfer_threshold": "1000000",
                "related_accounts": ["rvYAfWj5gh67oV6fW32ZzP3Aw4Eubs59B"],
                "source_label": "my wallet"
            }}"#
        )
        .unwrap();
        drop(fh);

        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.bulk_transfer_threshold(), &Amount::from_drops(1_000_000));
        assert_eq!(config.related_accounts().len(), 1);
        assert_eq!(config.source_label(), "my wallet");
        assert_eq!(config.reference_fiat().as_str(), "USD");

        assert!(Configuration::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn reject_bad_values() {
        assert!(serde_json::from_str::<Configuration>(r#"{"reference_fiat": "US"}"#).is_err());
        assert!(
            serde_json::from_str::<Configuration>(r#"{"related_accounts": ["nope"]}"#).is_err()
        );
    }
}
