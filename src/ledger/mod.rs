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

//! Ledger Records
//!
//! Typed model of a transaction as returned by the ledger's `tx` method,
//! including the metadata describing every ledger entry it touched.
//!
//! We only model the fields we need. Everything else in the JSON is ignored.
//!

use crate::units::{serde_ledger_seconds, Amount, UtcTime};
use serde::{Deserialize, Deserializer};
use std::{fmt, str};

pub mod balance;
pub mod node;

pub use self::balance::BalanceChange;
pub use self::node::{AffectedNode, LedgerEntry, Lifecycle};

/// Prefix for links to a transaction on a block explorer
const EXPLORER_URL: &str = "https://xrpscan.com/tx/";

/// A ledger account address
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Account(String);

impl str::FromStr for Account {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Addresses are base58 in the ripple alphabet, which excludes 0, O, I and l
        let well_formed = s.starts_with('r')
            && (25..=35).contains(&s.len())
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'));
        if well_formed {
            Ok(Account(s.to_string()))
        } else {
            Err(format!("malformed account address {s}"))
        }
    }
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D>(deser: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deser)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The hash which identifies a transaction
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct TxHash(String);

impl TxHash {
    /// Link to the transaction on a block explorer
    pub fn explorer_url(&self) -> String {
        format!("{EXPLORER_URL}{}", self.0)
    }

    /// The hash as a hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl str::FromStr for TxHash {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(TxHash(s.to_ascii_uppercase()))
        } else {
            Err(format!("malformed transaction hash {s}"))
        }
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D>(deser: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deser)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of the "TransactionType" field
#[derive(Clone, PartialEq, Eq, Debug, Hash, Deserialize)]
#[serde(from = "String")]
pub enum TransactionType {
    Payment,
    OfferCreate,
    OfferCancel,
    TrustSet,
    AccountSet,
    /// Anything we do not specifically handle
    Other(String),
}

impl From<String> for TransactionType {
    fn from(s: String) -> Self {
        match &s[..] {
            "Payment" => TransactionType::Payment,
            "OfferCreate" => TransactionType::OfferCreate,
            "OfferCancel" => TransactionType::OfferCancel,
            "TrustSet" => TransactionType::TrustSet,
            "AccountSet" => TransactionType::AccountSet,
            _ => TransactionType::Other(s),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TransactionType::Payment => f.write_str("Payment"),
            TransactionType::OfferCreate => f.write_str("OfferCreate"),
            TransactionType::OfferCancel => f.write_str("OfferCancel"),
            TransactionType::TrustSet => f.write_str("TrustSet"),
            TransactionType::AccountSet => f.write_str("AccountSet"),
            TransactionType::Other(ref s) => f.write_str(s),
        }
    }
}

/// Transaction metadata
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Meta {
    pub affected_nodes: Vec<AffectedNode>,
    /// Result code, e.g. `tesSUCCESS` or `tecPATH_DRY`
    #[serde(default)]
    pub transaction_result: Option<String>,
}

/// A transaction together with its metadata
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct Transaction {
    /// The account which signed the transaction and paid its fee
    #[serde(rename = "Account")]
    pub account: Account,
    /// For payments, the recipient
    #[serde(rename = "Destination", default)]
    pub destination: Option<Account>,
    #[serde(rename = "Fee")]
    pub fee: Amount,
    #[serde(rename = "TransactionType")]
    pub ty: TransactionType,
    pub hash: TxHash,
    #[serde(with = "serde_ledger_seconds")]
    pub date: UtcTime,
    pub meta: Meta,
}

impl Transaction {
    /// Iterates over the affected ledger entries
    pub fn affected_nodes(&self) -> impl Iterator<Item = &AffectedNode> {
        self.meta.affected_nodes.iter()
    }

    /// Finds the `PreviousTxnID` of the given account's root entry
    ///
    /// Returns `None` if the account root was not modified by this
    /// transaction (in particular, if it was created by it, in which
    /// case there is no earlier transaction).
    pub fn previous_txn_for(&self, account: &Account) -> Option<&TxHash> {
        self.affected_nodes().find_map(|node| match node {
            AffectedNode::ModifiedNode(LedgerEntry::AccountRoot(snap)) => {
                let fields = snap.final_fields.as_ref()?;
                if fields.account.as_ref() == Some(account) {
                    snap.previous_txn_id.as_ref()
                } else {
                    None
                }
            }
            _ => None,
        })
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.date, self.hash, self.ty)?;
        if let Some(ref result) = self.meta.transaction_result {
            write!(f, " {result}")?;
        }
        Ok(())
    }
}

/// The contents of a single transaction record, as stored on disk
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct TxResponse {
    pub result: Transaction,
}
