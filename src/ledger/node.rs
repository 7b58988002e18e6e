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

//! Affected Nodes
//!
//! Each transaction's metadata lists the ledger entries it created, modified
//! or deleted, along with snapshots of their fields. Modified entries carry
//! only the fields which changed in `PreviousFields`, so every field of every
//! snapshot is optional.
//!

use super::{Account, TxHash};
use crate::units::RawAmount;
use serde::Deserialize;
use std::fmt;

/// Whether an entry was created, modified or deleted
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Lifecycle {
    Created,
    Modified,
    Deleted,
}

/// One entry of the `AffectedNodes` list
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub enum AffectedNode {
    CreatedNode(LedgerEntry),
    ModifiedNode(LedgerEntry),
    DeletedNode(LedgerEntry),
}

impl AffectedNode {
    /// Splits the node into its lifecycle state and the entry itself
    pub fn parts(&self) -> (Lifecycle, &LedgerEntry) {
        match *self {
            AffectedNode::CreatedNode(ref e) => (Lifecycle::Created, e),
            AffectedNode::ModifiedNode(ref e) => (Lifecycle::Modified, e),
            AffectedNode::DeletedNode(ref e) => (Lifecycle::Deleted, e),
        }
    }
}

/// A ledger entry, keyed by its `LedgerEntryType`
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(tag = "LedgerEntryType")]
pub enum LedgerEntry {
    AccountRoot(Snapshots<AccountRoot>),
    RippleState(Snapshots<RippleState>),
    Offer(Snapshots<Offer>),
    DirectoryNode(Snapshots<DirectoryNode>),
    /// Some entry type we do not care about
    #[serde(other)]
    Other,
}

/// The field snapshots attached to an affected node
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshots<F> {
    /// Fields of a newly-created entry
    pub new_fields: Option<F>,
    /// Fields after the transaction, for modified and deleted entries
    pub final_fields: Option<F>,
    /// Values before the transaction of those fields which changed
    pub previous_fields: Option<F>,
    #[serde(rename = "PreviousTxnID")]
    pub previous_txn_id: Option<TxHash>,
}

impl<F> Snapshots<F> {
    /// The fields as they are after the transaction
    pub fn after(&self, state: Lifecycle) -> Option<&F> {
        match state {
            Lifecycle::Created => self.new_fields.as_ref(),
            Lifecycle::Modified | Lifecycle::Deleted => self.final_fields.as_ref(),
        }
    }
}

/// An account's root entry, which holds its XRP balance
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountRoot {
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub balance: Option<RawAmount>,
    #[serde(default)]
    pub sequence: Option<u32>,
}

/// The limit on one side of a trust line. The issuer field is the account
/// which set the limit.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct Limit {
    pub issuer: Account,
}

/// A trust line, holding an issued-currency balance between two accounts
///
/// The balance is from the point of view of the low account: positive
/// means the high account owes the low account.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RippleState {
    #[serde(default)]
    pub balance: Option<RawAmount>,
    #[serde(default)]
    pub high_limit: Option<Limit>,
    #[serde(default)]
    pub low_limit: Option<Limit>,
}

/// A standing order on the decentralized exchange
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Offer {
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub taker_gets: Option<RawAmount>,
    #[serde(default)]
    pub taker_pays: Option<RawAmount>,
}

/// A page of an owner or order-book directory
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DirectoryNode {
    #[serde(default)]
    pub owner: Option<Account>,
    #[serde(default)]
    pub root_index: Option<String>,
}

fn write_opt<T: fmt::Display>(f: &mut fmt::Formatter, name: &str, x: Option<&T>) -> fmt::Result {
    match x {
        Some(x) => write!(f, " {name}={x}"),
        None => Ok(()),
    }
}

impl fmt::Display for AffectedNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (state, entry) = self.parts();
        write!(f, "{state:?} ")?;
        match *entry {
            LedgerEntry::AccountRoot(ref snap) => {
                f.write_str("AccountRoot")?;
                if let Some(fields) = snap.after(state) {
                    write_opt(f, "account", fields.account.as_ref())?;
                    write_opt(f, "balance", fields.balance.as_ref())?;
                    write_opt(f, "sequence", fields.sequence.as_ref())?;
                }
            }
            LedgerEntry::RippleState(ref snap) => {
                f.write_str("RippleState")?;
                if let Some(fields) = snap.after(state) {
                    write_opt(f, "low", fields.low_limit.as_ref().map(|l| &l.issuer))?;
                    write_opt(f, "high", fields.high_limit.as_ref().map(|l| &l.issuer))?;
                    write_opt(f, "balance", fields.balance.as_ref())?;
                }
            }
            LedgerEntry::Offer(ref snap) => {
                f.write_str("Offer")?;
                if let Some(fields) = snap.after(state) {
                    write_opt(f, "account", fields.account.as_ref())?;
                    write_opt(f, "gets", fields.taker_gets.as_ref())?;
                    write_opt(f, "pays", fields.taker_pays.as_ref())?;
                }
            }
            LedgerEntry::DirectoryNode(ref snap) => {
                f.write_str("DirectoryNode")?;
                if let Some(fields) = snap.after(state) {
                    write_opt(f, "owner", fields.owner.as_ref())?;
                    write_opt(f, "root", fields.root_index.as_ref())?;
                }
            }
            LedgerEntry::Other => f.write_str("(other)")?,
        }
        Ok(())
    }
}
