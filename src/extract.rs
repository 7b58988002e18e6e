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

//! Net Changes
//!
//! Folds one account's balance changes in a transaction down to a single
//! net amount per currency.
//!

use crate::ledger::{self, Account, Transaction, TxHash};
use crate::units::{Amount, AmountError, Currency};
use log::debug;
use std::collections::{btree_map, BTreeMap};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Could not read balance changes out of the metadata
    Balances(TxHash, ledger::balance::Error),
    /// Could not add up the changes for some currency
    Amount(TxHash, AmountError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Balances(ref hash, ref e) => write!(f, "reading balances of {hash}: {e}"),
            Error::Amount(ref hash, ref e) => write!(f, "netting balances of {hash}: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Balances(_, ref e) => Some(e),
            Error::Amount(_, ref e) => Some(e),
        }
    }
}

/// The net change of each currency for one account in one transaction
///
/// Never contains a zero entry.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct NetChanges(BTreeMap<Currency, Amount>);

impl NetChanges {
    /// Adds up a list of changes, dropping any currency which nets to zero
    pub fn from_changes<I>(changes: I) -> Result<Self, AmountError>
    where
        I: IntoIterator<Item = Amount>,
    {
        let mut map: BTreeMap<Currency, Amount> = BTreeMap::new();
        for change in changes {
            match map.entry(change.currency().clone()) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(change);
                }
                btree_map::Entry::Occupied(mut slot) => {
                    let sum = slot.get().add(&change)?;
                    *slot.get_mut() = sum;
                }
            }
        }
        map.retain(|_, amount| !amount.is_zero());
        Ok(NetChanges(map))
    }

    /// Number of currencies which changed
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The net change of a specific currency
    pub fn get(&self, currency: &Currency) -> Option<&Amount> {
        self.0.get(currency)
    }

    /// Iterates over the net changes, ordered by currency code
    pub fn iter(&self) -> btree_map::Values<Currency, Amount> {
        self.0.values()
    }
}

impl fmt::Display for NetChanges {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("{")?;
        for (n, amount) in self.0.values().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{amount}")?;
        }
        f.write_str("}")
    }
}

/// Computes the net changes of `account` in `tx`
///
/// Returns `None` if the transaction did not touch the account's balances
/// at all.
pub fn net_changes(tx: &Transaction, account: &Account) -> Result<Option<NetChanges>, Error> {
    let mut balances = tx
        .balances()
        .map_err(|e| Error::Balances(tx.hash.clone(), e))?;
    let ours = match balances.remove(account) {
        Some(changes) => changes,
        None => return Ok(None),
    };
    for change in &ours {
        debug!("{}: {} changed {}", tx.hash, change.account, change.change);
    }
    NetChanges::from_changes(ours.into_iter().map(|change| change.change))
        .map(Some)
        .map_err(|e| Error::Amount(tx.hash.clone(), e))
}
