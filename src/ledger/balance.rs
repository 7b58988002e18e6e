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

//! Balance Changes
//!
//! Reads the per-account balance changes out of a transaction's metadata.
//! XRP balances live in account roots; issued-currency balances live in
//! trust lines, which are shared between two accounts, so every trust line
//! change shows up twice, once with each sign.
//!
//! Fees are not balance changes. The fee is added back to the sender's XRP
//! change so that a transaction which did nothing but burn a fee shows no
//! changes at all.
//!

use super::node::{AccountRoot, Lifecycle, RippleState, Snapshots};
use super::{Account, LedgerEntry, Transaction};
use crate::units::{Amount, AmountError, Currency};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// A snapshot was missing a field we need
    MissingField {
        entry: &'static str,
        field: &'static str,
    },
    /// Balance arithmetic failed
    Amount(AmountError),
}

impl From<AmountError> for Error {
    fn from(e: AmountError) -> Error {
        Error::Amount(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MissingField { entry, field } => {
                write!(f, "{entry} entry missing field {field}")
            }
            Error::Amount(ref e) => write!(f, "computing balance change: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::MissingField { .. } => None,
            Error::Amount(ref e) => Some(e),
        }
    }
}

/// A change in one account's balance of one currency
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BalanceChange {
    pub account: Account,
    pub currency: Currency,
    pub change: Amount,
}

/// Helper to record a nonzero change
fn push(map: &mut BTreeMap<Account, Vec<BalanceChange>>, account: &Account, change: Amount) {
    if change.is_zero() {
        return;
    }
    map.entry(account.clone()).or_default().push(BalanceChange {
        account: account.clone(),
        currency: change.currency().clone(),
        change,
    });
}

/// Computes the XRP change recorded in an account root, if its balance changed
fn account_root_delta(
    state: Lifecycle,
    snap: &Snapshots<AccountRoot>,
) -> Result<Option<(Account, Amount)>, Error> {
    let after = snap.after(state).ok_or(Error::MissingField {
        entry: "AccountRoot",
        field: "FinalFields",
    })?;
    let account = after.account.clone().ok_or(Error::MissingField {
        entry: "AccountRoot",
        field: "Account",
    })?;
    let final_balance = match after.balance {
        Some(ref bal) => bal.parse()?,
        None => return Ok(None),
    };
    let before = match state {
        Lifecycle::Created => Amount::zero(final_balance.currency().clone()),
        Lifecycle::Modified | Lifecycle::Deleted => {
            // PreviousFields only lists fields which changed
            match snap.previous_fields.as_ref().and_then(|p| p.balance.as_ref()) {
                Some(bal) => bal.parse()?,
                None => return Ok(None),
            }
        }
    };
    Ok(Some((account, final_balance.subtract(&before)?)))
}

/// Computes the change of a trust line balance, from the low account's view
fn ripple_state_delta(
    state: Lifecycle,
    snap: &Snapshots<RippleState>,
) -> Result<Option<(Account, Account, Amount)>, Error> {
    let after = snap.after(state).ok_or(Error::MissingField {
        entry: "RippleState",
        field: "FinalFields",
    })?;
    let low = after.low_limit.as_ref().ok_or(Error::MissingField {
        entry: "RippleState",
        field: "LowLimit",
    })?;
    let high = after.high_limit.as_ref().ok_or(Error::MissingField {
        entry: "RippleState",
        field: "HighLimit",
    })?;
    let final_balance = match after.balance {
        Some(ref bal) => bal.parse()?,
        None => return Ok(None),
    };
    let before = match state {
        Lifecycle::Created => Amount::zero(final_balance.currency().clone()),
        Lifecycle::Modified | Lifecycle::Deleted => {
            match snap.previous_fields.as_ref().and_then(|p| p.balance.as_ref()) {
                Some(bal) => bal.parse()?,
                None => return Ok(None),
            }
        }
    };
    Ok(Some((
        low.issuer.clone(),
        high.issuer.clone(),
        final_balance.subtract(&before)?,
    )))
}

impl Transaction {
    /// Computes every account's balance changes, excluding the fee
    pub fn balances(&self) -> Result<BTreeMap<Account, Vec<BalanceChange>>, Error> {
        let mut map = BTreeMap::new();
        for node in self.affected_nodes() {
            let (state, entry) = node.parts();
            match *entry {
                LedgerEntry::AccountRoot(ref snap) => {
                    if let Some((account, mut change)) = account_root_delta(state, snap)? {
                        if account == self.account {
                            change = change.add(&self.fee)?;
                        }
                        push(&mut map, &account, change);
                    }
                }
                LedgerEntry::RippleState(ref snap) => {
                    if let Some((low, high, change)) = ripple_state_delta(state, snap)? {
                        push(&mut map, &high, change.negate());
                        push(&mut map, &low, change);
                    }
                }
                LedgerEntry::Offer(..) | LedgerEntry::DirectoryNode(..) | LedgerEntry::Other => {}
            }
        }
        Ok(map)
    }

    /// The raw change in an account's XRP balance, including any fee paid
    ///
    /// Returns `None` if the account's root was not touched.
    pub fn account_root_delta(&self, account: &Account) -> Result<Option<Amount>, Error> {
        for node in self.affected_nodes() {
            let (state, entry) = node.parts();
            if let LedgerEntry::AccountRoot(ref snap) = *entry {
                if let Some((acct, change)) = account_root_delta(state, snap)? {
                    if acct == *account {
                        return Ok(Some(change));
                    }
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::{offer_create_json, ACCOUNT, COUNTERPARTY, HASH};
    use crate::ledger::TxResponse;

    fn acct(s: &str) -> Account {
        s.parse().unwrap()
    }

    fn amt(s: &str, currency: &str) -> Amount {
        Amount::parse_value(s, currency.parse().unwrap()).unwrap()
    }

    #[test]
    fn offer_create_balances() {
        let tx = serde_json::from_str::<TxResponse>(&offer_create_json())
            .unwrap()
            .result;
        let balances = tx.balances().unwrap();
        assert_eq!(balances.len(), 2);

        let ours: Vec<_> = balances[&acct(ACCOUNT)]
            .iter()
            .map(|b| b.change.clone())
            .collect();
        assert_eq!(ours, vec![amt("-30", "XRP"), amt("90", "USD")]);

        let theirs: Vec<_> = balances[&acct(COUNTERPARTY)]
            .iter()
            .map(|b| b.change.clone())
            .collect();
        assert_eq!(theirs, vec![amt("-90", "USD"), amt("30", "XRP")]);

        let raw = tx.account_root_delta(&ACCOUNT.parse().unwrap()).unwrap();
        assert_eq!(raw, Some(amt("-30.000012", "XRP")));
    }

    #[test]
    fn fee_only() {
        let json = format!(
            r#"{{"result":{{"Account":"{ACCOUNT}","Fee":"15","TransactionType":"AccountSet","hash":"{HASH}","date":1,
              "meta":{{"AffectedNodes":[{{"ModifiedNode":{{"LedgerEntryType":"AccountRoot",
                "FinalFields":{{"Account":"{ACCOUNT}","Balance":"999985"}},
                "PreviousFields":{{"Balance":"1000000"}}}}}}]}}}}}}"#
        );
        let tx = serde_json::from_str::<TxResponse>(&json).unwrap().result;
        assert!(tx.balances().unwrap().is_empty());
        assert_eq!(
            tx.account_root_delta(&ACCOUNT.parse().unwrap()).unwrap(),
            Some(Amount::from_drops(-15)),
        );
        assert_eq!(
            tx.account_root_delta(&COUNTERPARTY.parse().unwrap()).unwrap(),
            None,
        );
    }

    #[test]
    fn created_trust_line() {
        let json = format!(
            r#"{{"result":{{"Account":"{COUNTERPARTY}","Fee":"10","TransactionType":"Payment","hash":"{HASH}","date":1,
              "meta":{{"AffectedNodes":[{{"CreatedNode":{{"LedgerEntryType":"RippleState",
                "NewFields":{{"Balance":{{"currency":"EUR","issuer":"rrrrrrrrrrrrrrrrrrrrBZbvji","value":"5"}},
                  "LowLimit":{{"currency":"EUR","issuer":"{ACCOUNT}","value":"100"}},
                  "HighLimit":{{"currency":"EUR","issuer":"{COUNTERPARTY}","value":"0"}}}}}}}}]}}}}}}"#
        );
        let tx = serde_json::from_str::<TxResponse>(&json).unwrap().result;
        let balances = tx.balances().unwrap();
        assert_eq!(
            balances[&acct(ACCOUNT)][0].change,
            amt("5", "EUR")
        );
        assert_eq!(
            balances[&acct(COUNTERPARTY)][0].change,
            amt("-5", "EUR")
        );
    }

    /// A payment of 50 XRP to us, alongside an extra node
    fn payment_with_node(node: &str) -> String {
        format!(
            r#"{{"result":{{"Account":"{COUNTERPARTY}","Destination":"{ACCOUNT}","Fee":"10","TransactionType":"Payment","hash":"{HASH}","date":1,
              "meta":{{"AffectedNodes":[{node},
                {{"ModifiedNode":{{"LedgerEntryType":"AccountRoot",
                  "FinalFields":{{"Account":"{ACCOUNT}","Balance":"150000000"}},
                  "PreviousFields":{{"Balance":"100000000"}}}}}}]}}}}}}"#
        )
    }

    #[test]
    fn huge_offer_amount() {
        // Legal on the ledger, but far too large for a Decimal
        let json = payment_with_node(&format!(
            r#"{{"DeletedNode":{{"LedgerEntryType":"Offer",
                "FinalFields":{{"Account":"{COUNTERPARTY}",
                  "TakerGets":{{"currency":"USD","issuer":"{COUNTERPARTY}","value":"9999999999999999e80"}},
                  "TakerPays":"1000"}}}}}}"#
        ));
        let tx = serde_json::from_str::<TxResponse>(&json).unwrap().result;
        let balances = tx.balances().unwrap();
        assert_eq!(balances[&acct(ACCOUNT)][0].change, amt("50", "XRP"));
        assert!(tx
            .affected_nodes()
            .any(|node| node.to_string().contains("gets=9999999999999999e80 USD")));
    }

    #[test]
    fn huge_trust_line_balance() {
        let json = payment_with_node(&format!(
            r#"{{"ModifiedNode":{{"LedgerEntryType":"RippleState",
                "FinalFields":{{"Balance":{{"currency":"USD","issuer":"rrrrrrrrrrrrrrrrrrrrBZbvji","value":"9999999999999999e80"}},
                  "LowLimit":{{"currency":"USD","issuer":"{ACCOUNT}","value":"0"}},
                  "HighLimit":{{"currency":"USD","issuer":"{COUNTERPARTY}","value":"0"}}}},
                "PreviousFields":{{"Balance":{{"currency":"USD","issuer":"rrrrrrrrrrrrrrrrrrrrBZbvji","value":"1"}}}}}}}}"#
        ));
        // The record itself is fine; only using the balance fails
        let tx = serde_json::from_str::<TxResponse>(&json).unwrap().result;
        assert_eq!(
            tx.balances(),
            Err(Error::Amount(AmountError::Parse("9999999999999999e80".into()))),
        );
        // The XRP side can still be read
        assert_eq!(
            tx.account_root_delta(&acct(ACCOUNT)).unwrap(),
            Some(amt("50", "XRP")),
        );
    }
}
