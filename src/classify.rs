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

//! Classification
//!
//! Turns the net balance changes of a transaction into a taxable event. Lots
//! of things can happen on the ledger which we have no idea how to report
//! (IOU deposits, transfers between our own wallets, trades between two
//! issued currencies with no obvious price). These are returned as
//! "deferred" errors, which the caller collects and prints so that the user
//! can deal with them by hand, rather than silently dropped.
//!
//! The other kind of error indicates that the ledger data did not make sense,
//! for example a fee which does not match the change in our XRP balance.
//!

use crate::config::Configuration;
use crate::extract::{self, NetChanges};
use crate::ledger::{Account, Transaction, TransactionType, TxHash};
use crate::row::{Action, ClassifiedRow};
use crate::units::{Amount, AmountError, Currency};
use std::fmt;

/// The reason a transaction could not be turned into a row
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// A transaction type which does nothing but charge a fee
    FeeOnlyUnsupported(TransactionType),
    /// Received an issued currency without giving anything up
    UnsupportedIouDeposit(Amount),
    /// Payment to or from one of our own accounts
    RelatedAccountPayment(Account, Amount),
    /// Received a suspiciously large amount of XRP
    UnsupportedBulkTransfer(Amount),
    /// Sent XRP away without receiving anything
    UnsupportedOutboundTransfer(Amount),
    /// A two-currency trade involving neither XRP nor the reference fiat
    NoReferenceCurrency(NetChanges),
    /// A trade between the reference fiat and the excluded fiat
    ExcludedCurrencyPair(Currency, Currency),
    /// More than two currencies changed
    TooManyCurrencies(NetChanges),
    /// A transaction type we know nothing about
    UnsupportedTransactionType(TransactionType),
    /// Our account was not touched at all
    NoBalanceChange,
    /// Our XRP balance changed by something other than the fee
    FeeMismatch { delta: Amount, fee: Amount },
    /// Could not compute net balance changes
    Extract(extract::Error),
    /// Arithmetic failed while computing a price
    Amount(AmountError),
}

impl ErrorKind {
    /// Whether the transaction is simply something we do not report, as
    /// opposed to something which indicates bad data
    pub fn is_deferred(&self) -> bool {
        match *self {
            ErrorKind::FeeOnlyUnsupported(..)
            | ErrorKind::UnsupportedIouDeposit(..)
            | ErrorKind::RelatedAccountPayment(..)
            | ErrorKind::UnsupportedBulkTransfer(..)
            | ErrorKind::UnsupportedOutboundTransfer(..)
            | ErrorKind::NoReferenceCurrency(..)
            | ErrorKind::ExcludedCurrencyPair(..)
            | ErrorKind::TooManyCurrencies(..)
            | ErrorKind::UnsupportedTransactionType(..)
            | ErrorKind::NoBalanceChange => true,
            ErrorKind::FeeMismatch { .. } | ErrorKind::Extract(..) | ErrorKind::Amount(..) => {
                false
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorKind::FeeOnlyUnsupported(ref ty) => write!(f, "fee-only {ty}"),
            ErrorKind::UnsupportedIouDeposit(ref amt) => write!(f, "depositing IOU {amt}"),
            ErrorKind::RelatedAccountPayment(ref acct, ref amt) => {
                write!(f, "payment of {amt} involving related account {acct}")
            }
            ErrorKind::UnsupportedBulkTransfer(ref amt) => write!(f, "bulk transfer of {amt}"),
            ErrorKind::UnsupportedOutboundTransfer(ref amt) => write!(f, "sent out {amt}"),
            ErrorKind::NoReferenceCurrency(ref net) => {
                write!(f, "no XRP or reference fiat in {net}")
            }
            ErrorKind::ExcludedCurrencyPair(ref a, ref b) => {
                write!(f, "{a}/{b} trade excluded")
            }
            ErrorKind::TooManyCurrencies(ref net) => {
                write!(f, "more than 2 currencies: {net}")
            }
            ErrorKind::UnsupportedTransactionType(ref ty) => {
                write!(f, "transaction type {ty}")
            }
            ErrorKind::NoBalanceChange => f.write_str("no balance change"),
            ErrorKind::FeeMismatch { ref delta, ref fee } => {
                write!(f, "balance changed by {delta} but fee was {fee}")
            }
            ErrorKind::Extract(ref e) => fmt::Display::fmt(e, f),
            ErrorKind::Amount(ref e) => write!(f, "computing price: {e}"),
        }
    }
}

/// A classification failure, tagged with the transaction it happened in
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Error {
    pub hash: TxHash,
    pub kind: ErrorKind,
}

impl Error {
    /// Whether the error should be reported and skipped, rather than retried
    pub fn is_deferred(&self) -> bool {
        self.kind.is_deferred()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_deferred() {
            write!(f, "not implemented: {}, hash: {}", self.kind, self.hash)
        } else {
            write!(f, "{}, hash: {}", self.kind, self.hash)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::Extract(ref e) => Some(e),
            ErrorKind::Amount(ref e) => Some(e),
            _ => None,
        }
    }
}

/// The trade read out of a set of net changes
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Trade {
    pub action: Action,
    /// The asset bought or sold, as a positive amount
    pub volume: Amount,
    /// What was paid or received for it, as a positive amount
    pub counter: Option<Amount>,
}

/// Classifies transactions according to a fixed policy
pub struct Classifier {
    config: Configuration,
}

impl Classifier {
    /// Constructs a new classifier
    pub fn new(config: Configuration) -> Self {
        Classifier { config }
    }

    /// Accessor for the configuration
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Classifies a set of net changes
    ///
    /// `source` and `destination` are the sending and receiving accounts of
    /// the transaction, used to detect payments between our own accounts.
    pub fn classify_changes(
        &self,
        ty: &TransactionType,
        net: &NetChanges,
        source: &Account,
        destination: Option<&Account>,
    ) -> Result<Trade, ErrorKind> {
        match *ty {
            TransactionType::AccountSet
            | TransactionType::TrustSet
            | TransactionType::OfferCancel => {
                return Err(ErrorKind::FeeOnlyUnsupported(ty.clone()));
            }
            TransactionType::Payment | TransactionType::OfferCreate => {}
            TransactionType::Other(..) => {
                return Err(ErrorKind::UnsupportedTransactionType(ty.clone()));
            }
        }

        match net.len() {
            0 => Err(ErrorKind::NoBalanceChange),
            1 => self.classify_single(ty, net, source, destination),
            2 => self.classify_pair(net),
            _ => Err(ErrorKind::TooManyCurrencies(net.clone())),
        }
    }

    fn classify_single(
        &self,
        ty: &TransactionType,
        net: &NetChanges,
        source: &Account,
        destination: Option<&Account>,
    ) -> Result<Trade, ErrorKind> {
        let change = match net.iter().next() {
            Some(change) => change,
            None => return Err(ErrorKind::NoBalanceChange),
        };
        if change.currency() != self.config.native_currency() {
            return Err(ErrorKind::UnsupportedIouDeposit(change.clone()));
        }

        if *ty == TransactionType::Payment {
            for related in self.config.related_accounts() {
                if related == source || Some(related) == destination {
                    return Err(ErrorKind::RelatedAccountPayment(
                        related.clone(),
                        change.clone(),
                    ));
                }
            }
        }

        let threshold = self.config.bulk_transfer_threshold();
        if change.value() >= threshold.value() {
            return Err(ErrorKind::UnsupportedBulkTransfer(change.clone()));
        }
        if change.is_negative() {
            return Err(ErrorKind::UnsupportedOutboundTransfer(change.clone()));
        }

        Ok(Trade {
            action: Action::Buy,
            volume: change.clone(),
            counter: None,
        })
    }

    fn classify_pair(&self, net: &NetChanges) -> Result<Trade, ErrorKind> {
        let native = self.config.native_currency();
        let fiat = self.config.reference_fiat();

        let (symbol_change, counter_change) = if let Some(xrp) = net.get(native) {
            let other = net.iter().find(|amt| amt.currency() != native);
            (xrp, other)
        } else if let Some(usd) = net.get(fiat) {
            let other = net.iter().find(|amt| amt.currency() != fiat);
            if let Some(other) = other {
                if other.currency() == self.config.excluded_fiat() {
                    return Err(ErrorKind::ExcludedCurrencyPair(
                        other.currency().clone(),
                        fiat.clone(),
                    ));
                }
                (other, Some(usd))
            } else {
                return Err(ErrorKind::NoReferenceCurrency(net.clone()));
            }
        } else {
            return Err(ErrorKind::NoReferenceCurrency(net.clone()));
        };
        // Map keys are distinct, so a two-entry map always has an "other" entry
        let counter_change = match counter_change {
            Some(amt) => amt,
            None => return Err(ErrorKind::NoReferenceCurrency(net.clone())),
        };

        let action = if symbol_change.is_negative() {
            Action::Sell
        } else {
            Action::Buy
        };
        Ok(Trade {
            action,
            volume: symbol_change.abs(),
            counter: Some(counter_change.abs()),
        })
    }

    /// Classifies a transaction from the point of view of `account`
    pub fn classify(&self, tx: &Transaction, account: &Account) -> Result<ClassifiedRow, Error> {
        let tag = |kind: ErrorKind| Error {
            hash: tx.hash.clone(),
            kind,
        };

        let net = extract::net_changes(tx, account)
            .map_err(|e| tag(ErrorKind::Extract(e)))?
            .unwrap_or_default();
        let trade = match self.classify_changes(&tx.ty, &net, &tx.account, tx.destination.as_ref())
        {
            Ok(trade) => trade,
            Err(ErrorKind::NoBalanceChange) => return self.fee_only(tx, account).map_err(tag),
            Err(kind) => return Err(tag(kind)),
        };

        let native = self.config.native_currency();
        let (price, proceeds) = match trade.counter {
            Some(ref counter) => (
                counter
                    .ratio(&trade.volume)
                    .map_err(|e| tag(ErrorKind::Amount(e)))?
                    .abs(),
                counter.clone(),
            ),
            None => (Amount::zero(native.clone()), Amount::zero(native.clone())),
        };
        Ok(ClassifiedRow {
            timestamp: tx.date,
            action: trade.action,
            symbol: trade.volume.currency().clone(),
            counter_currency: trade.counter.as_ref().map(|amt| amt.currency().clone()),
            volume: trade.volume,
            price,
            proceeds,
            fee: self.fee_paid(tx, account),
            source_label: self.config.source_label().to_owned(),
            tx_hash: tx.hash.clone(),
        })
    }

    /// The fee our account paid for a transaction
    fn fee_paid(&self, tx: &Transaction, account: &Account) -> Amount {
        if tx.account == *account {
            tx.fee.clone()
        } else {
            Amount::zero(tx.fee.currency().clone())
        }
    }

    /// Handles a transaction which changed none of our balances, other than
    /// possibly charging us a fee
    fn fee_only(&self, tx: &Transaction, account: &Account) -> Result<ClassifiedRow, ErrorKind> {
        let delta = match tx.account_root_delta(account) {
            Ok(Some(delta)) => delta,
            Ok(None) => return Err(ErrorKind::NoBalanceChange),
            Err(e) => return Err(ErrorKind::Extract(extract::Error::Balances(tx.hash.clone(), e))),
        };
        if tx.account != *account || delta != tx.fee.negate() {
            return Err(ErrorKind::FeeMismatch {
                delta,
                fee: tx.fee.clone(),
            });
        }

        let native = self.config.native_currency();
        Ok(ClassifiedRow {
            timestamp: tx.date,
            action: Action::Fee,
            symbol: tx.fee.currency().clone(),
            volume: Amount::zero(native.clone()),
            counter_currency: None,
            price: Amount::zero(native.clone()),
            proceeds: Amount::zero(native.clone()),
            fee: tx.fee.clone(),
            source_label: self.config.source_label().to_owned(),
            tx_hash: tx.hash.clone(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::ledger::tests::{offer_create_json, ACCOUNT, COUNTERPARTY, HASH};
    use crate::ledger::TxResponse;
    use rust_decimal::Decimal;

    pub fn amt(s: &str, currency: &str) -> Amount {
        Amount::parse_value(s, currency.parse().unwrap()).unwrap()
    }

    fn net(changes: &[(&str, &str)]) -> NetChanges {
        NetChanges::from_changes(changes.iter().map(|(v, c)| amt(v, c))).unwrap()
    }

    fn us() -> Account {
        ACCOUNT.parse().unwrap()
    }

    fn them() -> Account {
        COUNTERPARTY.parse().unwrap()
    }

    /// A transaction which changes our XRP balance by `drops` (excluding the
    /// fee), sent by `sender`
    pub fn xrp_payment_json(hash: &str, date: u32, sender: &str, drops: i64) -> String {
        let fee = if sender == ACCOUNT { 12 } else { 0 };
        let before = 1_000_000_000_000i64;
        let after = before + drops - fee;
        format!(
            r#"{{"result":{{"Account":"{sender}","Destination":"{ACCOUNT}","Fee":"12","TransactionType":"Payment","hash":"{hash}","date":{date},
              "meta":{{"AffectedNodes":[{{"ModifiedNode":{{"LedgerEntryType":"AccountRoot",
                "FinalFields":{{"Account":"{ACCOUNT}","Balance":"{after}"}},
                "PreviousFields":{{"Balance":"{before}"}},
                "PreviousTxnID":"{HASH}"}}}}]}}}}}}"#
        )
    }

    #[test]
    fn buy_xrp() {
        let classifier = Classifier::new(Configuration::default());
        let trade = classifier
            .classify_changes(
                &TransactionType::Payment,
                &net(&[("50", "XRP")]),
                &them(),
                Some(&us()),
            )
            .unwrap();
        assert_eq!(trade.action, Action::Buy);
        assert_eq!(trade.volume, amt("50", "XRP"));
        assert_eq!(trade.counter, None);

        let json = xrp_payment_json(HASH, 568598400, COUNTERPARTY, 50_000_000);
        let tx = serde_json::from_str::<TxResponse>(&json).unwrap().result;
        let row = classifier.classify(&tx, &us()).unwrap();
        assert_eq!(row.action, Action::Buy);
        assert_eq!(row.symbol, Currency::native());
        assert_eq!(row.volume, amt("50", "XRP"));
        assert!(row.price.is_zero());
        assert!(row.proceeds.is_zero());
        assert!(row.fee.is_zero());
        assert_eq!(row.counter_currency, None);
        assert_eq!(row.source_label, "XRP Ledger");
    }

    #[test]
    fn sell_xrp_for_usd() {
        let classifier = Classifier::new(Configuration::default());
        let tx = serde_json::from_str::<TxResponse>(&offer_create_json())
            .unwrap()
            .result;
        let row = classifier.classify(&tx, &us()).unwrap();
        assert_eq!(row.action, Action::Sell);
        assert_eq!(row.symbol, Currency::native());
        assert_eq!(row.volume, amt("30", "XRP"));
        assert_eq!(row.counter_currency, Some("USD".parse().unwrap()));
        assert_eq!(row.price, amt("3", "USD"));
        assert_eq!(row.proceeds, amt("90", "USD"));
        assert_eq!(row.fee, Amount::from_drops(12));
        assert_eq!(row.fee_currency(), &Currency::native());

        // price * volume recovers the counter amount
        assert_eq!(row.price.value() * row.volume.value(), Decimal::new(90, 0));
    }

    #[test]
    fn iou_pairs() {
        let classifier = Classifier::new(Configuration::default());
        let pay = TransactionType::OfferCreate;

        let trade = classifier
            .classify_changes(&pay, &net(&[("2", "EUR"), ("-3", "USD")]), &us(), None)
            .unwrap();
        assert_eq!(trade.action, Action::Buy);
        assert_eq!(trade.volume, amt("2", "EUR"));
        assert_eq!(trade.counter, Some(amt("3", "USD")));

        let trade = classifier
            .classify_changes(&pay, &net(&[("-2", "EUR"), ("3", "USD")]), &us(), None)
            .unwrap();
        assert_eq!(trade.action, Action::Sell);

        assert_eq!(
            classifier.classify_changes(&pay, &net(&[("-7", "CNY"), ("1", "USD")]), &us(), None),
            Err(ErrorKind::ExcludedCurrencyPair(
                "CNY".parse().unwrap(),
                "USD".parse().unwrap()
            )),
        );
        let no_ref = net(&[("-7", "CNY"), ("1", "EUR")]);
        assert_eq!(
            classifier.classify_changes(&pay, &no_ref, &us(), None),
            Err(ErrorKind::NoReferenceCurrency(no_ref)),
        );
    }

    #[test]
    fn too_many_currencies() {
        let classifier = Classifier::new(Configuration::default());
        let three = net(&[("-30", "XRP"), ("45", "USD"), ("40", "EUR")]);
        let err = classifier
            .classify_changes(&TransactionType::OfferCreate, &three, &us(), None)
            .unwrap_err();
        assert_eq!(err, ErrorKind::TooManyCurrencies(three));
        assert!(err.is_deferred());
    }

    #[test]
    fn single_currency_policy() {
        let classifier = Classifier::new(Configuration::default());
        let pay = TransactionType::Payment;

        let err = classifier
            .classify_changes(&pay, &net(&[("5", "USD")]), &them(), Some(&us()))
            .unwrap_err();
        assert_eq!(err, ErrorKind::UnsupportedIouDeposit(amt("5", "USD")));

        let err = classifier
            .classify_changes(&pay, &net(&[("-5", "XRP")]), &us(), Some(&them()))
            .unwrap_err();
        assert_eq!(err, ErrorKind::UnsupportedOutboundTransfer(amt("-5", "XRP")));

        // The threshold is inclusive
        let err = classifier
            .classify_changes(&pay, &net(&[("580000", "XRP")]), &them(), Some(&us()))
            .unwrap_err();
        assert_eq!(err, ErrorKind::UnsupportedBulkTransfer(amt("580000", "XRP")));
        assert!(classifier
            .classify_changes(&pay, &net(&[("579999.999999", "XRP")]), &them(), Some(&us()))
            .is_ok());
    }

    #[test]
    fn related_accounts() {
        let config: Configuration =
            serde_json::from_str(&format!(r#"{{"related_accounts":["{COUNTERPARTY}"]}}"#))
                .unwrap();
        let classifier = Classifier::new(config);
        let changes = net(&[("50", "XRP")]);

        let err = classifier
            .classify_changes(&TransactionType::Payment, &changes, &them(), Some(&us()))
            .unwrap_err();
        assert_eq!(err, ErrorKind::RelatedAccountPayment(them(), amt("50", "XRP")));

        // Only payments are checked against the related accounts
        assert!(classifier
            .classify_changes(&TransactionType::OfferCreate, &changes, &them(), None)
            .is_ok());
    }

    #[test]
    fn transaction_types() {
        let classifier = Classifier::new(Configuration::default());
        let changes = net(&[("50", "XRP")]);
        for ty in [
            TransactionType::AccountSet,
            TransactionType::TrustSet,
            TransactionType::OfferCancel,
        ] {
            assert_eq!(
                classifier.classify_changes(&ty, &changes, &us(), None),
                Err(ErrorKind::FeeOnlyUnsupported(ty.clone())),
            );
        }
        let escrow = TransactionType::Other("EscrowCreate".into());
        assert_eq!(
            classifier.classify_changes(&escrow, &changes, &us(), None),
            Err(ErrorKind::UnsupportedTransactionType(escrow.clone())),
        );
    }

    #[test]
    fn fee_only_payment() {
        let classifier = Classifier::new(Configuration::default());

        // A payment which only cost us the fee
        let json = xrp_payment_json(HASH, 1, ACCOUNT, 0);
        let tx = serde_json::from_str::<TxResponse>(&json).unwrap().result;
        let row = classifier.classify(&tx, &us()).unwrap();
        assert_eq!(row.action, Action::Fee);
        assert!(row.volume.is_zero());
        assert!(row.price.is_zero());
        assert_eq!(row.fee, Amount::from_drops(12));

        // Untouched accounts have nothing to report
        let err = classifier.classify(&tx, &them()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoBalanceChange);
        assert!(err.is_deferred());
    }

    #[test]
    fn fee_plus_transfer() {
        // Balance dropped by 20 drops but the fee is only 12
        let json = format!(
            r#"{{"result":{{"Account":"{ACCOUNT}","Fee":"12","TransactionType":"Payment","hash":"{HASH}","date":1,
              "meta":{{"AffectedNodes":[{{"ModifiedNode":{{"LedgerEntryType":"AccountRoot",
                "FinalFields":{{"Account":"{ACCOUNT}","Balance":"980"}},
                "PreviousFields":{{"Balance":"1000"}}}}}}]}}}}}}"#
        );
        let tx = serde_json::from_str::<TxResponse>(&json).unwrap().result;
        let classifier = Classifier::new(Configuration::default());
        let err = classifier.classify(&tx, &us()).unwrap_err();
        // The 8 extra drops show up as an outbound transfer, not a fee
        assert_eq!(
            err.kind,
            ErrorKind::UnsupportedOutboundTransfer(Amount::from_drops(-8))
        );
        // ...which is not a fee-only transaction
        assert_eq!(
            classifier.fee_only(&tx, &us()),
            Err(ErrorKind::FeeMismatch {
                delta: Amount::from_drops(-20),
                fee: Amount::from_drops(12),
            }),
        );
    }

    #[test]
    fn error_display() {
        let err = Error {
            hash: HASH.parse().unwrap(),
            kind: ErrorKind::UnsupportedOutboundTransfer(amt("-5", "XRP")),
        };
        assert_eq!(
            err.to_string(),
            format!("not implemented: sent out -5 XRP, hash: {HASH}"),
        );
        let err = Error {
            hash: HASH.parse().unwrap(),
            kind: ErrorKind::FeeMismatch {
                delta: Amount::from_drops(-20),
                fee: Amount::from_drops(12),
            },
        };
        assert!(!err.is_deferred());
        assert_eq!(
            err.to_string(),
            format!("balance changed by -0.00002 XRP but fee was 0.000012 XRP, hash: {HASH}"),
        );
    }
}
