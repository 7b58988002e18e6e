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

//! Amounts
//!
//! A decimal quantity tagged with its currency. Arithmetic between amounts
//! of different currencies is an error rather than a panic, since it can
//! only happen when the ledger data is somehow inconsistent.
//!

use super::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::{fmt, str::FromStr as _};

/// Number of drops in one XRP
const DROPS_PER_XRP: u32 = 6;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Tried to combine amounts of different currencies
    CurrencyMismatch(Currency, Currency),
    /// Tried to compute a ratio against zero
    DivideByZero(Amount),
    /// A decimal operation overflowed
    Overflow,
    /// Could not parse a decimal value
    Parse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::CurrencyMismatch(ref a, ref b) => {
                write!(f, "currency mismatch: {a} vs {b}")
            }
            Error::DivideByZero(ref a) => write!(f, "ratio of {a} against zero"),
            Error::Overflow => f.write_str("decimal overflow"),
            Error::Parse(ref s) => write!(f, "could not parse amount {s}"),
        }
    }
}

impl std::error::Error for Error {}

/// A signed amount of some currency
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Amount {
    value: Decimal,
    currency: Currency,
}

impl Amount {
    /// Constructs an amount from a decimal value and a currency
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Amount { value, currency }
    }

    /// Constructs a zero amount of the given currency
    pub fn zero(currency: Currency) -> Self {
        Amount::new(Decimal::ZERO, currency)
    }

    /// Constructs a native amount from an integer number of drops
    pub fn from_drops(drops: i64) -> Self {
        Amount::new(Decimal::new(drops, DROPS_PER_XRP), Currency::native())
    }

    /// Parses a native amount from a decimal string of drops, which is how
    /// the ledger encodes XRP
    pub fn parse_drops(s: &str) -> Result<Self, Error> {
        let drops = i64::from_str(s).map_err(|_| Error::Parse(s.into()))?;
        Ok(Amount::from_drops(drops))
    }

    /// Parses an issued-currency amount, which may be in scientific notation
    pub fn parse_value(s: &str, currency: Currency) -> Result<Self, Error> {
        let value = if s.contains(['e', 'E']) {
            Decimal::from_scientific(s)
        } else {
            Decimal::from_str(s)
        }
        .map_err(|_| Error::Parse(s.into()))?;
        Ok(Amount::new(value, currency))
    }

    /// Accessor for the decimal value
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Accessor for the currency
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Whether this amount is strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    /// Whether this amount is zero
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns the amount with its sign flipped
    pub fn negate(&self) -> Self {
        Amount::new(-self.value, self.currency.clone())
    }

    /// Returns the absolute value of the amount
    pub fn abs(&self) -> Self {
        Amount::new(self.value.abs(), self.currency.clone())
    }

    /// Adds two amounts of the same currency
    pub fn add(&self, other: &Amount) -> Result<Self, Error> {
        self.check_currency(other)?;
        let value = self.value.checked_add(other.value).ok_or(Error::Overflow)?;
        Ok(Amount::new(value, self.currency.clone()))
    }

    /// Subtracts an amount of the same currency from this one
    pub fn subtract(&self, other: &Amount) -> Result<Self, Error> {
        self.add(&other.negate())
    }

    /// Divides this amount by another, possibly of a different currency
    ///
    /// The result is expressed in units of `self`'s currency per unit of
    /// `other`'s currency.
    pub fn ratio(&self, other: &Amount) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::DivideByZero(self.clone()));
        }
        let value = self.value.checked_div(other.value).ok_or(Error::Overflow)?;
        Ok(Amount::new(value, self.currency.clone()))
    }

    fn check_currency(&self, other: &Amount) -> Result<(), Error> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(Error::CurrencyMismatch(
                self.currency.clone(),
                other.currency.clone(),
            ))
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Alternate display is the fixed six-digit form used in CSV output
        if f.alternate() {
            let mut copy = self.value.round_dp(6);
            copy.rescale(6);
            fmt::Display::fmt(&copy, f)
        } else {
            write!(f, "{} {}", self.value.normalize(), self.currency)
        }
    }
}

/// An amount exactly as it appears in a record, before conversion to a decimal
///
/// Issued-currency values on the ledger range far beyond what a [Decimal]
/// can hold. Ledger entries which we may never look at keep their amounts
/// in this form so that an unrepresentable value only matters if it is used.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    /// Native amount, a decimal string of drops
    Drops(String),
    /// Issued-currency amount
    Issued { currency: Currency, value: String },
}

impl RawAmount {
    /// Converts to an [Amount]
    pub fn parse(&self) -> Result<Amount, Error> {
        match *self {
            RawAmount::Drops(ref s) => Amount::parse_drops(s),
            RawAmount::Issued {
                ref currency,
                ref value,
            } => Amount::parse_value(value, currency.clone()),
        }
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.parse() {
            Ok(amount) => fmt::Display::fmt(&amount, f),
            Err(_) => match *self {
                RawAmount::Drops(ref s) => write!(f, "{s} drops"),
                RawAmount::Issued {
                    ref currency,
                    ref value,
                } => write!(f, "{value} {currency}"),
            },
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deser: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawAmount::deserialize(deser)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Amount {
        Amount::parse_value(s, "USD".parse().unwrap()).unwrap()
    }

    #[test]
    fn drops() {
        let amt = Amount::parse_drops("50000000").unwrap();
        assert_eq!(amt.value(), Decimal::new(50, 0));
        assert!(amt.currency().is_native());
        assert_eq!(format!("{amt:#}"), "50.000000");
        assert_eq!(format!("{}", Amount::from_drops(12)), "0.000012 XRP");
        assert!(Amount::parse_drops("1.5").is_err());
    }

    #[test]
    fn arithmetic() {
        let a = usd("1.5");
        let b = usd("-2.25");
        assert_eq!(a.add(&b).unwrap(), usd("-0.75"));
        assert_eq!(a.subtract(&b).unwrap(), usd("3.75"));
        assert!(b.is_negative());
        assert!(!a.is_negative());
        assert!(!usd("-0").is_negative());
        assert!(usd("0.000").is_zero());
        assert_eq!(b.negate(), usd("2.25"));
        assert_eq!(b.abs(), usd("2.25"));

        let xrp = Amount::from_drops(1_000_000);
        assert_eq!(
            a.add(&xrp),
            Err(Error::CurrencyMismatch(
                "USD".parse().unwrap(),
                Currency::native()
            )),
        );
    }

    #[test]
    fn ratio() {
        let xrp = Amount::parse_drops("-30000000").unwrap();
        let price = usd("90").ratio(&xrp).unwrap();
        assert_eq!(price, usd("-3"));
        assert!(usd("1").ratio(&Amount::from_drops(0)).is_err());
    }

    #[test]
    fn scientific() {
        assert_eq!(usd("1.5e-3"), usd("0.0015"));
        assert_eq!(usd("2e2"), usd("200"));
    }

    #[test]
    fn deserialize() {
        let native: Amount = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(native, Amount::from_drops(12));
        let issued: Amount = serde_json::from_str(
            "{\"currency\":\"USD\",\"issuer\":\"rvYAfWj5gh67oV6fW32ZzP3Aw4Eubs59B\",\"value\":\"-0.25\"}",
        )
        .unwrap();
        assert_eq!(issued, usd("-0.25"));
    }

    #[test]
    fn raw_out_of_range() {
        let raw: RawAmount = serde_json::from_str(
            "{\"currency\":\"USD\",\"issuer\":\"rvYAfWj5gh67oV6fW32ZzP3Aw4Eubs59B\",\"value\":\"9999999999999999e80\"}",
        )
        .unwrap();
        assert_eq!(
            raw.parse(),
            Err(Error::Parse("9999999999999999e80".into()))
        );
        assert_eq!(raw.to_string(), "9999999999999999e80 USD");

        let drops: RawAmount = serde_json::from_str("\"25000000\"").unwrap();
        assert_eq!(drops.parse(), Ok(Amount::from_drops(25_000_000)));
        assert_eq!(drops.to_string(), "25 XRP");
    }
}
