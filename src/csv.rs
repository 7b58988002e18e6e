// XRP Tax Tracker
// Written in 2021 by
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

//! CSV
//!
//! Basic support for printing data in comma-separated-value format
//!

use crate::units::{Amount, UtcTime};
use std::fmt;

/// Trait for objects that can be printed in CSV format
pub trait PrintCsv {
    fn print(&self, f: &mut fmt::Formatter) -> fmt::Result;
}

/// Wrapper around a `PrintCsv` used for println! etc
pub struct CsvPrinter<P: PrintCsv>(pub P);

impl<P: PrintCsv> fmt::Display for CsvPrinter<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.print(f)
    }
}

/// Wrapper around a date that will output date, time and UTC offset,
/// e.g. `2018-01-07 00:00:00 +0000`
#[derive(Copy, Clone)]
pub struct DateTimeOffset(pub UtcTime);
impl PrintCsv for DateTimeOffset {
    fn print(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S %z"))
    }
}

/// Wrapper around a date that will output a US-style date and time,
/// e.g. `01/07/2018 00:00:00`
#[derive(Copy, Clone)]
pub struct UsDateTime(pub UtcTime);
impl PrintCsv for UsDateTime {
    fn print(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.format("%m/%d/%Y %H:%M:%S"))
    }
}

impl PrintCsv for Amount {
    fn print(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Quantities are always printed with six decimal places, which is
        // the precision of XRP
        write!(f, "{self:#}")
    }
}

macro_rules! impl_display {
    ($ty:ty) => {
        impl PrintCsv for $ty {
            fn print(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }
    };
}

impl_display!(crate::units::Currency);
impl_display!(crate::row::Action);
impl_display!(crate::ledger::TxHash);

macro_rules! impl_string {
    ($ty:ty) => {
        impl PrintCsv for $ty {
            fn print(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if self.contains(',') || self.contains('"') {
                    write!(f, "\"{}\"", self.replace('"', "\"\""))
                } else {
                    write!(f, "{}", self)
                }
            }
        }
    };
}

impl_string!(String);
impl_string!(&str);
impl_string!(str);

macro_rules! impl_tuple {
    ($($ty:ident $idx:tt)*) => {
        impl<$($ty: PrintCsv,)*> PrintCsv for ($($ty,)*) {
            #[allow(unused_assignments)]
            fn print(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let mut comma = false;
                $(
                    if comma {
                        f.write_str(",")?;
                    }
                    self.$idx.print(f)?;
                    comma = true;
                )*
                Ok(())
            }
        }
    }
}

impl_tuple!(A 0 B 1);
impl_tuple!(A 0 B 1 C 2);
impl_tuple!(A 0 B 1 C 2 D 3);
impl_tuple!(A 0 B 1 C 2 D 3 E 4);
impl_tuple!(A 0 B 1 C 2 D 3 E 4 F 5);
impl_tuple!(A 0 B 1 C 2 D 3 E 4 F 5 G 6);
impl_tuple!(A 0 B 1 C 2 D 3 E 4 F 5 G 6 H 7);
impl_tuple!(A 0 B 1 C 2 D 3 E 4 F 5 G 6 H 7 I 8);

impl<P: PrintCsv> PrintCsv for Option<P> {
    fn print(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Some(p) => p.print(f),
            None => Ok(()), // "write the empty string"
        }
    }
}

impl<'a, P: PrintCsv> PrintCsv for &'a P {
    fn print(&self, f: &mut fmt::Formatter) -> fmt::Result {
        (*self).print(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates() {
        let t = UtcTime::from_ledger_seconds(568_598_400 + 3661);
        assert_eq!(
            CsvPrinter(DateTimeOffset(t)).to_string(),
            "2018-01-07 01:01:01 +0000"
        );
        assert_eq!(CsvPrinter(UsDateTime(t)).to_string(), "01/07/2018 01:01:01");
    }

    #[test]
    fn tuples() {
        let amt = Amount::from_drops(1_500_000);
        let none: Option<Amount> = None;
        assert_eq!(
            CsvPrinter((&amt, "XRP", none, "a,b", "say \"hi\"")).to_string(),
            "1.500000,XRP,,\"a,b\",\"say \"\"hi\"\"\"",
        );
    }
}
