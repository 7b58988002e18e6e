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

//! Chronological Aggregation
//!
//! Collects classified rows in whatever order the record files happen to be
//! read, and hands them back ordered by timestamp. Rows with the same
//! timestamp come back in the order they were pushed.
//!

use crate::row::ClassifiedRow;
use crate::units::UtcTime;
use std::collections::{btree_map, BTreeMap};
use std::iter;

/// A time-ordered collection of rows
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct ChronoAggregator {
    map: BTreeMap<(UtcTime, usize), ClassifiedRow>,
    next_idx: usize,
}

impl ChronoAggregator {
    /// Constructs a new empty aggregator
    pub fn new() -> Self {
        Default::default()
    }

    /// Computes the number of stored rows
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether or not any rows have been pushed
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Adds a row. Allows duplicate timestamps.
    pub fn push(&mut self, row: ClassifiedRow) {
        let idx = self.next_idx;
        self.next_idx += 1;
        self.map.insert((row.timestamp, idx), row);
    }

    /// Constructs a borrowed iterator over the rows, earliest first
    pub fn iter(&self) -> btree_map::Values<(UtcTime, usize), ClassifiedRow> {
        self.map.values()
    }
}

impl<'a> iter::IntoIterator for &'a ChronoAggregator {
    type Item = &'a ClassifiedRow;
    type IntoIter = btree_map::Values<'a, (UtcTime, usize), ClassifiedRow>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owned iterator over rows, earliest first
pub struct IntoIter {
    iter: btree_map::IntoValues<(UtcTime, usize), ClassifiedRow>,
}

impl Iterator for IntoIter {
    type Item = ClassifiedRow;
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

impl iter::IntoIterator for ChronoAggregator {
    type Item = ClassifiedRow;
    type IntoIter = IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            iter: self.map.into_values(),
        }
    }
}
