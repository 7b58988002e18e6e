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

//! History Walk
//!
//! The ledger has no cheap way to list every transaction that touched an
//! account, but every account root records the ID of the last transaction
//! to modify it. So starting from the account's current state, we can follow
//! these links backward one transaction at a time until we reach the
//! transaction which created the account.
//!
//! After every hop the ID of the next transaction to fetch is written to a
//! checkpoint file, so that a walk which dies halfway through (these walks
//! take a long time for active accounts) can be resumed.
//!

use crate::connect::{self, Transport};
use crate::file;
use crate::ledger::{Account, TxHash, TxResponse};
use anyhow::Context as _;
use log::{debug, info};
use serde::Deserialize as _;
use std::path::PathBuf;

/// Where the walk is
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum State {
    /// Asking the server for the account's most recent transaction
    Seeking,
    /// About to fetch the given transaction
    Walking(TxHash),
}

/// How a walk ended
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// Reached the transaction which created the account (or the account has
    /// no transactions at all)
    HistoryExhausted { last: Option<TxHash> },
    /// Stopped after the maximum number of hops; resuming will continue at
    /// `next`
    HopLimitReached { next: TxHash },
}

/// The result of a walk
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Walk {
    /// Every transaction fetched, most recent first
    pub visited: Vec<TxHash>,
    pub outcome: Outcome,
}

/// Walks an account's history backward
pub struct ChainWalker {
    account: Account,
    checkpoint: PathBuf,
    max_hops: Option<usize>,
    save_dir: Option<PathBuf>,
}

impl ChainWalker {
    /// Constructs a new walker, which will record its progress in `checkpoint`
    pub fn new<P: Into<PathBuf>>(account: Account, checkpoint: P) -> Self {
        ChainWalker {
            account,
            checkpoint: checkpoint.into(),
            max_hops: None,
            save_dir: None,
        }
    }

    /// Stops the walk after fetching this many transactions
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = Some(max_hops);
        self
    }

    /// Saves every fetched transaction as `<dir>/<hash>.json`
    pub fn with_save_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Reads the checkpoint left by a previous walk
    pub fn read_checkpoint(&self) -> anyhow::Result<TxHash> {
        let name = self.checkpoint.to_string_lossy();
        let contents = file::read_optional(&self.checkpoint)?
            .ok_or_else(|| anyhow::Error::msg(format!("checkpoint {name} does not exist")))?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Err(anyhow::Error::msg(format!("checkpoint {name} is empty")));
        }
        trimmed
            .parse()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("reading checkpoint {name}"))
    }

    fn write_checkpoint(&self, next: &TxHash) -> anyhow::Result<()> {
        file::write_atomic(&self.checkpoint, next.as_str().as_bytes(), "(checkpoint)")
    }

    /// Runs the walk
    ///
    /// If `resume` is set, starts from the checkpoint rather than asking the
    /// server for the account's latest transaction. Any error from the
    /// server aborts the walk; the checkpoint is left pointing at the
    /// transaction which could not be fetched.
    pub fn run(&self, transport: &mut dyn Transport, resume: bool) -> anyhow::Result<Walk> {
        let mut state = if resume {
            let start = self.read_checkpoint()?;
            info!("Resuming walk of {} at {}.", self.account, start);
            State::Walking(start)
        } else {
            State::Seeking
        };
        let mut visited = vec![];

        loop {
            state = match state {
                State::Seeking => match connect::latest_transaction(transport, &self.account)? {
                    Some(latest) => {
                        info!("Latest transaction of {} is {}.", self.account, latest);
                        self.write_checkpoint(&latest)?;
                        State::Walking(latest)
                    }
                    None => {
                        return Ok(Walk {
                            visited,
                            outcome: Outcome::HistoryExhausted { last: None },
                        })
                    }
                },
                State::Walking(hash) => {
                    if self.max_hops.map_or(false, |max| visited.len() >= max) {
                        info!("Stopping after {} transactions. Next is {}.", visited.len(), hash);
                        return Ok(Walk {
                            visited,
                            outcome: Outcome::HopLimitReached { next: hash },
                        });
                    }

                    let raw = connect::fetch_transaction(transport, &hash)?;
                    let tx = TxResponse::deserialize(&raw)
                        .with_context(|| format!("parsing transaction {hash}"))?
                        .result;
                    if tx.hash != hash {
                        return Err(anyhow::Error::msg(format!(
                            "asked for transaction {hash}, got {}",
                            tx.hash
                        )));
                    }
                    if let Some(ref dir) = self.save_dir {
                        let path = dir.join(format!("{hash}.json"));
                        let data = serde_json::to_vec_pretty(&raw).context("encoding transaction")?;
                        file::write_atomic(&path, &data, "(transaction record)")?;
                    }
                    info!("{}", tx);
                    for node in tx.affected_nodes() {
                        debug!("    {}", node);
                    }

                    let previous = tx.previous_txn_for(&self.account).cloned();
                    visited.push(hash);
                    match previous {
                        Some(prev) => {
                            self.write_checkpoint(&prev)?;
                            State::Walking(prev)
                        }
                        None => {
                            info!("Reached the start of {}'s history.", self.account);
                            return Ok(Walk {
                                outcome: Outcome::HistoryExhausted {
                                    last: visited.last().cloned(),
                                },
                                visited,
                            });
                        }
                    }
                }
            };
        }
    }
}
