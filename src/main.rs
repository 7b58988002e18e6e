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

//! XRP Tax Tracker
//!
//! Personal-use tool for turning an XRP ledger account's history into
//! something tax software will accept. Use `walk` to download the history
//! into a directory, then `csv` to classify it.
//!

pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod config;
pub mod connect;
pub mod csv;
pub mod dedup;
pub mod extract;
pub mod file;
pub mod format;
pub mod ledger;
pub mod logger;
pub mod pipeline;
pub mod row;
pub mod units;
pub mod walk;

use anyhow::Context;
use log::{debug, info};
use std::{fs, io};

use classify::Classifier;
use cli::Command;
use config::Configuration;
use connect::WebSocket;
use dedup::DedupLedger;
use logger::Logger;
use pipeline::Pipeline;
use walk::{ChainWalker, Outcome};

fn main() -> Result<(), anyhow::Error> {
    let command = Command::from_args();
    match command.debug_log() {
        Some(path) => Logger::init(path)?,
        None => Logger::init_stderr_only()?,
    }
    debug!("Running {} command.", command.name());

    match command {
        Command::Csv {
            record_dir,
            account,
            dialect,
            config_file,
            state_file,
            print_urls,
            debug_log: _,
        } => {
            let config = match config_file {
                Some(file) => Configuration::load(file)?,
                None => Configuration::default(),
            };
            let formatter =
                format::dialect(&dialect).with_context(|| format!("unknown format {dialect}"))?;
            let mut ledger = DedupLedger::load(state_file)?;
            info!(
                "{} files already processed according to {}.",
                ledger.len(),
                ledger.path().to_string_lossy(),
            );

            let pipeline =
                Pipeline::new(account, Classifier::new(config), formatter).with_urls(print_urls);
            pipeline
                .run(&record_dir, &mut ledger, io::stdout(), io::stderr())
                .with_context(|| format!("processing {}", record_dir.to_string_lossy()))?;
        }
        Command::Walk {
            account,
            address,
            checkpoint,
            resume,
            max_hops,
            save_dir,
            debug_log: _,
        } => {
            let mut walker = ChainWalker::new(account, checkpoint);
            if let Some(max) = max_hops {
                walker = walker.with_max_hops(max);
            }
            if let Some(dir) = save_dir {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("creating directory {}", dir.to_string_lossy()))?;
                walker = walker.with_save_dir(dir);
            }

            let mut sock = WebSocket::connect(&address)?;
            let walk = walker.run(&mut sock, resume)?;
            for hash in &walk.visited {
                println!("{hash}");
            }
            match walk.outcome {
                Outcome::HistoryExhausted { last: Some(last) } => {
                    info!("Walked {} transactions back to {}.", walk.visited.len(), last)
                }
                Outcome::HistoryExhausted { last: None } => info!("No transactions found."),
                Outcome::HopLimitReached { next } => info!(
                    "Walked {} transactions; run again with -r to continue from {}.",
                    walk.visited.len(),
                    next,
                ),
            }
        }
        Command::Tx {
            hash,
            address,
            debug_log: _,
        } => {
            let mut sock = WebSocket::connect(&address)?;
            let reply = connect::fetch_transaction(&mut sock, &hash)?;
            let pretty = serde_json::to_string_pretty(&reply).context("encoding transaction")?;
            println!("{pretty}");
        }
    }

    Ok(())
}
