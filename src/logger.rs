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

//! Logging
//!
//! Log infrastructure. This uses the traits and macros from the log 0.4 crate.
//!
//! Will write INFO and more urgent messages to stderr, leaving stdout free
//! for CSV output. If a debug log is given, will also log everything DEBUG
//! and up to it, with timestamp and severity information.
//!
//! Any errors related to writing are simply dropped and the messages won't be
//! logged. Errors related to initially opening the files should kill the program.
//!

use anyhow::Context as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Internal marker structure used to indicate that we only log to stderr
struct StderrOnly;

impl log::Log for StderrOnly {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Actual logging structure
pub struct Logger {
    /// Log for everything, with timestamps
    debug_log: Mutex<File>,
}

impl Logger {
    /// Initialize a global logger which also writes a debug log
    pub fn init(debug_log: &Path) -> Result<(), anyhow::Error> {
        let file = File::create(debug_log)
            .with_context(|| format!("creating debug log {}", debug_log.to_string_lossy()))?;
        log::set_max_level(log::LevelFilter::Debug);
        log::set_boxed_logger(Box::new(Logger {
            debug_log: Mutex::new(file),
        }))
        .map_err(From::from)
    }

    /// Initialize a global logger (without extra files)
    pub fn init_stderr_only() -> Result<(), log::SetLoggerError> {
        log::set_max_level(log::LevelFilter::Info);
        log::set_logger(&StderrOnly)
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Debug
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            if record.level() <= log::Level::Info {
                eprintln!("{}", record.args());
            }
            // Regardless, log to debug log with more precise timestamp and log level
            if let Ok(mut log) = self.debug_log.lock() {
                let _ = writeln!(
                    log,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%F %T%.6f%z"),
                    record.level(),
                    record.target(),
                    record.args(),
                );
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut log) = self.debug_log.lock() {
            let _ = log.flush();
        }
    }
}
