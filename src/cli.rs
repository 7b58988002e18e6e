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

//! Command-line Argument Parsing
//!

use crate::connect::DEFAULT_ADDRESS;
use crate::format;
use crate::ledger::{Account, TxHash};
use std::{
    env,
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    process,
    str::FromStr,
};

/// If no state file is given, record processed files here
static DEFAULT_STATE_FILE: &str = "processed-files.json";
/// If no checkpoint file is given, record walk progress here
static DEFAULT_CHECKPOINT_FILE: &str = "walk-checkpoint.txt";

/// Structure representing parsing of command-line options
pub enum Command {
    /// Classify a directory of transaction records and output tax CSV
    Csv {
        record_dir: PathBuf,
        account: Account,
        dialect: String,
        config_file: Option<PathBuf>,
        /// List of files already processed by earlier runs
        state_file: PathBuf,
        /// Whether to add a block explorer link to each row
        print_urls: bool,
        debug_log: Option<PathBuf>,
    },
    /// Walk an account's history backward, optionally saving every transaction
    Walk {
        account: Account,
        address: String,
        checkpoint: PathBuf,
        /// Start from the checkpoint rather than the account's latest transaction
        resume: bool,
        max_hops: Option<usize>,
        save_dir: Option<PathBuf>,
        debug_log: Option<PathBuf>,
    },
    /// Fetch and print a single transaction
    Tx {
        hash: TxHash,
        address: String,
        debug_log: Option<PathBuf>,
    },
}

/// Master list of supported commands
#[allow(clippy::type_complexity)]
static COMMANDS: &[(&str, &str, fn(&str, env::ArgsOs) -> Command)] = &[
    (
        "csv",
        "<record dir> <account> <format> [-c <config file>] [-s <state file>] [-u] [-l <debug log>]",
        csv,
    ),
    (
        "walk",
        "<account> [-a <server>] [-k <checkpoint file>] [-r] [-n <max hops>] [-d <save dir>] [-l <debug log>]",
        walk,
    ),
    ("tx", "<tx id> [-a <server>] [-l <debug log>]", tx),
];

/// Calls `f` with every remaining flag, bailing out if it doesn't recognize one
fn parse_flags<F>(invocation: &str, args: &mut env::ArgsOs, mut f: F)
where
    F: FnMut(u8, &mut env::ArgsOs) -> bool,
{
    while let Some(dash) = parse_os_string::<DashOpt>(args.next(), "flag", invocation) {
        if !f(dash.0, args) {
            eprintln!("Unrecognized flag -{}", char::from(dash.0));
            usage(invocation);
        }
    }
}

/// Parse the "csv" command
fn csv(invocation: &str, mut args: env::ArgsOs) -> Command {
    let record_dir = parse_os_string_required(args.next(), "record directory", invocation);
    let account = parse_os_string_required(args.next(), "account", invocation);
    let dialect: String = parse_os_string_required(args.next(), "format", invocation);
    if format::dialect(&dialect).is_none() {
        eprintln!("Unknown format {dialect}. Supported formats:");
        for name in format::dialect_names() {
            eprintln!("    {name}");
        }
        usage(invocation);
    }

    let mut config_file = None;
    let mut state_file = PathBuf::from(DEFAULT_STATE_FILE);
    let mut print_urls = false;
    let mut debug_log = None;
    parse_flags(invocation, &mut args, |flag, args| {
        match flag {
            b'c' => {
                config_file = Some(parse_os_string_required(args.next(), "config file", invocation))
            }
            b's' => state_file = parse_os_string_required(args.next(), "state file", invocation),
            b'u' => print_urls = true,
            b'l' => debug_log = Some(parse_os_string_required(args.next(), "debug log", invocation)),
            _ => return false,
        }
        true
    });

    Command::Csv {
        record_dir,
        account,
        dialect,
        config_file,
        state_file,
        print_urls,
        debug_log,
    }
}

/// Parse the "walk" command
fn walk(invocation: &str, mut args: env::ArgsOs) -> Command {
    let account = parse_os_string_required(args.next(), "account", invocation);

    let mut address = String::from(DEFAULT_ADDRESS);
    let mut checkpoint = PathBuf::from(DEFAULT_CHECKPOINT_FILE);
    let mut resume = false;
    let mut max_hops = None;
    let mut save_dir = None;
    let mut debug_log = None;
    parse_flags(invocation, &mut args, |flag, args| {
        match flag {
            b'a' => address = parse_os_string_required(args.next(), "server address", invocation),
            b'k' => checkpoint = parse_os_string_required(args.next(), "checkpoint file", invocation),
            b'r' => resume = true,
            b'n' => max_hops = Some(parse_os_string_required(args.next(), "max hops", invocation)),
            b'd' => save_dir = Some(parse_os_string_required(args.next(), "save directory", invocation)),
            b'l' => debug_log = Some(parse_os_string_required(args.next(), "debug log", invocation)),
            _ => return false,
        }
        true
    });

    Command::Walk {
        account,
        address,
        checkpoint,
        resume,
        max_hops,
        save_dir,
        debug_log,
    }
}

/// Parse the "tx" command
fn tx(invocation: &str, mut args: env::ArgsOs) -> Command {
    let hash = parse_os_string_required(args.next(), "transaction ID", invocation);

    let mut address = String::from(DEFAULT_ADDRESS);
    let mut debug_log = None;
    parse_flags(invocation, &mut args, |flag, args| {
        match flag {
            b'a' => address = parse_os_string_required(args.next(), "server address", invocation),
            b'l' => debug_log = Some(parse_os_string_required(args.next(), "debug log", invocation)),
            _ => return false,
        }
        true
    });

    Command::Tx {
        hash,
        address,
        debug_log,
    }
}

impl Command {
    /// Parse the command-line arguments
    ///
    /// If this fails, it will output a usage text to stderr and then
    /// terminate the process. It should not be called once the program
    /// is "really" running.
    pub fn from_args() -> Self {
        let mut args = env::args_os();
        // Obtain name we were called with
        let invocation = match args.next().map(OsString::into_string) {
            Some(Ok(inv)) => inv,
            Some(Err(_)) => "non-utf8-command-name".into(),
            None => "xrp-tax-tracker".into(),
        };

        // Obtain primary command
        match args.next().map(OsString::into_string) {
            Some(Ok(inv)) => {
                for (cmd, _, f) in COMMANDS {
                    if inv == *cmd {
                        return f(&invocation, args);
                    }
                }
                eprintln!("Unknown command {inv}");
                usage(&invocation);
            }
            Some(Err(inv)) => {
                eprintln!("Unknown non-UTF8 command {}", inv.to_string_lossy());
                usage(&invocation);
            }
            None => usage(&invocation),
        }
    }

    /// The name of the command, for logging
    pub fn name(&self) -> &'static str {
        match *self {
            Command::Csv { .. } => "csv",
            Command::Walk { .. } => "walk",
            Command::Tx { .. } => "tx",
        }
    }

    /// Where to write the debug log, if anywhere
    pub fn debug_log(&self) -> Option<&Path> {
        match *self {
            Command::Csv { ref debug_log, .. }
            | Command::Walk { ref debug_log, .. }
            | Command::Tx { ref debug_log, .. } => debug_log.as_deref(),
        }
    }
}

fn usage(invocation: &str) -> ! {
    eprintln!();
    eprintln!("Usage:");
    for (cmd, help, _) in COMMANDS {
        eprintln!("    {invocation} {cmd} {help}");
    }
    process::exit(1)
}

struct DashOpt(u8);
impl FromStr for DashOpt {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        if s.len() != 2 || !s.is_ascii() || s.as_bytes()[0] != b'-' {
            return Err(format!("malformed flag option {s}"));
        }
        Ok(DashOpt(s.as_bytes()[1]))
    }
}

/// Helper function to parse some string data from an OsString
fn parse_os_string<T>(iter_res: Option<OsString>, desc: &str, invocation: &str) -> Option<T>
where
    T: FromStr,
    <T as FromStr>::Err: fmt::Display,
{
    iter_res.map(|oss| match oss.into_string() {
        Ok(s) => match T::from_str(&s) {
            Ok(obj) => obj,
            Err(e) => {
                eprintln!("Unable to parse {desc}: {e}");
                usage(invocation);
            }
        },
        Err(s) => {
            eprintln!("Unable to parse non-UTF8 {desc} {}", s.to_string_lossy());
            usage(invocation);
        }
    })
}

/// Helper function to parse some string data from an OsString, exiting if
/// it is not there
fn parse_os_string_required<T>(iter_res: Option<OsString>, desc: &str, invocation: &str) -> T
where
    T: FromStr,
    <T as FromStr>::Err: fmt::Display,
{
    match parse_os_string(iter_res, desc, invocation) {
        Some(x) => x,
        None => {
            eprintln!("Missing required {desc}.");
            usage(invocation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_opt() {
        assert_eq!("-c".parse::<DashOpt>().unwrap().0, b'c');
        assert!("c".parse::<DashOpt>().is_err());
        assert!("--c".parse::<DashOpt>().is_err());
        assert!("-".parse::<DashOpt>().is_err());
    }

    #[test]
    fn command_table() {
        for (name, help, _) in COMMANDS {
            assert!(!name.is_empty());
            assert!(!help.is_empty());
        }
        assert_eq!(COMMANDS.len(), 3);
    }
}
