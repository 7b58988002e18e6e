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

//! Ledger Server Connection
//!
//! Talks to a rippled server over its websocket API. We only ever make one
//! request at a time and wait for its reply, so there is no need to match
//! up request IDs.
//!

use crate::ledger::{Account, TxHash};
use anyhow::Context as _;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::TcpStream;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;

/// Public server used if none is given on the command line
pub const DEFAULT_ADDRESS: &str = "s2.ripple.com:443";

/// Something which can carry requests to a ledger server and bring back replies
pub trait Transport {
    /// Sends a single request
    fn send(&mut self, msg: &str) -> anyhow::Result<()>;
    /// Blocks until the next reply arrives
    fn receive(&mut self) -> anyhow::Result<String>;
}

/// A websocket connection to a ledger server
pub struct WebSocket {
    url: String,
    sock: tungstenite::WebSocket<MaybeTlsStream<TcpStream>>,
}

impl WebSocket {
    /// Connects to the given server
    ///
    /// If `address` has no scheme, `wss://` is assumed.
    pub fn connect(address: &str) -> anyhow::Result<Self> {
        let url = if address.contains("://") {
            address.to_owned()
        } else {
            format!("wss://{address}")
        };
        info!("Connecting to {}", url);
        let (sock, _) = tungstenite::client::connect(url.as_str())
            .with_context(|| format!("connecting to {url}"))?;
        Ok(WebSocket { url, sock })
    }
}

impl Transport for WebSocket {
    fn send(&mut self, msg: &str) -> anyhow::Result<()> {
        debug!("Sending to {}: {}", self.url, msg);
        self.sock
            .write_message(Message::Text(msg.to_owned()))
            .with_context(|| format!("sending request to {}", self.url))
    }

    fn receive(&mut self) -> anyhow::Result<String> {
        loop {
            let msg = self
                .sock
                .read_message()
                .with_context(|| format!("reading reply from {}", self.url))?;
            match msg {
                Message::Text(text) => return Ok(text),
                Message::Binary(data) => {
                    return String::from_utf8(data)
                        .with_context(|| format!("decoding binary reply from {}", self.url));
                }
                Message::Ping(..) | Message::Pong(..) | Message::Frame(..) => {}
                Message::Close(frame) => {
                    return Err(anyhow::Error::msg(format!(
                        "{} closed the connection ({frame:?})",
                        self.url,
                    )));
                }
            }
        }
    }
}

impl Drop for WebSocket {
    fn drop(&mut self) {
        if let Err(e) = self.sock.close(None) {
            debug!("Failed to cleanly close connection to {}: {}", self.url, e);
        }
    }
}

/// An error reported by the server itself
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ProtocolError {
    pub error: String,
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "server returned error {}", self.error)?;
        if let Some(ref msg) = self.message {
            write!(f, " ({msg})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

/// The error fields of a reply, which may appear at the top level or inside
/// `result` depending on the server version
#[derive(Deserialize, Default)]
struct ErrorFields {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl ErrorFields {
    fn check(self) -> Result<(), ProtocolError> {
        match self.error {
            Some(error) => Err(ProtocolError {
                error,
                message: self.error_message,
            }),
            None if self.status.as_deref() == Some("error") => Err(ProtocolError {
                error: "unknown".into(),
                message: self.error_message,
            }),
            None => Ok(()),
        }
    }
}

/// Checks a raw reply for errors
fn check_reply(reply: &serde_json::Value) -> Result<(), ProtocolError> {
    // The more specific error is inside `result`, when there is one
    if let Some(result) = reply.get("result") {
        ErrorFields::deserialize(result).unwrap_or_default().check()?;
    }
    ErrorFields::deserialize(reply).unwrap_or_default().check()
}

/// Sends a request and waits for its reply, failing on any server error
fn request<R: Serialize>(
    transport: &mut dyn Transport,
    req: &R,
) -> anyhow::Result<serde_json::Value> {
    let msg = serde_json::to_string(req).context("encoding request")?;
    transport.send(&msg)?;
    let reply = transport.receive()?;
    let value: serde_json::Value =
        serde_json::from_str(&reply).with_context(|| format!("parsing reply {reply}"))?;
    check_reply(&value).with_context(|| format!("request {msg}"))?;
    Ok(value)
}

#[derive(Serialize)]
struct AccountInfoRequest {
    command: &'static str,
    account: String,
    strict: bool,
    ledger_index: &'static str,
    queue: bool,
}

#[derive(Serialize)]
struct TxRequest {
    command: &'static str,
    transaction: String,
    binary: bool,
}

#[derive(Deserialize)]
struct AccountInfoReply {
    result: AccountInfoResult,
}

#[derive(Deserialize)]
struct AccountInfoResult {
    account_data: AccountData,
}

#[derive(Deserialize)]
struct AccountData {
    #[serde(rename = "PreviousTxnID", default)]
    previous_txn_id: Option<TxHash>,
}

/// Asks the server for the most recent transaction to touch an account
///
/// Returns `None` for an account with no transactions, which should not
/// happen for any account which exists.
pub fn latest_transaction(
    transport: &mut dyn Transport,
    account: &Account,
) -> anyhow::Result<Option<TxHash>> {
    let reply = request(
        transport,
        &AccountInfoRequest {
            command: "account_info",
            account: account.to_string(),
            strict: true,
            ledger_index: "current",
            queue: true,
        },
    )
    .with_context(|| format!("looking up account {account}"))?;
    let info = AccountInfoReply::deserialize(&reply)
        .with_context(|| format!("parsing account_info reply for {account}"))?;
    if info.result.account_data.previous_txn_id.is_none() {
        warn!("Account {} has no PreviousTxnID.", account);
    }
    Ok(info.result.account_data.previous_txn_id)
}

/// Fetches a single transaction, with its metadata, as raw JSON
pub fn fetch_transaction(
    transport: &mut dyn Transport,
    hash: &TxHash,
) -> anyhow::Result<serde_json::Value> {
    request(
        transport,
        &TxRequest {
            command: "tx",
            transaction: hash.to_string(),
            binary: false,
        },
    )
    .with_context(|| format!("fetching transaction {hash}"))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::ledger::tests::{ACCOUNT, HASH, PREV_HASH};
    use std::collections::VecDeque;

    /// A transport which replays canned replies and records what was sent
    #[derive(Default)]
    pub struct Scripted {
        pub sent: Vec<String>,
        pub replies: VecDeque<String>,
    }

    impl Scripted {
        pub fn new<I: IntoIterator<Item = String>>(replies: I) -> Self {
            Scripted {
                sent: vec![],
                replies: replies.into_iter().collect(),
            }
        }
    }

    impl Transport for Scripted {
        fn send(&mut self, msg: &str) -> anyhow::Result<()> {
            self.sent.push(msg.to_owned());
            Ok(())
        }

        fn receive(&mut self) -> anyhow::Result<String> {
            self.replies
                .pop_front()
                .ok_or_else(|| anyhow::Error::msg("connection closed"))
        }
    }

    #[test]
    fn account_info() {
        let mut transport = Scripted::new(vec![format!(
            r#"{{"result":{{"account_data":{{"Account":"{ACCOUNT}","Balance":"100","PreviousTxnID":"{PREV_HASH}"}},"validated":false}},"status":"success","type":"response"}}"#
        )]);
        let latest = latest_transaction(&mut transport, &ACCOUNT.parse().unwrap()).unwrap();
        assert_eq!(latest.unwrap().as_str(), PREV_HASH);

        let sent: serde_json::Value = serde_json::from_str(&transport.sent[0]).unwrap();
        assert_eq!(sent["command"], "account_info");
        assert_eq!(sent["account"], ACCOUNT);
        assert_eq!(sent["strict"], true);
        assert_eq!(sent["ledger_index"], "current");
        assert_eq!(sent["queue"], true);
    }

    #[test]
    fn tx_request() {
        let mut transport = Scripted::new(vec![format!(
            r#"{{"result":{{"hash":"{HASH}"}},"status":"success","type":"response"}}"#
        )]);
        let reply = fetch_transaction(&mut transport, &HASH.parse().unwrap()).unwrap();
        assert_eq!(reply["result"]["hash"], HASH);

        let sent: serde_json::Value = serde_json::from_str(&transport.sent[0]).unwrap();
        assert_eq!(sent["command"], "tx");
        assert_eq!(sent["transaction"], HASH);
        assert_eq!(sent["binary"], false);
    }

    #[test]
    fn server_errors() {
        let mut transport = Scripted::new(vec![
            r#"{"error":"txnNotFound","error_message":"Transaction not found.","status":"error","type":"response"}"#.to_owned(),
            r#"{"result":{"error":"actNotFound","status":"error"},"status":"error","type":"response"}"#.to_owned(),
            r#"{"status":"error","type":"response"}"#.to_owned(),
            "not json".to_owned(),
        ]);
        let hash: TxHash = HASH.parse().unwrap();
        for expected in ["txnNotFound", "actNotFound", "unknown"] {
            let err = fetch_transaction(&mut transport, &hash).unwrap_err();
            let proto = err.downcast_ref::<ProtocolError>().unwrap();
            assert_eq!(proto.error, expected);
        }
        assert!(fetch_transaction(&mut transport, &hash).is_err());
        // Nothing left to receive
        assert!(fetch_transaction(&mut transport, &hash).is_err());
    }
}
