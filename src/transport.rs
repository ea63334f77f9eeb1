//! External editor transport
//!
//! A thin channel to the companion editor process, connected over a port
//! taken from the launch arguments. Frames are newline-delimited JSON.
//!
//! ## Protocol
//!
//! Commands sent to the editor:
//! ```json
//! {"cmd": "update", "scope": null, "token": 3}
//! {"cmd": "payload", "scope": "instances", "payload": "..."}
//! ```
//!
//! Events received from the editor:
//! ```json
//! {"event": "update", "scope": null, "token": 3, "payload": "..."}
//! {"event": "show"}
//! ```
//!
//! The `scope` tag is the whole protocol discriminator: `"instances"` marks
//! an instances-only payload, anything else or absent is a full project.
//! `token` echoes the request token of the `update` command a frame answers;
//! `null` marks an unsolicited push. Sends are fire-and-forget, there is no
//! delivery acknowledgement and no automatic reconnect.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Payload scope tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    /// Whole project graph
    FullProject,
    /// One scene's placed instances only
    Instances,
}

impl UpdateScope {
    /// Wire tag for this scope (`None` = full project)
    pub fn to_tag(self) -> Option<&'static str> {
        match self {
            UpdateScope::FullProject => None,
            UpdateScope::Instances => Some("instances"),
        }
    }

    /// Parse a wire tag. Anything other than `"instances"` is a full
    /// project payload.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("instances") => UpdateScope::Instances,
            _ => UpdateScope::FullProject,
        }
    }
}

/// Command sent to the external editor
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum EditorCommand {
    /// Ask the editor to send a (scoped) update
    Update {
        scope: Option<String>,
        token: u64,
    },
    /// Push a snapshot to the editor
    Payload {
        scope: Option<String>,
        payload: String,
    },
}

/// Frame received from the external editor
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum EditorFrame {
    /// A snapshot arrived
    Update {
        #[serde(default)]
        scope: Option<String>,
        #[serde(default)]
        token: Option<u64>,
        payload: String,
    },
    /// The editor wants this window brought to the foreground
    Show,
}

/// Events surfaced to the controller
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection established
    Connected,
    /// Snapshot received
    UpdateReceived {
        payload: String,
        scope: UpdateScope,
        token: Option<u64>,
    },
    /// Bring the window to the foreground
    ShowRequested,
    /// Peer closed the connection
    Disconnected,
    /// Read or parse failure
    Error(String),
}

/// Outbound side of the editor channel
pub trait EditorTransport: Send {
    /// Request an update, optionally scoped. Fire-and-forget: the only
    /// correlation with the answer is the echoed token.
    fn request_update(&mut self, scope: UpdateScope, token: u64) -> Result<()>;

    /// Push a snapshot. No delivery acknowledgement.
    fn send_payload(&mut self, payload: &str, scope: UpdateScope) -> Result<()>;
}

/// TCP transport to the external editor
pub struct TcpTransport {
    writer: TcpStream,
}

impl TcpTransport {
    /// Whether this environment can host an editor connection at all.
    /// Must be checked before any other operation.
    pub fn is_supported() -> bool {
        // A port-based channel needs nothing beyond a socket here; the
        // capability gate is whether a server port was handed to us at
        // launch, which the caller decides.
        true
    }

    /// Connect to the editor and start the background reader.
    ///
    /// Returns the outbound handle plus the single event receiver. There
    /// is no multi-subscriber fan-out: whoever holds the receiver gets
    /// every inbound event.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(Self, Receiver<TransportEvent>)> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| BridgeError::Unreachable {
                port,
                message: e.to_string(),
            })?
            .next()
            .ok_or_else(|| BridgeError::Unreachable {
                port,
                message: format!("no address for host {}", host),
            })?;

        let stream =
            TcpStream::connect_timeout(&addr, timeout).map_err(|e| BridgeError::Unreachable {
                port,
                message: e.to_string(),
            })?;

        let reader_stream = stream.try_clone()?;
        let (tx, rx) = channel();

        let _ = tx.send(TransportEvent::Connected);

        thread::spawn(move || {
            let reader = BufReader::new(reader_stream);
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        let _ = tx.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<EditorFrame>(&line) {
                    Ok(EditorFrame::Update {
                        scope,
                        token,
                        payload,
                    }) => {
                        let scope = UpdateScope::from_tag(scope.as_deref());
                        debug!(?scope, ?token, bytes = payload.len(), "update frame");
                        let _ = tx.send(TransportEvent::UpdateReceived {
                            payload,
                            scope,
                            token,
                        });
                    }
                    Ok(EditorFrame::Show) => {
                        let _ = tx.send(TransportEvent::ShowRequested);
                    }
                    Err(e) => {
                        warn!(error = %e, "unparseable frame from editor");
                        let _ = tx.send(TransportEvent::Error(e.to_string()));
                    }
                }
            }
            let _ = tx.send(TransportEvent::Disconnected);
        });

        Ok((Self { writer: stream }, rx))
    }

    fn write_command(&mut self, command: &EditorCommand) -> Result<()> {
        let json =
            serde_json::to_string(command).map_err(|e| BridgeError::Transport(e.to_string()))?;
        writeln!(self.writer, "{}", json).map_err(|e| BridgeError::Transport(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        Ok(())
    }
}

impl EditorTransport for TcpTransport {
    fn request_update(&mut self, scope: UpdateScope, token: u64) -> Result<()> {
        self.write_command(&EditorCommand::Update {
            scope: scope.to_tag().map(str::to_string),
            token,
        })
    }

    fn send_payload(&mut self, payload: &str, scope: UpdateScope) -> Result<()> {
        self.write_command(&EditorCommand::Payload {
            scope: scope.to_tag().map(str::to_string),
            payload: payload.to_string(),
        })
    }
}
