//! Loopback TCP [`CommandSource`] implementation.
//!
//! Accepts one connection at a time.  Each line received is parsed as a
//! JSON-encoded [`Command`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"ApplyLayout":3}
//! "CyclePosition"
//! {"MoveToMonitor":"next"}
//! {"Nudge":{"dx":-15,"dy":0}}
//! "ToggleGameMode"
//! "ReloadHotkeys"
//! ```

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info};
use std::io::{BufRead, BufReader};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::mpsc;

/// A [`CommandSource`] that listens on a TCP socket for JSON-encoded
/// commands.
///
/// The socket is bound in [`bind`](Self::bind) so that a port clash is
/// reported before the listener thread starts.  Each accepted connection
/// can send multiple newline-delimited commands; when it closes, the
/// listener waits for the next one.
pub struct CommandListener {
    listener: TcpListener,
}

/// Errors produced by the command listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CommandListener {
    /// Bind to `addr`, normally a loopback address.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener })
    }

    /// The address actually bound (useful with port `0`).
    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        Ok(self.listener.local_addr()?)
    }
}

impl CommandSource for CommandListener {
    type Error = ListenerError;

    /// Start accepting connections.
    ///
    /// This method **blocks** indefinitely.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        info!("listening on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer = stream.peer_addr().ok();
                    debug!("client connected {:?}", peer);
                    let reader = BufReader::new(stream);
                    for line in reader.lines() {
                        match line {
                            Ok(ref text) if text.trim().is_empty() => continue,
                            Ok(text) => match serde_json::from_str::<Command>(&text) {
                                Ok(cmd) => {
                                    debug!("received {:?}", cmd);
                                    if sink.send(cmd).is_err() {
                                        info!("sink closed, shutting down");
                                        return Ok(());
                                    }
                                }
                                Err(e) => {
                                    error!("bad command: {}: {}", text, e);
                                }
                            },
                            Err(e) => {
                                error!("read error: {}", e);
                                break;
                            }
                        }
                    }
                    debug!("client disconnected {:?}", peer);
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
        Ok(())
    }
}

//  Tests
