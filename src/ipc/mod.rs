//! IPC listener that accepts commands over a loopback TCP port.
//!
//! External tools (scripts, launchers, the settings front end) can connect
//! and send newline-delimited JSON commands.

pub mod listener;
