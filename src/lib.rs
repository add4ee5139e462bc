//! **winven** — keyboard-driven window placement for the Windows desktop.
//!
//! Windows are placed by named layouts (fractions of a monitor's work area),
//! cycled through a fixed set of 25 quick positions, tiled in a grid or a
//! master/stack arrangement, and nudged or stretched while a modifier and
//! W/A/S/D are held.  A game mode suspends all of that and can optionally
//! clear the desktop of everything but the game.
//!
//! # Architecture
//!
//! The crate is organised around three seams in [`traits`]:
//!
//! * [`traits::Desktop`] — windows, monitors and processes, so placement
//!   logic is not coupled to Win32.
//! * [`traits::HotkeyBackend`] — claims and releases system-wide hotkeys for
//!   the [`hotkey::HotkeyRegistry`].
//! * [`traits::CommandSource`] — transports that deliver [`command::Command`]s
//!   (the loopback command port in [`ipc`], continuous control in
//!   [`control`]).
//!
//! A single [`dispatcher::Dispatcher`] owns every piece of mutable state and
//! runs on the thread that pumps the OS message loop.  Concrete backends
//! live in `win32`.

pub mod catalog;
pub mod command;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod game_mode;
pub mod hotkey;
pub mod ipc;
pub mod placement;
pub mod session;
pub mod store;
pub mod traits;

#[cfg(windows)]
pub mod win32;

#[cfg(test)]
pub(crate) mod testing;
