//! Core traits that decouple winven from the host operating system and from
//! any transport mechanism.
//!
//! Every concrete backend (the Win32 desktop, the loopback command port, the
//! continuous-control thread, a test harness, …) implements one of these
//! traits.  The [`PlacementEngine`](crate::placement::PlacementEngine) and the
//! [`Dispatcher`](crate::dispatcher::Dispatcher) only depend on these
//! abstractions.

use crate::command::{Command, Point, ProcessInfo, Rect, WindowId};
use crate::hotkey::Hotkey;
use std::sync::mpsc;

/// Z-order requests understood by [`Desktop::set_z_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    /// Top of the non-topmost band.
    Top,
    /// Bottom of the stack.
    Bottom,
    /// Pin above all non-topmost windows.
    Topmost,
    /// Drop a pinned window back into the normal band.
    NoTopmost,
}

/// Audible feedback for game-mode transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Activate,
    Deactivate,
}

/// Abstraction over the desktop: windows, monitors and processes.
///
/// An implementation might talk to Win32, or it might be a recording fake
/// used in tests.  All handles are plain values; an implementation must
/// tolerate handles that went stale between calls by returning an error (or
/// `false` from [`is_window`](Desktop::is_window)).
pub trait Desktop {
    /// The error type produced by this desktop.
    type Error: std::error::Error + Send + 'static;

    //  Windows

    /// Every eligible top-level window in enumeration (z) order: visible,
    /// captioned, non-child, non-cloaked, titled, and not this process's
    /// own console.
    fn windows(&self) -> Result<Vec<WindowId>, Self::Error>;

    /// Whether `window` still refers to a live window.
    fn is_window(&self, window: WindowId) -> bool;

    fn window_title(&self, window: WindowId) -> Result<String, Self::Error>;

    fn window_class(&self, window: WindowId) -> Result<String, Self::Error>;

    /// Id of the process that owns `window`.
    fn window_process_id(&self, window: WindowId) -> Result<u32, Self::Error>;

    /// Executable file name of process `pid`, or `None` if it cannot be
    /// queried.
    fn process_name(&self, pid: u32) -> Result<Option<String>, Self::Error>;

    /// Absolute outer rectangle of `window`.
    fn window_rect(&self, window: WindowId) -> Result<Rect, Self::Error>;

    /// Move and resize `window` without changing its z-order.
    fn set_window_rect(&self, window: WindowId, rect: Rect) -> Result<(), Self::Error>;

    /// Restore `window` if it is minimized or maximized.
    fn restore(&self, window: WindowId) -> Result<(), Self::Error>;

    /// Flash the caption of `window` once.
    fn flash(&self, window: WindowId) -> Result<(), Self::Error>;

    fn foreground_window(&self) -> Result<Option<WindowId>, Self::Error>;

    /// Bring `window` to the foreground and give it focus.
    fn focus(&self, window: WindowId) -> Result<(), Self::Error>;

    fn set_z_order(&self, window: WindowId, order: ZOrder) -> Result<(), Self::Error>;

    fn is_topmost(&self, window: WindowId) -> Result<bool, Self::Error>;

    /// Current overall alpha of `window`, or `None` if it is not layered.
    fn alpha(&self, window: WindowId) -> Result<Option<u8>, Self::Error>;

    /// Make `window` layered with the given alpha, or drop the layered style
    /// again with `None`.
    fn set_alpha(&self, window: WindowId, alpha: Option<u8>) -> Result<(), Self::Error>;

    /// Politely ask `window` to close.
    fn close_window(&self, window: WindowId) -> Result<(), Self::Error>;

    //  Monitors

    /// Work area of the monitor that contains `window` (nearest monitor if
    /// it spans none).
    fn work_area_for_window(&self, window: WindowId) -> Result<Rect, Self::Error>;

    /// Work area of the monitor nearest to `point`.
    fn work_area_at(&self, point: Point) -> Result<Rect, Self::Error>;

    fn primary_work_area(&self) -> Result<Rect, Self::Error>;

    /// Work areas of every monitor, in enumeration order.
    fn monitors(&self) -> Result<Vec<Rect>, Self::Error>;

    fn cursor_position(&self) -> Result<Point, Self::Error>;

    //  Processes

    fn processes(&self) -> Result<Vec<ProcessInfo>, Self::Error>;

    fn terminate_process(&self, pid: u32) -> Result<(), Self::Error>;

    fn current_process_id(&self) -> u32;

    /// Open `path` with the shell's default handler.
    fn launch(&self, path: &str) -> Result<(), Self::Error>;

    //  Feedback

    /// Create the small always-on-top, click-through game-mode indicator.
    fn create_indicator(&self) -> Result<WindowId, Self::Error>;

    fn destroy_window(&self, window: WindowId) -> Result<(), Self::Error>;

    fn play_cue(&self, cue: Cue) -> Result<(), Self::Error>;
}

/// The OS global-hotkey facility.
///
/// Firing notifications are delivered asynchronously by the host event loop
/// as [`Command::Hotkey`]; this trait only claims and releases combinations.
pub trait HotkeyBackend {
    /// The error type produced by this backend.
    type Error: std::error::Error + Send + 'static;

    /// Claim `hotkey` system-wide under `id`.  Fails if another process
    /// already holds the combination.
    fn register(&mut self, id: i32, hotkey: Hotkey) -> Result<(), Self::Error>;

    fn unregister(&mut self, id: i32) -> Result<(), Self::Error>;
}

//  UI notifications

/// Events sent from the [`Dispatcher`](crate::dispatcher::Dispatcher) to a
/// settings front end over an [`mpsc`](std::sync::mpsc) channel.
///
/// The dispatcher never blocks on UI: it only describes what should be
/// shown, and whoever owns the receiver decides how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The settings panel was requested.
    OpenSettings,
    /// Game mode changed state.
    GameMode(bool),
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a TCP port, a keyboard hook
/// channel, an in-memory channel, …) and forward commands into the provided
/// [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each produced command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Direction};
    use std::sync::mpsc;

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    /// A test double that emits a fixed sequence of commands.
    struct MockSource {
        commands: Vec<Command>,
    }

    impl CommandSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), MockError> {
            for cmd in self.commands.drain(..) {
                let _ = sink.send(cmd);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_commands() {
        let mut src = MockSource {
            commands: vec![Command::Move(Direction::Right), Command::ApplyLayout(2)],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(cmds, vec![Command::Move(Direction::Right), Command::ApplyLayout(2)]);
    }
}
