//! Commands and types used throughout winven.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes every action the dispatcher can perform, and
//! [`Direction`] / [`Step`] / [`Rect`] / [`WindowId`] provide the supporting
//! data types.
//!
//! Commands arrive from three places: fired global hotkeys (as
//! [`Command::Hotkey`]), the continuous-control thread, and the loopback
//! command port.  Direction and step strings are parsed case-insensitively
//! ("left", "Left", "LEFT"; "next", "prev", "forward", "back").

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Cardinal direction for nudging and resizing the active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Lower-case a token and drop whitespace and underscores so that
/// `"Move_Left"`, `"move left"` and `"MOVELEFT"` compare equal.
fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Parse a direction string (case-insensitive).
fn parse_direction(s: &str) -> Option<Direction> {
    match normalize(s).as_str() {
        "left" => Some(Direction::Left),
        "right" => Some(Direction::Right),
        "up" => Some(Direction::Up),
        "down" => Some(Direction::Down),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_direction(&s).ok_or_else(|| DeError::custom(format!("invalid direction: {:?}", s)))
    }
}

/// Forward/backward step through a cyclic list (layouts, monitors, windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Step {
    Next,
    Previous,
}

impl Step {
    /// Advance `index` by one step within `0..len`, wrapping at both ends.
    ///
    /// `len` must be non-zero.
    pub fn wrap(self, index: usize, len: usize) -> usize {
        match self {
            Step::Next => (index + 1) % len,
            Step::Previous => (index + len - 1) % len,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Next => write!(f, "next"),
            Step::Previous => write!(f, "previous"),
        }
    }
}

fn parse_step(s: &str) -> Option<Step> {
    match normalize(s).as_str() {
        "next" | "forward" | "fwd" => Some(Step::Next),
        "previous" | "prev" | "back" | "backward" => Some(Step::Previous),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_step(&s).ok_or_else(|| DeError::custom(format!("invalid step: {:?}", s)))
    }
}

/// Which edge a continuous resize moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Edge {
    /// Right/bottom edge moves, left/top stays put.
    #[default]
    Far,
    /// Left/top edge moves, right/bottom stays put.
    Leading,
}

//  Geometry

/// Opaque handle to a top-level OS window.
///
/// Handles are "stable for now": they stay valid while the window is open
/// and may be recycled by the OS once it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub isize);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A screen point in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// An absolute screen rectangle in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from Win32-style edges.
    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2,
            y: self.y + self.height / 2,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}

/// One running OS process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Executable file name, e.g. `notepad.exe`.
    pub name: String,
}

//  Commands

/// A command that the [`Dispatcher`](crate::dispatcher::Dispatcher) can
/// execute.
///
/// Window commands act on the current foreground window and are ignored
/// while game mode is active; see [`Command::is_window_action`].
///
/// # Wire format
///
/// Newline-delimited JSON, externally tagged:
///
/// ```json
/// {"ApplyLayout":3}
/// "CyclePosition"
/// {"MoveToMonitor":"next"}
/// {"Nudge":{"dx":-15,"dy":0}}
/// {"AddLayout":{"name":"Focus","x":0.2,"y":0.1,"width":0.6,"height":0.8,"key":"F"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// An OS global hotkey with this id fired.
    Hotkey(i32),

    //  Placement
    /// Apply user layout `n` to the foreground window.
    ApplyLayout(usize),
    /// Advance the foreground window through the 25 quick positions.
    CyclePosition,
    /// Step the foreground window one quick position backwards.
    RestorePreviousPosition,
    /// Apply the next/previous user layout (one cursor shared by all windows).
    CycleLayout(Step),
    /// Tile every eligible window on the foreground window's monitor.
    TileAll,
    /// Arrange every eligible window on the monitor under the cursor,
    /// flashing each one.
    ArrangeNoOverlap,
    /// 60 % master pane plus a vertical stack.
    TileMasterStack,
    /// Move the foreground window to the next/previous monitor, keeping its
    /// relative placement.
    MoveToMonitor(Step),
    /// Fixed-step move.
    Move(Direction),
    /// Fixed-step resize.
    Resize(Direction),
    /// Unanimated move by a delta, kept partly on screen.
    Nudge { dx: i32, dy: i32 },
    /// Unanimated resize by a delta from one edge.
    Stretch {
        dw: i32,
        dh: i32,
        #[serde(default)]
        edge: Edge,
    },
    /// Center the foreground window at 80 % of its work area.
    CenterWindow,

    //  Window utilities
    SwitchFocus(Step),
    BringToFront,
    SendToBack,
    /// Ask the foreground window to close.
    SafeClose,
    ToggleTransparency,
    ToggleAlwaysOnTop,
    /// Launch app shortcut `n`.
    LaunchApp(usize),

    //  System
    ToggleGameMode,
    /// Shared game-mode/settings hotkey: toggles game mode and requests the
    /// settings panel when that turns game mode off.
    GameModeOrSettings,
    OpenSettings,
    SaveSession,
    RestoreSession,

    //  Catalog
    AddLayout {
        name: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        /// Key name bound with Ctrl+Alt, e.g. `"5"` or `"F"`.
        #[serde(default)]
        key: Option<String>,
    },
    RemoveLayout(usize),
    AddApp {
        name: String,
        path: String,
        /// Full hotkey string, e.g. `"Ctrl+Shift+N"`.
        #[serde(default)]
        hotkey: Option<String>,
    },
    RemoveApp(usize),
    /// Add a process-name substring to the exclusion list.
    AddExclusion(String),
    /// Re-read the catalog file and re-register layout/app hotkeys.
    ReloadHotkeys,

    /// Stop the daemon.
    Quit,
}

impl Command {
    /// Whether this command touches windows and is therefore suppressed
    /// while game mode is active.
    pub fn is_window_action(&self) -> bool {
        matches!(
            self,
            Command::ApplyLayout(_)
                | Command::CyclePosition
                | Command::RestorePreviousPosition
                | Command::CycleLayout(_)
                | Command::TileAll
                | Command::ArrangeNoOverlap
                | Command::TileMasterStack
                | Command::MoveToMonitor(_)
                | Command::Move(_)
                | Command::Resize(_)
                | Command::Nudge { .. }
                | Command::Stretch { .. }
                | Command::CenterWindow
                | Command::SwitchFocus(_)
                | Command::BringToFront
                | Command::SendToBack
                | Command::SafeClose
                | Command::ToggleTransparency
                | Command::ToggleAlwaysOnTop
                | Command::LaunchApp(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_directions_case_insensitive() {
        for (s, d) in [
            ("\"left\"", Direction::Left),
            ("\"Right\"", Direction::Right),
            ("\"UP\"", Direction::Up),
            ("\" down \"", Direction::Down),
        ] {
            let got: Direction = serde_json::from_str(s).unwrap();
            assert_eq!(got, d, "{}", s);
        }
    }

    #[test]
    fn reject_unknown_direction() {
        assert!(serde_json::from_str::<Direction>("\"upleft\"").is_err());
    }

    #[test]
    fn step_aliases() {
        let s: Step = serde_json::from_str("\"forward\"").unwrap();
        assert_eq!(s, Step::Next);
        let s: Step = serde_json::from_str("\"Prev\"").unwrap();
        assert_eq!(s, Step::Previous);
    }

    #[test]
    fn step_wraps_both_ends() {
        assert_eq!(Step::Next.wrap(2, 3), 0);
        assert_eq!(Step::Previous.wrap(0, 3), 2);
        assert_eq!(Step::Next.wrap(0, 1), 0);
    }

    #[test]
    fn deserialize_commands() {
        let cmd: Command = serde_json::from_str(r#"{"ApplyLayout":3}"#).unwrap();
        assert_eq!(cmd, Command::ApplyLayout(3));

        let cmd: Command = serde_json::from_str(r#""CyclePosition""#).unwrap();
        assert_eq!(cmd, Command::CyclePosition);

        let cmd: Command = serde_json::from_str(r#"{"MoveToMonitor":"prev"}"#).unwrap();
        assert_eq!(cmd, Command::MoveToMonitor(Step::Previous));

        let cmd: Command = serde_json::from_str(r#"{"Stretch":{"dw":15,"dh":0}}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Stretch {
                dw: 15,
                dh: 0,
                edge: Edge::Far
            }
        );
    }

    #[test]
    fn add_layout_key_is_optional() {
        let cmd: Command = serde_json::from_str(
            r#"{"AddLayout":{"name":"Focus","x":0.2,"y":0.1,"width":0.6,"height":0.8}}"#,
        )
        .unwrap();
        match cmd {
            Command::AddLayout { name, key, .. } => {
                assert_eq!(name, "Focus");
                assert_eq!(key, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn window_actions_are_classified() {
        assert!(Command::TileAll.is_window_action());
        assert!(Command::Nudge { dx: 1, dy: 0 }.is_window_action());
        assert!(!Command::ToggleGameMode.is_window_action());
        assert!(!Command::OpenSettings.is_window_action());
        assert!(!Command::Hotkey(100).is_window_action());
        assert!(!Command::SaveSession.is_window_action());
    }

    #[test]
    fn rect_edges() {
        let r = Rect::from_edges(10, 20, 110, 70);
        assert_eq!(r, Rect::new(10, 20, 100, 50));
        assert_eq!(r.right(), 110);
        assert_eq!(r.bottom(), 70);
        assert!(r.contains(Point { x: 10, y: 20 }));
        assert!(!r.contains(Point { x: 110, y: 20 }));
        assert_eq!(r.center(), Point { x: 60, y: 45 });
    }
}
