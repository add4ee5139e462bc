//! Continuous key-hold control.
//!
//! While a modifier and one of W/A/S/D are held, the foreground window is
//! nudged or stretched by a small step at a steady rate:
//!
//! | Held                    | Effect                                   |
//! |-------------------------|------------------------------------------|
//! | Ctrl + A / D / W        | move left / right / up                   |
//! | Ctrl + Shift + S        | move down                                |
//! | Alt + A / D / W / S     | narrower / wider / shorter / taller      |
//! | Alt + Shift + A/D/W/S   | same, but from the left/top edge         |
//!
//! The first step fires on key-down, the next after the initial delay, and
//! then one per repeat interval.  Keys held at the same time add up.
//!
//! Input arrives as [`ControlEvent`]s from a keyboard hook.  The
//! [`HoldTracker`] is a pure state machine over those events and the clock;
//! [`ContinuousControl`] drives it on its own thread and forwards the
//! resulting [`Command`]s into the dispatcher's queue.  It never touches a
//! window itself.

use crate::command::{Command, Edge};
use crate::game_mode::GameModeToken;
use crate::hotkey::{KeyCode, Modifiers};
use crate::traits::CommandSource;
use log::{debug, trace};
use serde::Deserialize;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Raw input seen by the continuous-control thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Key { key: KeyCode, pressed: bool },
    /// The foreground window changed.  Cancels the active hold.
    FocusChanged,
}

/// Step sizes and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Pixels per move step.
    pub move_step: i32,
    /// Pixels per resize step.
    pub resize_step: i32,
    /// Interval between repeated steps, in milliseconds.
    pub repeat_ms: u64,
    /// Delay before the first repeat, in milliseconds.
    pub initial_delay_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            move_step: 15,
            resize_step: 15,
            repeat_ms: 16,
            initial_delay_ms: 150,
        }
    }
}

impl ControlConfig {
    fn repeat(&self) -> Duration {
        Duration::from_millis(self.repeat_ms.max(1))
    }

    fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

fn modifier_of(key: KeyCode) -> Option<Modifiers> {
    match key.0 {
        // VK_CONTROL, VK_LCONTROL, VK_RCONTROL
        0x11 | 0xA2 | 0xA3 => Some(Modifiers::CONTROL),
        // VK_MENU, VK_LMENU, VK_RMENU
        0x12 | 0xA4 | 0xA5 => Some(Modifiers::ALT),
        // VK_SHIFT, VK_LSHIFT, VK_RSHIFT
        0x10 | 0xA0 | 0xA1 => Some(Modifiers::SHIFT),
        _ => None,
    }
}

/// Index into [`HoldTracker::held`] for W, A, S, D.
fn wasd(key: KeyCode) -> Option<usize> {
    match key.0 {
        0x57 => Some(0),
        0x41 => Some(1),
        0x53 => Some(2),
        0x44 => Some(3),
        _ => None,
    }
}

const W: usize = 0;
const A: usize = 1;
const S: usize = 2;
const D: usize = 3;

/// Turns held keys into repeated nudge/stretch commands.
#[derive(Debug, Clone)]
pub struct HoldTracker {
    config: ControlConfig,
    modifiers: Modifiers,
    held: [bool; 4],
    active: Option<Command>,
    next_fire: Option<Instant>,
    /// Set by a focus change; cleared once every W/A/S/D key is up.
    suppressed: bool,
}

impl HoldTracker {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            modifiers: Modifiers::empty(),
            held: [false; 4],
            active: None,
            next_fire: None,
            suppressed: false,
        }
    }

    /// The command the current key state asks for, if any.
    fn intent(&self) -> Option<Command> {
        let ctrl = self.modifiers.contains(Modifiers::CONTROL);
        let alt = self.modifiers.contains(Modifiers::ALT);
        let shift = self.modifiers.contains(Modifiers::SHIFT);
        let h = &self.held;

        if ctrl && !alt {
            let s = self.config.move_step;
            let (mut dx, mut dy) = (0, 0);
            if shift {
                if h[S] {
                    dy += s;
                }
            } else {
                if h[A] {
                    dx -= s;
                }
                if h[D] {
                    dx += s;
                }
                if h[W] {
                    dy -= s;
                }
            }
            return (dx != 0 || dy != 0).then_some(Command::Nudge { dx, dy });
        }

        if alt && !ctrl {
            let s = self.config.resize_step;
            let (mut dw, mut dh) = (0, 0);
            if h[A] {
                dw -= s;
            }
            if h[D] {
                dw += s;
            }
            if h[W] {
                dh -= s;
            }
            if h[S] {
                dh += s;
            }
            let edge = if shift { Edge::Leading } else { Edge::Far };
            return (dw != 0 || dh != 0).then_some(Command::Stretch { dw, dh, edge });
        }

        None
    }

    /// Feed one input event.  Returns a command to send right away.
    pub fn on_event(&mut self, event: ControlEvent, now: Instant) -> Option<Command> {
        match event {
            ControlEvent::FocusChanged => {
                if self.active.is_some() {
                    debug!("focus changed, hold cancelled");
                    self.suppressed = true;
                }
                self.active = None;
                self.next_fire = None;
                return None;
            }
            ControlEvent::Key { key, pressed } => {
                if let Some(m) = modifier_of(key) {
                    self.modifiers.set(m, pressed);
                } else if let Some(i) = wasd(key) {
                    self.held[i] = pressed;
                } else {
                    return None;
                }
            }
        }

        if self.suppressed {
            if self.held.iter().any(|&h| h) {
                return None;
            }
            self.suppressed = false;
        }

        let intent = self.intent();
        if intent == self.active {
            // auto-repeat key-down, or a change that does not matter
            return None;
        }
        self.active = intent.clone();
        match intent {
            Some(cmd) => {
                trace!("hold {:?}", cmd);
                self.next_fire = Some(now + self.config.initial_delay());
                Some(cmd)
            }
            None => {
                self.next_fire = None;
                None
            }
        }
    }

    /// Returns the repeated command if a repeat is due at `now`.
    pub fn on_tick(&mut self, now: Instant) -> Option<Command> {
        let due = self.next_fire?;
        if now < due {
            return None;
        }
        self.next_fire = Some(now + self.config.repeat());
        self.active.clone()
    }

    /// When the next repeat is due, or `None` while idle.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_fire
    }

    /// Drop the active hold and forget every key, as if all were released.
    pub fn cancel(&mut self) {
        self.modifiers = Modifiers::empty();
        self.held = [false; 4];
        self.active = None;
        self.next_fire = None;
        self.suppressed = false;
    }
}

/// A [`CommandSource`] that turns hook events into nudge/stretch commands.
///
/// Blocks without a timeout while no hold is active and wakes at the
/// repeat interval only while one is.  Input is dropped while game mode is
/// on.  Returns once either channel disconnects.
pub struct ContinuousControl {
    events: mpsc::Receiver<ControlEvent>,
    tracker: HoldTracker,
    game_mode: GameModeToken,
}

impl ContinuousControl {
    pub fn new(
        events: mpsc::Receiver<ControlEvent>,
        config: ControlConfig,
        game_mode: GameModeToken,
    ) -> Self {
        Self {
            events,
            tracker: HoldTracker::new(config),
            game_mode,
        }
    }

    fn next_event(&self) -> Result<Option<ControlEvent>, ()> {
        match self.tracker.next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match self.events.recv_timeout(wait) {
                    Ok(event) => Ok(Some(event)),
                    Err(RecvTimeoutError::Timeout) => Ok(None),
                    Err(RecvTimeoutError::Disconnected) => Err(()),
                }
            }
            None => self.events.recv().map(Some).map_err(|_| ()),
        }
    }
}

impl CommandSource for ContinuousControl {
    type Error = std::convert::Infallible;

    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        while let Ok(event) = self.next_event() {
            if self.game_mode.is_active() {
                self.tracker.cancel();
                continue;
            }
            let now = Instant::now();
            let command = match event {
                Some(event) => self.tracker.on_event(event, now),
                None => self.tracker.on_tick(now),
            };
            if let Some(command) = command {
                if sink.send(command).is_err() {
                    break;
                }
            }
        }
        debug!("continuous control stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_mode::ProcessGuard;
    use crate::testing::FakeDesktop;

    const CTRL: KeyCode = KeyCode(0xA2);
    const ALT: KeyCode = KeyCode(0xA4);
    const SHIFT: KeyCode = KeyCode(0xA0);
    const KEY_W: KeyCode = KeyCode(0x57);
    const KEY_A: KeyCode = KeyCode(0x41);
    const KEY_S: KeyCode = KeyCode(0x53);
    const KEY_D: KeyCode = KeyCode(0x44);

    fn down(key: KeyCode) -> ControlEvent {
        ControlEvent::Key { key, pressed: true }
    }

    fn up(key: KeyCode) -> ControlEvent {
        ControlEvent::Key {
            key,
            pressed: false,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn ctrl_a_fires_immediately_then_repeats() {
        let t0 = Instant::now();
        let mut t = HoldTracker::new(ControlConfig::default());
        assert_eq!(t.on_event(down(CTRL), t0), None);
        assert_eq!(t.on_event(down(KEY_A), t0), Some(Command::Nudge { dx: -15, dy: 0 }));
        assert_eq!(t.next_deadline(), Some(t0 + ms(150)));

        assert_eq!(t.on_tick(t0 + ms(100)), None);
        assert_eq!(t.on_tick(t0 + ms(150)), Some(Command::Nudge { dx: -15, dy: 0 }));
        assert_eq!(t.next_deadline(), Some(t0 + ms(166)));

        // OS auto-repeat key-downs do not fire extra steps
        assert_eq!(t.on_event(down(KEY_A), t0 + ms(160)), None);

        assert_eq!(t.on_event(up(KEY_A), t0 + ms(170)), None);
        assert_eq!(t.next_deadline(), None);
    }

    #[test]
    fn held_keys_add_up() {
        let t0 = Instant::now();
        let mut t = HoldTracker::new(ControlConfig::default());
        t.on_event(down(CTRL), t0);
        t.on_event(down(KEY_D), t0);
        assert_eq!(
            t.on_event(down(KEY_W), t0),
            Some(Command::Nudge { dx: 15, dy: -15 })
        );
    }

    #[test]
    fn moving_down_needs_shift() {
        let t0 = Instant::now();
        let mut t = HoldTracker::new(ControlConfig::default());
        t.on_event(down(CTRL), t0);
        assert_eq!(t.on_event(down(KEY_S), t0), None);
        assert_eq!(
            t.on_event(down(SHIFT), t0),
            Some(Command::Nudge { dx: 0, dy: 15 })
        );
    }

    #[test]
    fn alt_stretches_from_far_or_leading_edge() {
        let t0 = Instant::now();
        let mut t = HoldTracker::new(ControlConfig::default());
        t.on_event(down(ALT), t0);
        assert_eq!(
            t.on_event(down(KEY_D), t0),
            Some(Command::Stretch { dw: 15, dh: 0, edge: Edge::Far })
        );
        assert_eq!(
            t.on_event(down(SHIFT), t0),
            Some(Command::Stretch { dw: 15, dh: 0, edge: Edge::Leading })
        );
        t.on_event(up(KEY_D), t0);
        assert_eq!(
            t.on_event(down(KEY_S), t0),
            Some(Command::Stretch { dw: 0, dh: 15, edge: Edge::Leading })
        );
    }

    #[test]
    fn ctrl_alt_together_does_nothing() {
        let t0 = Instant::now();
        let mut t = HoldTracker::new(ControlConfig::default());
        t.on_event(down(CTRL), t0);
        t.on_event(down(ALT), t0);
        assert_eq!(t.on_event(down(KEY_A), t0), None);
        assert_eq!(t.next_deadline(), None);
    }

    #[test]
    fn focus_change_suppresses_until_release() {
        let t0 = Instant::now();
        let mut t = HoldTracker::new(ControlConfig::default());
        t.on_event(down(CTRL), t0);
        assert!(t.on_event(down(KEY_A), t0).is_some());
        t.on_event(ControlEvent::FocusChanged, t0 + ms(10));
        assert_eq!(t.on_tick(t0 + ms(500)), None);
        assert_eq!(t.on_event(down(KEY_D), t0 + ms(510)), None);
        t.on_event(up(KEY_A), t0 + ms(520));
        t.on_event(up(KEY_D), t0 + ms(530));
        assert_eq!(
            t.on_event(down(KEY_A), t0 + ms(540)),
            Some(Command::Nudge { dx: -15, dy: 0 })
        );
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let t0 = Instant::now();
        let mut t = HoldTracker::new(ControlConfig::default());
        t.on_event(down(CTRL), t0);
        assert_eq!(t.on_event(down(KeyCode(0x43)), t0), None);
    }

    #[test]
    fn source_forwards_commands_and_respects_game_mode() {
        let (event_tx, event_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let desktop = FakeDesktop::single_monitor();
        let mut guard = ProcessGuard::new(false, false);
        let config = ControlConfig {
            initial_delay_ms: 60_000,
            ..ControlConfig::default()
        };
        let mut control = ContinuousControl::new(event_rx, config, guard.token());

        event_tx.send(down(CTRL)).unwrap();
        event_tx.send(down(KEY_A)).unwrap();
        event_tx.send(up(KEY_A)).unwrap();
        let handle = std::thread::spawn(move || control.run(cmd_tx));

        let first = cmd_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, Command::Nudge { dx: -15, dy: 0 });

        guard.toggle(&desktop);
        event_tx.send(down(KEY_D)).unwrap();
        drop(event_tx);
        handle.join().unwrap().unwrap();
        assert!(cmd_rx.try_recv().is_err());
    }
}
