//! Game mode.
//!
//! [`ProcessGuard`] is a two-state machine.  Turning it on shows a small
//! always-on-top indicator and plays a cue; turning it off removes the
//! indicator again.  With `aggressive` set, turning it on also closes
//! every other window and terminates every process that is not on a
//! fixed whitelist.  That purge cannot be undone.
//!
//! The on/off flag is an [`Arc<AtomicBool>`] so the continuous-control
//! thread can watch it through a [`GameModeToken`] without touching the
//! guard itself.

use crate::command::WindowId;
use crate::traits::{Cue, Desktop};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process names the purge never terminates (compared case-insensitively).
pub const PROCESS_WHITELIST: &[&str] = &[
    "explorer.exe",
    "svchost.exe",
    "csrss.exe",
    "wininit.exe",
    "services.exe",
    "lsass.exe",
    "winlogon.exe",
    "dwm.exe",
    "smss.exe",
    "taskhostw.exe",
    "RuntimeBroker.exe",
    "sihost.exe",
    "ctfmon.exe",
    "smartscreen.exe",
    "conhost.exe",
    "System",
    "Registry",
    "audiodg.exe",
    "spoolsv.exe",
    "dasHost.exe",
    "SearchUI.exe",
    "ShellExperienceHost.exe",
    "StandardCollector.Service.exe",
    "WmiPrvSE.exe",
    "Memory Compression",
    "ntoskrnl.exe",
    "winven.exe",
    "cmd.exe",
];

/// Window classes of the shell itself, never closed by the purge.
const SHELL_CLASSES: &[&str] = &["Shell_TrayWnd", "Progman", "WorkerW"];

pub fn is_whitelisted(name: &str) -> bool {
    PROCESS_WHITELIST
        .iter()
        .any(|w| w.eq_ignore_ascii_case(name))
}

/// Read-only view of the game-mode flag.
#[derive(Debug, Clone)]
pub struct GameModeToken(Arc<AtomicBool>);

impl GameModeToken {
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a purge did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    pub windows_closed: usize,
    pub processes_terminated: usize,
    /// Targets that refused; they are skipped, never retried.
    pub failures: usize,
}

#[derive(Debug)]
pub struct ProcessGuard {
    active: Arc<AtomicBool>,
    indicator: Option<WindowId>,
    aggressive: bool,
    sounds: bool,
}

impl ProcessGuard {
    pub fn new(aggressive: bool, sounds: bool) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            indicator: None,
            aggressive,
            sounds,
        }
    }

    pub fn token(&self) -> GameModeToken {
        GameModeToken(self.active.clone())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn indicator(&self) -> Option<WindowId> {
        self.indicator
    }

    pub fn set_sounds(&mut self, sounds: bool) {
        self.sounds = sounds;
    }

    pub fn set_aggressive(&mut self, aggressive: bool) {
        self.aggressive = aggressive;
    }

    /// Flip game mode.  Returns the new state.
    ///
    /// Indicator and cue failures are logged; the state still flips.
    pub fn toggle<D: Desktop>(&mut self, desktop: &D) -> bool {
        if self.is_active() {
            self.deactivate(desktop);
        } else {
            self.activate(desktop);
        }
        self.is_active()
    }

    fn activate<D: Desktop>(&mut self, desktop: &D) {
        self.active.store(true, Ordering::Relaxed);
        info!("game mode on");
        match self.indicator.filter(|&w| desktop.is_window(w)) {
            Some(w) => debug!("reusing indicator {}", w),
            None => match desktop.create_indicator() {
                Ok(w) => self.indicator = Some(w),
                Err(e) => {
                    warn!("could not create game-mode indicator: {}", e);
                    self.indicator = None;
                }
            },
        }
        self.cue(desktop, Cue::Activate);
        if self.aggressive {
            let report = self.purge(desktop);
            info!(
                "purge closed {} windows, terminated {} processes, {} refused",
                report.windows_closed, report.processes_terminated, report.failures
            );
        }
    }

    fn deactivate<D: Desktop>(&mut self, desktop: &D) {
        self.active.store(false, Ordering::Relaxed);
        info!("game mode off");
        if let Some(w) = self.indicator.take() {
            if let Err(e) = desktop.destroy_window(w) {
                debug!("indicator already gone: {}", e);
            }
        }
        self.cue(desktop, Cue::Deactivate);
    }

    fn cue<D: Desktop>(&self, desktop: &D, cue: Cue) {
        if self.sounds {
            if let Err(e) = desktop.play_cue(cue) {
                debug!("cue failed: {}", e);
            }
        }
    }

    /// Close every other window and terminate every non-whitelisted
    /// process.  Best-effort: each refusal is counted and skipped.
    pub fn purge<D: Desktop>(&self, desktop: &D) -> PurgeReport {
        let mut report = PurgeReport::default();
        let own_pid = desktop.current_process_id();
        let foreground = desktop.foreground_window().ok().flatten();
        let foreground_pid = foreground.and_then(|w| desktop.window_process_id(w).ok());

        for window in desktop.windows().unwrap_or_default() {
            if Some(window) == foreground || Some(window) == self.indicator {
                continue;
            }
            if desktop.window_process_id(window).ok() == Some(own_pid) {
                continue;
            }
            if let Ok(class) = desktop.window_class(window) {
                if SHELL_CLASSES.contains(&class.as_str()) {
                    continue;
                }
            }
            match desktop.close_window(window) {
                Ok(()) => report.windows_closed += 1,
                Err(e) => {
                    debug!("close {} refused: {}", window, e);
                    report.failures += 1;
                }
            }
        }

        for process in desktop.processes().unwrap_or_default() {
            if process.pid == 0 || process.pid == own_pid || Some(process.pid) == foreground_pid {
                continue;
            }
            if is_whitelisted(&process.name) {
                continue;
            }
            match desktop.terminate_process(process.pid) {
                Ok(()) => {
                    debug!("terminated {} ({})", process.name, process.pid);
                    report.processes_terminated += 1;
                }
                Err(e) => {
                    debug!("terminate {} refused: {}", process.name, e);
                    report.failures += 1;
                }
            }
        }
        report
    }
}
