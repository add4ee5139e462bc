//! The orchestrator that ties the engine, hotkeys, game mode and sessions
//! together.
//!
//! [`Dispatcher`] owns every piece of mutable engine state and reacts to
//! [`Command`]s.  It lives on the thread that runs the OS message loop;
//! every other thread (command port, continuous control) only sends
//! commands into its queue.
//!
//! Fired hotkeys arrive as [`Command::Hotkey`].  The registry's callbacks do
//! not act directly: each one pushes the [`Command`] it stands for back into
//! the same queue, so hotkeys, the command port and continuous control all
//! take one path through [`Dispatcher::handle`].

use crate::catalog::{AppShortcut, CatalogError, Layout};
use crate::command::{Command, Step, WindowId};
use crate::config::HotkeyConfig;
use crate::game_mode::{GameModeToken, ProcessGuard};
use crate::hotkey::{
    ids, ActionError, DispatchOutcome, Hotkey, HotkeyParseError, HotkeyRegistry, KeyCode,
    Modifiers,
};
use crate::placement::{EngineError, PlacementEngine};
use crate::session::{SessionError, SessionStore};
use crate::store::{CatalogFile, Settings, StoreError};
use crate::traits::{Desktop, HotkeyBackend, UiEvent};
use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc;

/// Possible errors from handling a command.  None of them is fatal.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("catalog file: {0}")]
    Store(#[from] StoreError),
    #[error("session file: {0}")]
    Session(#[from] SessionError),
    #[error(transparent)]
    Hotkey(#[from] HotkeyParseError),
}

/// Everything the dispatcher needs besides its backends.
#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    pub catalog_path: PathBuf,
    pub session_path: PathBuf,
    pub settings: Settings,
    pub hotkeys: HotkeyConfig,
    /// Purge windows and processes when game mode turns on.
    pub aggressive: bool,
}

/// The built-in bindings that do not depend on configuration.
pub fn fixed_bindings() -> Vec<(i32, Hotkey, Command)> {
    let ctrl_alt = Modifiers::CTRL_ALT;
    let ctrl_shift = Modifiers::CONTROL | Modifiers::SHIFT;
    let digit = |c: char| KeyCode(c as u32);
    vec![
        (ids::FOCUS_PREVIOUS, Hotkey::new(ctrl_alt, KeyCode::LEFT), Command::SwitchFocus(Step::Previous)),
        (ids::FOCUS_NEXT, Hotkey::new(ctrl_alt, KeyCode::RIGHT), Command::SwitchFocus(Step::Next)),
        (ids::BRING_TO_FRONT, Hotkey::new(ctrl_alt, KeyCode::UP), Command::BringToFront),
        (ids::SEND_TO_BACK, Hotkey::new(ctrl_alt, KeyCode::DOWN), Command::SendToBack),
        (ids::CYCLE_POSITION, Hotkey::new(ctrl_alt, digit('1')), Command::CyclePosition),
        (ids::RESTORE_PREVIOUS, Hotkey::new(ctrl_alt, digit('2')), Command::RestorePreviousPosition),
        (ids::ARRANGE_NO_OVERLAP, Hotkey::new(ctrl_alt, digit('3')), Command::ArrangeNoOverlap),
        (ids::SAFE_CLOSE, Hotkey::new(ctrl_shift, digit('D')), Command::SafeClose),
        (ids::TOGGLE_TRANSPARENCY, Hotkey::new(ctrl_shift, digit('T')), Command::ToggleTransparency),
    ]
}

/// Orchestrates hotkeys, placement, game mode and sessions.
///
/// The dispatcher is generic over the [`Desktop`] and [`HotkeyBackend`], so
/// it runs unchanged against Win32 or against test doubles.
pub struct Dispatcher<D: Desktop, B: HotkeyBackend> {
    engine: PlacementEngine<D>,
    registry: HotkeyRegistry<B>,
    guard: ProcessGuard,
    session: SessionStore,
    catalog_path: PathBuf,
    settings: Settings,
    hotkeys: HotkeyConfig,
    queue: mpsc::Sender<Command>,
    ui_tx: Option<mpsc::Sender<UiEvent>>,
}

impl<D: Desktop, B: HotkeyBackend> Dispatcher<D, B> {
    /// Create a dispatcher.  `queue` is the sending half of the channel
    /// whose receiver feeds [`process`](Self::process).
    pub fn new(
        mut engine: PlacementEngine<D>,
        backend: B,
        queue: mpsc::Sender<Command>,
        options: DispatcherOptions,
    ) -> Self {
        engine.apply_settings(&options.settings);
        Self {
            engine,
            registry: HotkeyRegistry::new(backend),
            guard: ProcessGuard::new(options.aggressive, options.settings.sounds),
            session: SessionStore::new(options.session_path),
            catalog_path: options.catalog_path,
            settings: options.settings,
            hotkeys: options.hotkeys,
            queue,
            ui_tx: None,
        }
    }

    /// Attach a settings front-end channel.
    pub fn set_ui(&mut self, tx: mpsc::Sender<UiEvent>) {
        self.ui_tx = Some(tx);
    }

    pub fn engine(&self) -> &PlacementEngine<D> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlacementEngine<D> {
        &mut self.engine
    }

    pub fn registry(&self) -> &HotkeyRegistry<B> {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn game_mode(&self) -> GameModeToken {
        self.guard.token()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    //  Hotkeys

    fn bind(&mut self, id: i32, hotkey: Hotkey, command: Command) -> bool {
        let tx = self.queue.clone();
        let result = self.registry.register(id, hotkey, move |_| -> Result<(), ActionError> {
            tx.send(command.clone())
                .map_err(|_| "command queue closed".into())
        });
        match result {
            Ok(()) => {
                info!("hotkey {} bound to id {}", hotkey, id);
                true
            }
            Err(e) => {
                warn!("hotkey id {} not bound: {}", id, e);
                false
            }
        }
    }

    fn bind_str(&mut self, id: i32, hotkey: &str, command: Command) -> bool {
        match hotkey.parse::<Hotkey>() {
            Ok(hotkey) => self.bind(id, hotkey, command),
            Err(e) => {
                warn!("hotkey id {} not bound: {:?}: {}", id, hotkey, e);
                false
            }
        }
    }

    /// Register the fixed, system and dynamic hotkeys.  A binding that fails
    /// is logged and skipped.  Returns how many were bound.
    pub fn register_hotkeys(&mut self) -> usize {
        let mut bound = 0;
        for (id, hotkey, command) in fixed_bindings() {
            bound += self.bind(id, hotkey, command) as usize;
        }
        bound += self.register_system_hotkeys();
        bound += self.register_dynamic_hotkeys();
        info!("{} hotkeys registered", bound);
        bound
    }

    fn register_system_hotkeys(&mut self) -> usize {
        let panel = self.hotkeys.config_panel.clone();
        let game = self.hotkeys.game_mode.clone();
        let shared = match (panel.parse::<Hotkey>(), game.parse::<Hotkey>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => panel.trim().eq_ignore_ascii_case(game.trim()),
        };
        if shared {
            debug!("settings and game mode share {}", game);
            return self.bind_str(ids::GAME_MODE, &game, Command::GameModeOrSettings) as usize;
        }
        self.bind_str(ids::OPEN_SETTINGS, &panel, Command::OpenSettings) as usize
            + self.bind_str(ids::GAME_MODE, &game, Command::ToggleGameMode) as usize
    }

    /// Bind every layout and app shortcut that has a key: layouts with
    /// Ctrl+Alt, apps with their own modifiers.
    fn register_dynamic_hotkeys(&mut self) -> usize {
        let mut wanted = Vec::new();
        for (i, layout) in self.engine.catalog().layouts().iter().enumerate() {
            if let (Some(key), Some(id)) = (layout.hotkey, ids::layout(i)) {
                wanted.push((id, Hotkey::new(Modifiers::CTRL_ALT, key), Command::ApplyLayout(i)));
            }
        }
        for (i, app) in self.engine.catalog().apps().iter().enumerate() {
            if let (Some(key), Some(id)) = (app.hotkey, ids::app(i)) {
                wanted.push((id, Hotkey::new(app.modifiers, key), Command::LaunchApp(i)));
            }
        }
        wanted
            .into_iter()
            .map(|(id, hotkey, command)| self.bind(id, hotkey, command) as usize)
            .sum()
    }

    fn rebind_dynamic_hotkeys(&mut self) {
        let released = self.registry.unregister_where(ids::is_dynamic);
        let bound = self.register_dynamic_hotkeys();
        info!("dynamic hotkeys: {} released, {} bound", released, bound);
    }

    //  Commands

    /// Handle `cmd`, logging any failure or panic.  Returns `false` once
    /// [`Command::Quit`] has been seen.
    pub fn process(&mut self, cmd: Command) -> bool {
        if cmd == Command::Quit {
            info!("quit requested");
            return false;
        }
        let shown = format!("{:?}", cmd);
        match panic::catch_unwind(AssertUnwindSafe(|| self.handle(cmd))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("{} failed: {}", shown, e),
            Err(_) => error!("{} panicked", shown),
        }
        true
    }

    /// Process a single [`Command`].
    ///
    /// Window actions are dropped while game mode is on.  Errors leave
    /// whatever part of the action already happened in place.
    pub fn handle(&mut self, cmd: Command) -> Result<(), DispatchError> {
        if self.guard.is_active() && cmd.is_window_action() {
            debug!("game mode on, ignoring {:?}", cmd);
            return Ok(());
        }
        match cmd {
            Command::Hotkey(id) => match self.registry.dispatch(id) {
                DispatchOutcome::Handled => {}
                DispatchOutcome::Unknown => warn!("hotkey id {} is not bound", id),
                other => debug!("hotkey {} -> {:?}", id, other),
            },

            //  Placement
            Command::ApplyLayout(index) => {
                if let Some(w) = self.foreground()? {
                    self.engine.apply_layout(w, index)?;
                }
            }
            Command::CyclePosition => {
                if let Some(w) = self.foreground()? {
                    self.engine.cycle_position(w)?;
                }
            }
            Command::RestorePreviousPosition => {
                if let Some(w) = self.foreground()? {
                    self.engine.restore_previous(w)?;
                }
            }
            Command::CycleLayout(step) => {
                if let Some(w) = self.foreground()? {
                    self.engine.cycle_layout(w, step)?;
                }
            }
            Command::TileAll => {
                self.engine.tile_all()?;
            }
            Command::ArrangeNoOverlap => {
                self.engine.arrange_no_overlap()?;
            }
            Command::TileMasterStack => {
                self.engine.tile_master_stack()?;
            }
            Command::MoveToMonitor(step) => {
                if let Some(w) = self.foreground()? {
                    self.engine.move_to_monitor(w, step)?;
                }
            }
            Command::Move(dir) => {
                if let Some(w) = self.foreground()? {
                    self.engine.move_window(w, dir)?;
                }
            }
            Command::Resize(dir) => {
                if let Some(w) = self.foreground()? {
                    self.engine.resize_window(w, dir)?;
                }
            }
            Command::Nudge { dx, dy } => {
                if let Some(w) = self.foreground()? {
                    self.engine.nudge(w, dx, dy)?;
                }
            }
            Command::Stretch { dw, dh, edge } => {
                if let Some(w) = self.foreground()? {
                    self.engine.stretch(w, dw, dh, edge)?;
                }
            }
            Command::CenterWindow => {
                if let Some(w) = self.foreground()? {
                    self.engine.center_window(w)?;
                }
            }

            //  Window utilities
            Command::SwitchFocus(step) => {
                self.engine.switch_focus(step)?;
            }
            Command::BringToFront => {
                if let Some(w) = self.foreground()? {
                    self.engine.bring_to_front(w)?;
                }
            }
            Command::SendToBack => {
                if let Some(w) = self.foreground()? {
                    self.engine.send_to_back(w)?;
                }
            }
            Command::SafeClose => {
                if let Some(w) = self.foreground()? {
                    self.engine.safe_close(w)?;
                }
            }
            Command::ToggleTransparency => {
                if let Some(w) = self.foreground()? {
                    self.engine
                        .toggle_transparency(w, self.settings.transparency)?;
                }
            }
            Command::ToggleAlwaysOnTop => {
                if let Some(w) = self.foreground()? {
                    self.engine.toggle_always_on_top(w)?;
                }
            }
            Command::LaunchApp(index) => {
                self.engine.launch(index)?;
            }

            //  System
            Command::ToggleGameMode => {
                self.toggle_game_mode();
            }
            Command::GameModeOrSettings => {
                let was_on = self.guard.is_active();
                let on = self.toggle_game_mode();
                if was_on && !on {
                    self.open_settings();
                }
            }
            Command::OpenSettings => {
                if self.guard.is_active() {
                    debug!("game mode on, settings not opened");
                } else {
                    self.open_settings();
                }
            }
            Command::SaveSession => {
                self.session.save(&self.engine)?;
            }
            Command::RestoreSession => {
                self.session.restore(&self.engine)?;
            }

            //  Catalog
            Command::AddLayout {
                name,
                x,
                y,
                width,
                height,
                key,
            } => {
                let mut layout = Layout::new(name, x, y, width, height);
                if let Some(key) = key {
                    let code = KeyCode::from_name(&key)
                        .ok_or(HotkeyParseError::UnknownKey(key))?;
                    layout = layout.with_hotkey(code);
                }
                let index = self.engine.catalog_mut().add_layout(layout)?;
                info!("added layout {}", index);
                self.catalog_changed()?;
            }
            Command::RemoveLayout(index) => {
                let removed = self.engine.catalog_mut().remove_layout(index)?;
                info!("removed layout {} ({})", index, removed.name);
                self.catalog_changed()?;
            }
            Command::AddApp {
                name,
                path,
                hotkey,
            } => {
                let mut app = AppShortcut::new(name, path);
                if let Some(hotkey) = hotkey {
                    let hotkey: Hotkey = hotkey.parse()?;
                    if !hotkey.modifiers.is_empty() {
                        app.modifiers = hotkey.modifiers;
                    }
                    app.hotkey = Some(hotkey.key);
                }
                let index = self.engine.catalog_mut().add_app(app)?;
                info!("added app shortcut {}", index);
                self.catalog_changed()?;
            }
            Command::RemoveApp(index) => {
                let removed = self.engine.catalog_mut().remove_app(index)?;
                info!("removed app shortcut {} ({})", index, removed.name);
                self.catalog_changed()?;
            }
            Command::AddExclusion(pattern) => {
                if self.engine.catalog_mut().add_exclusion(&pattern)? {
                    info!("excluding processes matching {:?}", pattern);
                    self.persist()?;
                }
            }
            Command::ReloadHotkeys => {
                self.reload_catalog();
                self.rebind_dynamic_hotkeys();
            }

            Command::Quit => {}
        }
        Ok(())
    }

    fn foreground(&self) -> Result<Option<WindowId>, DispatchError> {
        let w = self
            .engine
            .desktop()
            .foreground_window()
            .map_err(|e| EngineError::Desktop(e.to_string()))?;
        if w.is_none() {
            debug!("no foreground window");
        }
        Ok(w)
    }

    fn toggle_game_mode(&mut self) -> bool {
        let on = self.guard.toggle(self.engine.desktop());
        self.notify(UiEvent::GameMode(on));
        on
    }

    fn open_settings(&self) {
        if self.ui_tx.is_none() {
            info!("settings requested, no front end attached");
        }
        self.notify(UiEvent::OpenSettings);
    }

    fn notify(&self, event: UiEvent) {
        if let Some(tx) = &self.ui_tx {
            let _ = tx.send(event);
        }
    }

    //  Persistence

    fn persist(&self) -> Result<(), DispatchError> {
        let file = CatalogFile {
            settings: self.settings,
            catalog: self.engine.catalog().clone(),
        };
        file.save(&self.catalog_path)?;
        debug!("catalog saved to {}", self.catalog_path.display());
        Ok(())
    }

    fn catalog_changed(&mut self) -> Result<(), DispatchError> {
        self.rebind_dynamic_hotkeys();
        self.persist()
    }

    /// Re-read the catalog file.  An unreadable file keeps the catalog in
    /// memory.
    fn reload_catalog(&mut self) {
        match CatalogFile::load(&self.catalog_path) {
            Ok(file) => {
                info!("reloaded {}", self.catalog_path.display());
                self.settings = file.settings;
                self.engine.apply_settings(&file.settings);
                self.guard.set_sounds(file.settings.sounds);
                self.engine.set_catalog(file.catalog);
            }
            Err(e) => warn!(
                "could not reload {} ({}), keeping current catalog",
                self.catalog_path.display(),
                e
            ),
        }
    }
}
