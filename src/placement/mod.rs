//! The placement engine.
//!
//! [`PlacementEngine`] turns layouts into absolute geometry and applies it
//! through a [`Desktop`].  It owns every piece of per-window state (cycle
//! indices and snapshots) plus the shared layout cursor, so it must live on
//! exactly one thread; other threads reach it through the dispatcher's
//! command queue.

pub mod animation;
pub mod geometry;

use crate::catalog::{Layout, LayoutCatalog, MAXIMIZED_LAYOUT};
use crate::command::{Direction, Edge, Rect, Step, WindowId};
use crate::store::Settings;
use crate::traits::{Desktop, ZOrder};
use animation::{smooth_move, Animation};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Instant;

/// Fixed step of [`PlacementEngine::move_window`] and
/// [`PlacementEngine::resize_window`].
pub const FIXED_STEP: i32 = 60;

/// Fraction of the work area a centered window occupies.
pub const CENTER_FRACTION: f32 = 0.8;

/// Possible errors from the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The desktop backend returned an error.
    #[error("desktop error: {0}")]
    Desktop(String),
}

fn os<E: std::error::Error>(e: E) -> EngineError {
    EngineError::Desktop(e.to_string())
}

/// Geometry of a window when it first entered the quick-position cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub rect: Rect,
    pub captured_at: Instant,
}

#[derive(Debug, Clone, Default)]
struct WindowCycleState {
    index: usize,
    snapshot: Option<WindowSnapshot>,
}

/// Computes and applies window geometry.
///
/// Operations that target one window return `Ok(())` without touching
/// anything when the handle is dead or an index is out of range.
/// Operations over all windows keep going when a single window refuses to
/// move, so a failed pass can leave some windows placed and others not.
pub struct PlacementEngine<D: Desktop> {
    desktop: D,
    catalog: LayoutCatalog,
    margin: i32,
    animation: Animation,
    cycle: HashMap<WindowId, WindowCycleState>,
    layout_cursor: usize,
}

impl<D: Desktop> PlacementEngine<D> {
    pub fn new(desktop: D, catalog: LayoutCatalog) -> Self {
        Self {
            desktop,
            catalog,
            margin: Settings::default().margin,
            animation: Animation::default(),
            cycle: HashMap::new(),
            layout_cursor: 0,
        }
    }

    /// Take margin and the animation switch from persisted settings.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.margin = settings.margin.max(0);
        self.animation.enabled = settings.animations;
    }

    pub fn set_animation(&mut self, animation: Animation) {
        self.animation = animation;
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn set_margin(&mut self, margin: i32) {
        self.margin = margin.max(0);
    }

    pub fn margin(&self) -> i32 {
        self.margin
    }

    pub fn desktop(&self) -> &D {
        &self.desktop
    }

    pub fn catalog(&self) -> &LayoutCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut LayoutCatalog {
        &mut self.catalog
    }

    /// Replace the catalog.  The layout cursor is clamped back into range.
    pub fn set_catalog(&mut self, catalog: LayoutCatalog) {
        self.catalog = catalog;
        if self.layout_cursor >= self.catalog.layouts().len() {
            self.layout_cursor = 0;
        }
    }

    /// Next quick position `window` will take, if it has cycle state.
    pub fn cycle_index(&self, window: WindowId) -> Option<usize> {
        self.cycle.get(&window).map(|s| s.index)
    }

    pub fn snapshot(&self, window: WindowId) -> Option<WindowSnapshot> {
        self.cycle.get(&window).and_then(|s| s.snapshot)
    }

    /// Index of the user layout last applied or cycled to.
    pub fn layout_cursor(&self) -> usize {
        self.layout_cursor
    }

    //  Enumeration

    /// Eligible windows in enumeration order, minus those whose process
    /// matches the exclusion list.
    pub fn eligible_windows(&self) -> Result<Vec<WindowId>, EngineError> {
        let windows = self.desktop.windows().map_err(os)?;
        let exclusions = self.catalog.exclusions();
        if exclusions.is_empty() {
            return Ok(windows);
        }
        Ok(windows
            .into_iter()
            .filter(|&w| {
                let name = self
                    .desktop
                    .window_process_id(w)
                    .ok()
                    .and_then(|pid| self.desktop.process_name(pid).ok().flatten());
                match name {
                    Some(name) if exclusions.matches(&name) => {
                        debug!("{} excluded ({})", w, name);
                        false
                    }
                    _ => true,
                }
            })
            .collect())
    }

    fn live(&self, window: WindowId) -> bool {
        if self.desktop.is_window(window) {
            true
        } else {
            debug!("{} is not a window, ignoring", window);
            false
        }
    }

    //  Single layouts

    /// Move `window` to `target` with the configured animation.
    pub fn move_window_to(&self, window: WindowId, target: Rect) -> Result<(), EngineError> {
        smooth_move(&self.desktop, window, target, &self.animation).map_err(os)
    }

    fn place(&self, window: WindowId, layout: &Layout) -> Result<(), EngineError> {
        let area = self.desktop.work_area_for_window(window).map_err(os)?;
        let target = geometry::layout_rect(area, layout, self.margin);
        debug!("{} -> {} ({})", window, target, layout.name);
        self.desktop.restore(window).map_err(os)?;
        self.move_window_to(window, target)
    }

    /// Apply user layout `index` to `window`.
    pub fn apply_layout(&mut self, window: WindowId, index: usize) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        let Some(layout) = self.catalog.layout(index).cloned() else {
            debug!("layout {} out of range", index);
            return Ok(());
        };
        self.layout_cursor = index;
        self.place(window, &layout)
    }

    /// Step the shared layout cursor and apply the layout it lands on.
    pub fn cycle_layout(&mut self, window: WindowId, step: Step) -> Result<(), EngineError> {
        let len = self.catalog.layouts().len();
        if len == 0 || !self.live(window) {
            return Ok(());
        }
        let next = step.wrap(self.layout_cursor.min(len - 1), len);
        self.apply_layout(window, next)
    }

    //  Quick positions

    fn cycle_state(&mut self, window: WindowId) -> &mut WindowCycleState {
        if !self.cycle.contains_key(&window) {
            let desktop = &self.desktop;
            self.cycle.retain(|&w, _| desktop.is_window(w));
        }
        self.cycle.entry(window).or_default()
    }

    fn place_quick(&self, window: WindowId, index: usize) -> Result<(), EngineError> {
        match self.catalog.quick_positions().get(index) {
            Some(layout) => self.place(window, layout),
            None => Ok(()),
        }
    }

    /// Apply the window's current quick position and advance its index.
    ///
    /// The window's rectangle is captured the first time it enters the
    /// cycle.
    pub fn cycle_position(&mut self, window: WindowId) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        let len = self.catalog.quick_positions().len();
        let current = self.desktop.window_rect(window).ok();
        let state = self.cycle_state(window);
        if state.snapshot.is_none() {
            state.snapshot = current.map(|rect| WindowSnapshot {
                rect,
                captured_at: Instant::now(),
            });
        }
        let index = state.index;
        state.index = (index + 1) % len;
        self.place_quick(window, index)
    }

    /// Step one quick position backwards.
    ///
    /// Rewinds the index by two, applies that slot, and advances by one, so
    /// a following [`cycle_position`](Self::cycle_position) continues from
    /// where this call left off.
    pub fn restore_previous(&mut self, window: WindowId) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        let len = self.catalog.quick_positions().len();
        let state = self.cycle_state(window);
        let index = (state.index + len - 2) % len;
        state.index = (index + 1) % len;
        self.place_quick(window, index)
    }

    //  Tiling

    fn foreground_area(&self) -> Result<Rect, EngineError> {
        match self.desktop.foreground_window().map_err(os)? {
            Some(w) => self.desktop.work_area_for_window(w).map_err(os),
            None => self.desktop.primary_work_area().map_err(os),
        }
    }

    fn place_all(&self, windows: &[WindowId], cells: &[Rect], flash: bool) -> usize {
        let mut placed = 0;
        for (&window, &cell) in windows.iter().zip(cells) {
            let result = self
                .desktop
                .restore(window)
                .map_err(os)
                .and_then(|_| self.move_window_to(window, cell));
            match result {
                Ok(()) => {
                    placed += 1;
                    if flash {
                        let _ = self.desktop.flash(window);
                    }
                }
                Err(e) => warn!("could not place {}: {}", window, e),
            }
        }
        placed
    }

    /// Grid-tile every eligible window on the foreground window's monitor.
    /// Returns the number of windows placed.
    pub fn tile_all(&mut self) -> Result<usize, EngineError> {
        let windows = self.eligible_windows()?;
        if windows.is_empty() {
            return Ok(0);
        }
        let area = self.foreground_area()?;
        let cells = geometry::grid_cells(windows.len(), area, self.margin);
        info!("tiling {} windows in {}", windows.len(), area);
        Ok(self.place_all(&windows, &cells, false))
    }

    /// Grid-tile every eligible window on the monitor under the cursor,
    /// flashing each one once placed.
    pub fn arrange_no_overlap(&mut self) -> Result<usize, EngineError> {
        let windows = self.eligible_windows()?;
        if windows.is_empty() {
            return Ok(0);
        }
        let cursor = self.desktop.cursor_position().map_err(os)?;
        let area = self.desktop.work_area_at(cursor).map_err(os)?;
        let cells = geometry::grid_cells(windows.len(), area, self.margin);
        info!("arranging {} windows in {}", windows.len(), area);
        Ok(self.place_all(&windows, &cells, true))
    }

    /// First window as a 60 % master pane, the rest stacked beside it.  A
    /// single window gets the "Maximized" layout instead.
    pub fn tile_master_stack(&mut self) -> Result<usize, EngineError> {
        let windows = self.eligible_windows()?;
        match windows.len() {
            0 => Ok(0),
            1 => {
                self.apply_layout(windows[0], MAXIMIZED_LAYOUT)?;
                Ok(1)
            }
            n => {
                let area = self.foreground_area()?;
                let rects = geometry::master_stack(n, area, self.margin);
                info!("master/stack with {} windows in {}", n, area);
                Ok(self.place_all(&windows, &rects, false))
            }
        }
    }

    //  Monitors

    /// Move `window` to the next/previous monitor, keeping its position and
    /// size relative to the work area.
    pub fn move_to_monitor(&mut self, window: WindowId, step: Step) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        let monitors = self.desktop.monitors().map_err(os)?;
        if monitors.len() < 2 {
            debug!("only {} monitor(s)", monitors.len());
            return Ok(());
        }
        let current = self.desktop.work_area_for_window(window).map_err(os)?;
        let Some(index) = monitors
            .iter()
            .position(|m| m.x == current.x && m.y == current.y)
        else {
            debug!("work area {} matches no monitor", current);
            return Ok(());
        };
        let target_area = monitors[step.wrap(index, monitors.len())];
        let rect = self.desktop.window_rect(window).map_err(os)?;
        let target = geometry::transfer(rect, current, target_area);
        info!("{} monitor {} -> {}", window, current, target_area);
        self.desktop.restore(window).map_err(os)?;
        self.move_window_to(window, target)
    }

    //  Direct manipulation (never animated)

    fn reshape(
        &self,
        window: WindowId,
        f: impl FnOnce(Rect, Rect) -> Rect,
    ) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        let rect = self.desktop.window_rect(window).map_err(os)?;
        let area = self.desktop.work_area_for_window(window).map_err(os)?;
        let target = f(rect, area);
        if target != rect {
            self.desktop.set_window_rect(window, target).map_err(os)?;
        }
        Ok(())
    }

    /// Move `window` [`FIXED_STEP`] units towards `dir`.
    pub fn move_window(&self, window: WindowId, dir: Direction) -> Result<(), EngineError> {
        self.reshape(window, |r, _| geometry::shifted(r, dir, FIXED_STEP))
    }

    /// Grow (right/down) or shrink (left/up) `window` by [`FIXED_STEP`].
    pub fn resize_window(&self, window: WindowId, dir: Direction) -> Result<(), EngineError> {
        self.reshape(window, |r, _| geometry::resized(r, dir, FIXED_STEP))
    }

    pub fn nudge(&self, window: WindowId, dx: i32, dy: i32) -> Result<(), EngineError> {
        self.reshape(window, |r, area| geometry::nudged(r, dx, dy, area))
    }

    pub fn stretch(
        &self,
        window: WindowId,
        dw: i32,
        dh: i32,
        edge: Edge,
    ) -> Result<(), EngineError> {
        self.reshape(window, |r, area| geometry::stretched(r, dw, dh, edge, area))
    }

    pub fn center_window(&self, window: WindowId) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        let area = self.desktop.work_area_for_window(window).map_err(os)?;
        self.desktop.restore(window).map_err(os)?;
        self.move_window_to(window, geometry::centered(area, CENTER_FRACTION))
    }

    //  Window utilities

    /// Focus the next/previous eligible window after the foreground one and
    /// flash it.  Returns the newly focused window.
    pub fn switch_focus(&self, step: Step) -> Result<Option<WindowId>, EngineError> {
        let windows = self.eligible_windows()?;
        if windows.is_empty() {
            return Ok(None);
        }
        let foreground = self.desktop.foreground_window().map_err(os)?;
        let next = match foreground.and_then(|f| windows.iter().position(|&w| w == f)) {
            Some(i) => step.wrap(i, windows.len()),
            None => 0,
        };
        let target = windows[next];
        self.desktop.focus(target).map_err(os)?;
        let _ = self.desktop.flash(target);
        Ok(Some(target))
    }

    pub fn bring_to_front(&self, window: WindowId) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        self.desktop.set_z_order(window, ZOrder::Top).map_err(os)?;
        self.desktop.focus(window).map_err(os)
    }

    pub fn send_to_back(&self, window: WindowId) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        self.desktop.set_z_order(window, ZOrder::Bottom).map_err(os)
    }

    pub fn safe_close(&self, window: WindowId) -> Result<(), EngineError> {
        if !self.live(window) {
            return Ok(());
        }
        info!("closing {}", window);
        self.desktop.close_window(window).map_err(os)
    }

    /// Pin or unpin `window`.  Returns whether it is now topmost.
    pub fn toggle_always_on_top(&self, window: WindowId) -> Result<bool, EngineError> {
        if !self.live(window) {
            return Ok(false);
        }
        let pinned = self.desktop.is_topmost(window).map_err(os)?;
        let order = if pinned { ZOrder::NoTopmost } else { ZOrder::Topmost };
        self.desktop.set_z_order(window, order).map_err(os)?;
        Ok(!pinned)
    }

    /// Make `window` translucent at `level`, or opaque again if it already
    /// is translucent.  Returns whether it is now translucent.
    pub fn toggle_transparency(&self, window: WindowId, level: u8) -> Result<bool, EngineError> {
        if !self.live(window) {
            return Ok(false);
        }
        let translucent = matches!(self.desktop.alpha(window).map_err(os)?, Some(a) if a < 255);
        let alpha = if translucent { None } else { Some(level) };
        self.desktop.set_alpha(window, alpha).map_err(os)?;
        Ok(!translucent)
    }

    /// Open app shortcut `index`.
    pub fn launch(&self, index: usize) -> Result<(), EngineError> {
        let Some(app) = self.catalog.app(index) else {
            debug!("app {} out of range", index);
            return Ok(());
        };
        info!("launching {} ({})", app.name, app.path);
        self.desktop.launch(&app.path).map_err(os)
    }
}
