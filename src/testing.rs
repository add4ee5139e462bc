//! Recording test doubles shared by the unit tests.

use crate::command::{Point, ProcessInfo, Rect, WindowId};
use crate::hotkey::Hotkey;
use crate::traits::{Cue, Desktop, HotkeyBackend, ZOrder};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum FakeError {
    #[error("no such window {0}")]
    NoWindow(WindowId),
    #[error("refused")]
    Refused,
}

/// Every mutating call made against a [`FakeDesktop`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetRect(WindowId, Rect),
    Restore(WindowId),
    Flash(WindowId),
    Focus(WindowId),
    ZOrder(WindowId, ZOrder),
    SetAlpha(WindowId, Option<u8>),
    Close(WindowId),
    Terminate(u32),
    CreateIndicator(WindowId),
    Destroy(WindowId),
    Cue(Cue),
    Launch(String),
}

#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub id: WindowId,
    pub title: String,
    pub class: String,
    pub pid: u32,
    pub rect: Rect,
    pub alive: bool,
    /// Returned by [`Desktop::windows`].
    pub listed: bool,
    pub topmost: bool,
    pub alpha: Option<u8>,
}

/// An in-memory desktop that records every call made to it.
pub struct FakeDesktop {
    windows: RefCell<Vec<FakeWindow>>,
    monitors: Vec<Rect>,
    foreground: Cell<Option<WindowId>>,
    cursor: Cell<Point>,
    processes: RefCell<Vec<ProcessInfo>>,
    next_id: Cell<isize>,
    calls: RefCell<Vec<Call>>,
    refuse_rect: RefCell<HashSet<WindowId>>,
    refuse_terminate: RefCell<HashSet<u32>>,
}

/// Process id the fake reports for itself.
pub const SELF_PID: u32 = 4242;
/// Process id new windows belong to unless stated otherwise.
pub const APP_PID: u32 = 500;

impl FakeDesktop {
    pub fn new(monitors: Vec<Rect>) -> Self {
        Self {
            windows: RefCell::new(Vec::new()),
            monitors,
            foreground: Cell::new(None),
            cursor: Cell::new(Point::default()),
            processes: RefCell::new(vec![
                ProcessInfo {
                    pid: SELF_PID,
                    name: "winven.exe".into(),
                },
                ProcessInfo {
                    pid: APP_PID,
                    name: "app.exe".into(),
                },
            ]),
            next_id: Cell::new(0x100),
            calls: RefCell::new(Vec::new()),
            refuse_rect: RefCell::new(HashSet::new()),
            refuse_terminate: RefCell::new(HashSet::new()),
        }
    }

    /// One 1920×1080 monitor at the origin.
    pub fn single_monitor() -> Self {
        Self::new(vec![Rect::new(0, 0, 1920, 1080)])
    }

    //  Setup

    pub fn add_window(&self, title: &str, rect: Rect) -> WindowId {
        self.add_window_for(title, rect, APP_PID)
    }

    pub fn add_window_for(&self, title: &str, rect: Rect, pid: u32) -> WindowId {
        let id = WindowId(self.next_id.get());
        self.next_id.set(id.0 + 0x10);
        self.windows.borrow_mut().push(FakeWindow {
            id,
            title: title.into(),
            class: "AppWindow".into(),
            pid,
            rect,
            alive: true,
            listed: true,
            topmost: false,
            alpha: None,
        });
        id
    }

    pub fn add_process(&self, pid: u32, name: &str) {
        self.processes.borrow_mut().push(ProcessInfo {
            pid,
            name: name.into(),
        });
    }

    pub fn set_class(&self, window: WindowId, class: &str) {
        self.with(window, |w| w.class = class.into());
    }

    pub fn set_foreground(&self, window: Option<WindowId>) {
        self.foreground.set(window);
    }

    pub fn set_cursor(&self, p: Point) {
        self.cursor.set(p);
    }

    /// Simulate the user closing `window`.
    pub fn kill(&self, window: WindowId) {
        self.with(window, |w| w.alive = false);
    }

    pub fn refuse_rect(&self, window: WindowId) {
        self.refuse_rect.borrow_mut().insert(window);
    }

    pub fn refuse_terminate(&self, pid: u32) {
        self.refuse_terminate.borrow_mut().insert(pid);
    }

    //  Inspection

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Every rectangle applied to `window`, in order.
    pub fn placements(&self, window: WindowId) -> Vec<Rect> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::SetRect(w, r) if *w == window => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn rect_of(&self, window: WindowId) -> Rect {
        self.find(window).map(|w| w.rect).unwrap_or_default()
    }

    pub fn window(&self, window: WindowId) -> Option<FakeWindow> {
        self.find(window)
    }

    pub fn process_ids(&self) -> Vec<u32> {
        self.processes.borrow().iter().map(|p| p.pid).collect()
    }

    //  Internals

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn find(&self, window: WindowId) -> Option<FakeWindow> {
        self.windows
            .borrow()
            .iter()
            .find(|w| w.id == window && w.alive)
            .cloned()
    }

    fn with<T>(&self, window: WindowId, f: impl FnOnce(&mut FakeWindow) -> T) -> Option<T> {
        self.windows
            .borrow_mut()
            .iter_mut()
            .find(|w| w.id == window)
            .map(f)
    }

    fn live(&self, window: WindowId) -> Result<FakeWindow, FakeError> {
        self.find(window).ok_or(FakeError::NoWindow(window))
    }

    fn monitor_at(&self, p: Point) -> Rect {
        self.monitors
            .iter()
            .copied()
            .find(|m| m.contains(p))
            .or_else(|| self.monitors.first().copied())
            .unwrap_or_default()
    }
}

impl Desktop for FakeDesktop {
    type Error = FakeError;

    fn windows(&self) -> Result<Vec<WindowId>, FakeError> {
        Ok(self
            .windows
            .borrow()
            .iter()
            .filter(|w| w.alive && w.listed)
            .map(|w| w.id)
            .collect())
    }

    fn is_window(&self, window: WindowId) -> bool {
        self.find(window).is_some()
    }

    fn window_title(&self, window: WindowId) -> Result<String, FakeError> {
        Ok(self.live(window)?.title)
    }

    fn window_class(&self, window: WindowId) -> Result<String, FakeError> {
        Ok(self.live(window)?.class)
    }

    fn window_process_id(&self, window: WindowId) -> Result<u32, FakeError> {
        Ok(self.live(window)?.pid)
    }

    fn process_name(&self, pid: u32) -> Result<Option<String>, FakeError> {
        Ok(self
            .processes
            .borrow()
            .iter()
            .find(|p| p.pid == pid)
            .map(|p| p.name.clone()))
    }

    fn window_rect(&self, window: WindowId) -> Result<Rect, FakeError> {
        Ok(self.live(window)?.rect)
    }

    fn set_window_rect(&self, window: WindowId, rect: Rect) -> Result<(), FakeError> {
        self.live(window)?;
        if self.refuse_rect.borrow().contains(&window) {
            return Err(FakeError::Refused);
        }
        self.with(window, |w| w.rect = rect);
        self.record(Call::SetRect(window, rect));
        Ok(())
    }

    fn restore(&self, window: WindowId) -> Result<(), FakeError> {
        self.live(window)?;
        self.record(Call::Restore(window));
        Ok(())
    }

    fn flash(&self, window: WindowId) -> Result<(), FakeError> {
        self.live(window)?;
        self.record(Call::Flash(window));
        Ok(())
    }

    fn foreground_window(&self) -> Result<Option<WindowId>, FakeError> {
        Ok(self.foreground.get().filter(|&w| self.is_window(w)))
    }

    fn focus(&self, window: WindowId) -> Result<(), FakeError> {
        self.live(window)?;
        self.foreground.set(Some(window));
        self.record(Call::Focus(window));
        Ok(())
    }

    fn set_z_order(&self, window: WindowId, order: ZOrder) -> Result<(), FakeError> {
        self.live(window)?;
        match order {
            ZOrder::Topmost => self.with(window, |w| w.topmost = true),
            ZOrder::NoTopmost => self.with(window, |w| w.topmost = false),
            ZOrder::Top | ZOrder::Bottom => None,
        };
        self.record(Call::ZOrder(window, order));
        Ok(())
    }

    fn is_topmost(&self, window: WindowId) -> Result<bool, FakeError> {
        Ok(self.live(window)?.topmost)
    }

    fn alpha(&self, window: WindowId) -> Result<Option<u8>, FakeError> {
        Ok(self.live(window)?.alpha)
    }

    fn set_alpha(&self, window: WindowId, alpha: Option<u8>) -> Result<(), FakeError> {
        self.live(window)?;
        self.with(window, |w| w.alpha = alpha);
        self.record(Call::SetAlpha(window, alpha));
        Ok(())
    }

    fn close_window(&self, window: WindowId) -> Result<(), FakeError> {
        self.live(window)?;
        self.record(Call::Close(window));
        Ok(())
    }

    fn work_area_for_window(&self, window: WindowId) -> Result<Rect, FakeError> {
        Ok(self.monitor_at(self.live(window)?.rect.center()))
    }

    fn work_area_at(&self, point: Point) -> Result<Rect, FakeError> {
        Ok(self.monitor_at(point))
    }

    fn primary_work_area(&self) -> Result<Rect, FakeError> {
        Ok(self.monitors.first().copied().unwrap_or_default())
    }

    fn monitors(&self) -> Result<Vec<Rect>, FakeError> {
        Ok(self.monitors.clone())
    }

    fn cursor_position(&self) -> Result<Point, FakeError> {
        Ok(self.cursor.get())
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>, FakeError> {
        Ok(self.processes.borrow().clone())
    }

    fn terminate_process(&self, pid: u32) -> Result<(), FakeError> {
        if self.refuse_terminate.borrow().contains(&pid) {
            return Err(FakeError::Refused);
        }
        self.processes.borrow_mut().retain(|p| p.pid != pid);
        self.record(Call::Terminate(pid));
        Ok(())
    }

    fn current_process_id(&self) -> u32 {
        SELF_PID
    }

    fn launch(&self, path: &str) -> Result<(), FakeError> {
        self.record(Call::Launch(path.into()));
        Ok(())
    }

    fn create_indicator(&self) -> Result<WindowId, FakeError> {
        let id = self.add_window_for("GAME", Rect::new(5, 5, 60, 20), SELF_PID);
        self.with(id, |w| {
            w.listed = false;
            w.topmost = true;
        });
        self.record(Call::CreateIndicator(id));
        Ok(id)
    }

    fn destroy_window(&self, window: WindowId) -> Result<(), FakeError> {
        self.live(window)?;
        self.kill(window);
        self.record(Call::Destroy(window));
        Ok(())
    }

    fn play_cue(&self, cue: Cue) -> Result<(), FakeError> {
        self.record(Call::Cue(cue));
        Ok(())
    }
}

//  Hotkeys

/// OS hotkey facility double.  Combinations passed to
/// [`take_system_wide`](Self::take_system_wide) behave as if another
/// process held them.
#[derive(Default)]
pub struct FakeHotkeys {
    claims: Rc<RefCell<Vec<(i32, Hotkey)>>>,
    taken: RefCell<Vec<Hotkey>>,
}

impl FakeHotkeys {
    pub fn take_system_wide(&self, hotkey: Hotkey) {
        self.taken.borrow_mut().push(hotkey);
    }

    pub fn claimed(&self) -> Vec<(i32, Hotkey)> {
        self.claims.borrow().clone()
    }

    /// Shared view of the claims that outlives the backend.
    pub fn handle(&self) -> Rc<RefCell<Vec<(i32, Hotkey)>>> {
        self.claims.clone()
    }
}

impl HotkeyBackend for FakeHotkeys {
    type Error = FakeError;

    fn register(&mut self, id: i32, hotkey: Hotkey) -> Result<(), FakeError> {
        let held = self.claims.borrow().iter().any(|(_, h)| *h == hotkey);
        if held || self.taken.borrow().contains(&hotkey) {
            return Err(FakeError::Refused);
        }
        self.claims.borrow_mut().push((id, hotkey));
        Ok(())
    }

    fn unregister(&mut self, id: i32) -> Result<(), FakeError> {
        let mut claims = self.claims.borrow_mut();
        let before = claims.len();
        claims.retain(|(i, _)| *i != id);
        if claims.len() == before {
            return Err(FakeError::Refused);
        }
        Ok(())
    }
}
