//! Low-level keyboard hook and foreground WinEvent hook feeding
//! [`ControlEvent`]s to the continuous-control thread.
//!
//! Both hooks are called on the installing thread while it pumps messages,
//! so they only forward into a channel and return.

use super::Win32Error;
use crate::control::ControlEvent;
use crate::hotkey::KeyCode;
use log::{debug, warn};
use std::sync::{mpsc, Mutex, MutexGuard, PoisonError};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, SetWindowsHookExW, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT,
    WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

const EVENT_SYSTEM_FOREGROUND: u32 = 0x0003;
const WINEVENT_OUTOFCONTEXT: u32 = 0x0000;
const WINEVENT_SKIPOWNPROCESS: u32 = 0x0002;

static SENDER: Mutex<Option<mpsc::Sender<ControlEvent>>> = Mutex::new(None);

fn sender() -> MutexGuard<'static, Option<mpsc::Sender<ControlEvent>>> {
    SENDER.lock().unwrap_or_else(PoisonError::into_inner)
}

fn forward(event: ControlEvent) {
    if let Some(tx) = sender().as_ref() {
        let _ = tx.send(event);
    }
}

/// Installed hooks.  Dropping this unhooks both and stops forwarding.
pub struct InputHooks {
    keyboard: HHOOK,
    foreground: HWINEVENTHOOK,
}

impl InputHooks {
    /// Install both hooks on the calling thread.  Only one set may be live.
    pub fn install(events: mpsc::Sender<ControlEvent>) -> Result<Self, Win32Error> {
        {
            let mut slot = sender();
            if slot.is_some() {
                return Err(Win32Error::Call("InputHooks::install (already installed)"));
            }
            *slot = Some(events);
        }
        let keyboard = match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), None, 0) } {
            Ok(hook) => hook,
            Err(e) => {
                *sender() = None;
                return Err(e.into());
            }
        };
        let foreground = unsafe {
            SetWinEventHook(
                EVENT_SYSTEM_FOREGROUND,
                EVENT_SYSTEM_FOREGROUND,
                None,
                Some(foreground_proc),
                0,
                0,
                WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
            )
        };
        if foreground.is_invalid() {
            warn!("foreground hook not installed; holds survive focus changes");
        }
        debug!("input hooks installed");
        Ok(Self {
            keyboard,
            foreground,
        })
    }
}

impl Drop for InputHooks {
    fn drop(&mut self) {
        unsafe {
            let _ = UnhookWindowsHookEx(self.keyboard);
            if !self.foreground.is_invalid() {
                let _ = UnhookWinEvent(self.foreground);
            }
        }
        *sender() = None;
        debug!("input hooks removed");
    }
}

unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
        let pressed = match wparam.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(true),
            WM_KEYUP | WM_SYSKEYUP => Some(false),
            _ => None,
        };
        if let Some(pressed) = pressed {
            forward(ControlEvent::Key {
                key: KeyCode(info.vkCode),
                pressed,
            });
        }
    }
    CallNextHookEx(None, code, wparam, lparam)
}

unsafe extern "system" fn foreground_proc(
    _hook: HWINEVENTHOOK,
    _event: u32,
    _hwnd: HWND,
    _object: i32,
    _child: i32,
    _thread: u32,
    _time: u32,
) {
    forward(ControlEvent::FocusChanged);
}
