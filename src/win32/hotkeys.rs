//! [`HotkeyBackend`] over `RegisterHotKey`.
//!
//! Hotkeys are registered without a window, so `WM_HOTKEY` is posted to the
//! registering thread's queue and picked up by
//! [`event_loop::run`](super::event_loop::run).

use super::Win32Error;
use crate::hotkey::Hotkey;
use crate::traits::HotkeyBackend;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_NOREPEAT,
};

/// Global hotkeys owned by the calling thread.  Must stay on the thread
/// that runs the message loop.
#[derive(Debug, Default)]
pub struct Win32Hotkeys {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Win32Hotkeys {
    pub fn new() -> Self {
        Self::default()
    }
}

fn os_modifiers(hotkey: Hotkey) -> HOT_KEY_MODIFIERS {
    // Modifiers uses the MOD_ALT/MOD_CONTROL/MOD_SHIFT/MOD_WIN bit values.
    HOT_KEY_MODIFIERS(hotkey.modifiers.bits()) | MOD_NOREPEAT
}

impl HotkeyBackend for Win32Hotkeys {
    type Error = Win32Error;

    fn register(&mut self, id: i32, hotkey: Hotkey) -> Result<(), Win32Error> {
        unsafe { RegisterHotKey(None, id, os_modifiers(hotkey), hotkey.key.0)? };
        Ok(())
    }

    fn unregister(&mut self, id: i32) -> Result<(), Win32Error> {
        unsafe { UnregisterHotKey(None, id)? };
        Ok(())
    }
}
