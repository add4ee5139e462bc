//! Win32 backends: the [`Desktop`](crate::traits::Desktop) and
//! [`HotkeyBackend`](crate::traits::HotkeyBackend) implementations, the
//! low-level input hooks that feed continuous control, and the message loop
//! that drives the dispatcher.
//!
//! Everything in here must run on the thread that owns the message loop:
//! global hotkeys registered without a window, low-level hooks and
//! out-of-context WinEvent hooks are all delivered through that thread's
//! message queue.

pub mod desktop;
pub mod event_loop;
pub mod hotkeys;
pub mod input;

pub use desktop::Win32Desktop;
pub use event_loop::{relay, run, Waker};
pub use hotkeys::Win32Hotkeys;
pub use input::InputHooks;

use crate::command::WindowId;
use std::ffi::c_void;
use windows::core::w;
use windows::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, HWND};
use windows::Win32::System::Threading::CreateMutexW;

/// Errors from Win32 calls.
#[derive(Debug, thiserror::Error)]
pub enum Win32Error {
    #[error("window {0} no longer exists")]
    NoWindow(WindowId),
    #[error("{0}")]
    Os(#[from] windows::core::Error),
    #[error("{0} failed")]
    Call(&'static str),
}

pub(crate) fn hwnd(window: WindowId) -> HWND {
    HWND(window.0 as *mut c_void)
}

pub(crate) fn window_id(hwnd: HWND) -> WindowId {
    WindowId(hwnd.0 as isize)
}

/// NUL-terminated UTF-16.
pub(crate) fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Text up to the first NUL.
pub(crate) fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

/// A named mutex held for the life of the daemon.
pub struct SingleInstance(HANDLE);

impl SingleInstance {
    /// Claim the per-session instance lock.  `Ok(None)` means another
    /// instance already holds it.
    pub fn claim() -> Result<Option<Self>, Win32Error> {
        let handle = unsafe { CreateMutexW(None, true, w!("Local\\WinVen_SingleInstance_Mutex"))? };
        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            let _ = unsafe { CloseHandle(handle) };
            return Ok(None);
        }
        Ok(Some(Self(handle)))
    }
}

impl Drop for SingleInstance {
    fn drop(&mut self) {
        let _ = unsafe { CloseHandle(self.0) };
    }
}
