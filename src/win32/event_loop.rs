//! The dispatch thread's message loop.
//!
//! `WM_HOTKEY` becomes [`Command::Hotkey`].  Commands from other threads
//! travel through [`relay`], which forwards them to the dispatcher's queue
//! and posts a wake-up message so a blocked `GetMessageW` returns.

use crate::command::Command;
use crate::dispatcher::Dispatcher;
use crate::traits::{Desktop, HotkeyBackend};
use log::{debug, error, info};
use std::sync::mpsc;
use std::thread;
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, PostThreadMessageW, TranslateMessage, MSG, WM_APP, WM_HOTKEY,
};

/// Posted to the dispatch thread when its queue has new commands.
const WM_APP_WAKE: u32 = WM_APP + 1;

/// Wakes the dispatch thread's message loop.
#[derive(Debug, Clone, Copy)]
pub struct Waker {
    thread_id: u32,
}

impl Waker {
    /// A waker for the calling thread.
    pub fn current() -> Self {
        Self {
            thread_id: unsafe { GetCurrentThreadId() },
        }
    }

    pub fn wake(&self) {
        if let Err(e) =
            unsafe { PostThreadMessageW(self.thread_id, WM_APP_WAKE, WPARAM(0), LPARAM(0)) }
        {
            debug!("wake failed: {}", e);
        }
    }
}

/// Spawn a thread that forwards every command sent to the returned sender
/// into `queue`, waking the dispatch thread after each one.
pub fn relay(queue: mpsc::Sender<Command>, waker: Waker) -> mpsc::Sender<Command> {
    let (tx, rx) = mpsc::channel::<Command>();
    thread::spawn(move || {
        for cmd in rx {
            if queue.send(cmd).is_err() {
                break;
            }
            waker.wake();
        }
        debug!("command relay stopped");
    });
    tx
}

/// Pump messages until [`Command::Quit`] or `WM_QUIT`.
///
/// `commands` is the receiving half of the dispatcher's queue; it is
/// drained after every message.
pub fn run<D: Desktop, B: HotkeyBackend>(
    dispatcher: &mut Dispatcher<D, B>,
    commands: &mpsc::Receiver<Command>,
) {
    let mut msg = MSG::default();
    loop {
        match unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 {
            0 => {
                info!("WM_QUIT received");
                return;
            }
            -1 => {
                error!("GetMessageW failed: {}", windows::core::Error::from_win32());
                return;
            }
            _ => {}
        }
        match msg.message {
            WM_HOTKEY => {
                if !dispatcher.process(Command::Hotkey(msg.wParam.0 as i32)) {
                    return;
                }
            }
            WM_APP_WAKE => {}
            _ => unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            },
        }
        while let Ok(cmd) = commands.try_recv() {
            if !dispatcher.process(cmd) {
                return;
            }
        }
    }
}
