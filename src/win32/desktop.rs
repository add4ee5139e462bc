//! [`Desktop`] over user32, dwmapi and the tool-help snapshot API.

use super::{from_wide, hwnd, wide, window_id, Win32Error};
use crate::command::{Point, ProcessInfo, Rect, WindowId};
use crate::traits::{Cue, Desktop, ZOrder};
use log::debug;
use std::ffi::c_void;
use std::sync::OnceLock;
use windows::core::{w, HSTRING, PCWSTR};
use windows::Win32::Foundation::{
    CloseHandle, BOOL, COLORREF, HWND, LPARAM, LRESULT, POINT, RECT, TRUE, WPARAM,
};
use windows::Win32::Graphics::Dwm::{DwmGetWindowAttribute, DWMWA_CLOAKED};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateSolidBrush, EndPaint, EnumDisplayMonitors, GetMonitorInfoW,
    MonitorFromPoint, MonitorFromWindow, SetBkMode, SetTextColor, TextOutW, HDC, HMONITOR,
    MONITORINFO, MONITOR_DEFAULTTONEAREST, MONITOR_DEFAULTTOPRIMARY, PAINTSTRUCT, TRANSPARENT,
};
use windows::Win32::System::Console::GetConsoleWindow;
use windows::Win32::System::Diagnostics::Debug::Beep;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::ProcessStatus::K32GetModuleFileNameExW;
use windows::Win32::System::Threading::{
    GetCurrentProcessId, OpenProcess, TerminateProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    PROCESS_TERMINATE,
};
use windows::Win32::UI::Shell::ShellExecuteW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, EnumWindows, FlashWindowEx, GetClassNameW,
    GetCursorPos, GetForegroundWindow, GetLayeredWindowAttributes, GetWindow, GetWindowLongW,
    GetWindowRect, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId, IsIconic,
    IsWindow, IsWindowVisible, IsZoomed, PostMessageW, RegisterClassW, SetForegroundWindow,
    SetLayeredWindowAttributes, SetWindowLongW, SetWindowPos, ShowWindow, FLASHWINFO,
    FLASHW_CAPTION, GWL_EXSTYLE, GWL_STYLE, GW_OWNER, HWND_BOTTOM, HWND_NOTOPMOST, HWND_TOP,
    HWND_TOPMOST, LWA_ALPHA, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
    SW_RESTORE, SW_SHOWNORMAL, WM_CLOSE, WM_PAINT, WNDCLASSW, WS_CAPTION, WS_CHILD,
    WS_EX_LAYERED, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP, WS_VISIBLE,
};

const INDICATOR_CLASS: PCWSTR = w!("WinvenGameModeIndicator");
const INDICATOR_TEXT: &str = "GAME";

/// Titles of shell surfaces that pass every style check.
const SKIP_TITLES: &[&str] = &["Program Manager", "Windows Input Experience"];

/// The live desktop.  Holds no state of its own besides the handle of this
/// process's console window.
pub struct Win32Desktop {
    console: HWND,
}

impl Win32Desktop {
    pub fn new() -> Self {
        Self {
            console: unsafe { GetConsoleWindow() },
        }
    }

    fn live(&self, window: WindowId) -> Result<HWND, Win32Error> {
        if window.0 == 0 || !self.is_window(window) {
            return Err(Win32Error::NoWindow(window));
        }
        Ok(hwnd(window))
    }

    fn ex_style(&self, window: WindowId) -> Result<u32, Win32Error> {
        let h = self.live(window)?;
        Ok(unsafe { GetWindowLongW(h, GWL_EXSTYLE) } as u32)
    }

    fn set_ex_style(&self, window: WindowId, style: u32) -> Result<(), Win32Error> {
        let h = self.live(window)?;
        unsafe { SetWindowLongW(h, GWL_EXSTYLE, style as i32) };
        Ok(())
    }

    fn eligible(&self, h: HWND) -> bool {
        unsafe {
            if h == self.console || !IsWindowVisible(h).as_bool() {
                return false;
            }
            let style = GetWindowLongW(h, GWL_STYLE) as u32;
            if style & WS_CHILD.0 != 0 || style & WS_CAPTION.0 != WS_CAPTION.0 {
                return false;
            }
            if let Ok(owner) = GetWindow(h, GW_OWNER) {
                if !owner.is_invalid() {
                    return false;
                }
            }
            if is_cloaked(h) || GetWindowTextLengthW(h) == 0 {
                return false;
            }
        }
        let title = self.window_title(window_id(h)).unwrap_or_default();
        !SKIP_TITLES.contains(&title.as_str())
    }
}

impl Default for Win32Desktop {
    fn default() -> Self {
        Self::new()
    }
}

fn is_cloaked(h: HWND) -> bool {
    let mut cloaked: u32 = 0;
    let result = unsafe {
        DwmGetWindowAttribute(
            h,
            DWMWA_CLOAKED,
            &mut cloaked as *mut u32 as *mut c_void,
            std::mem::size_of::<u32>() as u32,
        )
    };
    result.is_ok() && cloaked != 0
}

fn to_rect(r: RECT) -> Rect {
    Rect::from_edges(r.left, r.top, r.right, r.bottom)
}

fn monitor_work_area(monitor: HMONITOR) -> Result<Rect, Win32Error> {
    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
        return Err(Win32Error::Call("GetMonitorInfoW"));
    }
    Ok(to_rect(info.rcWork))
}

unsafe extern "system" fn collect_window(h: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<HWND>);
    found.push(h);
    TRUE
}

unsafe extern "system" fn collect_monitor(
    monitor: HMONITOR,
    _hdc: HDC,
    _clip: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<Rect>);
    if let Ok(area) = monitor_work_area(monitor) {
        found.push(area);
    }
    TRUE
}

unsafe extern "system" fn indicator_proc(
    h: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_PAINT {
        let mut ps = PAINTSTRUCT::default();
        let hdc = BeginPaint(h, &mut ps);
        SetBkMode(hdc, TRANSPARENT);
        SetTextColor(hdc, COLORREF(0x00FF_FFFF));
        let text: Vec<u16> = INDICATOR_TEXT.encode_utf16().collect();
        let _ = TextOutW(hdc, 12, 2, &text);
        let _ = EndPaint(h, &ps);
        return LRESULT(0);
    }
    DefWindowProcW(h, msg, wparam, lparam)
}

fn register_indicator_class() -> Result<(), Win32Error> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| unsafe {
        let instance = match GetModuleHandleW(None) {
            Ok(module) => module.into(),
            Err(_) => return false,
        };
        let class = WNDCLASSW {
            lpfnWndProc: Some(indicator_proc),
            hInstance: instance,
            lpszClassName: INDICATOR_CLASS,
            // Green, as 0x00BBGGRR.
            hbrBackground: CreateSolidBrush(COLORREF(0x0000_A000)),
            ..Default::default()
        };
        RegisterClassW(&class) != 0
    });
    if ok {
        Ok(())
    } else {
        Err(Win32Error::Call("RegisterClassW"))
    }
}

impl Desktop for Win32Desktop {
    type Error = Win32Error;

    fn windows(&self) -> Result<Vec<WindowId>, Win32Error> {
        let mut all: Vec<HWND> = Vec::new();
        unsafe { EnumWindows(Some(collect_window), LPARAM(&mut all as *mut Vec<HWND> as isize))? };
        Ok(all
            .into_iter()
            .filter(|&h| self.eligible(h))
            .map(window_id)
            .collect())
    }

    fn is_window(&self, window: WindowId) -> bool {
        window.0 != 0 && unsafe { IsWindow(Some(hwnd(window))) }.as_bool()
    }

    fn window_title(&self, window: WindowId) -> Result<String, Win32Error> {
        let h = self.live(window)?;
        let len = unsafe { GetWindowTextLengthW(h) };
        let mut buf = vec![0u16; len.max(0) as usize + 1];
        let copied = unsafe { GetWindowTextW(h, &mut buf) };
        Ok(String::from_utf16_lossy(&buf[..copied.max(0) as usize]))
    }

    fn window_class(&self, window: WindowId) -> Result<String, Win32Error> {
        let h = self.live(window)?;
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(h, &mut buf) };
        if len == 0 {
            return Err(Win32Error::Call("GetClassNameW"));
        }
        Ok(String::from_utf16_lossy(&buf[..len as usize]))
    }

    fn window_process_id(&self, window: WindowId) -> Result<u32, Win32Error> {
        let h = self.live(window)?;
        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(h, Some(&mut pid)) };
        Ok(pid)
    }

    fn process_name(&self, pid: u32) -> Result<Option<String>, Win32Error> {
        let Ok(handle) = (unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) })
        else {
            return Ok(None);
        };
        let mut buf = [0u16; 260];
        let len = unsafe { K32GetModuleFileNameExW(Some(handle), None, &mut buf) };
        let _ = unsafe { CloseHandle(handle) };
        if len == 0 {
            return Ok(None);
        }
        let path = String::from_utf16_lossy(&buf[..len as usize]);
        Ok(path.rsplit('\\').next().map(str::to_string))
    }

    fn window_rect(&self, window: WindowId) -> Result<Rect, Win32Error> {
        let h = self.live(window)?;
        let mut r = RECT::default();
        unsafe { GetWindowRect(h, &mut r)? };
        Ok(to_rect(r))
    }

    fn set_window_rect(&self, window: WindowId, rect: Rect) -> Result<(), Win32Error> {
        let h = self.live(window)?;
        unsafe {
            SetWindowPos(
                h,
                None,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                SWP_NOZORDER | SWP_NOACTIVATE,
            )?
        };
        Ok(())
    }

    fn restore(&self, window: WindowId) -> Result<(), Win32Error> {
        let h = self.live(window)?;
        unsafe {
            if IsIconic(h).as_bool() || IsZoomed(h).as_bool() {
                let _ = ShowWindow(h, SW_RESTORE);
            }
        }
        Ok(())
    }

    fn flash(&self, window: WindowId) -> Result<(), Win32Error> {
        let h = self.live(window)?;
        let info = FLASHWINFO {
            cbSize: std::mem::size_of::<FLASHWINFO>() as u32,
            hwnd: h,
            dwFlags: FLASHW_CAPTION,
            uCount: 1,
            dwTimeout: 0,
        };
        let _ = unsafe { FlashWindowEx(&info) };
        Ok(())
    }

    fn foreground_window(&self) -> Result<Option<WindowId>, Win32Error> {
        let h = unsafe { GetForegroundWindow() };
        Ok((!h.is_invalid()).then(|| window_id(h)))
    }

    fn focus(&self, window: WindowId) -> Result<(), Win32Error> {
        let h = self.live(window)?;
        if !unsafe { SetForegroundWindow(h) }.as_bool() {
            debug!("SetForegroundWindow refused for {}", window);
        }
        Ok(())
    }

    fn set_z_order(&self, window: WindowId, order: ZOrder) -> Result<(), Win32Error> {
        let h = self.live(window)?;
        let after = match order {
            ZOrder::Top => HWND_TOP,
            ZOrder::Bottom => HWND_BOTTOM,
            ZOrder::Topmost => HWND_TOPMOST,
            ZOrder::NoTopmost => HWND_NOTOPMOST,
        };
        unsafe {
            SetWindowPos(h, Some(after), 0, 0, 0, 0, SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE)?
        };
        Ok(())
    }

    fn is_topmost(&self, window: WindowId) -> Result<bool, Win32Error> {
        Ok(self.ex_style(window)? & WS_EX_TOPMOST.0 != 0)
    }

    fn alpha(&self, window: WindowId) -> Result<Option<u8>, Win32Error> {
        if self.ex_style(window)? & WS_EX_LAYERED.0 == 0 {
            return Ok(None);
        }
        let mut alpha = 255u8;
        let got = unsafe {
            GetLayeredWindowAttributes(hwnd(window), None, Some(&mut alpha as *mut u8), None)
        };
        Ok(got.ok().map(|_| alpha))
    }

    fn set_alpha(&self, window: WindowId, alpha: Option<u8>) -> Result<(), Win32Error> {
        let style = self.ex_style(window)?;
        match alpha {
            Some(alpha) => {
                self.set_ex_style(window, style | WS_EX_LAYERED.0)?;
                unsafe {
                    SetLayeredWindowAttributes(hwnd(window), COLORREF(0), alpha, LWA_ALPHA)?
                };
            }
            None => self.set_ex_style(window, style & !WS_EX_LAYERED.0)?,
        }
        Ok(())
    }

    fn close_window(&self, window: WindowId) -> Result<(), Win32Error> {
        let h = self.live(window)?;
        unsafe { PostMessageW(Some(h), WM_CLOSE, WPARAM(0), LPARAM(0))? };
        Ok(())
    }

    fn work_area_for_window(&self, window: WindowId) -> Result<Rect, Win32Error> {
        let h = self.live(window)?;
        monitor_work_area(unsafe { MonitorFromWindow(h, MONITOR_DEFAULTTONEAREST) })
    }

    fn work_area_at(&self, point: Point) -> Result<Rect, Win32Error> {
        let pt = POINT {
            x: point.x,
            y: point.y,
        };
        monitor_work_area(unsafe { MonitorFromPoint(pt, MONITOR_DEFAULTTONEAREST) })
    }

    fn primary_work_area(&self) -> Result<Rect, Win32Error> {
        monitor_work_area(unsafe { MonitorFromPoint(POINT::default(), MONITOR_DEFAULTTOPRIMARY) })
    }

    fn monitors(&self) -> Result<Vec<Rect>, Win32Error> {
        let mut found: Vec<Rect> = Vec::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                None,
                None,
                Some(collect_monitor),
                LPARAM(&mut found as *mut Vec<Rect> as isize),
            )
        };
        if !ok.as_bool() || found.is_empty() {
            return Err(Win32Error::Call("EnumDisplayMonitors"));
        }
        Ok(found)
    }

    fn cursor_position(&self) -> Result<Point, Win32Error> {
        let mut pt = POINT::default();
        unsafe { GetCursorPos(&mut pt)? };
        Ok(Point { x: pt.x, y: pt.y })
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>, Win32Error> {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)? };
        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        let mut found = Vec::new();
        let mut more = unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok();
        while more {
            found.push(ProcessInfo {
                pid: entry.th32ProcessID,
                name: from_wide(&entry.szExeFile),
            });
            more = unsafe { Process32NextW(snapshot, &mut entry) }.is_ok();
        }
        let _ = unsafe { CloseHandle(snapshot) };
        Ok(found)
    }

    fn terminate_process(&self, pid: u32) -> Result<(), Win32Error> {
        let handle = unsafe { OpenProcess(PROCESS_TERMINATE, false, pid)? };
        let result = unsafe { TerminateProcess(handle, 0) };
        let _ = unsafe { CloseHandle(handle) };
        Ok(result?)
    }

    fn current_process_id(&self) -> u32 {
        unsafe { GetCurrentProcessId() }
    }

    fn launch(&self, path: &str) -> Result<(), Win32Error> {
        let file = HSTRING::from(path);
        let result = unsafe {
            ShellExecuteW(
                None,
                w!("open"),
                &file,
                PCWSTR::null(),
                PCWSTR::null(),
                SW_SHOWNORMAL,
            )
        };
        // Values above 32 mean success.
        if result.0 as isize <= 32 {
            return Err(Win32Error::Call("ShellExecuteW"));
        }
        Ok(())
    }

    fn create_indicator(&self) -> Result<WindowId, Win32Error> {
        register_indicator_class()?;
        let title = wide("GameMode");
        let h = unsafe {
            CreateWindowExW(
                WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_LAYERED | WS_EX_TRANSPARENT,
                INDICATOR_CLASS,
                PCWSTR(title.as_ptr()),
                WS_POPUP | WS_VISIBLE,
                5,
                5,
                60,
                20,
                None,
                None,
                GetModuleHandleW(None).ok().map(Into::into),
                None,
            )?
        };
        unsafe {
            SetLayeredWindowAttributes(h, COLORREF(0), 255, LWA_ALPHA)?;
            SetWindowPos(
                h,
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )?;
        }
        debug!("indicator window {:?}", h);
        Ok(window_id(h))
    }

    fn destroy_window(&self, window: WindowId) -> Result<(), Win32Error> {
        let h = self.live(window)?;
        unsafe { DestroyWindow(h)? };
        Ok(())
    }

    fn play_cue(&self, cue: Cue) -> Result<(), Win32Error> {
        let (freq, ms) = match cue {
            Cue::Activate => (1000, 150),
            Cue::Deactivate => (500, 150),
        };
        unsafe { Beep(freq, ms)? };
        Ok(())
    }
}
