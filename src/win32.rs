//! Win32 implementation of [`Desktop`].

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::path::Path;
use std::ptr;

use tracing::{debug, warn};
use widestring::U16CString;
use winapi::shared::minwindef::{BOOL, DWORD, FALSE, LPARAM, TRUE};
use winapi::shared::windef::{HDC, HMONITOR, HWND, LPRECT, RECT};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::libloaderapi::{GetModuleHandleA, GetProcAddress};
use winapi::um::processthreadsapi::{GetProcessId, OpenProcess};
use winapi::um::shellapi::{SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW, ShellExecuteExW};
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use winapi::um::winnt::{HANDLE, PROCESS_QUERY_LIMITED_INFORMATION};
use winapi::um::winuser::{
    EnumDisplayMonitors, EnumWindows, GW_OWNER, GetClientRect, GetMonitorInfoW, GetWindow,
    GetWindowRect, GetWindowThreadProcessId, IsWindow, IsWindowVisible, MONITORINFO, SW_HIDE,
    SW_SHOWMAXIMIZED, SW_SHOWMINIMIZED, SW_SHOWNORMAL, SWP_NOZORDER, SetWindowPos, ShowWindow,
};

use crate::desktop::{Desktop, Pid, ProcessEntry, Rect, WindowHandle};
use crate::error::{LaunchError, MonitorError, WindowError};
use crate::monitor::MonitorInfo;
use crate::settings::WindowStyle;

// NtQueryInformationProcess is not in winapi, so it is looked up in ntdll.
type NtQueryInformationProcessFn =
    unsafe extern "system" fn(HANDLE, u32, *mut std::ffi::c_void, u32, *mut u32) -> i32;

#[repr(C)]
#[allow(non_snake_case)]
struct PROCESS_BASIC_INFORMATION {
    ExitStatus: *mut std::ffi::c_void,
    PebBaseAddress: *mut std::ffi::c_void,
    Reserved2: [*mut std::ffi::c_void; 2],
    UniqueProcessId: *mut std::ffi::c_void,
    InheritedFromUniqueProcessId: *mut std::ffi::c_void,
}

/// Closes a kernel handle when dropped.
struct OwnedHandle(HANDLE);

impl OwnedHandle {
    fn new(handle: HANDLE) -> Option<Self> {
        if handle.is_null() || handle == INVALID_HANDLE_VALUE {
            None
        } else {
            Some(Self(handle))
        }
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

pub struct Win32Desktop {
    nt_query_information_process: Option<NtQueryInformationProcessFn>,
}

impl Default for Win32Desktop {
    fn default() -> Self {
        Self::new()
    }
}

impl Win32Desktop {
    pub fn new() -> Self {
        let nt_query_information_process = unsafe {
            let ntdll = GetModuleHandleA(b"ntdll.dll\0".as_ptr() as _);
            if ntdll.is_null() {
                None
            } else {
                let proc_addr = GetProcAddress(ntdll, b"NtQueryInformationProcess\0".as_ptr() as _);
                if proc_addr.is_null() {
                    None
                } else {
                    Some(std::mem::transmute::<_, NtQueryInformationProcessFn>(
                        proc_addr,
                    ))
                }
            }
        };
        if nt_query_information_process.is_none() {
            warn!(event = "win32.ntdll_lookup_failed");
        }
        Self {
            nt_query_information_process,
        }
    }
}

fn hwnd_of(handle: WindowHandle) -> HWND {
    handle.raw() as HWND
}

fn rect_from(rect: RECT) -> Rect {
    Rect::new(rect.left, rect.top, rect.right, rect.bottom)
}

fn show_command(style: WindowStyle) -> i32 {
    match style {
        WindowStyle::Hidden => SW_HIDE,
        WindowStyle::Normal => SW_SHOWNORMAL,
        WindowStyle::Minimized => SW_SHOWMINIMIZED,
        WindowStyle::Maximized => SW_SHOWMAXIMIZED,
    }
}

fn window_error(operation: &'static str, handle: WindowHandle) -> WindowError {
    WindowError::OperationFailed {
        operation,
        handle,
        message: std::io::Error::last_os_error().to_string(),
    }
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|c| *c == 0).unwrap_or(wide.len());
    OsString::from_wide(&wide[..len])
        .to_string_lossy()
        .into_owned()
}

impl Desktop for Win32Desktop {
    fn list_processes(&self) -> Vec<ProcessEntry> {
        let mut processes = Vec::new();
        unsafe {
            let Some(snapshot) = OwnedHandle::new(CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0))
            else {
                warn!(
                    event = "win32.process_snapshot_failed",
                    error = %std::io::Error::last_os_error()
                );
                return processes;
            };

            let mut entry: PROCESSENTRY32W = std::mem::zeroed();
            entry.dwSize = std::mem::size_of::<PROCESSENTRY32W>() as u32;
            if Process32FirstW(snapshot.0, &mut entry) != FALSE {
                loop {
                    processes.push(ProcessEntry {
                        id: entry.th32ProcessID,
                        name: wide_to_string(&entry.szExeFile),
                    });
                    if Process32NextW(snapshot.0, &mut entry) == FALSE {
                        break;
                    }
                }
            }
        }
        processes
    }

    fn parent_id_of(&self, pid: Pid) -> Option<Pid> {
        let query = self.nt_query_information_process?;
        unsafe {
            let process = OwnedHandle::new(OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid))?;
            let mut pbi: PROCESS_BASIC_INFORMATION = std::mem::zeroed();
            let mut return_len = 0u32;
            let status = query(
                process.0,
                0, // ProcessBasicInformation
                &mut pbi as *mut _ as *mut _,
                std::mem::size_of::<PROCESS_BASIC_INFORMATION>() as u32,
                &mut return_len,
            );
            if status != 0 {
                debug!(event = "win32.parent_lookup_failed", pid, status);
                return None;
            }
            Some(pbi.InheritedFromUniqueProcessId as usize as Pid)
        }
    }

    fn main_window_of(&self, pid: Pid) -> Option<WindowHandle> {
        struct EnumData {
            target_pid: DWORD,
            hwnd: HWND,
        }

        unsafe extern "system" fn enum_windows_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
            unsafe {
                let data = &mut *(lparam as *mut EnumData);
                let mut process_id = 0;
                GetWindowThreadProcessId(hwnd, &mut process_id);
                if process_id != data.target_pid {
                    return TRUE;
                }
                // main window: visible and not owned by another window
                if IsWindowVisible(hwnd) == 0 || !GetWindow(hwnd, GW_OWNER).is_null() {
                    return TRUE;
                }
                data.hwnd = hwnd;
                FALSE
            }
        }

        let mut data = EnumData {
            target_pid: pid,
            hwnd: ptr::null_mut(),
        };
        unsafe {
            EnumWindows(Some(enum_windows_proc), &mut data as *mut _ as LPARAM);
        }
        WindowHandle::new(data.hwnd as isize)
    }

    fn enumerate_monitors(&self) -> Result<Vec<MonitorInfo>, MonitorError> {
        unsafe extern "system" fn enum_monitor_proc(
            hmonitor: HMONITOR,
            _hdc: HDC,
            _lprc: LPRECT,
            lparam: LPARAM,
        ) -> BOOL {
            unsafe {
                let monitors = &mut *(lparam as *mut Vec<MonitorInfo>);
                let mut mi: MONITORINFO = std::mem::zeroed();
                mi.cbSize = std::mem::size_of::<MONITORINFO>() as u32;
                if GetMonitorInfoW(hmonitor, &mut mi) != 0 {
                    monitors.push(MonitorInfo {
                        index: monitors.len(),
                        bounds: rect_from(mi.rcMonitor),
                        working_area: rect_from(mi.rcWork),
                    });
                }
                TRUE
            }
        }

        let mut monitors: Vec<MonitorInfo> = Vec::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                ptr::null_mut(),
                ptr::null(),
                Some(enum_monitor_proc),
                &mut monitors as *mut _ as LPARAM,
            )
        };
        if ok == 0 {
            return Err(MonitorError::EnumerationFailed {
                message: std::io::Error::last_os_error().to_string(),
            });
        }
        Ok(monitors)
    }

    fn set_show_state(&self, handle: WindowHandle, style: WindowStyle) -> Result<(), WindowError> {
        let hwnd = hwnd_of(handle);
        unsafe {
            if IsWindow(hwnd) == 0 {
                return Err(window_error("ShowWindow", handle));
            }
            // the return value is the previous visibility, not a status
            ShowWindow(hwnd, show_command(style));
        }
        Ok(())
    }

    fn set_window_position(&self, handle: WindowHandle, rect: Rect) -> Result<(), WindowError> {
        let ok = unsafe {
            SetWindowPos(
                hwnd_of(handle),
                ptr::null_mut(),
                rect.left,
                rect.top,
                rect.width(),
                rect.height(),
                SWP_NOZORDER,
            )
        };
        if ok == 0 {
            return Err(window_error("SetWindowPos", handle));
        }
        Ok(())
    }

    fn outer_rect(&self, handle: WindowHandle) -> Result<Rect, WindowError> {
        let mut rect: RECT = unsafe { std::mem::zeroed() };
        if unsafe { GetWindowRect(hwnd_of(handle), &mut rect) } == 0 {
            return Err(window_error("GetWindowRect", handle));
        }
        Ok(rect_from(rect))
    }

    fn client_rect(&self, handle: WindowHandle) -> Result<Rect, WindowError> {
        let mut rect: RECT = unsafe { std::mem::zeroed() };
        if unsafe { GetClientRect(hwnd_of(handle), &mut rect) } == 0 {
            return Err(window_error("GetClientRect", handle));
        }
        Ok(rect_from(rect))
    }

    fn start_process(
        &self,
        path: &Path,
        arguments: Option<&str>,
        style: WindowStyle,
    ) -> Result<Pid, LaunchError> {
        let invalid = |message: String| LaunchError::InvalidArgument {
            path: path.to_path_buf(),
            message,
        };
        let file_w = U16CString::from_os_str(path.as_os_str()).map_err(|e| invalid(e.to_string()))?;
        let params_w = arguments
            .filter(|a| !a.is_empty())
            .map(U16CString::from_str)
            .transpose()
            .map_err(|e| invalid(e.to_string()))?;

        unsafe {
            let mut sei: SHELLEXECUTEINFOW = std::mem::zeroed();
            sei.cbSize = std::mem::size_of::<SHELLEXECUTEINFOW>() as u32;
            sei.fMask = SEE_MASK_NOCLOSEPROCESS;
            sei.lpFile = file_w.as_ptr();
            sei.lpParameters = params_w.as_ref().map(|s| s.as_ptr()).unwrap_or(ptr::null());
            sei.nShow = show_command(style);

            if ShellExecuteExW(&mut sei) == 0 {
                return Err(LaunchError::StartFailed {
                    path: path.to_path_buf(),
                    message: std::io::Error::last_os_error().to_string(),
                });
            }

            // No handle when the shell handed the request to a running instance.
            let Some(process) = OwnedHandle::new(sei.hProcess) else {
                return Err(LaunchError::StartFailed {
                    path: path.to_path_buf(),
                    message: "no new process was created".to_string(),
                });
            };
            let pid = GetProcessId(process.0);
            if pid == 0 {
                return Err(LaunchError::StartFailed {
                    path: path.to_path_buf(),
                    message: std::io::Error::last_os_error().to_string(),
                });
            }
            debug!(event = "win32.process_started", pid, path = %path.display());
            Ok(pid)
        }
    }
}
