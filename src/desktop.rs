//! OS capability surface the launcher core is written against.
//!
//! Everything that touches processes, windows or monitors goes through the
//! [`Desktop`] trait, so the scanning and resolution logic can run against the
//! real Win32 backend or a scripted in-memory desktop in tests.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LaunchError, MonitorError, WindowError};
use crate::monitor::MonitorInfo;
use crate::settings::WindowStyle;

pub type Pid = u32;

/// Opaque top-level window identifier. Never null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowHandle(isize);

impl WindowHandle {
    pub fn new(raw: isize) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    pub fn raw(self) -> isize {
        self.0
    }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HWND(0x{:X})", self.0)
    }
}

/// Edge-based rectangle, same layout as a Win32 `RECT`. Arithmetic saturates
/// at the `i32` range instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub id: Pid,
    pub name: String,
}

pub trait Desktop: Sync {
    /// Every process running right now.
    fn list_processes(&self) -> Vec<ProcessEntry>;

    /// Parent of `pid`, or `None` when it cannot be determined.
    fn parent_id_of(&self, pid: Pid) -> Option<Pid>;

    /// The visible, unowned top-level window of `pid`, if it has one yet.
    fn main_window_of(&self, pid: Pid) -> Option<WindowHandle>;

    /// Takes its own snapshot. The resolver checks membership in the snapshot
    /// of the current round instead, so the liveness check and the tree scan
    /// see the same process list.
    fn is_running(&self, pid: Pid) -> bool {
        self.list_processes().iter().any(|p| p.id == pid)
    }

    fn enumerate_monitors(&self) -> Result<Vec<MonitorInfo>, MonitorError>;

    fn set_show_state(&self, handle: WindowHandle, style: WindowStyle) -> Result<(), WindowError>;

    /// Move and resize without touching z-order.
    fn set_window_position(&self, handle: WindowHandle, rect: Rect) -> Result<(), WindowError>;

    fn outer_rect(&self, handle: WindowHandle) -> Result<Rect, WindowError>;

    fn client_rect(&self, handle: WindowHandle) -> Result<Rect, WindowError>;

    fn start_process(
        &self,
        path: &Path,
        arguments: Option<&str>,
        style: WindowStyle,
    ) -> Result<Pid, LaunchError>;
}


#[cfg(test)]
mod tests {
    use super::fake::FakeDesktop;
    use super::*;

    #[test]
    fn test_rect_arithmetic_saturates() {
        let rect = Rect::from_origin_size(100, -100, i32::MAX, i32::MAX);
        assert_eq!(rect, Rect::new(100, -100, i32::MAX, i32::MAX - 100));
        assert_eq!(Rect::new(i32::MIN, 0, i32::MAX, 0).width(), i32::MAX);
    }

    #[test]
    fn test_is_running_uses_a_fresh_snapshot() {
        let desktop = FakeDesktop::new()
            .with_process(7, 1)
            .with_exit_after_round(7, 1);
        assert!(desktop.is_running(7));
        assert!(!desktop.is_running(7));
        assert!(!desktop.is_running(8));
    }
}
