//! Launch a configured set of executables and place the window each of them
//! opens on a multi-monitor desktop.
//!
//! The flow for one executable is: [`Launcher`] starts the process, the
//! [`WindowHandleResolver`] polls the process tree (via [`ProcessTreeScanner`])
//! until the right top-level window appears, and the [`WindowPlacer`] applies
//! show state, position and size relative to the [`MonitorTopology`].

pub mod cli;
pub mod desktop;
pub mod error;
pub mod hwnd;
pub mod launch;
pub mod monitor;
pub mod place;
pub mod ps;
pub mod registry;
pub mod settings;
#[cfg(windows)]
pub mod win32;

pub use desktop::{Desktop, Pid, ProcessEntry, Rect, WindowHandle};
pub use error::{LaunchError, MonitorError, PlacementError, RegistryError, WindowError};
pub use hwnd::{ResolvedWindow, WindowHandleResolver};
pub use launch::{LaunchOutcome, LaunchState, Launcher, LauncherConfig};
pub use monitor::{MonitorInfo, MonitorTopology};
pub use place::{BorderCorrection, Placement, WindowPlacer, move_and_resize_by_process_name};
pub use ps::{ProcessNode, ProcessTreeScanner};
pub use registry::{Executable, ExecutableRegistry};
pub use settings::{ExecutableSettings, WindowPlacementData, WindowStyle};
#[cfg(windows)]
pub use win32::Win32Desktop;
