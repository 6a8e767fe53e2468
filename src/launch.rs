//! Per-executable driver: start, resolve the window, place it.

use std::path::Path;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::desktop::{Desktop, Pid, WindowHandle};
use crate::error::LaunchError;
use crate::hwnd::{DEFAULT_POLL_INTERVAL, WindowHandleResolver};
use crate::place::WindowPlacer;
use crate::ps::ProcessTreeScanner;
use crate::settings::ExecutableSettings;

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// How long to wait for a launched program's window.
    pub resolve_timeout: Duration,
    /// Pause between two polling rounds.
    pub poll_interval: Duration,
    /// Threads used to resolve parent ids during one scan.
    pub parent_lookup_workers: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            parent_lookup_workers: ProcessTreeScanner::default().workers(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    NotStarted,
    Started,
    HandleResolved,
    ResolutionTimedOut,
    Placed,
    PlacementSkipped,
}

impl std::fmt::Display for LaunchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
pub enum LaunchOutcome {
    /// Started without advanced handling; nothing else was attempted.
    Started { pid: Pid },
    StartFailed { error: LaunchError },
    /// No window showed up in time, or the process exited first.
    ResolutionTimedOut { pid: Pid },
    /// The window was found and styled. `positioned` is false when positioning
    /// was not requested or could not be applied.
    Placed {
        pid: Pid,
        handle: WindowHandle,
        positioned: bool,
    },
}

impl LaunchOutcome {
    pub fn pid(&self) -> Option<Pid> {
        match self {
            LaunchOutcome::Started { pid }
            | LaunchOutcome::ResolutionTimedOut { pid }
            | LaunchOutcome::Placed { pid, .. } => Some(*pid),
            LaunchOutcome::StartFailed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, LaunchOutcome::StartFailed { .. })
    }
}

/// Owns the desktop backend and the process-wide resolver. Launches run one
/// after another; a launch never starts before the previous one has placed its
/// window or given up.
pub struct Launcher<D: Desktop> {
    desktop: D,
    resolver: WindowHandleResolver,
    placer: WindowPlacer,
    config: LauncherConfig,
}

impl<D: Desktop> Launcher<D> {
    pub fn new(desktop: D, config: LauncherConfig) -> Self {
        let scanner = ProcessTreeScanner::new(config.parent_lookup_workers);
        Self {
            desktop,
            resolver: WindowHandleResolver::new(scanner, config.poll_interval),
            placer: WindowPlacer::new(),
            config,
        }
    }

    pub fn desktop(&self) -> &D {
        &self.desktop
    }

    pub fn resolver(&self) -> &WindowHandleResolver {
        &self.resolver
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn launch_and_place(
        &mut self,
        path: &Path,
        arguments: Option<&str>,
        settings: &ExecutableSettings,
    ) -> LaunchOutcome {
        let mut state = LaunchState::NotStarted;
        info!(
            event = "core.launch.started",
            path = %path.display(),
            state = %state,
            advanced = settings.advanced_handling
        );

        let pid = match self
            .desktop
            .start_process(path, arguments, settings.window_style)
        {
            Ok(pid) => pid,
            Err(e) => {
                error!(event = "core.launch.start_failed", path = %path.display(), error = %e);
                return LaunchOutcome::StartFailed { error: e };
            }
        };
        state = transition(state, LaunchState::Started, pid);

        if !settings.advanced_handling {
            return LaunchOutcome::Started { pid };
        }

        let Some(resolved) = self.resolver.resolve(
            &self.desktop,
            pid,
            settings.skip_amount_of_windows,
            self.config.resolve_timeout,
        ) else {
            transition(state, LaunchState::ResolutionTimedOut, pid);
            return LaunchOutcome::ResolutionTimedOut { pid };
        };
        state = transition(state, LaunchState::HandleResolved, pid);

        if settings.style_skipped_windows {
            for skipped in &resolved.skipped {
                if let Err(e) = self.desktop.set_show_state(*skipped, settings.window_style) {
                    warn!(event = "core.launch.skipped_style_failed", pid, handle = %skipped, error = %e);
                }
            }
        }

        let positioned = match self.placer.place(&self.desktop, resolved.handle, settings) {
            Ok(placement) => {
                transition(state, LaunchState::Placed, pid);
                placement.rect.is_some()
            }
            Err(e) => {
                warn!(
                    event = "core.launch.placement_failed",
                    pid,
                    handle = %resolved.handle,
                    error = %e
                );
                transition(state, LaunchState::PlacementSkipped, pid);
                false
            }
        };

        LaunchOutcome::Placed {
            pid,
            handle: resolved.handle,
            positioned,
        }
    }
}

fn transition(from: LaunchState, to: LaunchState, pid: Pid) -> LaunchState {
    info!(event = "core.launch.state_changed", pid, from = %from, to = %to);
    to
}
