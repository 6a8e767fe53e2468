//! Monitor layout snapshots and monitor-local to virtual-desktop coordinates.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::desktop::{Desktop, Rect};
use crate::error::MonitorError;

/// One attached display as reported by a single enumeration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub index: usize,
    /// Full monitor area in virtual-desktop coordinates.
    pub bounds: Rect,
    /// Area excluding the taskbar and docked toolbars.
    pub working_area: Rect,
}

/// Snapshot of the monitor layout. Indices are only meaningful within the
/// snapshot they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTopology {
    monitors: Vec<MonitorInfo>,
}

impl MonitorTopology {
    pub fn enumerate<D: Desktop + ?Sized>(desktop: &D) -> Result<Self, MonitorError> {
        info!(event = "core.monitor.enumerate_started");
        let monitors = desktop.enumerate_monitors()?;
        let topology = Self::from_monitors(monitors)?;
        info!(
            event = "core.monitor.enumerate_completed",
            count = topology.monitors.len()
        );
        Ok(topology)
    }

    /// Builds a topology, renumbering monitors in the given order.
    pub fn from_monitors(monitors: Vec<MonitorInfo>) -> Result<Self, MonitorError> {
        if monitors.is_empty() {
            return Err(MonitorError::EnumerationFailed {
                message: "no monitors attached".to_string(),
            });
        }
        let monitors = monitors
            .into_iter()
            .enumerate()
            .map(|(index, monitor)| MonitorInfo { index, ..monitor })
            .collect();
        Ok(Self { monitors })
    }

    pub fn monitors(&self) -> &[MonitorInfo] {
        &self.monitors
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Monitor at `screen_index`, or monitor 0 when the index is out of range
    /// (for example a placement authored for a display that was unplugged).
    pub fn monitor_or_primary(&self, screen_index: i32) -> &MonitorInfo {
        usize::try_from(screen_index)
            .ok()
            .and_then(|i| self.monitors.get(i))
            .unwrap_or_else(|| {
                debug!(
                    event = "core.monitor.index_fallback",
                    screen_index,
                    count = self.monitors.len()
                );
                &self.monitors[0]
            })
    }

    /// Converts monitor-local coordinates into virtual-desktop coordinates.
    pub fn resolve(&self, screen_index: i32, x: i32, y: i32) -> (i32, i32) {
        let bounds = self.monitor_or_primary(screen_index).bounds;
        (bounds.left.saturating_add(x), bounds.top.saturating_add(y))
    }
}
