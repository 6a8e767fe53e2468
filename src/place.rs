//! Applies show state, position and size to a resolved window.

use tracing::{debug, info};

use crate::desktop::{Desktop, Rect, WindowHandle};
use crate::error::{PlacementError, WindowError};
use crate::monitor::MonitorTopology;
use crate::ps::processes_named;
use crate::settings::{ExecutableSettings, WindowPlacementData};

/// Difference between a window's outer frame and its client area.
///
/// The x correction compensates for the invisible resize border some window
/// chromes carry. `border / 2 - 2` and growing the height by only half the
/// border are empirical values, not derived from any frame metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderCorrection {
    pub border_width: i32,
    pub x_correction: i32,
}

impl BorderCorrection {
    pub fn measure(outer: Rect, client: Rect) -> Self {
        let border_width = outer.width().saturating_sub(client.width());
        let x_correction = if border_width > 1 {
            border_width / 2 - 2
        } else {
            0
        };
        Self {
            border_width,
            x_correction,
        }
    }

    /// Outer rectangle that gives the requested placement at `(abs_x, abs_y)`.
    pub fn apply(&self, abs_x: i32, abs_y: i32, width: i32, height: i32) -> Rect {
        Rect::from_origin_size(
            abs_x.saturating_sub(self.x_correction),
            abs_y,
            width.saturating_add(self.border_width),
            height.saturating_add(self.border_width / 2),
        )
    }
}

/// What [`WindowPlacer::place`] did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub handle: WindowHandle,
    /// Final outer rectangle, when custom positioning was requested.
    pub rect: Option<Rect>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WindowPlacer;

impl WindowPlacer {
    pub fn new() -> Self {
        Self
    }

    /// Applies the show state, then the custom position if the settings ask
    /// for one. The show state is applied even when positioning fails.
    pub fn place<D: Desktop + ?Sized>(
        &self,
        desktop: &D,
        handle: WindowHandle,
        settings: &ExecutableSettings,
    ) -> Result<Placement, PlacementError> {
        desktop.set_show_state(handle, settings.window_style)?;
        debug!(
            event = "core.place.show_applied",
            handle = %handle,
            style = %settings.window_style
        );

        let Some(data) = settings.effective_placement() else {
            return Ok(Placement { handle, rect: None });
        };

        let topology = MonitorTopology::enumerate(desktop)?;
        let rect = self.position(desktop, handle, data, &topology)?;
        Ok(Placement {
            handle,
            rect: Some(rect),
        })
    }

    /// Moves and resizes `handle` to `data` on `topology`, correcting for the
    /// window's border.
    pub fn position<D: Desktop + ?Sized>(
        &self,
        desktop: &D,
        handle: WindowHandle,
        data: &WindowPlacementData,
        topology: &MonitorTopology,
    ) -> Result<Rect, PlacementError> {
        let outer = desktop.outer_rect(handle)?;
        let client = desktop.client_rect(handle)?;
        let correction = BorderCorrection::measure(outer, client);
        let (abs_x, abs_y) = data.virtual_position(topology);
        let rect = correction.apply(abs_x, abs_y, data.width(), data.height());

        desktop.set_window_position(handle, rect)?;
        info!(
            event = "core.place.position_applied",
            handle = %handle,
            screen_index = data.screen_index(),
            x = rect.left,
            y = rect.top,
            width = rect.width(),
            height = rect.height(),
            border_width = correction.border_width
        );
        Ok(rect)
    }
}

/// Moves the main window of the first running process called `name` to
/// `rect` (virtual-desktop coordinates, no border correction). Works on any
/// process, not just ones this application launched.
///
/// Only position and size change: a hidden or minimized window keeps its show
/// state. Use [`Desktop::set_show_state`] first when it should also be shown.
pub fn move_and_resize_by_process_name<D: Desktop + ?Sized>(
    desktop: &D,
    name: &str,
    rect: Rect,
) -> Result<WindowHandle, WindowError> {
    let snapshot = desktop.list_processes();
    let pids = processes_named(&snapshot, name);
    if pids.is_empty() {
        return Err(WindowError::ProcessNotFound {
            name: name.to_string(),
        });
    }

    let handle = pids
        .iter()
        .find_map(|pid| desktop.main_window_of(*pid))
        .ok_or_else(|| WindowError::NoMainWindow {
            name: name.to_string(),
        })?;
    desktop.set_window_position(handle, rect)?;
    info!(
        event = "core.place.moved_by_name",
        name,
        handle = %handle,
        matches = pids.len()
    );
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::fake::{Call, FakeDesktop, hwnd, two_monitors};
    use crate::settings::WindowStyle;

    fn windowed_desktop() -> FakeDesktop {
        FakeDesktop::new().with_monitors(two_monitors()).with_rects(
            hwnd(0x10),
            Rect::new(50, 50, 860, 660),
            Rect::new(0, 0, 800, 600),
        )
    }

    fn positioned(style: WindowStyle, data: WindowPlacementData) -> ExecutableSettings {
        ExecutableSettings::advanced(None, style, 0, false, Some(data))
    }

    // Heuristic values, kept for compatibility with existing layouts.
    #[test]
    fn test_border_correction_heuristic() {
        let correction =
            BorderCorrection::measure(Rect::new(0, 0, 810, 610), Rect::new(0, 0, 800, 600));
        assert_eq!(correction.border_width, 10);
        assert_eq!(correction.x_correction, 3);
        assert_eq!(
            correction.apply(100, 100, 400, 300),
            Rect::from_origin_size(97, 100, 410, 305)
        );
    }

    #[test]
    fn test_border_correction_zero_for_thin_borders() {
        for border in [0, 1] {
            let correction = BorderCorrection::measure(
                Rect::new(0, 0, 800 + border, 600),
                Rect::new(0, 0, 800, 600),
            );
            assert_eq!(correction.x_correction, 0);
        }
    }

    #[test]
    fn test_place_applies_style_and_corrected_position() {
        let desktop = windowed_desktop();
        let settings = positioned(
            WindowStyle::Normal,
            WindowPlacementData::new(100, 100, 400, 300, 0),
        );

        let placement = WindowPlacer::new()
            .place(&desktop, hwnd(0x10), &settings)
            .unwrap();

        let expected = Rect::from_origin_size(97, 100, 410, 305);
        assert_eq!(placement.rect, Some(expected));
        assert_eq!(
            desktop.calls(),
            vec![
                Call::Show(hwnd(0x10), WindowStyle::Normal),
                Call::Position(hwnd(0x10), expected),
            ]
        );
    }

    #[test]
    fn test_oversized_placement_saturates() {
        let desktop = windowed_desktop();
        let settings = positioned(
            WindowStyle::Normal,
            WindowPlacementData::new(100, 100, i32::MAX - 5, 300, 0),
        );

        let placement = WindowPlacer::new()
            .place(&desktop, hwnd(0x10), &settings)
            .unwrap();
        assert_eq!(placement.rect, Some(Rect::new(97, 100, i32::MAX, 405)));
    }

    #[test]
    fn test_place_on_secondary_monitor() {
        let desktop = windowed_desktop();
        let settings = positioned(
            WindowStyle::Normal,
            WindowPlacementData::new(100, 100, 400, 300, 1),
        );
        let placement = WindowPlacer::new()
            .place(&desktop, hwnd(0x10), &settings)
            .unwrap();
        assert_eq!(
            placement.rect,
            Some(Rect::from_origin_size(-1280 + 97, -100, 410, 305))
        );
    }

    #[test]
    fn test_place_without_positioning_only_shows() {
        let desktop = windowed_desktop();
        let settings = ExecutableSettings::basic(None, WindowStyle::Maximized);
        let placement = WindowPlacer::new()
            .place(&desktop, hwnd(0x10), &settings)
            .unwrap();
        assert_eq!(placement.rect, None);
        assert_eq!(
            desktop.calls(),
            vec![Call::Show(hwnd(0x10), WindowStyle::Maximized)]
        );
    }

    #[test]
    fn test_monitor_failure_still_applies_style() {
        let desktop = FakeDesktop::new().with_rects(
            hwnd(0x10),
            Rect::new(0, 0, 810, 610),
            Rect::new(0, 0, 800, 600),
        );
        let settings = positioned(
            WindowStyle::Minimized,
            WindowPlacementData::new(0, 0, 400, 300, 0),
        );

        let result = WindowPlacer::new().place(&desktop, hwnd(0x10), &settings);
        assert!(matches!(result, Err(PlacementError::Monitor(_))));
        assert_eq!(
            desktop.calls(),
            vec![Call::Show(hwnd(0x10), WindowStyle::Minimized)]
        );
    }

    #[test]
    fn test_move_by_process_name_uses_first_process_with_window() {
        let desktop = FakeDesktop::new()
            .with_named_process(30, "chat.exe")
            .with_named_process(31, "Chat.exe")
            .with_window(31, hwnd(0x31));
        let target = Rect::from_origin_size(0, 0, 640, 480);

        let handle = move_and_resize_by_process_name(&desktop, "chat", target).unwrap();
        assert_eq!(handle, hwnd(0x31));
        assert_eq!(desktop.calls(), vec![Call::Position(hwnd(0x31), target)]);
    }

    #[test]
    fn test_move_by_process_name_errors() {
        let desktop = FakeDesktop::new().with_named_process(30, "chat.exe");
        let target = Rect::from_origin_size(0, 0, 640, 480);

        assert!(matches!(
            move_and_resize_by_process_name(&desktop, "mail", target),
            Err(WindowError::ProcessNotFound { .. })
        ));
        assert!(matches!(
            move_and_resize_by_process_name(&desktop, "chat", target),
            Err(WindowError::NoMainWindow { .. })
        ));
    }

    #[test]
    fn test_vanished_window_reports_window_error() {
        let desktop = FakeDesktop::new().with_monitors(two_monitors());
        let settings = positioned(
            WindowStyle::Normal,
            WindowPlacementData::new(0, 0, 400, 300, 0),
        );
        let result = WindowPlacer::new().place(&desktop, hwnd(0x20), &settings);
        assert!(matches!(result, Err(PlacementError::Window(_))));
    }
}
