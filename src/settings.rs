use serde::{Deserialize, Serialize};

use crate::monitor::MonitorTopology;

/// Show state a launched window is put into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStyle {
    #[default]
    Normal,
    Hidden,
    Minimized,
    Maximized,
}

impl std::str::FromStr for WindowStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(WindowStyle::Normal),
            "hidden" => Ok(WindowStyle::Hidden),
            "minimized" | "min" => Ok(WindowStyle::Minimized),
            "maximized" | "max" => Ok(WindowStyle::Maximized),
            other => Err(format!("unknown window style '{}'", other)),
        }
    }
}

impl std::fmt::Display for WindowStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WindowStyle::Normal => "normal",
            WindowStyle::Hidden => "hidden",
            WindowStyle::Minimized => "minimized",
            WindowStyle::Maximized => "maximized",
        };
        f.write_str(name)
    }
}

/// Size and position of a window in coordinates local to one monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPlacementData {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    screen_index: i32,
}

impl WindowPlacementData {
    pub fn new(x: i32, y: i32, width: i32, height: i32, screen_index: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            screen_index,
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn screen_index(&self) -> i32 {
        self.screen_index
    }

    /// Top-left corner in virtual-desktop coordinates. Falls back to monitor 0
    /// when `screen_index` no longer exists.
    pub fn virtual_position(&self, topology: &MonitorTopology) -> (i32, i32) {
        topology.resolve(self.screen_index, self.x, self.y)
    }
}

/// Per-executable launch preset. `placement_data` is only honored when both
/// `advanced_handling` and `custom_positioning` are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutableSettings {
    pub name: Option<String>,
    pub window_style: WindowStyle,
    pub advanced_handling: bool,
    pub skip_amount_of_windows: u32,
    /// Also apply `window_style` to the windows passed over by the skip count.
    pub style_skipped_windows: bool,
    pub placement_data: Option<WindowPlacementData>,
    pub custom_positioning: bool,
}

impl ExecutableSettings {
    pub fn basic(name: Option<String>, window_style: WindowStyle) -> Self {
        Self {
            name,
            window_style,
            ..Self::default()
        }
    }

    /// Advanced preset; turns on `advanced_handling`, and `custom_positioning`
    /// whenever placement data is given.
    pub fn advanced(
        name: Option<String>,
        window_style: WindowStyle,
        skip_amount_of_windows: u32,
        style_skipped_windows: bool,
        placement_data: Option<WindowPlacementData>,
    ) -> Self {
        Self {
            name,
            window_style,
            advanced_handling: true,
            skip_amount_of_windows,
            style_skipped_windows,
            custom_positioning: placement_data.is_some(),
            placement_data,
        }
    }

    /// Placement that should actually be applied, if any.
    pub fn effective_placement(&self) -> Option<&WindowPlacementData> {
        if self.advanced_handling && self.custom_positioning {
            self.placement_data.as_ref()
        } else {
            None
        }
    }
}
