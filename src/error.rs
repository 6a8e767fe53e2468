use std::path::PathBuf;

use crate::desktop::WindowHandle;

/// Starting an executable failed before any process existed.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Failed to start '{}': {message}", path.display())]
    StartFailed { path: PathBuf, message: String },

    #[error("Invalid launch argument for '{}': {message}", path.display())]
    InvalidArgument { path: PathBuf, message: String },

    #[error("No desktop backend is available on this platform")]
    Unsupported,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to enumerate monitors: {message}")]
    EnumerationFailed { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Window operation '{operation}' failed for {handle}: {message}")]
    OperationFailed {
        operation: &'static str,
        handle: WindowHandle,
        message: String,
    },

    #[error("Process with name '{name}' not found")]
    ProcessNotFound { name: String },

    #[error("None of the processes named '{name}' has a main window")]
    NoMainWindow { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to access registry store '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry store '{}' has no executable ids left", path.display())]
    IdSpaceExhausted { path: PathBuf },

    #[error("Registry store '{}' is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Expected a value after {flag}")]
    MissingValue { flag: String },

    #[error("Invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("Unknown argument '{0}'")]
    UnknownArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_launch_error_display() {
        let error = LaunchError::StartFailed {
            path: PathBuf::from("C:\\missing.exe"),
            message: "The system cannot find the file specified.".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to start 'C:\\missing.exe': The system cannot find the file specified."
        );
    }

    #[test]
    fn test_placement_error_wraps_monitor_error() {
        let error: PlacementError = MonitorError::EnumerationFailed {
            message: "no displays".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "Failed to enumerate monitors: no displays");
        assert!(matches!(error, PlacementError::Monitor(_)));
    }

    #[test]
    fn test_registry_error_keeps_source() {
        let error = RegistryError::Io {
            path: PathBuf::from("executables.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(error.source().is_some());
    }

    #[test]
    fn test_errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LaunchError>();
        assert_send_sync::<PlacementError>();
        assert_send_sync::<RegistryError>();
    }
}
