//! The list of executables started at login, and its JSON store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::desktop::Desktop;
use crate::error::RegistryError;
use crate::launch::{LaunchOutcome, Launcher};
use crate::settings::ExecutableSettings;

pub const DEFAULT_STORE_FILE: &str = "executables.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
    pub id: u32,
    /// File name of `path` without its extension.
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub settings: ExecutableSettings,
}

impl Executable {
    pub fn display_name(&self) -> &str {
        self.settings.name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Store {
    next_id: u32,
    executables: Vec<Executable>,
}

/// Owns the executable list for the lifetime of the application. Call
/// [`close`](Self::close) (or [`flush`](Self::flush)) to persist changes;
/// dropping the registry does not write anything.
#[derive(Debug)]
pub struct ExecutableRegistry {
    path: PathBuf,
    next_id: u32,
    executables: Vec<Executable>,
}

impl ExecutableRegistry {
    /// Store beside the running executable, falling back to the working
    /// directory.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_STORE_FILE)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE))
    }

    /// Loads the store at `path`; a missing file gives an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let store = match fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str::<Store>(&contents).map_err(|source| {
                    RegistryError::Malformed {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Store::default(),
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.clone(),
                    source,
                });
            }
        };

        // Ids must keep growing even if the stored counter lags behind.
        let max_id = store.executables.iter().map(|e| e.id).max().unwrap_or(0);
        let after_max = max_id
            .checked_add(1)
            .ok_or_else(|| RegistryError::IdSpaceExhausted { path: path.clone() })?;
        let next_id = store.next_id.max(after_max).max(1);
        info!(
            event = "core.registry.opened",
            path = %path.display(),
            count = store.executables.len()
        );
        Ok(Self {
            path,
            next_id,
            executables: store.executables,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.executables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executables.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Executable> {
        self.executables.iter()
    }

    pub fn get(&self, id: u32) -> Option<&Executable> {
        self.executables.iter().find(|e| e.id == id)
    }

    /// Registers a new executable and returns its id, or `None` when `path` is
    /// already registered.
    pub fn create(
        &mut self,
        path: impl Into<PathBuf>,
        arguments: Option<String>,
        settings: ExecutableSettings,
    ) -> Result<Option<u32>, RegistryError> {
        let path = path.into();
        if self.contains_path(&path) {
            info!(event = "core.registry.duplicate_skipped", path = %path.display());
            return Ok(None);
        }
        let id = self.allocate_id()?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.executables.push(Executable {
            id,
            name,
            path,
            arguments,
            settings,
        });
        Ok(Some(id))
    }

    /// Adds already-built executables, skipping any whose path is registered.
    /// Each added entry gets a fresh id from this registry; the id it carried
    /// is ignored. Returns how many were added.
    pub fn add(
        &mut self,
        executables: impl IntoIterator<Item = Executable>,
    ) -> Result<usize, RegistryError> {
        let mut added = 0;
        for mut executable in executables {
            if self.contains_path(&executable.path) {
                continue;
            }
            executable.id = self.allocate_id()?;
            self.executables.push(executable);
            added += 1;
        }
        Ok(added)
    }

    pub fn remove_by_id(&mut self, id: u32) -> bool {
        let before = self.executables.len();
        self.executables.retain(|e| e.id != id);
        before != self.executables.len()
    }

    pub fn remove_by_path(&mut self, path: &Path) -> bool {
        let before = self.executables.len();
        self.executables.retain(|e| e.path != path);
        before != self.executables.len()
    }

    /// Starts every executable in registration order. A failing executable is
    /// reported in its outcome and never stops the others.
    pub fn perform_start<D: Desktop>(
        &self,
        launcher: &mut Launcher<D>,
    ) -> Vec<(u32, LaunchOutcome)> {
        self.perform_start_while(launcher, || true)
    }

    /// Like [`perform_start`](Self::perform_start), but checks `keep_going`
    /// before each executable.
    pub fn perform_start_while<D: Desktop>(
        &self,
        launcher: &mut Launcher<D>,
        mut keep_going: impl FnMut() -> bool,
    ) -> Vec<(u32, LaunchOutcome)> {
        let mut outcomes = Vec::with_capacity(self.executables.len());
        for executable in &self.executables {
            if !keep_going() {
                warn!(
                    event = "core.registry.start_interrupted",
                    remaining = self.executables.len() - outcomes.len()
                );
                break;
            }
            let outcome = launcher.launch_and_place(
                &executable.path,
                executable.arguments.as_deref(),
                &executable.settings,
            );
            outcomes.push((executable.id, outcome));
        }
        outcomes
    }

    /// Writes the store, creating parent directories as needed.
    pub fn flush(&self) -> Result<(), RegistryError> {
        let io_err = |source: std::io::Error| RegistryError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let store = Store {
            next_id: self.next_id,
            executables: self.executables.clone(),
        };
        let json = serde_json::to_string_pretty(&store).map_err(|source| {
            RegistryError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(io_err)?;
        info!(
            event = "core.registry.flushed",
            path = %self.path.display(),
            count = self.executables.len()
        );
        Ok(())
    }

    pub fn close(self) -> Result<(), RegistryError> {
        self.flush()
    }

    fn allocate_id(&mut self) -> Result<u32, RegistryError> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| RegistryError::IdSpaceExhausted {
                path: self.path.clone(),
            })?;
        Ok(id)
    }

    fn contains_path(&self, path: &Path) -> bool {
        self.executables.iter().any(|e| e.path == path)
    }
}

impl<'a> IntoIterator for &'a ExecutableRegistry {
    type Item = &'a Executable;
    type IntoIter = std::slice::Iter<'a, Executable>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
