//! Role marker persistence.
//!
//! The client keeps exactly one string across reloads: the active role.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use medgate_contracts::{
    error::{MedgateError, MedgateResult},
    role::Role,
};
use medgate_core::traits::RoleStore;

/// Role marker held in memory; lost with the process.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    role: Mutex<Option<Role>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `role`, as after a previous sign-in.
    pub fn with_role(role: Role) -> Self {
        Self {
            role: Mutex::new(Some(role)),
        }
    }
}

impl RoleStore for MemoryRoleStore {
    fn load(&self) -> MedgateResult<Option<Role>> {
        Ok(*self.role.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn save(&self, role: Role) -> MedgateResult<()> {
        *self.role.lock().unwrap_or_else(|e| e.into_inner()) = Some(role);
        Ok(())
    }

    fn clear(&self) -> MedgateResult<()> {
        *self.role.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Role marker kept in a small text file holding the role name.
#[derive(Debug, Clone)]
pub struct FileRoleStore {
    path: PathBuf,
}

impl FileRoleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, err: std::io::Error) -> MedgateError {
        MedgateError::StoreError {
            reason: format!(
                "failed to {} role marker '{}': {}",
                action,
                self.path.display(),
                err
            ),
        }
    }
}

impl RoleStore for FileRoleStore {
    /// A missing file means no saved role. Unknown contents are an error.
    fn load(&self) -> MedgateResult<Option<Role>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    return Ok(None);
                }
                contents.parse::<Role>().map(Some)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error("read", err)),
        }
    }

    fn save(&self, role: Role) -> MedgateResult<()> {
        std::fs::write(&self.path, role.as_str()).map_err(|e| self.io_error("write", e))
    }

    fn clear(&self) -> MedgateResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error("remove", err)),
        }
    }
}
