use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Activity Tracker is already running (lock file: {})", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("Failed to create lock file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Exclusive single-instance marker. The file is created atomically and removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                warn!(path = %path.display(), "another instance holds the lock");
                return Err(LockError::AlreadyRunning(path.to_path_buf()));
            }
            Err(source) => {
                return Err(LockError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let lock = Self {
            path: path.to_path_buf(),
        };

        // pid is informational only
        if let Err(error) = writeln!(file, "{}", std::process::id()) {
            warn!(error = %error, "failed to write pid into lock file");
        }

        info!(path = %lock.path.display(), "instance lock acquired");
        Ok(lock)
    }

    pub fn is_held(path: &Path) -> bool {
        path.exists()
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "instance lock released"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(error = %error, path = %self.path.display(), "failed to remove lock file"),
        }
    }
}
