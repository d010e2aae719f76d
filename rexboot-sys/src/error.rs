// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Cannot create device node {node}: {source}")]
    NodeCreation {
        node: String,
        source: nix::errno::Errno,
    },

    #[error("Mount of {device} on {mount_point} failed: {source}")]
    Mount {
        device: String,
        mount_point: String,
        source: nix::errno::Errno,
    },

    #[error("Unmount of {mount_point} failed: {source}")]
    Unmount {
        mount_point: String,
        source: nix::errno::Errno,
    },
}

impl SysError {
    /// True when a mount failed only because something is already attached
    /// at the same point; the orchestrator treats that as success.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SysError::Mount {
                source: nix::errno::Errno::EBUSY,
                ..
            }
        )
    }
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
