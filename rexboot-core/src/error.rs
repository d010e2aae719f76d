// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Error taxonomy of the resolution/orchestration core.
///
/// The disk registry and the type detector never produce these: absence of a
/// result is their only failure signal, which forces callers to handle "not
/// found" explicitly. Everything here surfaces as a single-line diagnostic;
/// nothing may crash or hang the loader, since the only operator console is
/// the one this program provides.
#[derive(Error, Debug)]
pub enum BootError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unknown filesystem format on {0}")]
    UnknownFilesystem(String),

    #[error("Mount of {device} failed: {reason}")]
    MountFailed { device: String, reason: String },

    #[error("Invalid path syntax: {0}")]
    InvalidVPath(String),

    #[error("No device specified and no root device configured")]
    NoDeviceContext,

    /// Internal only: a rollback left mounts attached. Always resolved (or
    /// downgraded to the original failure) before a public call returns.
    #[error("Rollback left {0} filesystem(s) attached")]
    PartialMountRollback(usize),
}

pub type Result<T> = std::result::Result<T, BootError>;
