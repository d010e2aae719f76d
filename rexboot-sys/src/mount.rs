// SPDX-License-Identifier: GPL-3.0-only

//! Read-only mount/unmount wrappers
//!
//! Every target filesystem the loader touches is mounted read-only; the
//! loader only ever reads kernels, initrds and menu files off them.

use std::path::Path;

use nix::mount::{mount, umount, MsFlags};

use crate::error::{Result, SysError};

/// Mount `device` at `mount_point` read-only.
///
/// The mount-point directory must already exist; the orchestrator creates
/// it. An `EBUSY` failure surfaces as `SysError::Mount` whose `is_busy()`
/// is true so the caller can treat an already-attached point as success.
pub fn mount_readonly(device: &str, mount_point: &Path, fstype: &str) -> Result<()> {
    mount(
        Some(device),
        mount_point,
        Some(fstype),
        MsFlags::MS_RDONLY,
        None::<&str>,
    )
    .map_err(|source| SysError::Mount {
        device: device.to_string(),
        mount_point: mount_point.display().to_string(),
        source,
    })
}

/// Detach the filesystem at `mount_point`.
pub fn unmount(mount_point: &Path) -> Result<()> {
    umount(mount_point).map_err(|source| SysError::Unmount {
        mount_point: mount_point.display().to_string(),
        source,
    })
}
