//! Mount request and live-mount models
//!
//! A `MountSpec` is a requested attachment; a `MountedFilesystem` is the
//! runtime record of one that succeeded. The orchestrator in rexboot-core
//! owns the live set and is its sole mutator.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A requested mount: device reference, target point, nesting depth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Raw source device reference: plain name, `LABEL=`/`UUID=` qualifier,
    /// `fstype:` compound, or a foreign bootloader token
    pub device: String,

    /// Target mount point
    pub mount_point: PathBuf,

    /// Nesting order: depth 0 mounts first, depth 1 mounts a point that only
    /// exists once depth 0 is attached, and so on
    pub depth: u32,

    /// Explicit filesystem type; None means probe at mount time
    pub fstype: Option<String>,
}

impl MountSpec {
    /// Build a spec with the depth computed from the mount point.
    ///
    /// Depth is the number of path separators in the normalized mount point
    /// under root: `/` is 0, `/boot` is 1, `/boot/efi` is 2. Within one
    /// target, mount points must be reachable in non-decreasing depth order.
    pub fn new(device: impl Into<String>, mount_point: impl Into<PathBuf>) -> Self {
        let mount_point = mount_point.into();
        let depth = depth_of(&mount_point);
        Self {
            device: device.into(),
            mount_point,
            depth,
            fstype: None,
        }
    }

    /// Same as [`MountSpec::new`] with an explicit filesystem type
    pub fn with_fstype(
        device: impl Into<String>,
        mount_point: impl Into<PathBuf>,
        fstype: impl Into<String>,
    ) -> Self {
        let mut spec = Self::new(device, mount_point);
        spec.fstype = Some(fstype.into());
        spec
    }
}

/// Nesting depth of a mount point: separator count after trimming any
/// trailing slash, so `/boot` and `/boot/` agree.
pub fn depth_of(mount_point: &Path) -> u32 {
    let s = mount_point.to_string_lossy();
    let trimmed = if s.len() > 1 {
        s.trim_end_matches('/')
    } else {
        &s
    };
    if trimmed == "/" || trimmed.is_empty() {
        return 0;
    }
    trimmed.matches('/').count() as u32
}

/// Runtime record of an active attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountedFilesystem {
    /// Real mount point in the initramfs tree
    pub mount_point: PathBuf,

    /// Device node the filesystem came from
    pub device: String,

    /// Depth the spec carried; drives unmount ordering
    pub depth: u32,
}
