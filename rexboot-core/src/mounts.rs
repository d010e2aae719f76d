// SPDX-License-Identifier: GPL-3.0-only

//! Depth-ordered mount orchestration with all-or-nothing rollback
//!
//! Specs mount in ascending depth order (a depth-1 point only exists once
//! its depth-0 parent is attached) and unmount in descending order. A
//! failure anywhere unwinds every mount this call performed, deepest first:
//! the live set after a failed `mount_all` equals the live set before it.
//!
//! Per-spec state machine: `Pending -> Mounted -> Unmounted`, or
//! `Pending -> MountFailed`. A spec never moves from `Mounted` to
//! `MountFailed`.

use std::path::{Path, PathBuf};

use rexboot_types::{depth_of, Disk, FsType, MountSpec, MountedFilesystem};

use crate::context::BootContext;
use crate::error::{BootError, Result};

/// The live mounted set. Process-wide, owned by the context, mutated only
/// here; the VFS resolver consults it instead of re-deriving it so a shared
/// device is never mounted twice.
#[derive(Debug, Default)]
pub struct MountTable {
    mounted: Vec<MountedFilesystem>,
}

impl MountTable {
    pub fn iter(&self) -> impl Iterator<Item = &MountedFilesystem> {
        self.mounted.iter()
    }

    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    /// Mount point a device is currently attached at, if any
    pub fn point_of(&self, device: &str) -> Option<&Path> {
        self.mounted
            .iter()
            .find(|m| m.device == device)
            .map(|m| m.mount_point.as_path())
    }

    pub fn contains(&self, device: &str, mount_point: &Path) -> bool {
        self.mounted
            .iter()
            .any(|m| m.device == device && m.mount_point == mount_point)
    }

    fn push(&mut self, mount: MountedFilesystem) {
        self.mounted.push(mount);
    }

    fn remove(&mut self, mount_point: &Path) {
        self.mounted.retain(|m| m.mount_point != mount_point);
    }

    /// Live records ordered deepest-first, the only safe unmount order
    fn deepest_first(&self) -> Vec<MountedFilesystem> {
        let mut order = self.mounted.clone();
        // Stable sort: equal depths detach in reverse mount order
        order.reverse();
        order.sort_by(|a, b| b.depth.cmp(&a.depth));
        order
    }
}

/// Seam to the actual mount syscalls. Production goes through
/// `rexboot-sys`; tests record calls and inject failures.
pub trait Mounter {
    fn mount_readonly(
        &mut self,
        device: &str,
        mount_point: &Path,
        fstype: &str,
    ) -> rexboot_sys::Result<()>;

    fn unmount(&mut self, mount_point: &Path) -> rexboot_sys::Result<()>;

    /// Create the mount-point directory if it is absent
    fn prepare_mount_point(&mut self, mount_point: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(mount_point)
    }
}

pub struct SysMounter;

impl Mounter for SysMounter {
    fn mount_readonly(
        &mut self,
        device: &str,
        mount_point: &Path,
        fstype: &str,
    ) -> rexboot_sys::Result<()> {
        rexboot_sys::mount_readonly(device, mount_point, fstype)
    }

    fn unmount(&mut self, mount_point: &Path) -> rexboot_sys::Result<()> {
        rexboot_sys::unmount(mount_point)
    }
}

/// Pick the filesystem type for a spec: explicit override first, then the
/// enumeration probe, then a direct detector pass on the node.
fn fstype_for(spec: &MountSpec, disk: &Disk, node: &Path) -> Option<FsType> {
    if let Some(name) = &spec.fstype {
        if name != "auto" {
            return Some(FsType::from_name(name));
        }
    }
    if let Some(fstype) = &disk.fstype {
        return Some(fstype.clone());
    }
    rexboot_sys::detect(node)
}

/// Mount one spec. `Ok(Some)` is a fresh attachment, `Ok(None)` means the
/// point was already attached (idempotent success).
fn mount_one(ctx: &mut BootContext, spec: &MountSpec) -> Result<Option<MountedFilesystem>> {
    let disk = ctx
        .resolve_device_wait(&spec.device)
        .ok_or_else(|| BootError::DeviceNotFound(spec.device.clone()))?;

    if ctx.mounts.contains(&disk.dev_path(), &spec.mount_point) {
        tracing::debug!(device = %disk.name, point = %spec.mount_point.display(),
            "already mounted, skipping");
        return Ok(None);
    }

    let node = PathBuf::from(disk.dev_path());
    let fstype = fstype_for(spec, &disk, &node)
        .ok_or_else(|| BootError::UnknownFilesystem(spec.device.clone()))?;

    ctx.mounter
        .prepare_mount_point(&spec.mount_point)
        .map_err(|err| BootError::MountFailed {
            device: disk.name.clone(),
            reason: format!("cannot create mount point: {err}"),
        })?;

    match ctx
        .mounter
        .mount_readonly(&node.to_string_lossy(), &spec.mount_point, fstype.as_str())
    {
        Ok(()) => {}
        Err(err) if err.is_busy() => {
            // Someone else already holds this point; not ours to track
            tracing::debug!(device = %disk.name, point = %spec.mount_point.display(),
                "mount point busy, treating as mounted");
            return Ok(None);
        }
        Err(err) => {
            return Err(BootError::MountFailed {
                device: disk.name.clone(),
                reason: err.to_string(),
            });
        }
    }

    tracing::info!(device = %disk.name, point = %spec.mount_point.display(),
        %fstype, "mounted read-only");

    let record = MountedFilesystem {
        mount_point: spec.mount_point.clone(),
        device: node.to_string_lossy().into_owned(),
        depth: spec.depth,
    };
    ctx.mounts.push(record.clone());
    Ok(Some(record))
}

/// Unwind the mounts of one failed `mount_all` call, deepest first. A
/// failing unmount is retried once; if it still fails the record stays in
/// the table (the filesystem really is still attached) and the original
/// mount error is what the caller sees.
fn rollback(ctx: &mut BootContext, attached: &mut Vec<MountedFilesystem>) {
    let mut stuck = 0;
    while let Some(record) = attached.pop() {
        let result = ctx
            .mounter
            .unmount(&record.mount_point)
            .or_else(|_| ctx.mounter.unmount(&record.mount_point));
        match result {
            Ok(()) => ctx.mounts.remove(&record.mount_point),
            Err(err) => {
                stuck += 1;
                tracing::error!(point = %record.mount_point.display(), %err,
                    "rollback unmount failed");
            }
        }
    }
    if stuck > 0 {
        // Internal condition only; the caller still gets the mount error
        let partial = BootError::PartialMountRollback(stuck);
        tracing::error!(%partial, "mount state not fully restored");
    }
}

/// Mount every spec in the list, ascending by depth, or mount nothing.
///
/// Within a depth level, specs mount in list order. A spec whose device is
/// already attached at its point is an idempotent success — two targets may
/// share a device. Any failure unwinds this call's mounts before the error
/// returns.
pub fn mount_all(ctx: &mut BootContext, specs: &[MountSpec]) -> Result<()> {
    let mut ordered: Vec<&MountSpec> = specs.iter().collect();
    ordered.sort_by_key(|s| s.depth);

    let mut attached: Vec<MountedFilesystem> = Vec::new();
    for spec in ordered {
        match mount_one(ctx, spec) {
            Ok(Some(record)) => attached.push(record),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(device = %spec.device, point = %spec.mount_point.display(),
                    %err, "mount failed, rolling back");
                rollback(ctx, &mut attached);
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Detach the whole live set, deepest first, best-effort.
///
/// Unmount failures are logged and skipped — the device may be pinned by an
/// open file handle outside this system's control — so shallower points
/// still get their chance. Never fails.
pub fn unmount_all(ctx: &mut BootContext) {
    for record in ctx.mounts.deepest_first() {
        match ctx.mounter.unmount(&record.mount_point) {
            Ok(()) => {
                tracing::info!(point = %record.mount_point.display(), "unmounted");
                ctx.mounts.remove(&record.mount_point);
            }
            Err(err) => {
                tracing::warn!(point = %record.mount_point.display(), %err,
                    "unmount failed, continuing");
            }
        }
    }
}

/// Detach a single point and drop its record. Used by excursions (the GRUB
/// loader) that must leave the mount set as they found it.
pub(crate) fn unmount_point(ctx: &mut BootContext, point: &Path) {
    match ctx.mounter.unmount(point) {
        Ok(()) => ctx.mounts.remove(point),
        Err(err) => {
            tracing::warn!(point = %point.display(), %err, "unmount failed");
        }
    }
}

/// Make sure a disk is attached somewhere, mounting it on demand at
/// `/mnt/<name>` when the live table has no record of it. Used by the VFS
/// resolver; the table is consulted, never re-derived.
pub(crate) fn ensure_mounted(ctx: &mut BootContext, disk: &Disk) -> Result<PathBuf> {
    if let Some(point) = ctx.mounts.point_of(&disk.dev_path()) {
        return Ok(point.to_path_buf());
    }

    let point = PathBuf::from("/mnt").join(&disk.name);
    let spec = MountSpec {
        device: disk.name.clone(),
        mount_point: point.clone(),
        depth: depth_of(&point),
        fstype: None,
    };
    mount_one(ctx, &spec)?;
    Ok(point)
}
