// SPDX-License-Identifier: GPL-3.0-only

//! Virtual path resolution
//!
//! Boot targets reference files as `(deviceref)/path` — the vpath form —
//! irrespective of which physical device holds them. Translation parses the
//! vpath into a device token plus path segments, resolves the device through
//! the registry (falling back to the GRUB token translator), makes sure the
//! backing filesystem is mounted, and rebuilds a real path from validated
//! segments. Rebuilding from segments, rather than splicing strings, is what
//! keeps `..` handling bounded: climbing stops at the mount root.

use std::path::PathBuf;

use crate::context::BootContext;
use crate::error::{BootError, Result};
use crate::mounts::ensure_mounted;

/// Device reference that disables translation entirely: the path refers to
/// the loader's own initramfs and is returned unchanged.
pub const DEV_DEBUG: &str = "debug";

/// Device reference for the initramfs root. Resolves under `/` without any
/// registry lookup or mount.
pub const DEV_ROOTFS: &str = "rootfs";

/// A parsed vpath: optional device token plus the raw remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VPath {
    pub device: Option<String>,
    pub path: String,
}

impl VPath {
    /// Parse `(deviceref)/path` or bare `/path`. The only syntax errors are
    /// an unterminated or empty device token.
    pub fn parse(raw: &str) -> Result<Self> {
        let Some(rest) = raw.strip_prefix('(') else {
            return Ok(Self {
                device: None,
                path: raw.to_string(),
            });
        };

        let Some(close) = rest.find(')') else {
            return Err(BootError::InvalidVPath(raw.to_string()));
        };
        let device = &rest[..close];
        if device.is_empty() {
            return Err(BootError::InvalidVPath(raw.to_string()));
        }

        Ok(Self {
            device: Some(device.to_string()),
            path: rest[close + 1..].to_string(),
        })
    }
}

/// Collapse a vpath remainder into clean segments: empty and `.` segments
/// drop, `..` pops the previous segment and is a no-op with nothing left to
/// pop — a path can never climb above its mount root.
fn clean_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments
}

fn rebuild(base: PathBuf, path: &str) -> PathBuf {
    let mut real = base;
    for segment in clean_segments(path) {
        real.push(segment);
    }
    real
}

/// Translate a vpath into a real filesystem path, mounting the backing
/// device on demand.
///
/// The device token defaults to the context's root device; no token and no
/// root is `NoDeviceContext`. The first specific cause encountered is the
/// one surfaced: syntax, missing context, device-not-found, or a propagated
/// mount failure.
pub fn translate(ctx: &mut BootContext, raw: &str) -> Result<PathBuf> {
    let vpath = VPath::parse(raw)?;

    let device = match vpath.device {
        Some(device) => device,
        None => ctx
            .root()
            .map(str::to_string)
            .ok_or(BootError::NoDeviceContext)?,
    };

    if device == DEV_DEBUG {
        return Ok(PathBuf::from(vpath.path));
    }
    if device == DEV_ROOTFS {
        return Ok(rebuild(PathBuf::from("/"), &vpath.path));
    }

    let disk = ctx
        .resolve_device(&device)
        .ok_or_else(|| BootError::DeviceNotFound(device.clone()))?;
    let mount_point = ensure_mounted(ctx, &disk)?;

    Ok(rebuild(mount_point, &vpath.path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mounts::Mounter;
    use crate::registry::{DiskRegistry, StaticSource};
    use rexboot_types::{Disk, FsType};
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    struct CountingMounter(Rc<RefCell<usize>>);

    impl Mounter for CountingMounter {
        fn mount_readonly(
            &mut self,
            _device: &str,
            _mount_point: &Path,
            _fstype: &str,
        ) -> rexboot_sys::Result<()> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }
        fn unmount(&mut self, _mount_point: &Path) -> rexboot_sys::Result<()> {
            Ok(())
        }
        fn prepare_mount_point(&mut self, _p: &Path) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn disk(name: &str, label: &str) -> Disk {
        Disk {
            name: name.to_string(),
            major: 8,
            minor: 1,
            label: Some(label.to_string()),
            uuid: None,
            fstype: Some(FsType::Ext4),
            size: 1024 * 1024,
        }
    }

    fn context(disks: Vec<Disk>) -> (BootContext, Rc<RefCell<usize>>) {
        let count = Rc::new(RefCell::new(0));
        let ctx = BootContext::new(
            DiskRegistry::with_source(Box::new(StaticSource(disks))),
            Box::new(CountingMounter(Rc::clone(&count))),
        );
        (ctx, count)
    }

    #[test]
    fn parse_splits_device_and_path() {
        let vp = VPath::parse("(LABEL=boot)/vmlinuz").unwrap();
        assert_eq!(vp.device.as_deref(), Some("LABEL=boot"));
        assert_eq!(vp.path, "/vmlinuz");

        let vp = VPath::parse("/vmlinuz").unwrap();
        assert_eq!(vp.device, None);
    }

    #[test]
    fn unterminated_and_empty_tokens_are_syntax_errors() {
        assert!(matches!(
            VPath::parse("(sda1/vmlinuz"),
            Err(BootError::InvalidVPath(_))
        ));
        assert!(matches!(
            VPath::parse("()/vmlinuz"),
            Err(BootError::InvalidVPath(_))
        ));
    }

    #[test]
    fn rootfs_sentinel_bypasses_the_orchestrator() {
        let (mut ctx, count) = context(vec![]);
        let real = translate(&mut ctx, "(rootfs)/a/b").unwrap();
        assert_eq!(real, PathBuf::from("/a/b"));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn debug_sentinel_returns_path_unchanged() {
        let (mut ctx, count) = context(vec![]);
        let real = translate(&mut ctx, "(debug)/conf/boot.cfg").unwrap();
        assert_eq!(real, PathBuf::from("/conf/boot.cfg"));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn missing_label_is_device_not_found_with_no_mount() {
        let (mut ctx, count) = context(vec![disk("sda1", "root")]);
        let err = translate(&mut ctx, "(LABEL=boot)/vmlinuz").unwrap_err();
        assert!(matches!(err, BootError::DeviceNotFound(d) if d == "LABEL=boot"));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn device_path_mounts_on_demand_exactly_once() {
        let (mut ctx, count) = context(vec![disk("sda1", "boot")]);
        let real = translate(&mut ctx, "(LABEL=boot)/vmlinuz").unwrap();
        assert_eq!(real, PathBuf::from("/mnt/sda1/vmlinuz"));
        assert_eq!(*count.borrow(), 1);

        // second translation reuses the live mount
        let real = translate(&mut ctx, "(sda1)/initrd.img").unwrap();
        assert_eq!(real, PathBuf::from("/mnt/sda1/initrd.img"));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn bare_path_uses_configured_root() {
        let (mut ctx, _) = context(vec![disk("sda1", "boot")]);
        assert!(matches!(
            translate(&mut ctx, "/vmlinuz"),
            Err(BootError::NoDeviceContext)
        ));

        ctx.set_root("LABEL=boot");
        let real = translate(&mut ctx, "/vmlinuz").unwrap();
        assert_eq!(real, PathBuf::from("/mnt/sda1/vmlinuz"));
    }

    #[test]
    fn parent_segments_cannot_climb_above_the_mount_root() {
        let (mut ctx, _) = context(vec![disk("sda1", "boot")]);
        let real = translate(&mut ctx, "(sda1)/a/../../../b/./c").unwrap();
        assert_eq!(real, PathBuf::from("/mnt/sda1/b/c"));
    }
}
