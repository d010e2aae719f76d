// SPDX-License-Identifier: GPL-3.0-only

//! GRUB legacy compatibility layer
//!
//! Converts a foreign bootloader's view of the world — `(hd0,1)` tokens, a
//! `device.map`, a `menu.lst` — into this loader's target/mount model. The
//! layer mounts the foreign boot volume read-only, parses both files,
//! materializes targets, and leaves the mount set exactly as it found it.
//! The parsed device map stays in the boot context afterwards so the VFS
//! resolver can fall back to it for foreign tokens.

pub mod bios;
pub mod device_map;
pub mod menu;

use std::path::{Path, PathBuf};

use rexboot_types::{Disk, MountSpec, Target};

pub use bios::{nth_bios_disk, DiskFamily};
pub use device_map::{parse_device_map, GrubDeviceMapEntry};
pub use menu::{parse_menu, GrubMenu};

use crate::context::BootContext;
use crate::error::{BootError, Result};
use crate::mounts;

/// Fixed internal mount point for the foreign boot volume
pub const GRUB_MOUNT_POINT: &str = "/mnt/grub";

const DEVICE_MAP_PATH: &str = "boot/grub/device.map";
const MENU_PATHS: [&str; 2] = ["boot/grub/menu.lst", "boot/grub/grub.conf"];

/// GRUB translation state carried by the boot context
#[derive(Debug, Default)]
pub struct GrubEnv {
    /// Token table from the last loaded device map
    pub device_map: Vec<GrubDeviceMapEntry>,

    /// Which disk family the machine's BIOS would have numbered first
    pub first_family: DiskFamily,
}

/// Translate a foreign device token to a device node path.
///
/// Order of attempts: exact device-map hit; disk-with-partition synthesis
/// over a mapped bare disk (GRUB partitions are 0-based, Linux names are
/// 1-based); floppy references; BIOS ordinal emulation over the live disk
/// list for unmapped bare disks. `None` means the token is not foreign
/// syntax this layer understands.
pub fn foreign_device_to_node(env: &GrubEnv, disks: &[Disk], token: &str) -> Option<String> {
    let inner = device_map::strip_parens(token);

    if let Some(entry) = env.device_map.iter().find(|e| e.token == inner) {
        return Some(entry.device.clone());
    }

    let (base, partition) = match inner.split_once(',') {
        Some((base, part)) => match part.parse::<u64>() {
            Ok(part) => (base, Some(part)),
            Err(_) => return None,
        },
        None => (inner, None),
    };

    if let Some(partition) = partition {
        if let Some(entry) = env.device_map.iter().find(|e| e.token == base) {
            return Some(format!("{}{}", entry.device, partition + 1));
        }
    }

    if let Some(unit) = base.strip_prefix("fd") {
        if unit.bytes().all(|b| b.is_ascii_digit()) && !unit.is_empty() {
            return Some(format!("/dev/fd{}", unit));
        }
    }

    let ordinal = base.strip_prefix("hd")?.parse::<u64>().ok()?;
    let name = nth_bios_disk(disks, env.first_family, ordinal)?;
    match partition {
        Some(partition) => Some(format!("/dev/{}{}", name, partition + 1)),
        None => Some(format!("/dev/{}", name)),
    }
}

/// Load a legacy GRUB configuration from a boot volume.
///
/// The volume is mounted read-only (reusing a live mount when one exists),
/// `device.map` and the menu file are parsed, targets are materialized, and
/// any mount this call performed is detached again before returning. The
/// device map is left in `ctx.grub` for later token translation.
pub fn load(ctx: &mut BootContext, boot_volume: &str) -> Result<Vec<Target>> {
    let disk = ctx
        .resolve_device_wait(boot_volume)
        .ok_or_else(|| BootError::DeviceNotFound(boot_volume.to_string()))?;

    let (volume_root, mounted_here) = match ctx.mounts.point_of(&disk.dev_path()) {
        Some(point) => (point.to_path_buf(), false),
        None => {
            let spec = MountSpec::new(disk.name.clone(), GRUB_MOUNT_POINT);
            mounts::mount_all(ctx, &[spec])?;
            (PathBuf::from(GRUB_MOUNT_POINT), true)
        }
    };

    let targets = load_from(ctx, &volume_root);

    if mounted_here {
        // leave the mount set exactly as we found it
        mounts::unmount_point(ctx, Path::new(GRUB_MOUNT_POINT));
    }

    targets
}

fn load_from(ctx: &mut BootContext, volume_root: &Path) -> Result<Vec<Target>> {
    match std::fs::read_to_string(volume_root.join(DEVICE_MAP_PATH)) {
        Ok(text) => ctx.grub.device_map = parse_device_map(&text),
        Err(err) => {
            tracing::debug!(%err, "no readable device map, translating without one");
            ctx.grub.device_map.clear();
        }
    }

    let menu_text = MENU_PATHS
        .iter()
        .find_map(|rel| std::fs::read_to_string(volume_root.join(rel)).ok());
    let Some(menu_text) = menu_text else {
        tracing::warn!(volume = %volume_root.display(), "boot volume carries no menu file");
        return Ok(Vec::new());
    };

    let disks = ctx.registry.enumerate();
    let menu = parse_menu(&ctx.grub, &disks, &menu_text);
    tracing::info!(targets = menu.targets.len(), "legacy menu loaded");
    Ok(menu.targets)
}
