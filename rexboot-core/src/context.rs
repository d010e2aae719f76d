// SPDX-License-Identifier: GPL-3.0-only

//! Boot context: the one object threaded through resolution and mounting
//!
//! The current VFS root device, the live mounted set, and the GRUB device
//! map are process state that used to be module-level globals in loaders of
//! this kind. Holding them in one explicitly passed context keeps the
//! rollback contract checkable: a failed `mount_all` must leave
//! `ctx.mounts` exactly as it found it.

use std::time::Duration;

use rexboot_types::Disk;

use crate::grub::{foreign_device_to_node, GrubEnv};
use crate::mounts::{MountTable, Mounter, SysMounter};
use crate::registry::DiskRegistry;

/// Interval between rounds of the cancellable device wait
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct BootContext {
    pub registry: DiskRegistry,
    pub mounts: MountTable,
    pub grub: GrubEnv,
    pub(crate) mounter: Box<dyn Mounter>,
    pub(crate) cancel: Box<dyn Fn() -> bool>,
    pub poll_interval: Duration,
    root: Option<String>,
}

impl BootContext {
    /// Context over the real kernel: `/proc/partitions`, `mount(2)`, and
    /// console keypress cancellation.
    pub fn system() -> Self {
        Self::new(DiskRegistry::system(), Box::new(SysMounter))
            .with_cancel(Box::new(rexboot_sys::key_pending))
    }

    /// Context with injected registry and mounter. The default cancel hook
    /// always fires, so device waits make exactly one attempt.
    pub fn new(registry: DiskRegistry, mounter: Box<dyn Mounter>) -> Self {
        Self {
            registry,
            mounts: MountTable::default(),
            grub: GrubEnv::default(),
            mounter,
            cancel: Box::new(|| true),
            poll_interval: DEVICE_POLL_INTERVAL,
            root: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Box<dyn Fn() -> bool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set the VFS root device for this boot attempt. Called once whenever a
    /// new root is chosen; bare `/path` vpaths resolve against it.
    pub fn set_root(&mut self, device: impl Into<String>) {
        self.root = Some(device.into());
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Resolve a device reference: registry lookup first, then the GRUB
    /// device-map fallback for foreign bootloader tokens.
    pub fn resolve_device(&self, identifier: &str) -> Option<Disk> {
        if let Some(disk) = self.registry.find(identifier) {
            return Some(disk);
        }

        let disks = self.registry.enumerate();
        let node = foreign_device_to_node(&self.grub, &disks, identifier)?;
        tracing::debug!(identifier, node, "translated foreign device token");
        crate::registry::match_disk(&disks, &node)
    }

    /// Like [`resolve_device`](Self::resolve_device) but polls for the
    /// device until it appears or the cancel hook fires.
    pub(crate) fn resolve_device_wait(&self, identifier: &str) -> Option<Disk> {
        loop {
            if let Some(disk) = self.resolve_device(identifier) {
                return Some(disk);
            }
            if (self.cancel)() {
                tracing::info!(identifier, "device wait cancelled");
                return None;
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}
