// SPDX-License-Identifier: GPL-3.0-only

//! Storage resolution and mount orchestration for the rexboot loader
//!
//! This crate is the engine behind boot-target selection:
//!
//! - **registry**: enumerate and identify block devices with no prior
//!   knowledge of their names
//! - **mounts**: attach a target's mount list in depth order, all or nothing
//! - **vfs**: translate `(device)path` references into real paths
//! - **grub**: convert a legacy bootloader's device map and menu into
//!   targets this loader can boot
//!
//! All state a boot attempt accumulates — the live mount table, the VFS root
//! device, the foreign device map — lives in [`BootContext`], constructed
//! once and threaded through every call. Single-threaded by design: boot
//! happens once per power cycle, and the only wait anywhere is the
//! keypress-cancellable device poll.

pub mod context;
pub mod error;
pub mod grub;
pub mod mounts;
pub mod registry;
pub mod vfs;

pub use context::{BootContext, DEVICE_POLL_INTERVAL};
pub use error::{BootError, Result};
pub use grub::{DiskFamily, GrubEnv};
pub use mounts::{mount_all, unmount_all, MountTable, Mounter, SysMounter};
pub use registry::{match_disk, BlockDeviceSource, DiskRegistry, StaticSource, SysSource};
pub use vfs::{translate, VPath, DEV_DEBUG, DEV_ROOTFS};
