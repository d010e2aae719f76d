// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system operations for the rexboot loader
//!
//! This crate is the only place that touches the kernel directly:
//! - block-device table parsing and device-node creation
//! - raw superblock reads for filesystem-type detection and label/UUID probing
//! - `mount(2)`/`umount(2)` wrappers (always read-only)
//! - console keypress polling for cancellable device waits
//!
//! Everything here runs as PID 1 inside the initramfs and therefore assumes
//! root; there is no privilege negotiation.

pub mod blockdev;
pub mod console;
pub mod detect;
pub mod error;
pub mod mount;
pub mod probe;

pub use blockdev::{ensure_device_node, list_block_devices, BlockDevice};
pub use console::key_pending;
pub use detect::detect;
pub use error::{Result, SysError};
pub use mount::{mount_readonly, unmount};
pub use probe::{probe_ids, FsIds};
