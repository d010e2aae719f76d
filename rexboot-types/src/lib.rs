// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for the rexboot loader
//!
//! This crate defines the single source of truth for the boot domain types.
//! The models are used throughout the stack:
//!
//! - **rexboot-sys**: fills in `Disk` metadata from raw superblock bytes
//! - **rexboot-core**: resolves, mounts and materializes these types
//! - configuration loading and the menu/shell collaborators consume
//!   `Target` lists produced here
//!
//! Nothing in this crate touches the system; it is pure data.

pub mod common;
pub mod disk;
pub mod mount;
pub mod target;

// Re-export all public types
pub use common::*;
pub use disk::*;
pub use mount::*;
pub use target::*;
