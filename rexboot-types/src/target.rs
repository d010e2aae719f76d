//! Boot target models
//!
//! A `Target` is one complete bootable configuration: kernel, optional
//! initrd, mounts, modules and flags. Targets are immutable once built;
//! configuration loading and the GRUB compatibility layer construct them
//! through `TargetBuilder`, the menu/shell collaborator displays them, and
//! the re-exec collaborator consumes the resolved paths.

use serde::{Deserialize, Serialize};

use crate::MountSpec;

/// A kernel module to load with the target: device-qualified path plus
/// optional argument string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// vpath of the module object
    pub path: String,

    /// Argument string passed to the module, if any
    pub args: Option<String>,
}

/// Display/behavior flags carried by a target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFlags {
    /// Boot this target when the menu times out
    pub default: bool,

    /// Reset the display mode before handing over
    pub reset_vga: bool,
}

/// One bootable entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Menu title
    pub title: String,

    /// Kernel image, as a vpath
    pub kernel: String,

    /// Initrd image, as a vpath
    pub initrd: Option<String>,

    /// Kernel command line appended after the loader defaults
    pub append: Option<String>,

    /// Full replacement command line; wins over `append` when both are set
    pub cmdline: Option<String>,

    pub flags: TargetFlags,

    /// Mounts this target needs, in configuration order
    pub mounts: Vec<MountSpec>,

    /// Kernel modules to load, in configuration order
    pub modules: Vec<Module>,
}

impl Target {
    /// Device reference that becomes the VFS root for this target: the
    /// shallowest mount's device, if the target carries any mounts.
    pub fn root_device(&self) -> Option<&str> {
        self.mounts
            .iter()
            .min_by_key(|m| m.depth)
            .map(|m| m.device.as_str())
    }
}

/// Title used for stanzas that reached a kernel but never a `title` line
pub const UNTITLED: &str = "Unknown";

/// Explicit parser state for one in-progress target.
///
/// Configuration loading and the GRUB menu parser hold an
/// `Option<TargetBuilder>`, fill it line by line, and finalize it into an
/// immutable `Target` at each stanza boundary. The builder is consumed by
/// `build`; there is no reuse or reset of a partially filled record.
#[derive(Debug, Clone, Default)]
pub struct TargetBuilder {
    pub title: Option<String>,
    pub kernel: Option<String>,
    pub initrd: Option<String>,
    pub append: Option<String>,
    pub cmdline: Option<String>,
    pub flags: TargetFlags,
    pub mounts: Vec<MountSpec>,
    pub modules: Vec<Module>,
}

impl TargetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing at all was collected; an empty builder at a stanza
    /// boundary is silently discarded rather than diagnosed.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.kernel.is_none()
            && self.initrd.is_none()
            && self.mounts.is_empty()
            && self.modules.is_empty()
    }

    /// Finalize into a target. Returns None when no kernel was collected;
    /// the caller decides whether that deserves a diagnostic.
    pub fn build(self) -> Option<Target> {
        let kernel = self.kernel?;
        Some(Target {
            title: self.title.unwrap_or_else(|| UNTITLED.to_string()),
            kernel,
            initrd: self.initrd,
            append: self.append,
            cmdline: self.cmdline,
            flags: self.flags,
            mounts: self.mounts,
            modules: self.modules,
        })
    }
}
