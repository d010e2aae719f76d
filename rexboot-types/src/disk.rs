//! Block device and filesystem-type models
//!
//! A `Disk` is one physical or logical block device as reported by the
//! kernel. Disks are enumerated fresh on every lookup (device presence is
//! asynchronous — removable media, slow buses); a `Disk` value lives for the
//! duration of a single lookup and is owned by the caller.

use serde::{Deserialize, Serialize};

use crate::bytes_to_pretty;

/// Filesystem families the loader can identify from raw superblock bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsType {
    Ext2,
    Ext3,
    Ext4,
    Iso9660,
    Vfat,
    Ntfs,
    Reiserfs,
    Minix,
    Xfs,
    /// Explicit override from a `fstype:` qualified identifier; passed to the
    /// kernel verbatim.
    Other(String),
}

impl FsType {
    /// The name the kernel expects as a mount source type
    pub fn as_str(&self) -> &str {
        match self {
            FsType::Ext2 => "ext2",
            FsType::Ext3 => "ext3",
            FsType::Ext4 => "ext4",
            FsType::Iso9660 => "iso9660",
            FsType::Vfat => "vfat",
            FsType::Ntfs => "ntfs",
            FsType::Reiserfs => "reiserfs",
            FsType::Minix => "minix",
            FsType::Xfs => "xfs",
            FsType::Other(name) => name,
        }
    }

    /// Parse a user-supplied type name; unknown names are kept verbatim
    /// so the kernel gets the final say.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ext2" => FsType::Ext2,
            "ext3" => FsType::Ext3,
            "ext4" => FsType::Ext4,
            "iso9660" => FsType::Iso9660,
            "vfat" | "fat" | "msdos" => FsType::Vfat,
            "ntfs" => FsType::Ntfs,
            "reiserfs" => FsType::Reiserfs,
            "minix" => FsType::Minix,
            "xfs" => FsType::Xfs,
            other => FsType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for FsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block device known to the kernel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// Stable kernel name (e.g. "sda1")
    pub name: String,

    /// Device major number
    pub major: u32,

    /// Device minor number
    pub minor: u32,

    /// Filesystem label, if the superblock carries one
    pub label: Option<String>,

    /// Filesystem UUID / volume serial, if the superblock carries one
    pub uuid: Option<String>,

    /// Probed or overridden filesystem type (None = unknown)
    pub fstype: Option<FsType>,

    /// Total size in bytes
    pub size: u64,
}

impl Disk {
    /// Path of the device node under /dev
    pub fn dev_path(&self) -> String {
        format!("/dev/{}", self.name)
    }

    /// Human-readable size for menu and log output
    pub fn display_size(&self) -> String {
        bytes_to_pretty(self.size)
    }
}
