// SPDX-License-Identifier: GPL-3.0-only

//! Block-device table access
//!
//! The kernel's `/proc/partitions` is the only partition-table knowledge the
//! loader has; anything the kernel did not enumerate does not exist for us.
//! An initramfs usually has no udev, so device nodes for enumerated disks
//! may be missing and are created on demand.

use std::path::{Path, PathBuf};

use nix::sys::stat::{makedev, mknod, Mode, SFlag};

use crate::error::{Result, SysError};

const PROC_PARTITIONS: &str = "/proc/partitions";

/// One row of the kernel block-device table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    pub name: String,
    pub major: u32,
    pub minor: u32,
    /// Size in 1 KiB blocks, as reported by the kernel
    pub blocks: u64,
}

impl BlockDevice {
    pub fn size_bytes(&self) -> u64 {
        self.blocks * 1024
    }
}

/// Device families that never hold a boot volume
fn is_virtual(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram")
}

/// Parse the text of `/proc/partitions`, skipping the header, virtual
/// devices, and extended-partition placeholders (which report one block).
pub fn parse_partitions(table: &str) -> Vec<BlockDevice> {
    let mut devices = Vec::new();

    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let (Some(major), Some(minor), Some(blocks), Some(name)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        // The header line ("major minor #blocks name") fails the numeric
        // parse and falls through here like any other noise.
        let (Ok(major), Ok(minor), Ok(blocks)) =
            (major.parse::<u32>(), minor.parse::<u32>(), blocks.parse::<u64>())
        else {
            continue;
        };

        if blocks <= 1 || is_virtual(name) {
            continue;
        }

        devices.push(BlockDevice {
            name: name.to_string(),
            major,
            minor,
            blocks,
        });
    }

    devices
}

/// Read the live block-device table
pub fn list_block_devices() -> Result<Vec<BlockDevice>> {
    let table = std::fs::read_to_string(PROC_PARTITIONS)?;
    Ok(parse_partitions(&table))
}

/// Make sure `/dev/<name>` exists for a device, creating the node when the
/// initramfs does not carry it. Returns the node path.
pub fn ensure_device_node(dev: &BlockDevice) -> Result<PathBuf> {
    let node = Path::new("/dev").join(&dev.name);
    if node.exists() {
        return Ok(node);
    }

    tracing::debug!(node = %node.display(), "creating missing device node");
    mknod(
        &node,
        SFlag::S_IFBLK,
        Mode::from_bits_truncate(0o600),
        makedev(dev.major as u64, dev.minor as u64),
    )
    .map_err(|source| SysError::NodeCreation {
        node: node.display().to_string(),
        source,
    })?;

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "major minor  #blocks  name

   8        0  976762584 sda
   8        1     524288 sda1
   8        2  976236544 sda2
   7        0      65536 loop0
   1        0      16384 ram0
   8       16          1 sdb
";

    #[test]
    fn parses_real_rows_and_skips_header() {
        let devs = parse_partitions(SAMPLE);
        let names: Vec<_> = devs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["sda", "sda1", "sda2"]);
        assert_eq!(devs[1].major, 8);
        assert_eq!(devs[1].minor, 1);
        assert_eq!(devs[1].size_bytes(), 524288 * 1024);
    }

    #[test]
    fn skips_virtual_and_placeholder_devices() {
        let devs = parse_partitions(SAMPLE);
        assert!(devs.iter().all(|d| !d.name.starts_with("loop")));
        assert!(devs.iter().all(|d| !d.name.starts_with("ram")));
        // sdb reports a single block (extended-partition placeholder)
        assert!(devs.iter().all(|d| d.name != "sdb"));
    }

    #[test]
    fn empty_table_yields_no_devices() {
        assert!(parse_partitions("").is_empty());
    }
}
