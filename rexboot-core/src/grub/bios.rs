// SPDX-License-Identifier: GPL-3.0-only

//! BIOS disk-numbering emulation
//!
//! A legacy menu may say `(hd2)` for a disk its device map never lists. The
//! BIOS assigned that ordinal at a time we cannot observe, so the ordering
//! is reconstructed heuristically: walk the live disk list family by family
//! (the configured first family, then the other), bare disks only, in
//! ascending trailing-index order, counting until the requested ordinal.
//! This is the most platform-divergent piece of translation, which is why it
//! lives here as a pure function instead of inline in the path resolver.

use rexboot_types::Disk;
use serde::{Deserialize, Serialize};

/// Disk naming family a BIOS would have scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskFamily {
    /// IDE-style names: hda, hdb, ...
    Ide,
    /// SCSI/SATA-style names: sda, sdb, ...
    Scsi,
}

impl Default for DiskFamily {
    // Real BIOSes numbered IDE channels before add-in SCSI controllers
    fn default() -> Self {
        DiskFamily::Ide
    }
}

impl DiskFamily {
    fn prefix(self) -> &'static str {
        match self {
            DiskFamily::Ide => "hd",
            DiskFamily::Scsi => "sd",
        }
    }

    pub fn other(self) -> Self {
        match self {
            DiskFamily::Ide => DiskFamily::Scsi,
            DiskFamily::Scsi => DiskFamily::Ide,
        }
    }
}

/// Trailing-letter index of a bare disk in a family: `sda` -> 0, `sdb` -> 1,
/// `sdaa` -> 26. Partitions (trailing digits) do not count.
fn bare_index(name: &str, family: DiskFamily) -> Option<u64> {
    let suffix = name.strip_prefix(family.prefix())?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_lowercase()) {
        return None;
    }
    let mut index: u64 = 0;
    for b in suffix.bytes() {
        index = index * 26 + u64::from(b - b'a') + 1;
    }
    Some(index - 1)
}

/// Resolve BIOS disk ordinal `n` against the live disk list. Scans the
/// first family in ascending index order, restarting the scan while indices
/// still advance, then falls through to the other family; the `n`th bare
/// disk encountered is the answer.
pub fn nth_bios_disk(disks: &[Disk], first: DiskFamily, ordinal: u64) -> Option<String> {
    let mut count: u64 = 0;

    for family in [first, first.other()] {
        let mut last: Option<u64> = None;
        loop {
            let next = disks
                .iter()
                .filter_map(|d| bare_index(&d.name, family).map(|i| (i, &d.name)))
                .filter(|(i, _)| last.map_or(true, |l| *i > l))
                .min_by_key(|(i, _)| *i);

            let Some((index, name)) = next else {
                break;
            };
            if count == ordinal {
                return Some(name.clone());
            }
            count += 1;
            last = Some(index);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rexboot_types::FsType;

    fn disk(name: &str) -> Disk {
        Disk {
            name: name.to_string(),
            major: 8,
            minor: 0,
            label: None,
            uuid: None,
            fstype: Some(FsType::Ext4),
            size: 1024 * 1024,
        }
    }

    #[test]
    fn bare_index_ignores_partitions() {
        assert_eq!(bare_index("sda", DiskFamily::Scsi), Some(0));
        assert_eq!(bare_index("sdc", DiskFamily::Scsi), Some(2));
        assert_eq!(bare_index("sdaa", DiskFamily::Scsi), Some(26));
        assert_eq!(bare_index("sda1", DiskFamily::Scsi), None);
        assert_eq!(bare_index("hda", DiskFamily::Scsi), None);
    }

    #[test]
    fn first_family_wins_ordinals_when_present() {
        let disks = vec![disk("hda"), disk("sda"), disk("hdb")];
        assert_eq!(
            nth_bios_disk(&disks, DiskFamily::Ide, 0),
            Some("hda".into())
        );
        assert_eq!(
            nth_bios_disk(&disks, DiskFamily::Ide, 1),
            Some("hdb".into())
        );
        assert_eq!(
            nth_bios_disk(&disks, DiskFamily::Ide, 2),
            Some("sda".into())
        );
    }

    #[test]
    fn falls_through_to_second_family_when_first_is_empty() {
        // three SCSI disks, zero IDE, first family configured IDE
        let disks = vec![disk("sdb"), disk("sda"), disk("sdc"), disk("sda1")];
        assert_eq!(
            nth_bios_disk(&disks, DiskFamily::Ide, 2),
            Some("sdc".into())
        );
    }

    #[test]
    fn ordinal_past_the_end_is_none() {
        let disks = vec![disk("sda")];
        assert_eq!(nth_bios_disk(&disks, DiskFamily::Ide, 1), None);
    }

    #[test]
    fn scan_order_is_ascending_index_not_list_order() {
        let disks = vec![disk("sdc"), disk("sda")];
        assert_eq!(
            nth_bios_disk(&disks, DiskFamily::Scsi, 0),
            Some("sda".into())
        );
        assert_eq!(
            nth_bios_disk(&disks, DiskFamily::Scsi, 1),
            Some("sdc".into())
        );
    }
}
