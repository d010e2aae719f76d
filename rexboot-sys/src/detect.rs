// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem-type detection from raw superblock bytes
//!
//! Fixed-offset magic signatures, checked in a fixed priority order; the set
//! is mutually exclusive in practice, so the first match wins. A device too
//! small to contain a probed offset is silently "no match", as is any read
//! error: detection never raises, and a `None` result means the caller must
//! fail with an explicit unknown-filesystem condition rather than guess.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use rexboot_types::FsType;

// ext superblock lives at byte 1024
const EXT_SUPERBLOCK: u64 = 1024;
const EXT_MAGIC: [u8; 2] = [0x53, 0xEF]; // 0xEF53 little-endian, sb + 56
const EXT_COMPAT_HAS_JOURNAL: u32 = 0x0004;
const EXT_INCOMPAT_EXTENTS: u32 = 0x0040;
const EXT_INCOMPAT_64BIT: u32 = 0x0080;
const EXT_INCOMPAT_FLEX_BG: u32 = 0x0200;

const MINIX_MAGICS: [u16; 4] = [0x137F, 0x138F, 0x2468, 0x2478];

/// Simple fixed-offset signatures, in priority order
const SIGNATURES: &[(u64, &[u8], FsType)] = &[
    (0, b"XFSB", FsType::Xfs),
    (65536 + 52, b"ReIsEr", FsType::Reiserfs),
    (8192 + 52, b"ReIsErFs", FsType::Reiserfs), // old 3.5 location
    (3, b"NTFS", FsType::Ntfs),
    (82, b"FAT32", FsType::Vfat),
    (54, b"FAT", FsType::Vfat),
    (32769, b"CD001", FsType::Iso9660),
];

struct Probe {
    file: File,
    size: u64,
}

impl Probe {
    fn open(path: &Path) -> Option<Self> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "cannot open device for probing");
                return None;
            }
        };
        // Works for both block devices and regular image files
        let size = file.seek(SeekFrom::End(0)).ok()?;
        Some(Self { file, size })
    }

    /// Read `len` bytes at `offset`; None when the device is too small or
    /// the read fails.
    fn read_at(&mut self, offset: u64, len: usize) -> Option<Vec<u8>> {
        if self.size < offset + len as u64 {
            return None;
        }
        let mut buf = vec![0u8; len];
        self.file.seek(SeekFrom::Start(offset)).ok()?;
        self.file.read_exact(&mut buf).ok()?;
        Some(buf)
    }
}

fn u32_le(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// The ext family shares one magic; journal and extent feature bits split
/// ext2/ext3/ext4 the way blkid does.
fn detect_ext(probe: &mut Probe) -> Option<FsType> {
    let sb = probe.read_at(EXT_SUPERBLOCK, 128)?;
    if sb[56..58] != EXT_MAGIC {
        return None;
    }

    let feature_compat = u32_le(&sb, 92);
    let feature_incompat = u32_le(&sb, 96);

    if feature_incompat & (EXT_INCOMPAT_EXTENTS | EXT_INCOMPAT_64BIT | EXT_INCOMPAT_FLEX_BG) != 0 {
        Some(FsType::Ext4)
    } else if feature_compat & EXT_COMPAT_HAS_JOURNAL != 0 {
        Some(FsType::Ext3)
    } else {
        Some(FsType::Ext2)
    }
}

fn detect_minix(probe: &mut Probe) -> Option<FsType> {
    let magic = probe.read_at(1024 + 16, 2)?;
    let magic = u16::from_le_bytes([magic[0], magic[1]]);
    MINIX_MAGICS.contains(&magic).then_some(FsType::Minix)
}

/// Classify the filesystem on a device (or image file) from superblock
/// magics alone. Never raises; `None` means no signature matched.
pub fn detect(path: &Path) -> Option<FsType> {
    let mut probe = Probe::open(path)?;

    if let Some(fstype) = detect_ext(&mut probe) {
        return Some(fstype);
    }

    for (offset, magic, fstype) in SIGNATURES {
        if let Some(bytes) = probe.read_at(*offset, magic.len()) {
            if bytes == *magic {
                return Some(fstype.clone());
            }
        }
    }

    detect_minix(&mut probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn image_with(patches: &[(u64, &[u8])], size: u64) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(size).unwrap();
        for (offset, bytes) in patches {
            file.as_file().seek(SeekFrom::Start(*offset)).unwrap();
            file.as_file().write_all(bytes).unwrap();
        }
        file
    }

    #[test]
    fn too_small_device_is_no_match_not_a_guess() {
        let img = image_with(&[], 3);
        assert_eq!(detect(img.path()), None);
    }

    #[test]
    fn blank_device_matches_nothing() {
        let img = image_with(&[], 128 * 1024);
        assert_eq!(detect(img.path()), None);
    }

    #[test]
    fn plain_ext2_detected() {
        let img = image_with(&[(1024 + 56, &EXT_MAGIC)], 8 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Ext2));
    }

    #[test]
    fn journal_flag_promotes_to_ext3() {
        let compat = EXT_COMPAT_HAS_JOURNAL.to_le_bytes();
        let img = image_with(&[(1024 + 56, &EXT_MAGIC), (1024 + 92, &compat)], 8 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Ext3));
    }

    #[test]
    fn extents_flag_promotes_to_ext4() {
        let compat = EXT_COMPAT_HAS_JOURNAL.to_le_bytes();
        let incompat = EXT_INCOMPAT_EXTENTS.to_le_bytes();
        let img = image_with(
            &[
                (1024 + 56, &EXT_MAGIC),
                (1024 + 92, &compat),
                (1024 + 96, &incompat),
            ],
            8 * 1024,
        );
        assert_eq!(detect(img.path()), Some(FsType::Ext4));
    }

    #[test]
    fn fat_variants_detected() {
        let img = image_with(&[(54, b"FAT16   ")], 4 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Vfat));

        let img = image_with(&[(82, b"FAT32   ")], 4 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Vfat));
    }

    #[test]
    fn iso_and_xfs_and_ntfs_detected() {
        let img = image_with(&[(32769, b"CD001")], 64 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Iso9660));

        let img = image_with(&[(0, b"XFSB")], 4 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Xfs));

        let img = image_with(&[(3, b"NTFS    ")], 4 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Ntfs));
    }

    #[test]
    fn reiser_and_minix_detected() {
        let img = image_with(&[(65536 + 52, b"ReIsEr2Fs")], 128 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Reiserfs));

        let img = image_with(&[(1024 + 16, &0x137Fu16.to_le_bytes())], 4 * 1024);
        assert_eq!(detect(img.path()), Some(FsType::Minix));
    }
}
