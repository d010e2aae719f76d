// SPDX-License-Identifier: GPL-3.0-only

//! Label and UUID extraction from filesystem superblocks
//!
//! Vendor-neutral field reads at the blkid-standard offsets for each family
//! the detector knows. Same contract as detection: never raises, absent or
//! unreadable fields are simply `None`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use rexboot_types::FsType;
use uuid::Uuid;

/// Identifying fields read from a superblock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsIds {
    pub label: Option<String>,
    pub uuid: Option<String>,
}

fn read_at(file: &mut File, size: u64, offset: u64, len: usize) -> Option<Vec<u8>> {
    if size < offset + len as u64 {
        return None;
    }
    let mut buf = vec![0u8; len];
    file.seek(SeekFrom::Start(offset)).ok()?;
    file.read_exact(&mut buf).ok()?;
    Some(buf)
}

/// NUL-terminated, space-padded text field -> trimmed string
fn text_field(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text = String::from_utf8_lossy(&bytes[..end]);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn uuid_field(bytes: &[u8]) -> Option<String> {
    let arr: [u8; 16] = bytes.try_into().ok()?;
    if arr == [0u8; 16] {
        return None;
    }
    Some(Uuid::from_bytes(arr).hyphenated().to_string())
}

/// FAT volume serials render as the familiar XXXX-XXXX
fn fat_serial(bytes: &[u8]) -> Option<String> {
    let serial = u32::from_le_bytes(bytes.try_into().ok()?);
    if serial == 0 {
        return None;
    }
    Some(format!("{:04X}-{:04X}", serial >> 16, serial & 0xFFFF))
}

/// Read label/UUID for a device whose filesystem type is already known.
pub fn probe_ids(path: &Path, fstype: &FsType) -> FsIds {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "cannot open device for id probing");
            return FsIds::default();
        }
    };
    let size = match file.seek(SeekFrom::End(0)) {
        Ok(s) => s,
        Err(_) => return FsIds::default(),
    };

    match fstype {
        FsType::Ext2 | FsType::Ext3 | FsType::Ext4 => FsIds {
            label: read_at(&mut file, size, 1024 + 120, 16)
                .as_deref()
                .and_then(text_field),
            uuid: read_at(&mut file, size, 1024 + 104, 16)
                .as_deref()
                .and_then(uuid_field),
        },
        FsType::Xfs => FsIds {
            label: read_at(&mut file, size, 108, 12).as_deref().and_then(text_field),
            uuid: read_at(&mut file, size, 32, 16).as_deref().and_then(uuid_field),
        },
        FsType::Reiserfs => FsIds {
            label: read_at(&mut file, size, 65536 + 100, 16)
                .as_deref()
                .and_then(text_field),
            uuid: read_at(&mut file, size, 65536 + 84, 16)
                .as_deref()
                .and_then(uuid_field),
        },
        FsType::Vfat => {
            // FAT32 keeps its id fields at different offsets than FAT12/16
            let fat32 = read_at(&mut file, size, 82, 5).is_some_and(|m| m == *b"FAT32");
            let (serial_off, label_off) = if fat32 { (67, 71) } else { (39, 43) };
            FsIds {
                label: read_at(&mut file, size, label_off, 11)
                    .as_deref()
                    .and_then(text_field),
                uuid: read_at(&mut file, size, serial_off, 4)
                    .as_deref()
                    .and_then(fat_serial),
            }
        }
        FsType::Iso9660 => FsIds {
            // Volume identifier in the primary volume descriptor
            label: read_at(&mut file, size, 32768 + 40, 32)
                .as_deref()
                .and_then(text_field),
            uuid: None,
        },
        FsType::Ntfs => FsIds {
            // The label lives in the MFT; only the boot-sector serial is cheap
            label: None,
            uuid: read_at(&mut file, size, 72, 8).and_then(|b| {
                let serial = u64::from_le_bytes(b.try_into().ok()?);
                (serial != 0).then(|| format!("{:016X}", serial))
            }),
        },
        FsType::Minix | FsType::Other(_) => FsIds::default(),
    }
}
