// SPDX-License-Identifier: GPL-3.0-only

//! Disk registry: enumeration and identifier matching
//!
//! Disks are enumerated fresh on every query. Device presence is
//! asynchronous — removable media settle late, buses enumerate slowly — so
//! caching a scan would let a stale view leak into mount decisions. Lookup
//! never raises; "not found" is a retryable condition and the caller decides
//! whether to wait.

use std::time::Duration;

use rexboot_types::{Disk, FsType};

/// Where the registry gets its device list. The production source reads the
/// kernel's partition table; tests substitute fixtures.
pub trait BlockDeviceSource {
    fn scan(&self) -> Vec<Disk>;
}

/// Production source: `/proc/partitions` plus superblock probing, creating
/// missing `/dev` nodes along the way.
pub struct SysSource;

impl BlockDeviceSource for SysSource {
    fn scan(&self) -> Vec<Disk> {
        let devices = match rexboot_sys::list_block_devices() {
            Ok(devices) => devices,
            Err(err) => {
                tracing::warn!(%err, "cannot read block-device table");
                return Vec::new();
            }
        };

        let mut disks = Vec::new();
        for dev in devices {
            let node = match rexboot_sys::ensure_device_node(&dev) {
                Ok(node) => node,
                Err(err) => {
                    tracing::warn!(device = %dev.name, %err, "skipping device without node");
                    continue;
                }
            };

            let fstype = rexboot_sys::detect(&node);
            let ids = match &fstype {
                Some(fstype) => rexboot_sys::probe_ids(&node, fstype),
                None => Default::default(),
            };

            disks.push(Disk {
                size: dev.size_bytes(),
                name: dev.name,
                major: dev.major,
                minor: dev.minor,
                label: ids.label,
                uuid: ids.uuid,
                fstype,
            });
        }
        disks
    }
}

/// A fixed disk list, for tests and dry runs
pub struct StaticSource(pub Vec<Disk>);

impl BlockDeviceSource for StaticSource {
    fn scan(&self) -> Vec<Disk> {
        self.0.clone()
    }
}

/// What an identifier asks for, after stripping any `fstype:` prefix
#[derive(Clone, Copy)]
enum MatchKey<'a> {
    Label(&'a str),
    Uuid(&'a str),
    Name(&'a str),
}

fn parse_identifier(identifier: &str) -> (Option<&str>, MatchKey<'_>) {
    // A `fstype:` compound prefix is stripped first and applied after the
    // lookup. The prefix must look like a type name, not a path or qualifier.
    let (fstype, rest) = match identifier.split_once(':') {
        Some((prefix, rest))
            if !prefix.is_empty() && !prefix.contains('=') && !prefix.contains('/') =>
        {
            (Some(prefix), rest)
        }
        _ => (None, identifier),
    };

    let lower = rest.to_ascii_lowercase();
    let key = if let Some(value) = lower.strip_prefix("label=") {
        MatchKey::Label(&rest[rest.len() - value.len()..])
    } else if let Some(value) = lower.strip_prefix("uuid=") {
        MatchKey::Uuid(&rest[rest.len() - value.len()..])
    } else {
        MatchKey::Name(rest.strip_prefix("/dev/").unwrap_or(rest))
    };

    (fstype, key)
}

/// Pure lookup policy over an enumerated disk list.
///
/// Matches are exact string equality on label, UUID, or device name. The
/// first structural match in enumeration order wins — for duplicate labels
/// or UUIDs across disks that tie-break is defined behavior, not an
/// accident.
pub fn match_disk(disks: &[Disk], identifier: &str) -> Option<Disk> {
    let (fstype, key) = parse_identifier(identifier);

    let hit = disks.iter().find(|disk| match key {
        MatchKey::Label(value) => disk.label.as_deref() == Some(value),
        MatchKey::Uuid(value) => disk.uuid.as_deref() == Some(value),
        MatchKey::Name(name) => disk.name == name,
    })?;

    let mut disk = hit.clone();
    if let Some(name) = fstype {
        // Explicit type wins over whatever the probe said
        disk.fstype = Some(FsType::from_name(name));
    }
    Some(disk)
}

pub struct DiskRegistry {
    source: Box<dyn BlockDeviceSource>,
}

impl DiskRegistry {
    pub fn system() -> Self {
        Self::with_source(Box::new(SysSource))
    }

    pub fn with_source(source: Box<dyn BlockDeviceSource>) -> Self {
        Self { source }
    }

    /// Read the live block-device table. Problem devices are logged and
    /// skipped; this never fails.
    pub fn enumerate(&self) -> Vec<Disk> {
        self.source.scan()
    }

    /// Look up one disk by identifier: bare name (with or without `/dev/`),
    /// `LABEL=`/`UUID=` qualifier, or `fstype:identifier` compound.
    pub fn find(&self, identifier: &str) -> Option<Disk> {
        match_disk(&self.enumerate(), identifier)
    }

    /// Poll `find` on a fixed interval until the disk appears or `cancel`
    /// fires (operator keypress). Removable media may still be settling, so
    /// absence now does not mean absence in a second.
    pub fn find_wait(
        &self,
        identifier: &str,
        interval: Duration,
        cancel: &dyn Fn() -> bool,
    ) -> Option<Disk> {
        loop {
            if let Some(disk) = self.find(identifier) {
                return Some(disk);
            }
            if cancel() {
                tracing::info!(identifier, "device wait cancelled");
                return None;
            }
            std::thread::sleep(interval);
        }
    }
}
