// SPDX-License-Identifier: GPL-3.0-only

//! Legacy device-map parsing
//!
//! GRUB's `device.map` pairs its own disk tokens with the device nodes the
//! installer saw: `(hd0)  /dev/sda`. Tokens are stored with the parentheses
//! stripped; lookups normalize the same way.

use serde::{Deserialize, Serialize};

/// One `<token> <device>` pair from a device-map file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrubDeviceMapEntry {
    /// Foreign token without parentheses, e.g. `hd0`
    pub token: String,

    /// Device node the token maps to, e.g. `/dev/sda`
    pub device: String,
}

pub(crate) fn strip_parens(token: &str) -> &str {
    token
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(token)
}

/// Parse a device-map file: whitespace-separated token/device lines,
/// `#` comments and blanks ignored. Malformed lines are logged and skipped.
pub fn parse_device_map(text: &str) -> Vec<GrubDeviceMapEntry> {
    let mut entries = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let (Some(token), Some(device)) = (fields.next(), fields.next()) else {
            tracing::warn!(line, "malformed device-map line, skipping");
            continue;
        };

        entries.push(GrubDeviceMapEntry {
            token: strip_parens(token).to_string(),
            device: device.to_string(),
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_skips_noise() {
        let text = "\
# this device map was generated by anaconda
(hd0)   /dev/sda

(hd1)   /dev/sdb
(fd0)   /dev/fd0
justonetoken
";
        let map = parse_device_map(text);
        assert_eq!(map.len(), 3);
        assert_eq!(map[0].token, "hd0");
        assert_eq!(map[0].device, "/dev/sda");
        assert_eq!(map[2].token, "fd0");
    }

    #[test]
    fn empty_file_is_empty_map() {
        assert!(parse_device_map("").is_empty());
    }
}
