// SPDX-License-Identifier: GPL-3.0-only

//! Legacy boot-menu parsing and target materialization
//!
//! `menu.lst` is line-oriented: the first token names the directive, the
//! trimmed remainder is the value. Stanzas accumulate in an explicit
//! in-progress record (`Stanza`) and finalize at each `title`, `chainload`
//! or end of file. Every parse or translation problem is non-fatal: log the
//! line and keep going, because a partially usable legacy menu is more
//! useful than none.

use rexboot_types::{Disk, Module, MountSpec, Target, TargetBuilder};

use crate::grub::{foreign_device_to_node, GrubEnv};

/// Parsed result of one menu file
#[derive(Debug, Default)]
pub struct GrubMenu {
    pub targets: Vec<Target>,
    pub timeout: Option<u32>,
}

/// In-progress stanza state between `title` boundaries
#[derive(Debug, Default)]
struct Stanza {
    title: Option<String>,
    root: Option<String>,
    kernel: Option<String>,
    kernel_opts: Option<String>,
    initrd: Option<String>,
    modules: Vec<Module>,
    /// Line the stanza started on, for diagnostics
    line: usize,
}

impl Stanza {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.root.is_none()
            && self.kernel.is_none()
            && self.initrd.is_none()
            && self.modules.is_empty()
    }
}

/// Split an optional `(device)` prefix off a menu path, falling back to the
/// stanza's root token.
fn split_device<'a>(path: &'a str, fallback: Option<&'a str>) -> (Option<String>, &'a str) {
    if let Some(rest) = path.strip_prefix('(') {
        if let Some(close) = rest.find(')') {
            return (Some(rest[..close].to_string()), &rest[close + 1..]);
        }
    }
    (fallback.map(str::to_string), path)
}

/// Translate a stanza device token into a registry identifier: foreign
/// tokens go through the device map / BIOS emulation; anything else (a
/// native name or `LABEL=` form) passes through untouched.
fn device_ref(env: &GrubEnv, disks: &[Disk], token: &str) -> String {
    match foreign_device_to_node(env, disks, token) {
        Some(node) => node.strip_prefix("/dev/").unwrap_or(&node).to_string(),
        None => super::device_map::strip_parens(token).to_string(),
    }
}

/// Mount point a materialized target uses for one of its devices
fn mount_point_for(device: &str) -> String {
    let name = device.rsplit('/').next().unwrap_or(device);
    format!("/mnt/{}", name.replace('=', "-"))
}

/// Turn a finished stanza into a target: device prefixes split from kernel
/// and initrd paths, tokens translated, one mount entry per distinct device.
fn materialize(env: &GrubEnv, disks: &[Disk], stanza: Stanza) -> Option<Target> {
    let Some(kernel_path) = stanza.kernel.as_deref() else {
        if !stanza.is_empty() {
            tracing::warn!(line = stanza.line, title = stanza.title.as_deref(),
                "menu stanza has no kernel, dropping");
        }
        return None;
    };

    let (kernel_token, kernel_rel) = split_device(kernel_path, stanza.root.as_deref());
    let Some(kernel_token) = kernel_token else {
        tracing::warn!(line = stanza.line,
            "menu stanza has neither a root nor a kernel device prefix, dropping");
        return None;
    };
    let kernel_dev = device_ref(env, disks, &kernel_token);

    let mut builder = TargetBuilder::new();
    builder.title = stanza.title;
    builder.kernel = Some(format!("({}){}", kernel_dev, kernel_rel));
    builder.append = stanza.kernel_opts;
    builder
        .mounts
        .push(MountSpec::new(kernel_dev.clone(), mount_point_for(&kernel_dev)));

    if let Some(initrd_path) = stanza.initrd.as_deref() {
        let (initrd_token, initrd_rel) = split_device(initrd_path, stanza.root.as_deref());
        let initrd_dev = initrd_token
            .map(|t| device_ref(env, disks, &t))
            .unwrap_or_else(|| kernel_dev.clone());
        builder.initrd = Some(format!("({}){}", initrd_dev, initrd_rel));
        if initrd_dev != kernel_dev {
            // kernel and initrd live on different devices: two mount
            // entries at distinct points
            builder
                .mounts
                .push(MountSpec::new(initrd_dev.clone(), mount_point_for(&initrd_dev)));
        }
    }

    for module in stanza.modules {
        let (token, rel) = split_device(&module.path, stanza.root.as_deref());
        let dev = token
            .map(|t| device_ref(env, disks, &t))
            .unwrap_or_else(|| kernel_dev.clone());
        builder.modules.push(Module {
            path: format!("({}){}", dev, rel),
            args: module.args,
        });
    }

    builder.build()
}

fn flush(
    env: &GrubEnv,
    disks: &[Disk],
    pending: &mut Option<Stanza>,
    targets: &mut Vec<Target>,
) {
    if let Some(stanza) = pending.take() {
        if let Some(target) = materialize(env, disks, stanza) {
            targets.push(target);
        }
    }
}

/// Parse a legacy boot menu into targets.
///
/// The default index counts emitted targets: a stanza dropped for a missing
/// kernel never reaches the menu, so it does not consume an index.
pub fn parse_menu(env: &GrubEnv, disks: &[Disk], text: &str) -> GrubMenu {
    let mut menu = GrubMenu::default();
    let mut pending: Option<Stanza> = None;
    let mut default_index: usize = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (directive, value) = match trimmed.split_once(char::is_whitespace) {
            Some((d, v)) => (d, v.trim()),
            None => (trimmed, ""),
        };

        match directive {
            "title" => {
                flush(env, disks, &mut pending, &mut menu.targets);
                pending = Some(Stanza {
                    title: Some(value.to_string()),
                    line,
                    ..Default::default()
                });
            }
            "root" | "rootnoverify" => {
                stanza_at(&mut pending, line).root = Some(value.to_string());
            }
            "kernel" => {
                let stanza = stanza_at(&mut pending, line);
                match value.split_once(char::is_whitespace) {
                    Some((path, opts)) => {
                        stanza.kernel = Some(path.to_string());
                        let opts = opts.trim();
                        if !opts.is_empty() {
                            stanza.kernel_opts = Some(opts.to_string());
                        }
                    }
                    None => stanza.kernel = Some(value.to_string()),
                }
            }
            "initrd" => {
                stanza_at(&mut pending, line).initrd = Some(value.to_string());
            }
            "module" => {
                let stanza = stanza_at(&mut pending, line);
                let (path, args) = match value.split_once(char::is_whitespace) {
                    Some((p, a)) => (p.to_string(), Some(a.trim().to_string())),
                    None => (value.to_string(), None),
                };
                stanza.modules.push(Module { path, args });
            }
            "default" => match value.parse::<usize>() {
                Ok(index) => default_index = index,
                Err(_) => tracing::warn!(line, value, "unusable default index, keeping 0"),
            },
            "timeout" => match value.parse::<u32>() {
                Ok(seconds) => menu.timeout = Some(seconds),
                Err(_) => tracing::warn!(line, value, "unusable timeout, ignoring"),
            },
            "chainloader" | "chainload" => {
                // chainloaded entries re-run firmware code we cannot
                // emulate; reset the stanza without emitting a target
                tracing::warn!(line, "chainload entry skipped");
                pending = None;
            }
            _ => {
                tracing::debug!(line, directive, "ignoring menu directive");
            }
        }
    }
    flush(env, disks, &mut pending, &mut menu.targets);

    if !menu.targets.is_empty() {
        let flagged = if default_index < menu.targets.len() {
            default_index
        } else {
            tracing::warn!(default_index, "default index past the menu, using first entry");
            0
        };
        menu.targets[flagged].flags.default = true;
    }

    menu
}

fn stanza_at(pending: &mut Option<Stanza>, line: usize) -> &mut Stanza {
    // Directives may appear before any title; they open an untitled stanza
    pending.get_or_insert_with(|| Stanza {
        line,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grub::device_map::parse_device_map;
    use rexboot_types::FsType;

    fn disks() -> Vec<Disk> {
        ["sda", "sda1", "sda2", "sdb", "sdb1"]
            .iter()
            .map(|name| Disk {
                name: name.to_string(),
                major: 8,
                minor: 0,
                label: None,
                uuid: None,
                fstype: Some(FsType::Ext3),
                size: 1024 * 1024,
            })
            .collect()
    }

    fn env() -> GrubEnv {
        GrubEnv {
            device_map: parse_device_map("(hd0) /dev/sda\n(hd1) /dev/sdb\n"),
            ..Default::default()
        }
    }

    #[test]
    fn full_stanza_materializes_with_translated_devices() {
        let text = "\
default 1
timeout 5

title Linux
root (hd0,0)
kernel /vmlinuz-2.6 ro root=/dev/sda1 quiet
initrd /initrd-2.6.img

title Rescue
root (hd0,1)
kernel /vmlinuz-rescue single
";
        let menu = parse_menu(&env(), &disks(), text);
        assert_eq!(menu.timeout, Some(5));
        assert_eq!(menu.targets.len(), 2);

        let linux = &menu.targets[0];
        assert_eq!(linux.title, "Linux");
        assert_eq!(linux.kernel, "(sda1)/vmlinuz-2.6");
        assert_eq!(linux.append.as_deref(), Some("ro root=/dev/sda1 quiet"));
        assert_eq!(linux.initrd.as_deref(), Some("(sda1)/initrd-2.6.img"));
        assert_eq!(linux.mounts.len(), 1);
        assert_eq!(linux.mounts[0].device, "sda1");
        assert!(!linux.flags.default);

        // default 1 flags the second emitted target
        assert!(menu.targets[1].flags.default);
        assert_eq!(menu.targets[1].kernel, "(sda2)/vmlinuz-rescue");
    }

    #[test]
    fn kernel_and_initrd_on_different_devices_get_two_mounts() {
        let text = "\
title Split
root (hd0,0)
kernel /vmlinuz
initrd (hd1,0)/initrd.img
";
        let menu = parse_menu(&env(), &disks(), text);
        let target = &menu.targets[0];
        assert_eq!(target.mounts.len(), 2);
        assert_eq!(target.mounts[0].device, "sda1");
        assert_eq!(target.mounts[1].device, "sdb1");
        assert_ne!(target.mounts[0].mount_point, target.mounts[1].mount_point);
    }

    #[test]
    fn kernel_without_title_becomes_unnamed_target() {
        let text = "\
root (hd0,0)
kernel /vmlinuz

title Named
root (hd0,1)
kernel /vmlinuz-b
";
        let menu = parse_menu(&env(), &disks(), text);
        assert_eq!(menu.targets.len(), 2);
        assert_eq!(menu.targets[0].title, rexboot_types::UNTITLED);
        assert_eq!(menu.targets[1].title, "Named");
    }

    #[test]
    fn title_without_kernel_is_dropped_and_consumes_no_index() {
        let text = "\
default 1
title Broken
root (hd0,0)

title First
root (hd0,0)
kernel /vmlinuz-a

title Second
root (hd0,1)
kernel /vmlinuz-b
";
        let menu = parse_menu(&env(), &disks(), text);
        assert_eq!(menu.targets.len(), 2);
        assert_eq!(menu.targets[0].title, "First");
        // index 1 counts emitted targets, so it lands on "Second"
        assert!(menu.targets[1].flags.default);
    }

    #[test]
    fn chainload_resets_without_emitting() {
        let text = "\
title Windows
rootnoverify (hd0,0)
chainloader +1

title Linux
root (hd0,1)
kernel /vmlinuz
";
        let menu = parse_menu(&env(), &disks(), text);
        assert_eq!(menu.targets.len(), 1);
        assert_eq!(menu.targets[0].title, "Linux");
    }

    #[test]
    fn modules_inherit_the_stanza_root() {
        let text = "\
title Xen
root (hd0,0)
kernel /xen.gz dom0_mem=512M
module /vmlinuz-xen ro
module /initrd-xen.img
";
        let menu = parse_menu(&env(), &disks(), text);
        let target = &menu.targets[0];
        assert_eq!(target.modules.len(), 2);
        assert_eq!(target.modules[0].path, "(sda1)/vmlinuz-xen");
        assert_eq!(target.modules[0].args.as_deref(), Some("ro"));
        assert_eq!(target.modules[1].args, None);
    }

    #[test]
    fn empty_menu_yields_no_targets() {
        let menu = parse_menu(&env(), &disks(), "# nothing here\n\n");
        assert!(menu.targets.is_empty());
    }
}
