// SPDX-License-Identifier: GPL-3.0-only

//! Diagnostic shell for the loader core
//!
//! Runs the same code paths the boot flow uses — enumeration, detection,
//! vpath translation, GRUB loading — from a normal shell, so storage quirks
//! can be reproduced without rebooting a machine into the initramfs.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use rexboot_core::{grub, mounts, vfs, BootContext};

#[derive(Parser)]
#[command(name = "rexboot-diag", about = "rexboot storage diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enumerate block devices with their probed identity
    Disks {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Detect the filesystem type of a device or image file
    Detect { device: PathBuf },
    /// Translate a vpath, mounting on demand, then restore the mount set
    Resolve {
        vpath: String,
        /// Root device for bare paths
        #[arg(long)]
        root: Option<String>,
    },
    /// Load a legacy GRUB menu from a boot volume and dump the targets
    Grub {
        boot_volume: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Detect { device } => {
            // works on plain image files, no privileges needed
            match rexboot_sys::detect(&device) {
                Some(fstype) => {
                    let ids = rexboot_sys::probe_ids(&device, &fstype);
                    println!(
                        "{}  label={}  uuid={}",
                        fstype,
                        ids.label.as_deref().unwrap_or("-"),
                        ids.uuid.as_deref().unwrap_or("-")
                    );
                }
                None => bail!("no known filesystem signature"),
            }
            Ok(())
        }
        command => {
            if unsafe { libc::geteuid() } != 0 {
                bail!("this subcommand needs root (it touches block devices)");
            }
            let mut ctx = BootContext::system();
            run(&mut ctx, command)
        }
    }
}

fn run(ctx: &mut BootContext, command: Command) -> Result<()> {
    match command {
        Command::Disks { json } => {
            let disks = ctx.registry.enumerate();
            if json {
                println!("{}", serde_json::to_string_pretty(&disks)?);
            } else {
                for disk in disks {
                    println!(
                        "{:<10} {:>9} {:<10} label={:<16} uuid={}",
                        disk.name,
                        disk.display_size(),
                        disk.fstype.as_ref().map(|f| f.as_str()).unwrap_or("?"),
                        disk.label.as_deref().unwrap_or("-"),
                        disk.uuid.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
        Command::Resolve { vpath, root } => {
            if let Some(root) = root {
                ctx.set_root(root);
            }
            let result = vfs::translate(ctx, &vpath);
            // a diagnostic run must not leave mounts behind
            mounts::unmount_all(ctx);
            println!("{}", result?.display());
        }
        Command::Grub { boot_volume, json } => {
            let targets = grub::load(ctx, &boot_volume)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&targets)?);
            } else {
                for target in &targets {
                    println!(
                        "{}{}  kernel={}  mounts={}",
                        target.title,
                        if target.flags.default { " [default]" } else { "" },
                        target.kernel,
                        target.mounts.len(),
                    );
                }
            }
        }
        Command::Detect { .. } => unreachable!("handled before privilege check"),
    }
    Ok(())
}
