// SPDX-License-Identifier: GPL-3.0-only

//! Console keypress polling
//!
//! The only wait the loader ever performs is the removable-media poll, and
//! that wait must abort on operator input instead of blocking boot forever.

use std::os::fd::AsFd;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

/// True when a key is waiting on stdin. Non-blocking; a poll error counts
/// as "no key" so a broken console cannot wedge a device wait.
pub fn key_pending() -> bool {
    let stdin = std::io::stdin();
    let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
    match poll(&mut fds, PollTimeout::ZERO) {
        Ok(n) => n > 0,
        Err(err) => {
            tracing::debug!(%err, "stdin poll failed");
            false
        }
    }
}
