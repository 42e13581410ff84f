/*
 * CLUU Firmware I/O Core
 *
 * POSIX-like byte-stream I/O for a microcontroller running a preemptive
 * scheduler. A board crate links this library, hands it the UART register
 * block and its scheduler hooks, and gets back:
 *
 * - a fixed-capacity descriptor table (`io::fd`) dispatching read/write/
 *   seek/close to pluggable device backends
 * - an interrupt-driven serial transport (`drivers::serial`) behind the
 *   console descriptors 0, 1 and 2
 * - a named-device resolver (`vfs::devfs`) mounted in a small filesystem
 *   dispatcher (`vfs`)
 * - a randomized heap integrity harness (`memory::mmtest`)
 *
 * The crate is no_std outside of tests. Unit tests run on the host and use
 * simulated UART hardware.
 */

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod io;
pub mod memory;
pub mod scheduler;
pub mod system;
pub mod utils;
pub mod vfs;

pub use io::{Caps, Device, FdTable, FioError, FioTable, Whence};
pub use system::System;
