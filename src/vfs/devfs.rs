/*
 * Device Filesystem (devfs)
 *
 * Resolves the console device names to fresh descriptors:
 *
 * - stdin  - read-only binding to the serial receive path
 * - stdout - write-only binding to the serial transmit path
 * - stderr - same as stdout
 *
 * Direction is enforced at open time: stdin refuses write access, stdout
 * and stderr refuse read-only access. Names are matched by djb2 hash and
 * then confirmed against the literal, so a colliding name is not found.
 */

use super::hash::djb2;
use super::{Access, OpenFlags, Resolver, VfsError};
use crate::drivers::serial::SerialPort;
use crate::io::{Device, FioTable, console};
use alloc::sync::Arc;

const STDIN_HASH: u32 = djb2(b"stdin");
const STDOUT_HASH: u32 = djb2(b"stdout");
const STDERR_HASH: u32 = djb2(b"stderr");

/// Console device namespace
pub struct DevFs<const N: usize> {
    table: Arc<FioTable<N>>,
    input: Arc<dyn Device>,
    output: Arc<dyn Device>,
}

impl<const N: usize> DevFs<N> {
    /// Namespace registering into `table`, backed by `serial`.
    pub fn new(table: Arc<FioTable<N>>, serial: Arc<SerialPort>) -> Self {
        let (input, output) = console::devices(serial);
        Self::with_devices(table, input, output)
    }

    /// Namespace over explicit input and output backends.
    pub fn with_devices(table: Arc<FioTable<N>>, input: Arc<dyn Device>, output: Arc<dyn Device>) -> Self {
        Self {
            table,
            input,
            output,
        }
    }

    fn bind(&self, device: &Arc<dyn Device>) -> Result<usize, VfsError> {
        Ok(self.table.register(device.clone(), None)?)
    }
}

impl<const N: usize> Resolver for DevFs<N> {
    fn open(&self, path: &str, flags: OpenFlags) -> Result<usize, VfsError> {
        match (djb2(path.as_bytes()), path) {
            (STDIN_HASH, "stdin") => {
                if flags.access() != Access::Read {
                    return Err(VfsError::AccessDenied);
                }
                self.bind(&self.input)
            }
            (STDOUT_HASH, "stdout") | (STDERR_HASH, "stderr") => {
                if flags.access() == Access::Read {
                    return Err(VfsError::AccessDenied);
                }
                self.bind(&self.output)
            }
            _ => Err(VfsError::NotFound),
        }
    }
}

/// Mount a devfs for `table` at `/dev`.
pub fn register_devfs<const N: usize, const M: usize>(
    fs: &super::FileSystems<M>,
    table: Arc<FioTable<N>>,
    serial: Arc<SerialPort>,
) -> Result<(), VfsError> {
    log::info!("Registering devfs.");
    fs.register("dev", Arc::new(DevFs::new(table, serial)))
}
