/*
 * System Bring-up
 *
 * Ties the pieces together in the order the firmware starts them:
 *
 * 1. The board creates the serial transport (`drivers::serial::split`) and
 *    installs `SerialIrq` in the UART vector.
 * 2. `System::init` binds the console to descriptors 0, 1 and 2 and mounts
 *    devfs at `/dev`.
 * 3. Optionally `start_logger` routes `log` output to stderr.
 * 4. The shell reads lines (`read_line`) and opens paths (`open`).
 *
 * Why this is important:
 * - Nothing may touch the descriptor table before the console is bound
 * - devfs needs the same table and transport the console uses
 * - The logger writes through handle 2, so it must come after step 2
 */

use crate::config::{HEAP_SIZE, STDOUT};
use crate::drivers::serial::SerialPort;
use crate::io::{FdTable, console};
use crate::memory::{BlockAllocator, MmTestConfig, MmTestError, MmTestReport, mmtest};
use crate::utils::{line_editor, logger};
use crate::vfs::{OpenFlags, Vfs, VfsError, devfs};
use alloc::sync::Arc;
use log::{LevelFilter, SetLoggerError};

/// The firmware I/O context.
pub struct System {
    fds: Arc<FdTable>,
    fs: Vfs,
    serial: Arc<SerialPort>,
}

impl System {
    /// Bind the console and mount devfs over `serial`.
    pub fn init(serial: Arc<SerialPort>) -> Result<Self, VfsError> {
        let fds = Arc::new(FdTable::new());
        let (stdin, stdout) = console::devices(serial.clone());
        fds.init(stdin, stdout)?;

        let fs = Vfs::new();
        devfs::register_devfs(&fs, fds.clone(), serial.clone())?;

        Ok(Self { fds, fs, serial })
    }

    /// Send `log` records to stderr from now on.
    pub fn start_logger(&self, level: LevelFilter) -> Result<(), SetLoggerError> {
        logger::init(self.fds.clone(), level)
    }

    /// Open `path` through the mounted filesystems.
    pub fn open(&self, path: &str, flags: OpenFlags) -> Result<usize, VfsError> {
        self.fs.open(path, flags)
    }

    /// Read one console line into `buf`.
    pub fn read_line(&self, buf: &mut [u8]) -> usize {
        line_editor::read_line(&*self.fds, buf)
    }

    /// Run the heap stress harness with the firmware defaults, narrating on
    /// stdout.
    pub fn mmtest<A: BlockAllocator>(&self, heap: &A) -> Result<MmTestReport, MmTestError> {
        let result = mmtest(heap, &*self.fds, MmTestConfig::for_heap(HEAP_SIZE));
        match &result {
            Ok(_) => {
                let _ = crate::fprintln!(&*self.fds, STDOUT, "mmtest: OK");
            }
            Err(e) => {
                let _ = crate::fprintln!(&*self.fds, STDOUT, "mmtest: {}", e);
            }
        }
        result
    }

    pub fn fds(&self) -> &Arc<FdTable> {
        &self.fds
    }

    pub fn fs(&self) -> &Vfs {
        &self.fs
    }

    pub fn serial(&self) -> &Arc<SerialPort> {
        &self.serial
    }
}
