/*
 * File Descriptor Table
 *
 * Fixed-capacity table mapping small integer handles to device backends.
 * Each slot holds a backend, the capabilities it binds and an optional
 * opaque context.
 *
 * Standard FDs:
 * - 0: stdin  (read)
 * - 1: stdout (write)
 * - 2: stderr (write)
 *
 * FDs 3+ are handed out at registration, always the lowest free index.
 *
 * Locking:
 * - One table-wide spin lock guards the slot array.
 * - It is held only while a slot is inspected or mutated, never across a
 *   delegated read/write/seek/close. Two tasks writing the same handle at
 *   once are not serialized here; a backend that cares must lock itself.
 */

use super::device::{Caps, Device, FioError, Opaque, Whence};
use crate::config::{MAX_FDS, RESERVED_FDS, STDERR, STDIN, STDOUT};
use alloc::sync::Arc;
use spin::Mutex;

/// An open slot.
#[derive(Clone)]
struct Binding {
    device: Arc<dyn Device>,
    caps: Caps,
    ctx: Option<Opaque>,
}

impl Binding {
    fn new(device: Arc<dyn Device>, ctx: Option<Opaque>) -> Self {
        let caps = device.caps();
        Self { device, caps, ctx }
    }

    /// A slot is open while it binds an operation or carries a context.
    fn is_open(&self) -> bool {
        !self.caps.is_empty() || self.ctx.is_some()
    }
}

/// Descriptor table with `N` slots
pub struct FioTable<const N: usize> {
    slots: Mutex<[Option<Binding>; N]>,
}

/// The firmware's table size.
pub type FdTable = FioTable<MAX_FDS>;

impl<const N: usize> FioTable<N> {
    /// Create a table with every slot free.
    ///
    /// Nothing is bound until `init` installs the console.
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new([const { None }; N]),
        }
    }

    /// Reset the table and bind the console to handles 0, 1 and 2.
    ///
    /// Returns `TableFull` if the table cannot hold the reserved handles.
    pub fn init(&self, stdin: Arc<dyn Device>, stdout: Arc<dyn Device>) -> Result<(), FioError> {
        if N < RESERVED_FDS {
            return Err(FioError::TableFull);
        }

        {
            let mut slots = self.slots.lock();
            for slot in slots.iter_mut() {
                *slot = None;
            }
            slots[STDIN] = Some(Binding::new(stdin, None));
            slots[STDOUT] = Some(Binding::new(stdout.clone(), None));
            slots[STDERR] = Some(Binding::new(stdout, None));
        }

        log::info!("fio: console bound to fds 0-2, {} slots total", N);
        Ok(())
    }

    /// Bind a backend into the lowest free slot.
    ///
    /// A backend with no capabilities and no context leaves the slot free:
    /// the index is returned but nothing is occupied.
    pub fn register(&self, device: Arc<dyn Device>, ctx: Option<Opaque>) -> Result<usize, FioError> {
        let binding = Binding::new(device, ctx);
        let mut slots = self.slots.lock();
        let fd = slots
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(FioError::TableFull)?;
        if binding.is_open() {
            slots[fd] = Some(binding);
        }
        Ok(fd)
    }

    /// Snapshot a slot so the lock is released before delegating.
    fn binding(&self, fd: usize) -> Result<Binding, FioError> {
        self.slots
            .lock()
            .get(fd)
            .and_then(|slot| slot.clone())
            .ok_or(FioError::InvalidHandle)
    }

    fn bound(&self, fd: usize, cap: Caps) -> Result<Binding, FioError> {
        let binding = self.binding(fd)?;
        if binding.caps.contains(cap) {
            Ok(binding)
        } else {
            Err(FioError::Unsupported)
        }
    }

    pub fn is_open(&self, fd: usize) -> bool {
        self.binding(fd).is_ok()
    }

    /// Read through the backend bound to `fd`.
    ///
    /// The backend result, negative codes included, is returned as is.
    pub fn read(&self, fd: usize, buf: &mut [u8]) -> Result<isize, FioError> {
        let b = self.bound(fd, Caps::READ)?;
        Ok(b.device.read(b.ctx.as_ref(), buf))
    }

    /// Write through the backend bound to `fd`.
    pub fn write(&self, fd: usize, buf: &[u8]) -> Result<isize, FioError> {
        let b = self.bound(fd, Caps::WRITE)?;
        Ok(b.device.write(b.ctx.as_ref(), buf))
    }

    /// Seek through the backend bound to `fd`.
    pub fn seek(&self, fd: usize, offset: i64, whence: Whence) -> Result<i64, FioError> {
        let b = self.bound(fd, Caps::SEEK)?;
        Ok(b.device.seek(b.ctx.as_ref(), offset, whence))
    }

    /// Close `fd`: free the slot, then run the backend's close.
    ///
    /// The binding is taken out of its slot under the lock, so of two
    /// concurrent closes only one reaches the backend and the other gets
    /// `InvalidHandle`. The slot may be handed out again while the backend
    /// is still closing.
    ///
    /// Returns the backend's close status (0 if it binds no close). The
    /// slot is freed whatever that status is.
    pub fn close(&self, fd: usize) -> Result<i32, FioError> {
        let b = self
            .slots
            .lock()
            .get_mut(fd)
            .and_then(Option::take)
            .ok_or(FioError::InvalidHandle)?;

        let status = if b.caps.contains(Caps::CLOSE) {
            b.device.close(b.ctx.as_ref())
        } else {
            0
        };
        Ok(status)
    }

    /// Replace the context of an open slot, keeping its operations.
    ///
    /// No-op if `fd` is not open. Clearing the context of a slot that
    /// binds no operation frees the slot.
    pub fn rebind(&self, fd: usize, ctx: Option<Opaque>) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(fd) {
            if let Some(binding) = slot.as_mut() {
                binding.ctx = ctx;
                if !binding.is_open() {
                    *slot = None;
                }
            }
        }
    }

    /// Context currently attached to `fd`.
    pub fn context(&self, fd: usize) -> Option<Opaque> {
        self.binding(fd).ok().and_then(|b| b.ctx)
    }

    /// Get number of open file descriptors
    pub fn count(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.is_some()).count()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for FioTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
