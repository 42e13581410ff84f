/*
 * Device Abstraction Layer
 *
 * A backend plugged into the descriptor table implements `Device` and
 * declares, through `caps()`, which of the four stream operations it
 * binds. The table never calls an operation whose capability is missing;
 * it answers `FioError::Unsupported` on its own.
 *
 * Backends report results the POSIX way: a byte count or offset, or a
 * negative backend-specific code. The table hands those back verbatim.
 *
 * Each slot also carries an optional opaque context, supplied at
 * registration and replaceable with `rebind`. The backend decides what it
 * means and protects it if it is shared.
 */

use alloc::sync::Arc;
use bitflags::bitflags;
use core::any::Any;
use core::fmt;

/// Backend-defined context attached to a descriptor slot.
pub type Opaque = Arc<dyn Any + Send + Sync>;

bitflags! {
    /// Operations a backend binds into its descriptor slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Caps: u8 {
        const READ = 1;
        const WRITE = 1 << 1;
        const SEEK = 1 << 2;
        const CLOSE = 1 << 3;
    }
}

/// Seek origin; what each one means is up to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    /// From the beginning
    Set = 0,
    /// From the current position
    Cur = 1,
    /// From the end
    End = 2,
}

/// Descriptor backend
///
/// Every operation has a default body so a backend only writes the ones
/// it lists in `caps()`. The defaults are never reached through the table.
pub trait Device: Send + Sync {
    /// Operations this backend binds.
    fn caps(&self) -> Caps;

    /// Read up to `buf.len()` bytes into `buf`.
    ///
    /// Returns the number of bytes read or a negative backend code.
    fn read(&self, _ctx: Option<&Opaque>, _buf: &mut [u8]) -> isize {
        FioError::Unsupported.code() as isize
    }

    /// Write bytes from `buf`.
    ///
    /// Returns the number of bytes written or a negative backend code.
    fn write(&self, _ctx: Option<&Opaque>, _buf: &[u8]) -> isize {
        FioError::Unsupported.code() as isize
    }

    /// Move the stream position. Returns the new offset or a negative code.
    fn seek(&self, _ctx: Option<&Opaque>, _offset: i64, _whence: Whence) -> i64 {
        FioError::Unsupported.code() as i64
    }

    /// Release backend resources. The status is informational only.
    fn close(&self, _ctx: Option<&Opaque>) -> i32 {
        0
    }
}

/// A backend binding no operation at all.
///
/// Registered together with a context it yields an inert slot: open, using
/// table capacity, but answering `Unsupported` to everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOps;

impl Device for NoOps {
    fn caps(&self) -> Caps {
        Caps::empty()
    }
}

/// Descriptor table errors
///
/// Discriminants are the multiplexer's own return codes, distinct from
/// whatever negative values backends produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FioError {
    /// No free slot at registration
    TableFull = -1,
    /// Handle out of range or slot not open
    InvalidHandle = -2,
    /// Operation not bound on this handle
    Unsupported = -3,
}

impl FioError {
    /// C-style return code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for FioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FioError::TableFull => write!(f, "descriptor table full"),
            FioError::InvalidHandle => write!(f, "invalid descriptor"),
            FioError::Unsupported => write!(f, "operation not supported"),
        }
    }
}

/// Collapse a table result into the C-style return convention.
pub fn to_ret(result: Result<isize, FioError>) -> isize {
    match result {
        Ok(n) => n,
        Err(e) => e.code() as isize,
    }
}
