/*
 * Filesystem Dispatcher
 *
 * Paths look like `/<mount>/<rest>`. Each mount point is a `Resolver`
 * registered under a name; opening a path hashes the mount component,
 * asks every resolver registered under that name to open `<rest>`, and
 * returns the first descriptor produced.
 *
 * Mount Points:
 * - /dev/stdin, /dev/stdout, /dev/stderr - console (devfs)
 * - anything a board registers (romfs, ...)
 *
 * A resolver answering `NotFound` lets the next one with the same mount
 * name try. Any other error ends the lookup.
 */

pub mod devfs;
pub mod hash;

use crate::config::MAX_FS;
use crate::io::FioError;
use alloc::sync::Arc;
use bitflags::bitflags;
use core::fmt;
use hash::djb2;
use spin::Mutex;

bitflags! {
    /// Open flags (newlib values). Read-only is the absence of both
    /// `WRONLY` and `RDWR`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const WRONLY = 0x0001;
        const RDWR = 0x0002;
        const APPEND = 0x0008;
        const CREAT = 0x0200;
        const TRUNC = 0x0400;
    }
}

/// Requested access direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl OpenFlags {
    pub const RDONLY: OpenFlags = OpenFlags::empty();

    pub fn access(self) -> Access {
        if self.contains(OpenFlags::RDWR) {
            Access::ReadWrite
        } else if self.contains(OpenFlags::WRONLY) {
            Access::Write
        } else {
            Access::Read
        }
    }
}

/// Resolution errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsError {
    /// No resolver knows the name
    NotFound,
    /// The device exists but not in the requested direction
    AccessDenied,
    /// No room for another mount point
    RegistryFull,
    /// The descriptor table refused the registration
    Fio(FioError),
}

impl VfsError {
    /// C-style return code.
    pub const fn code(self) -> i32 {
        match self {
            VfsError::Fio(e) => e.code(),
            _ => -1,
        }
    }
}

impl From<FioError> for VfsError {
    fn from(e: FioError) -> Self {
        VfsError::Fio(e)
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::NotFound => write!(f, "no such device"),
            VfsError::AccessDenied => write!(f, "access denied"),
            VfsError::RegistryFull => write!(f, "mount table full"),
            VfsError::Fio(e) => write!(f, "{}", e),
        }
    }
}

/// A named namespace able to turn a path into a descriptor.
pub trait Resolver: Send + Sync {
    /// Open `path` (relative to the mount point) and return its handle.
    fn open(&self, path: &str, flags: OpenFlags) -> Result<usize, VfsError>;
}

struct Mount {
    hash: u32,
    name: &'static str,
    resolver: Arc<dyn Resolver>,
}

/// Mount table with room for `M` resolvers
pub struct FileSystems<const M: usize> {
    mounts: Mutex<heapless::Vec<Mount, M>>,
}

/// The firmware's mount table size.
pub type Vfs = FileSystems<MAX_FS>;

impl<const M: usize> FileSystems<M> {
    pub const fn new() -> Self {
        Self {
            mounts: Mutex::new(heapless::Vec::new()),
        }
    }

    /// Mount `resolver` under `name`.
    pub fn register(&self, name: &'static str, resolver: Arc<dyn Resolver>) -> Result<(), VfsError> {
        let mount = Mount {
            hash: djb2(name.as_bytes()),
            name,
            resolver,
        };
        self.mounts
            .lock()
            .push(mount)
            .map_err(|_| VfsError::RegistryFull)?;
        log::info!("vfs: registered /{}", name);
        Ok(())
    }

    /// Open `path` through the resolver mounted at its first component.
    pub fn open(&self, path: &str, flags: OpenFlags) -> Result<usize, VfsError> {
        let path = path.trim_start_matches('/');
        let (mount, rest) = path.split_once('/').unwrap_or((path, ""));
        let hash = djb2(mount.as_bytes());

        // resolvers may register descriptors, so the mount lock is not
        // held while they run
        let candidates: heapless::Vec<Arc<dyn Resolver>, M> = self
            .mounts
            .lock()
            .iter()
            .filter(|m| m.hash == hash && m.name == mount)
            .map(|m| m.resolver.clone())
            .collect();

        for resolver in candidates {
            match resolver.open(rest, flags) {
                Err(VfsError::NotFound) => continue,
                result => return result,
            }
        }

        log::debug!("vfs: nothing mounted at /{} resolves {:?}", mount, rest);
        Err(VfsError::NotFound)
    }

    pub fn count(&self) -> usize {
        self.mounts.lock().len()
    }
}

impl<const M: usize> Default for FileSystems<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    /// Answers for a single name, counts how often it is asked.
    struct Fixed {
        name: &'static str,
        result: Result<usize, VfsError>,
        asked: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, result: Result<usize, VfsError>) -> Arc<Self> {
            Arc::new(Self {
                name,
                result,
                asked: AtomicUsize::new(0),
            })
        }
    }

    impl Resolver for Fixed {
        fn open(&self, path: &str, _flags: OpenFlags) -> Result<usize, VfsError> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            if path == self.name {
                self.result
            } else {
                Err(VfsError::NotFound)
            }
        }
    }

    #[test]
    fn access_follows_direction_bits() {
        assert_eq!(OpenFlags::RDONLY.access(), Access::Read);
        assert_eq!((OpenFlags::WRONLY | OpenFlags::CREAT).access(), Access::Write);
        assert_eq!(OpenFlags::RDWR.access(), Access::ReadWrite);
        assert_eq!(OpenFlags::TRUNC.access(), Access::Read);
    }

    #[test]
    fn open_dispatches_on_mount_name() {
        let fs = FileSystems::<4>::new();
        let a = Fixed::new("file", Ok(5));
        let b = Fixed::new("file", Ok(9));
        fs.register("a", a.clone()).unwrap();
        fs.register("b", b.clone()).unwrap();

        assert_eq!(fs.open("/b/file", OpenFlags::RDONLY), Ok(9));
        assert_eq!(fs.open("a/file", OpenFlags::RDONLY), Ok(5));
        assert_eq!(fs.open("/c/file", OpenFlags::RDONLY), Err(VfsError::NotFound));
        assert_eq!(fs.open("", OpenFlags::RDONLY), Err(VfsError::NotFound));
    }

    #[test]
    fn not_found_falls_through_to_next_resolver() {
        let fs = FileSystems::<4>::new();
        let first = Fixed::new("x", Ok(3));
        let second = Fixed::new("y", Ok(4));
        fs.register("m", first.clone()).unwrap();
        fs.register("m", second.clone()).unwrap();

        assert_eq!(fs.open("/m/y", OpenFlags::RDONLY), Ok(4));
        assert_eq!(first.asked.load(Ordering::SeqCst), 1);
        assert_eq!(second.asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn access_denied_stops_the_lookup() {
        let fs = FileSystems::<4>::new();
        let first = Fixed::new("x", Err(VfsError::AccessDenied));
        let second = Fixed::new("x", Ok(4));
        fs.register("m", first).unwrap();
        fs.register("m", second.clone()).unwrap();

        assert_eq!(fs.open("/m/x", OpenFlags::RDONLY), Err(VfsError::AccessDenied));
        assert_eq!(second.asked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn registry_is_bounded() {
        let fs = FileSystems::<1>::new();
        fs.register("a", Fixed::new("x", Ok(3))).unwrap();
        assert_eq!(
            fs.register("b", Fixed::new("x", Ok(3))),
            Err(VfsError::RegistryFull)
        );
        assert_eq!(fs.count(), 1);
    }

    #[test]
    fn error_codes() {
        assert_eq!(VfsError::AccessDenied.code(), -1);
        assert_eq!(VfsError::NotFound.code(), -1);
        assert_eq!(VfsError::Fio(FioError::TableFull).code(), -1);
        assert_eq!(VfsError::Fio(FioError::InvalidHandle).code(), -2);
    }
}
