/*
 * Input/Output System
 *
 * Descriptor multiplexer and everything that plugs into it:
 * the device trait, the console backends, formatted output over a
 * descriptor, and the MMIO register access drivers are built on.
 */

pub mod console;
pub mod device;
pub mod fd;
pub mod mmio;
pub mod writer;

pub use device::{Caps, Device, FioError, NoOps, Opaque, Whence, to_ret};
pub use fd::{FdTable, FioTable};
pub use mmio::{Io, Mmio, ReadOnly};
pub use writer::FdWriter;
