/*
 * Descriptor Writer
 *
 * `FdWriter` implements `core::fmt::Write` on top of a descriptor so
 * formatted output goes through the table like any other write. The
 * `fprint!` and `fprintln!` macros wrap it; lines end in "\r\n" because
 * the console is a raw serial terminal.
 */

use super::fd::FioTable;
use core::fmt;

/// Formatted output to one descriptor.
pub struct FdWriter<'a, const N: usize> {
    table: &'a FioTable<N>,
    fd: usize,
}

impl<'a, const N: usize> FdWriter<'a, N> {
    pub fn new(table: &'a FioTable<N>, fd: usize) -> Self {
        Self { table, fd }
    }

    pub fn fd(&self) -> usize {
        self.fd
    }
}

impl<const N: usize> fmt::Write for FdWriter<'_, N> {
    /// Fails if the descriptor rejects the write or the backend reports
    /// a negative result.
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self.table.write(self.fd, s.as_bytes()) {
            Ok(n) if n >= 0 => Ok(()),
            _ => Err(fmt::Error),
        }
    }
}

/// Formatted write to a descriptor: `fprint!(table, fd, "x = {}", x)`.
///
/// Evaluates to the `fmt::Result` of the write.
#[macro_export]
macro_rules! fprint {
    ($table:expr, $fd:expr, $($arg:tt)*) => ({
        use core::fmt::Write;
        $crate::io::writer::FdWriter::new($table, $fd).write_fmt(format_args!($($arg)*))
    });
}

/// Like `fprint!`, followed by "\r\n".
#[macro_export]
macro_rules! fprintln {
    ($table:expr, $fd:expr) => ($crate::fprint!($table, $fd, "\r\n"));
    ($table:expr, $fd:expr, $fmt:expr) => ($crate::fprint!($table, $fd, concat!($fmt, "\r\n")));
    ($table:expr, $fd:expr, $fmt:expr, $($arg:tt)*) => ($crate::fprint!($table, $fd, concat!($fmt, "\r\n"), $($arg)*));
}
