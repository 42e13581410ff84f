/*
 * Firmware Logging
 *
 * `log::Log` implementation writing every record as `[LEVEL] message` to
 * descriptor 2 of the firmware descriptor table, so log output shares the
 * console with stderr and follows any rebinding of handle 2.
 *
 * Records logged before `init` are dropped. Interrupt handlers must not
 * log: the console write blocks on the transmit interrupt.
 */

use crate::config::STDERR;
use crate::io::{FdTable, FioTable};
use alloc::sync::Arc;
use core::fmt;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use spin::Once;

/// Logger bound to a descriptor table once it exists.
struct FdLogger {
    table: Once<Arc<FdTable>>,
}

impl log::Log for FdLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(table) = self.table.get() {
            let _ = emit(&**table, record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: FdLogger = FdLogger { table: Once::new() };

/// Write one record to stderr of `table`.
pub fn emit<const N: usize>(table: &FioTable<N>, level: Level, args: &fmt::Arguments) -> fmt::Result {
    crate::fprint!(table, STDERR, "[{}] {}\r\n", level, args)
}

/// Install the logger on `table` and set the level filter.
///
/// Fails if a logger is already installed. Call after the console is
/// bound (`FioTable::init`).
pub fn init(table: Arc<FdTable>, level: LevelFilter) -> Result<(), SetLoggerError> {
    LOGGER.table.call_once(|| table);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    log::info!("Logger initialized correctly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::serial::sim;
    use crate::io::console;
    use log::Log;

    fn console_table() -> (Arc<sim::SimUart>, Arc<FdTable>) {
        let (hw, serial) = sim::console();
        let (stdin, stdout) = console::devices(serial);
        let table = Arc::new(FdTable::new());
        table.init(stdin, stdout).unwrap();
        (hw, table)
    }

    #[test]
    fn records_are_prefixed_with_their_level() {
        let (hw, table) = console_table();
        emit(&*table, Level::Warn, &format_args!("low heap: {} bytes", 12)).unwrap();
        assert_eq!(hw.transmitted(), b"[WARN] low heap: 12 bytes\r\n");
    }

    #[test]
    fn output_follows_handle_two() {
        let (hw, table) = console_table();
        table.close(2).unwrap();
        assert!(emit(&*table, Level::Error, &format_args!("lost")).is_err());
        assert!(hw.transmitted().is_empty());
    }

    #[test]
    fn unbound_logger_drops_records() {
        let logger = FdLogger { table: Once::new() };
        logger.log(
            &Record::builder()
                .level(Level::Error)
                .args(format_args!("nowhere to go"))
                .build(),
        );
    }

    #[test]
    fn bound_logger_writes_enabled_records() {
        let (hw, table) = console_table();
        let logger = FdLogger { table: Once::new() };
        logger.table.call_once(|| table);
        log::set_max_level(LevelFilter::Trace);

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("fio up"))
                .build(),
        );
        assert_eq!(hw.transmitted(), b"[INFO] fio up\r\n");
    }
}
