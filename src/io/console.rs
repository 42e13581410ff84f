/*
 * Console Devices
 *
 * Descriptor backends over the serial transport. Handle 0 gets
 * `ConsoleIn`, handles 1 and 2 share a `ConsoleOut`; devfs hands out more
 * of the same when `/dev/stdin`, `/dev/stdout` or `/dev/stderr` is opened.
 *
 * Neither binds seek or close and neither uses a context.
 */

use super::device::{Caps, Device, Opaque};
use crate::drivers::serial::SerialPort;
use alloc::sync::Arc;

/// Read-only console stream.
pub struct ConsoleIn {
    serial: Arc<SerialPort>,
}

impl ConsoleIn {
    pub fn new(serial: Arc<SerialPort>) -> Self {
        Self { serial }
    }
}

impl Device for ConsoleIn {
    fn caps(&self) -> Caps {
        Caps::READ
    }

    /// Blocks for the first byte, then takes whatever else is already
    /// queued without blocking again.
    fn read(&self, _ctx: Option<&Opaque>, buf: &mut [u8]) -> isize {
        let Some((first, rest)) = buf.split_first_mut() else {
            return 0;
        };

        *first = self.serial.receive();
        let mut count = 1;
        for slot in rest.iter_mut() {
            match self.serial.try_receive() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count as isize
    }
}

/// Write-only console stream.
pub struct ConsoleOut {
    serial: Arc<SerialPort>,
}

impl ConsoleOut {
    pub fn new(serial: Arc<SerialPort>) -> Self {
        Self { serial }
    }
}

impl Device for ConsoleOut {
    fn caps(&self) -> Caps {
        Caps::WRITE
    }

    fn write(&self, _ctx: Option<&Opaque>, buf: &[u8]) -> isize {
        self.serial.send_all(buf);
        buf.len() as isize
    }
}

/// Console devices for handles 0 and 1/2.
pub fn devices(serial: Arc<SerialPort>) -> (Arc<dyn Device>, Arc<dyn Device>) {
    (
        Arc::new(ConsoleIn::new(serial.clone())),
        Arc::new(ConsoleOut::new(serial)),
    )
}
