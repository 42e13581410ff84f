/*
 * Interrupt-Driven Serial Transport
 *
 * Byte-level console transport on top of a UART. The driver is split in
 * two halves at start-up:
 *
 * - `SerialPort` is used by tasks: `send` and `receive` block.
 * - `SerialIrq` is owned by the UART interrupt vector: it never blocks.
 *
 * Transmit: a binary semaphore starts available. `send` takes it, loads the
 * data register and arms the transmit interrupt. When the hardware raises
 * TX-ready, the handler gives the semaphore back and disarms the interrupt.
 *
 * Receive: the handler reads the data register and pushes the byte into a
 * depth-1 channel; `receive` blocks until the channel has a byte. A byte
 * that finds the channel still full means the consumer fell behind with no
 * flow control left, and the transport halts rather than drop it. Any
 * interrupt cause other than TX-ready or RX-ready halts as well.
 *
 * There are no timeouts: a task blocked here is released only by hardware
 * activity. That is fine for a single console, and it is the limit to
 * revisit before putting more than one device on this path.
 */

pub mod usart;

#[cfg(test)]
pub(crate) mod sim;

use crate::scheduler::{BinarySemaphore, IoChannel, IsrSender, TaskReceiver, TaskWait, isr_channel};
use alloc::sync::Arc;
use bitflags::bitflags;
use core::fmt;

pub use usart::Usart;

/// Bytes the receive channel holds before the next one is an overflow.
pub const RX_DEPTH: usize = 1;
const RX_QUEUE_LEN: usize = RX_DEPTH + 1;

bitflags! {
    /// Interrupt causes that are both flagged and enabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqStatus: u8 {
        const TX_READY = 1;
        const RX_READY = 1 << 1;
        const OTHER = 1 << 7;
    }
}

/// UART hardware as the transport needs it.
pub trait SerialHw: Send + Sync {
    /// Pending interrupt causes.
    fn pending(&self) -> IrqStatus;

    /// Load the transmit data register.
    fn write_data(&self, byte: u8);

    /// Read the receive data register (clears RX-ready).
    fn read_data(&self) -> u8;

    /// Arm or disarm the transmit-ready interrupt.
    fn set_tx_interrupt(&self, enabled: bool);
}

/// Conditions the transport cannot recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// The interrupt fired for a cause the driver never enables.
    UnexpectedCause(IrqStatus),
    /// A byte arrived before the previous one was consumed.
    RxOverflow(u8),
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFault::UnexpectedCause(status) => {
                write!(f, "unexpected interrupt cause {:#04x}", status.bits())
            }
            TransportFault::RxOverflow(byte) => {
                write!(f, "receive channel overflow (dropped {:#04x})", byte)
            }
        }
    }
}

/// Stop the system on a transport fault.
///
/// Runs in interrupt context, where the console may be the thing that is
/// broken, so it does not log. The firmware panic handler parks the core.
pub fn halt(fault: TransportFault) -> ! {
    panic!("unrecoverable serial transport fault: {}", fault);
}

/// Task-side half of the transport.
pub struct SerialPort {
    hw: Arc<dyn SerialHw>,
    tx_ready: Arc<BinarySemaphore>,
    rx: TaskReceiver<RX_QUEUE_LEN>,
    waiter: Arc<dyn TaskWait>,
}

/// Interrupt-side half of the transport.
pub struct SerialIrq {
    hw: Arc<dyn SerialHw>,
    tx_ready: Arc<BinarySemaphore>,
    rx: IsrSender<RX_QUEUE_LEN>,
    waiter: Arc<dyn TaskWait>,
}

/// Create the transport for UART number `unit`.
///
/// The transmit path starts idle. Call once per UART at start-up and hand
/// `SerialIrq` to the interrupt vector.
pub fn split(unit: u8, hw: Arc<dyn SerialHw>, waiter: Arc<dyn TaskWait>) -> (SerialPort, SerialIrq) {
    let tx_ready = Arc::new(BinarySemaphore::new(IoChannel::SerialTx(unit), true));
    let (sender, receiver) = isr_channel::<RX_QUEUE_LEN>(IoChannel::SerialRx(unit));

    log::info!("serial{}: transport ready (rx depth {})", unit, RX_DEPTH);

    (
        SerialPort {
            hw: hw.clone(),
            tx_ready: tx_ready.clone(),
            rx: receiver,
            waiter: waiter.clone(),
        },
        SerialIrq {
            hw,
            tx_ready,
            rx: sender,
            waiter,
        },
    )
}

impl SerialPort {
    /// Transmit one byte, blocking until the transmitter is free.
    ///
    /// Task context only.
    pub fn send(&self, byte: u8) {
        self.tx_ready.take(self.waiter.as_ref());
        self.hw.write_data(byte);
        self.hw.set_tx_interrupt(true);
    }

    /// Transmit every byte of `bytes` in order.
    pub fn send_all(&self, bytes: &[u8]) {
        for &byte in bytes {
            self.send(byte);
        }
    }

    /// Block until a byte has been received and return it.
    ///
    /// Task context only.
    pub fn receive(&self) -> u8 {
        self.rx.recv(self.waiter.as_ref())
    }

    /// Return a received byte if one is already queued.
    pub fn try_receive(&self) -> Option<u8> {
        self.rx.try_recv()
    }
}

impl SerialIrq {
    /// Service one interrupt.
    ///
    /// Returns whether a task may have been unblocked (the caller should
    /// request a context switch on exit), or the fault that must halt the
    /// system.
    pub fn on_interrupt(&mut self) -> Result<bool, TransportFault> {
        let status = self.hw.pending();

        if status.contains(IrqStatus::TX_READY) {
            let woken = self.tx_ready.give_from_isr(self.waiter.as_ref());
            self.hw.set_tx_interrupt(false);
            Ok(woken)
        } else if status.contains(IrqStatus::RX_READY) {
            let byte = self.hw.read_data();
            self.rx
                .send_from_isr(byte, self.waiter.as_ref())
                .map_err(TransportFault::RxOverflow)?;
            Ok(true)
        } else {
            Err(TransportFault::UnexpectedCause(status))
        }
    }

    /// Interrupt vector entry: service the interrupt or halt.
    pub fn handle(&mut self) -> bool {
        match self.on_interrupt() {
            Ok(woken) => woken,
            Err(fault) => halt(fault),
        }
    }
}
