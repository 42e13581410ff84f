/*
 * Simulated UART for host tests
 *
 * Models the parts of the hardware the transport relies on: a transmit
 * data register that is always ready again right after a write, a receive
 * line fed from a script, and the interrupt status logic (TX-ready only
 * counts while its interrupt is armed).
 *
 * `SimWait` stands in for the scheduler: whenever a task would block, it
 * lets the "hardware" raise its pending interrupt first, so single-threaded
 * tests drive the full send/receive path deterministically.
 */

use super::{IrqStatus, SerialHw, SerialIrq, SerialPort, split};
use crate::scheduler::{IoChannel, TaskWait};
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

pub struct SimUart {
    tx_irq: AtomicBool,
    other: AtomicBool,
    line: Mutex<VecDeque<u8>>,
    sent: Mutex<Vec<u8>>,
}

impl SimUart {
    pub fn new() -> Self {
        Self {
            tx_irq: AtomicBool::new(false),
            other: AtomicBool::new(false),
            line: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Put a byte on the receive line.
    pub fn inject(&self, byte: u8) {
        self.line.lock().push_back(byte);
    }

    pub fn inject_all(&self, bytes: &[u8]) {
        self.line.lock().extend(bytes.iter().copied());
    }

    /// Flag an interrupt cause the driver does not handle.
    pub fn raise_other(&self) {
        self.other.store(true, Ordering::SeqCst);
    }

    pub fn transmitted(&self) -> Vec<u8> {
        self.sent.lock().clone()
    }

    pub fn tx_interrupt_enabled(&self) -> bool {
        self.tx_irq.load(Ordering::SeqCst)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending().is_empty()
    }
}

impl SerialHw for SimUart {
    fn pending(&self) -> IrqStatus {
        let mut status = IrqStatus::empty();
        if self.tx_irq.load(Ordering::SeqCst) {
            status |= IrqStatus::TX_READY;
        }
        if !self.line.lock().is_empty() {
            status |= IrqStatus::RX_READY;
        }
        if self.other.load(Ordering::SeqCst) {
            status |= IrqStatus::OTHER;
        }
        status
    }

    fn write_data(&self, byte: u8) {
        self.sent.lock().push(byte);
    }

    fn read_data(&self) -> u8 {
        self.line.lock().pop_front().unwrap_or(0)
    }

    fn set_tx_interrupt(&self, enabled: bool) {
        self.tx_irq.store(enabled, Ordering::SeqCst);
    }
}

/// Scheduler stand-in that fires the pending UART interrupt on `wait`.
pub struct SimWait {
    hw: Arc<SimUart>,
    irq: Mutex<Option<SerialIrq>>,
}

impl TaskWait for SimWait {
    fn wait(&self, _channel: IoChannel, ready: &dyn Fn() -> bool) {
        if ready() {
            return;
        }
        if self.hw.has_pending() {
            if let Some(irq) = self.irq.lock().as_mut() {
                irq.handle();
            }
        }
        std::thread::yield_now();
    }

    fn wake(&self, _channel: IoChannel) {}
}

/// A transport over `SimUart` whose blocking calls complete by themselves.
pub fn console() -> (Arc<SimUart>, Arc<SerialPort>) {
    let hw = Arc::new(SimUart::new());
    let waiter = Arc::new(SimWait {
        hw: hw.clone(),
        irq: Mutex::new(None),
    });
    let (port, irq) = split(0, hw.clone(), waiter.clone());
    *waiter.irq.lock() = Some(irq);
    (hw, Arc::new(port))
}
