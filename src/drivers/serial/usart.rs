use super::{IrqStatus, SerialHw};
use crate::io::mmio::{Io, Mmio, ReadOnly};
use bitflags::bitflags;

bitflags! {
    /// Status register flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u32 {
        const PARITY_ERROR = 1;
        const FRAMING_ERROR = 1 << 1;
        const NOISE = 1 << 2;
        const OVERRUN = 1 << 3;
        const IDLE = 1 << 4;
        const RX_NOT_EMPTY = 1 << 5;
        const TX_COMPLETE = 1 << 6;
        const TX_EMPTY = 1 << 7;
        // 8 and 9: LIN break and CTS, not used
    }
}

bitflags! {
    /// Control register 1 flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ctrl1Flags: u32 {
        const RX_ENABLE = 1 << 2;
        const TX_ENABLE = 1 << 3;
        const IDLE_IE = 1 << 4;
        const RXNE_IE = 1 << 5;
        const TC_IE = 1 << 6;
        const TXE_IE = 1 << 7;
        const PARITY_IE = 1 << 8;
        const ENABLE = 1 << 13;
    }
}

/// USART register block (STM32F1 layout).
#[repr(C)]
pub struct UsartRegs {
    status: Mmio<u32>,
    data: Mmio<u32>,
    baud: Mmio<u32>,
    ctrl1: Mmio<u32>,
    ctrl2: Mmio<u32>,
    ctrl3: Mmio<u32>,
    guard_prescaler: ReadOnly<Mmio<u32>>,
}

impl UsartRegs {
    /// A register block in RAM, as the peripheral looks after reset.
    pub const fn reset() -> Self {
        UsartRegs {
            status: Mmio::new(0x00C0),
            data: Mmio::new(0),
            baud: Mmio::new(0),
            ctrl1: Mmio::new(0),
            ctrl2: Mmio::new(0),
            ctrl3: Mmio::new(0),
            guard_prescaler: ReadOnly::new(Mmio::new(0)),
        }
    }
}

/// USART peripheral.
pub struct Usart {
    regs: &'static UsartRegs,
}

impl Usart {
    /// Creates a USART instance over the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a USART register block that nothing
    /// else drives.
    pub unsafe fn new(base: usize) -> Usart {
        Usart {
            regs: unsafe { &*(base as *const UsartRegs) },
        }
    }

    /// Creates a USART instance over an existing register block.
    pub const fn from_regs(regs: &'static UsartRegs) -> Usart {
        Usart { regs }
    }

    /// Program 8N1 at `baud` from peripheral clock `pclk`, enable the
    /// transmitter and receiver, and arm the receive interrupt.
    ///
    /// The transmit interrupt stays disarmed until the first `send`.
    pub fn init(&self, pclk: u32, baud: u32) {
        self.regs.ctrl1.write(0);
        self.regs.ctrl2.write(0);
        self.regs.ctrl3.write(0);
        // 16x oversampling: mantissa.fraction of pclk / (16 * baud) in 12.4
        self.regs.baud.write((pclk + baud / 2) / baud);
        self.regs.ctrl1.write(
            (Ctrl1Flags::ENABLE | Ctrl1Flags::TX_ENABLE | Ctrl1Flags::RX_ENABLE | Ctrl1Flags::RXNE_IE)
                .bits(),
        );
        log::debug!(
            "usart: {} baud, brr={:#x}, gtpr={:#x}",
            baud,
            self.regs.baud.read(),
            self.regs.guard_prescaler.read()
        );
    }

    fn status(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.regs.status.read())
    }

    fn ctrl1(&self) -> Ctrl1Flags {
        Ctrl1Flags::from_bits_truncate(self.regs.ctrl1.read())
    }
}

impl SerialHw for Usart {
    fn pending(&self) -> IrqStatus {
        let status = self.status();
        let ctrl = self.ctrl1();
        let mut pending = IrqStatus::empty();

        if ctrl.contains(Ctrl1Flags::TXE_IE) && status.contains(StatusFlags::TX_EMPTY) {
            pending |= IrqStatus::TX_READY;
        }
        if ctrl.contains(Ctrl1Flags::RXNE_IE) {
            if status.contains(StatusFlags::RX_NOT_EMPTY) {
                pending |= IrqStatus::RX_READY;
            } else if status.contains(StatusFlags::OVERRUN) {
                pending |= IrqStatus::OTHER;
            }
        }
        if (ctrl.contains(Ctrl1Flags::TC_IE) && status.contains(StatusFlags::TX_COMPLETE))
            || (ctrl.contains(Ctrl1Flags::IDLE_IE) && status.contains(StatusFlags::IDLE))
        {
            pending |= IrqStatus::OTHER;
        }
        pending
    }

    fn write_data(&self, byte: u8) {
        self.regs.data.write(byte as u32);
    }

    fn read_data(&self) -> u8 {
        (self.regs.data.read() & 0xFF) as u8
    }

    fn set_tx_interrupt(&self, enabled: bool) {
        self.regs.ctrl1.writef(Ctrl1Flags::TXE_IE.bits(), enabled);
    }
}
