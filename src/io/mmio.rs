/*
 * Memory-Mapped I/O (MMIO) Registers
 *
 * Peripherals on the microcontroller are controlled through registers
 * mapped into the address space. `Mmio<T>` is laid over such a register
 * and performs every access as a volatile read or write, so the compiler
 * never merges, reorders or drops them.
 *
 * Register blocks are declared as `#[repr(C)]` structs of `Mmio<T>` fields
 * and referenced at their base address (see `drivers::serial::usart`).
 */

use core::cell::UnsafeCell;
use core::ops::{BitAnd, BitOr, Not};
use core::ptr::NonNull;
use volatile::VolatilePtr;

/// A hardware register as drivers see it.
///
/// Stores take `&self`: task and interrupt context share the register, and
/// the peripheral changes its value behind the program's back anyway.
pub trait Io {
    /// Register width (`u8`, `u16`, `u32`).
    type Value: Copy
        + PartialEq
        + BitAnd<Output = Self::Value>
        + BitOr<Output = Self::Value>
        + Not<Output = Self::Value>;

    /// Load the current register contents.
    fn read(&self) -> Self::Value;

    /// Store `value` into the register.
    fn write(&self, value: Self::Value);

    /// True if every bit of `flags` is set in the register.
    fn readf(&self, flags: Self::Value) -> bool {
        (self.read() & flags) == flags
    }

    /// Set (`value == true`) or clear the bits of `flags`, leaving the rest.
    ///
    /// Not atomic: a status bit the hardware flips between the load and the
    /// store is overwritten.
    fn writef(&self, flags: Self::Value, value: bool) {
        let current = self.read();
        self.write(if value { current | flags } else { current & !flags });
    }
}

/// A register the hardware updates and software only samples, such as a
/// status word or a reserved field in a register block.
#[repr(transparent)]
pub struct ReadOnly<I> {
    inner: I,
}

impl<I> ReadOnly<I> {
    pub const fn new(inner: I) -> ReadOnly<I> {
        ReadOnly { inner }
    }
}

impl<I: Io> ReadOnly<I> {
    #[inline(always)]
    pub fn read(&self) -> I::Value {
        self.inner.read()
    }

    /// True if every bit of `flags` is set.
    pub fn readf(&self, flags: I::Value) -> bool {
        self.inner.readf(flags)
    }
}

/// A single memory-mapped register.
#[repr(transparent)]
pub struct Mmio<T> {
    value: UnsafeCell<T>,
}

impl<T> Mmio<T> {
    /// Create a register holding `value`.
    ///
    /// Real registers are never constructed, they are referenced at their
    /// mapped address. This exists for register blocks placed in RAM.
    pub const fn new(value: T) -> Self {
        Mmio {
            value: UnsafeCell::new(value),
        }
    }

    #[inline(always)]
    fn ptr(&self) -> VolatilePtr<'_, T> {
        // SAFETY: the pointer comes from a live UnsafeCell, so it is
        // non-null, aligned and valid for reads and writes through &self.
        unsafe { VolatilePtr::new(NonNull::new_unchecked(self.value.get())) }
    }
}

impl<T> Io for Mmio<T>
where
    T: Copy + PartialEq + BitAnd<Output = T> + BitOr<Output = T> + Not<Output = T>,
{
    type Value = T;

    #[inline(always)]
    fn read(&self) -> T {
        self.ptr().read()
    }

    #[inline(always)]
    fn write(&self, value: T) {
        self.ptr().write(value)
    }
}

// SAFETY: every access is a single volatile load or store of a register.
unsafe impl<T: Send> Sync for Mmio<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_helpers_modify_only_requested_bits() {
        let reg = Mmio::new(0b1000_0001u32);
        reg.writef(0b0010_0000, true);
        assert_eq!(reg.read(), 0b1010_0001);
        assert!(reg.readf(0b1010_0000));
        reg.writef(0b1000_0000, false);
        assert_eq!(reg.read(), 0b0010_0001);
        assert!(!reg.readf(0b1000_0000));
    }

    #[test]
    fn read_only_wrapper_forwards_reads() {
        let reg = ReadOnly::new(Mmio::new(0x5Au8));
        assert_eq!(reg.read(), 0x5A);
        assert!(reg.readf(0x0A));
    }
}
