/*
 * Heap Integrity Stress Test
 *
 * Allocates randomly sized blocks, fills them from a 16-bit LFSR, keeps a
 * bounded FIFO of outstanding blocks and checks every byte before the
 * block is freed. Catches allocators that hand out overlapping blocks and
 * anything else that scribbles over live heap memory.
 *
 * Algorithm:
 * 1. One LFSR, seeded to a fixed value, drives both the block sizes and
 *    the fill bytes, so a run is fully reproducible.
 * 2. Each round draws a size (redrawing anything below the minimum) and
 *    tries to allocate it.
 * 3. If the allocation failed or the ring is full, drain: pop the oldest
 *    block, reset the LFSR to the state saved when that block was filled,
 *    regenerate its bytes and compare, then free it. Stop when the ring is
 *    empty or the next LFSR bit is zero.
 * 4. Otherwise record (block, size, LFSR state) and fill the block.
 * 5. After the last round, verify and free everything still outstanding.
 *
 * Progress is narrated on stdout through the descriptor table.
 */

use super::heap::BlockAllocator;
use super::lfsr::Lfsr16;
use crate::config::{self, STDOUT};
use crate::io::FioTable;
use alloc::vec::Vec;
use core::fmt;
use core::ptr::NonNull;

/// Harness parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmTestConfig {
    pub rounds: usize,
    pub min_size: usize,
    pub size_mask: u16,
    pub seed: u16,
    /// Ring slots; at most `ring_capacity - 1` blocks are outstanding.
    pub ring_capacity: usize,
}

impl MmTestConfig {
    /// Defaults with the ring sized to a heap of `heap_size` bytes.
    pub fn for_heap(heap_size: usize) -> Self {
        Self {
            ring_capacity: (heap_size / config::mmtest::MIN_ALLOC_SIZE).max(2),
            ..Self::default()
        }
    }
}

impl Default for MmTestConfig {
    fn default() -> Self {
        Self {
            rounds: config::mmtest::ROUNDS,
            min_size: config::mmtest::MIN_ALLOC_SIZE,
            size_mask: config::mmtest::SIZE_MASK,
            seed: config::mmtest::SEED,
            ring_capacity: (config::HEAP_SIZE / config::mmtest::MIN_ALLOC_SIZE).max(2),
        }
    }
}

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmTestError {
    /// A block no longer holds what was written into it.
    Integrity {
        block: usize,
        offset: usize,
        expected: u8,
        actual: u8,
    },
    /// A block was recorded into a full ring.
    RingOverflow,
    /// The configuration cannot produce a block size.
    BadConfig,
}

impl fmt::Display for MmTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MmTestError::Integrity {
                block,
                offset,
                expected,
                actual,
            } => write!(
                f,
                "block {:#x} corrupted at +{}: u={:02X}, v={:02X}",
                block, offset, actual, expected
            ),
            MmTestError::RingOverflow => write!(f, "circular buffer overflow"),
            MmTestError::BadConfig => write!(f, "invalid harness configuration"),
        }
    }
}

/// Counters from a completed run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MmTestReport {
    pub allocations: usize,
    pub failed_allocations: usize,
    pub frees: usize,
    pub drains: usize,
    pub bytes_verified: usize,
    /// Most blocks outstanding at once.
    pub peak_outstanding: usize,
}

/// One outstanding block.
#[derive(Debug, Clone, Copy)]
struct RingSlot {
    ptr: NonNull<u8>,
    size: usize,
    lfsr: u16,
}

/// FIFO of outstanding blocks; one slot stays empty to tell full from empty.
struct Ring {
    slots: Vec<Option<RingSlot>>,
    write: usize,
    read: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize(capacity, None);
        Self {
            slots,
            write: 0,
            read: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        (self.write + self.capacity() - self.read) % self.capacity()
    }

    fn is_full(&self) -> bool {
        (self.write + 1) % self.capacity() == self.read
    }

    fn push(&mut self, slot: RingSlot) -> Result<(), MmTestError> {
        if self.is_full() {
            return Err(MmTestError::RingOverflow);
        }
        self.slots[self.write] = Some(slot);
        self.write = (self.write + 1) % self.capacity();
        Ok(())
    }

    fn pop(&mut self) -> Option<RingSlot> {
        if self.len() == 0 {
            return None;
        }
        let slot = self.slots[self.read].take();
        self.read = (self.read + 1) % self.capacity();
        slot
    }
}

/// Stress harness bound to an allocator and a descriptor table for output
pub struct MmTest<'a, A: BlockAllocator, const N: usize> {
    heap: &'a A,
    out: &'a FioTable<N>,
    config: MmTestConfig,
    lfsr: Lfsr16,
    ring: Ring,
    report: MmTestReport,
}

impl<'a, A: BlockAllocator, const N: usize> MmTest<'a, A, N> {
    pub fn new(heap: &'a A, out: &'a FioTable<N>, config: MmTestConfig) -> Self {
        Self {
            heap,
            out,
            config,
            lfsr: Lfsr16::new(config.seed),
            ring: Ring::new(config.ring_capacity.max(2)),
            report: MmTestReport::default(),
        }
    }

    /// Run every round, then drain what is left.
    ///
    /// On an integrity failure the remaining blocks are abandoned: the heap
    /// is no longer trustworthy enough to free into.
    pub fn run(mut self) -> Result<MmTestReport, MmTestError> {
        // a zero seed locks the LFSR at zero, so no size is ever drawn
        if self.config.seed == 0
            || self.config.size_mask == 0
            || self.config.min_size > self.config.size_mask as usize
        {
            return Err(MmTestError::BadConfig);
        }

        log::info!(
            "mmtest: {} rounds, ring of {}",
            self.config.rounds,
            self.ring.capacity()
        );

        for _ in 0..self.config.rounds {
            self.round()?;
        }

        while let Some(slot) = self.ring.pop() {
            self.verify_and_free(slot)?;
        }

        log::info!("mmtest: passed, {} blocks verified", self.report.frees);
        Ok(self.report)
    }

    fn round(&mut self) -> Result<(), MmTestError> {
        let size = self.draw_size();
        let _ = crate::fprintln!(self.out, STDOUT, "try to allocate {} bytes", size);
        let block = self.heap.allocate(size);
        let _ = crate::fprintln!(
            self.out,
            STDOUT,
            "malloc returned {:#x}",
            block.map_or(0, |p| p.as_ptr() as usize)
        );

        match block {
            Some(ptr) if !self.ring.is_full() => {
                let _ = crate::fprint!(self.out, STDOUT, "allocate a block, size {}\r\n\r\n", size);
                self.record_and_fill(ptr, size)?;
            }
            block => {
                match block {
                    // ring full: the fresh block cannot be tracked, hand it back
                    Some(ptr) => unsafe { self.heap.release(ptr, size) },
                    None => self.report.failed_allocations += 1,
                }
                self.drain()?;
            }
        }
        Ok(())
    }

    fn draw_size(&mut self) -> usize {
        loop {
            let size = (self.lfsr.next_u16() & self.config.size_mask) as usize;
            if size >= self.config.min_size {
                return size;
            }
        }
    }

    fn record_and_fill(&mut self, ptr: NonNull<u8>, size: usize) -> Result<(), MmTestError> {
        self.ring.push(RingSlot {
            ptr,
            size,
            lfsr: self.lfsr.state(),
        })?;
        self.report.allocations += 1;
        self.report.peak_outstanding = self.report.peak_outstanding.max(self.ring.len());

        // SAFETY: `ptr` is a live block of `size` bytes owned by the ring.
        let block = unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), size) };
        for byte in block.iter_mut() {
            *byte = self.lfsr.next_byte();
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), MmTestError> {
        self.report.drains += 1;
        while let Some(slot) = self.ring.pop() {
            self.verify_and_free(slot)?;
            if self.lfsr.next_u16() & 1 == 0 {
                break;
            }
        }
        let _ = crate::fprint!(self.out, STDOUT, "\r\n");
        Ok(())
    }

    /// Replay the LFSR from the block's snapshot and compare, then free.
    ///
    /// The LFSR keeps running from where the replay left it.
    fn verify_and_free(&mut self, slot: RingSlot) -> Result<(), MmTestError> {
        self.lfsr.set_state(slot.lfsr);
        let _ = crate::fprintln!(self.out, STDOUT, "free a block, size {}", slot.size);

        // SAFETY: the block is live until released below.
        let block = unsafe { core::slice::from_raw_parts(slot.ptr.as_ptr(), slot.size) };
        for (offset, &actual) in block.iter().enumerate() {
            let expected = self.lfsr.next_byte();
            if actual != expected {
                let _ = crate::fprintln!(self.out, STDOUT, "OUCH: u={:02X}, v={:02X}", actual, expected);
                let err = MmTestError::Integrity {
                    block: slot.ptr.as_ptr() as usize,
                    offset,
                    expected,
                    actual,
                };
                log::error!("mmtest: {}", err);
                return Err(err);
            }
        }

        // SAFETY: allocated with this size by `round` and popped exactly once.
        unsafe { self.heap.release(slot.ptr, slot.size) };
        self.report.frees += 1;
        self.report.bytes_verified += slot.size;
        Ok(())
    }
}

/// Run the harness with `config`, narrating on `out`'s stdout.
pub fn mmtest<A: BlockAllocator, const N: usize>(
    heap: &A,
    out: &FioTable<N>,
    config: MmTestConfig,
) -> Result<MmTestReport, MmTestError> {
    MmTest::new(heap, out, config).run()
}
