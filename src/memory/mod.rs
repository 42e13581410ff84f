/*
 * Memory
 *
 * Heap backends and the heap integrity stress harness.
 */

pub mod heap;
pub mod lfsr;
pub mod mmtest;

pub use heap::{ArenaHeap, BlockAllocator, GlobalHeap};
pub use lfsr::Lfsr16;
pub use mmtest::{MmTest, MmTestConfig, MmTestError, MmTestReport, mmtest};
