/*
 * Heap Allocators
 *
 * `BlockAllocator` is the allocate/free pair the stress harness drives.
 * Two implementations:
 *
 * - `ArenaHeap`: linked_list_allocator::LockedHeap over a region the
 *   caller hands in. This is the firmware heap.
 * - `GlobalHeap`: whatever `#[global_allocator]` the image links.
 */

use alloc::alloc::{alloc, dealloc};
use core::alloc::Layout;
use core::ptr::NonNull;
use linked_list_allocator::LockedHeap;

/// Alignment of every block handed out, as the RTOS allocator does.
pub const BLOCK_ALIGN: usize = 8;

fn block_layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size.max(1), BLOCK_ALIGN).ok()
}

/// Allocate/free by size, the way the firmware heap API looks.
pub trait BlockAllocator {
    /// Allocate `size` bytes, or `None` when the heap cannot satisfy it.
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Return a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate(size)` on this allocator and must not
    /// have been released already.
    unsafe fn release(&self, ptr: NonNull<u8>, size: usize);
}

/// Firmware heap over a fixed region.
pub struct ArenaHeap {
    heap: LockedHeap,
}

impl ArenaHeap {
    /// Manage `size` bytes starting at `start`.
    ///
    /// # Safety
    ///
    /// The region must be valid for reads and writes, unused by anything
    /// else, and outlive the heap.
    pub unsafe fn new(start: *mut u8, size: usize) -> Self {
        log::info!("heap: {:p} - {:p} ({} bytes)", start, start.wrapping_add(size), size);
        Self {
            heap: unsafe { LockedHeap::new(start, size) },
        }
    }

    /// Manage a region the program will never touch again.
    pub fn from_static(region: &'static mut [u8]) -> Self {
        // SAFETY: the exclusive 'static borrow hands the region over for good.
        unsafe { Self::new(region.as_mut_ptr(), region.len()) }
    }

    pub fn size(&self) -> usize {
        self.heap.lock().size()
    }

    pub fn used(&self) -> usize {
        self.heap.lock().used()
    }

    pub fn free(&self) -> usize {
        self.heap.lock().free()
    }
}

impl BlockAllocator for ArenaHeap {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = block_layout(size)?;
        self.heap.lock().allocate_first_fit(layout).ok()
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) {
        if let Some(layout) = block_layout(size) {
            unsafe { self.heap.lock().deallocate(ptr, layout) }
        }
    }
}

/// The image's global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalHeap;

impl BlockAllocator for GlobalHeap {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = block_layout(size)?;
        // SAFETY: the layout has a non-zero size.
        NonNull::new(unsafe { alloc(layout) })
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) {
        if let Some(layout) = block_layout(size) {
            unsafe { dealloc(ptr.as_ptr(), layout) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;

    fn arena(size: usize) -> ArenaHeap {
        ArenaHeap::from_static(Box::leak(vec![0u8; size].into_boxed_slice()))
    }

    #[test]
    fn arena_hands_out_aligned_blocks_and_takes_them_back() {
        let heap = arena(4096);
        let a = heap.allocate(300).unwrap();
        let b = heap.allocate(1).unwrap();
        assert_eq!(a.as_ptr() as usize % BLOCK_ALIGN, 0);
        assert_eq!(b.as_ptr() as usize % BLOCK_ALIGN, 0);
        assert!(heap.used() >= 301);

        unsafe {
            heap.release(a, 300);
            heap.release(b, 1);
        }
        assert_eq!(heap.used(), 0);
        assert_eq!(heap.free(), heap.size());
    }

    #[test]
    fn arena_reports_exhaustion() {
        let heap = arena(1024);
        assert!(heap.allocate(4096).is_none());
        let block = heap.allocate(512).unwrap();
        assert!(heap.allocate(1024).is_none());
        unsafe { heap.release(block, 512) };
        assert!(heap.allocate(512).is_some());
    }

    #[test]
    fn global_heap_round_trip() {
        let block = GlobalHeap.allocate(64).unwrap();
        unsafe {
            block.as_ptr().write_bytes(0xA5, 64);
            assert_eq!(*block.as_ptr().add(63), 0xA5);
            GlobalHeap.release(block, 64);
        }
    }
}
