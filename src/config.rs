/*
 * Firmware Configuration
 *
 * Compile-time limits and defaults shared by the I/O core.
 */

/// Capacity of the descriptor table, reserved console handles included.
pub const MAX_FDS: usize = 32;

/// Number of mount points the filesystem dispatcher can hold.
pub const MAX_FS: usize = 16;

/// Longest line (terminator included) the console line reader accepts.
pub const MAX_SERIAL_STR: usize = 100;

/// Console input, bound at start-up.
pub const STDIN: usize = 0;
/// Console output, bound at start-up.
pub const STDOUT: usize = 1;
/// Console error output, shares the transmit path with stdout.
pub const STDERR: usize = 2;

/// Handles below this index are reserved for the console.
pub const RESERVED_FDS: usize = 3;

/// Total heap managed by the firmware allocator.
pub const HEAP_SIZE: usize = 17 * 1024;

/// Default settings for the heap stress harness.
pub mod mmtest {
    /// Number of allocation rounds.
    pub const ROUNDS: usize = 200;
    /// Smallest block size the harness will request.
    pub const MIN_ALLOC_SIZE: usize = 256;
    /// Mask applied to the generator output to draw a block size.
    pub const SIZE_MASK: u16 = 0x7FF;
    /// Generator state at the start of every run.
    pub const SEED: u16 = 0xACE1;
}
