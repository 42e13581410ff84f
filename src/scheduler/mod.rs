/*
 * Scheduler Interface
 *
 * The preemptive scheduler itself belongs to the host RTOS. This module
 * holds the seam drivers block through (`io_wait`) and the bounded
 * primitives that carry events from interrupt handlers to tasks (`sync`).
 */

pub mod io_wait;
pub mod sync;

pub use io_wait::{IoChannel, SpinWait, TaskWait};
pub use sync::{BinarySemaphore, IsrSender, TaskReceiver, isr_channel};
