/*
 * Generic I/O Wait Interface
 *
 * The firmware does not own a scheduler. The host RTOS provides one and
 * plugs it in through `TaskWait`, so drivers can block a task until an
 * interrupt reports activity on a channel.
 *
 * ## Architecture
 *
 * **Wait Channels:**
 * Each direction of each device has its own channel (`IoChannel`).
 * A task calls `wait(channel)` when the state it needs is not there yet.
 *
 * **Waking:**
 * The interrupt handler calls `wake(channel)` after it changed the state.
 *
 * ## Contract
 *
 * - `wait` runs in task context only and may return spuriously; callers
 *   always re-check their condition in a loop.
 * - `wait` must not lose a wake that lands between the caller's failed
 *   check and the task being listed on the channel. The caller hands in
 *   `ready`; the implementation lists the task first, then evaluates
 *   `ready`, and only parks if it is still false. Any wake after the
 *   listing finds the task.
 * - `wake` must be safe to call from interrupt context: no blocking and no
 *   allocation.
 */

/// I/O channel identifier
///
/// Each hardware event source has a unique channel.
/// Tasks wait on channels, and interrupts wake tasks on channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IoChannel {
    /// Transmit slot released (USART number)
    SerialTx(u8),

    /// Received byte queued (USART number)
    SerialRx(u8),

    /// Generic device (for custom drivers)
    Device(u32),
}

/// Scheduler hooks used by blocking drivers.
pub trait TaskWait: Send + Sync {
    /// Park the calling task until `wake(channel)` or a spurious wakeup.
    ///
    /// Lists the task on `channel` before calling `ready`, and returns
    /// without parking if `ready` is already true.
    fn wait(&self, channel: IoChannel, ready: &dyn Fn() -> bool);

    /// Make tasks parked on `channel` runnable. Interrupt-safe.
    fn wake(&self, channel: IoChannel);
}

/// Busy-wait fallback for boards without a scheduler hook.
///
/// `wait` only issues a spin-loop hint and returns, so callers poll.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinWait;

impl TaskWait for SpinWait {
    fn wait(&self, _channel: IoChannel, ready: &dyn Fn() -> bool) {
        if !ready() {
            core::hint::spin_loop();
        }
    }

    fn wake(&self, _channel: IoChannel) {}
}
