/*
 * ISR-to-Task Handoff Primitives
 *
 * Two bounded primitives connect interrupt handlers to tasks:
 *
 * - `BinarySemaphore`: one unit of credit. Tasks take it (blocking),
 *   interrupts give it (never blocking).
 * - `isr_channel`: a single-producer single-consumer byte queue built on
 *   `heapless::spsc`. The producer half is only ever used from interrupt
 *   context, the consumer half only from task context.
 *
 * Neither primitive takes a lock on the interrupt side.
 */

use super::io_wait::{IoChannel, TaskWait};
use alloc::boxed::Box;
use core::sync::atomic::{AtomicBool, Ordering};
use heapless::spsc::{Consumer, Producer, Queue};
use spin::Mutex;

/// Binary semaphore with an interrupt-safe give.
pub struct BinarySemaphore {
    available: AtomicBool,
    channel: IoChannel,
}

impl BinarySemaphore {
    /// Create a semaphore; `available` is its initial state.
    pub const fn new(channel: IoChannel, available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            channel,
        }
    }

    /// Take the credit without blocking.
    pub fn try_take(&self) -> bool {
        self.available
            .compare_exchange(true, false, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Block the calling task until the credit is available, then take it.
    ///
    /// No timeout: only a `give_from_isr` releases a waiting task.
    pub fn take(&self, waiter: &dyn TaskWait) {
        while !self.try_take() {
            waiter.wait(self.channel, &|| self.is_available());
        }
    }

    /// Release the credit from interrupt context.
    ///
    /// Returns true if the credit was previously taken, meaning a task may
    /// have been waiting for it.
    pub fn give_from_isr(&self, waiter: &dyn TaskWait) -> bool {
        let was_available = self.available.swap(true, Ordering::Release);
        waiter.wake(self.channel);
        !was_available
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }
}

/// Producer half of an interrupt channel. Interrupt context only.
pub struct IsrSender<const N: usize> {
    producer: Producer<'static, u8, N>,
    channel: IoChannel,
}

/// Consumer half of an interrupt channel. Task context only.
pub struct TaskReceiver<const N: usize> {
    consumer: Mutex<Consumer<'static, u8, N>>,
    channel: IoChannel,
}

/// Create a channel holding up to `N - 1` bytes.
///
/// The backing queue lives for the rest of the program, like the queue a
/// driver creates once at start-up.
pub fn isr_channel<const N: usize>(channel: IoChannel) -> (IsrSender<N>, TaskReceiver<N>) {
    let queue: &'static mut Queue<u8, N> = Box::leak(Box::new(Queue::new()));
    let (producer, consumer) = queue.split();
    (
        IsrSender { producer, channel },
        TaskReceiver {
            consumer: Mutex::new(consumer),
            channel,
        },
    )
}

impl<const N: usize> IsrSender<N> {
    /// Queue a byte without blocking. Hands the byte back if the queue is full.
    pub fn send_from_isr(&mut self, byte: u8, waiter: &dyn TaskWait) -> Result<(), u8> {
        self.producer.enqueue(byte)?;
        waiter.wake(self.channel);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        !self.producer.ready()
    }
}

impl<const N: usize> TaskReceiver<N> {
    /// Pop a byte if one is queued.
    pub fn try_recv(&self) -> Option<u8> {
        self.consumer.lock().dequeue()
    }

    /// Block the calling task until a byte is queued.
    pub fn recv(&self, waiter: &dyn TaskWait) -> u8 {
        loop {
            if let Some(byte) = self.try_recv() {
                return byte;
            }
            waiter.wait(self.channel, &|| !self.is_empty());
        }
    }

    pub fn len(&self) -> usize {
        self.consumer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::io_wait::SpinWait;
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    type Interrupt = Box<dyn FnOnce(&dyn TaskWait) + Send>;

    /// Scheduler with a wait list: a wake with nobody listed is dropped,
    /// and a listed task stays parked until it is woken.
    ///
    /// `interrupt` fires once, after the caller's failed check and before
    /// the task is listed.
    struct ListedWait {
        listed: AtomicBool,
        woken: AtomicBool,
        interrupt: Mutex<Option<Interrupt>>,
    }

    impl ListedWait {
        fn new(interrupt: impl FnOnce(&dyn TaskWait) + Send + 'static) -> Self {
            Self {
                listed: AtomicBool::new(false),
                woken: AtomicBool::new(false),
                interrupt: Mutex::new(Some(Box::new(interrupt))),
            }
        }
    }

    impl TaskWait for ListedWait {
        fn wait(&self, channel: IoChannel, ready: &dyn Fn() -> bool) {
            let interrupt = self.interrupt.lock().take();
            if let Some(interrupt) = interrupt {
                interrupt(self);
            }

            self.listed.store(true, Ordering::SeqCst);
            if !ready() {
                let deadline = Instant::now() + Duration::from_secs(2);
                while !self.woken.swap(false, Ordering::SeqCst) {
                    assert!(Instant::now() < deadline, "wake on {:?} was lost", channel);
                    thread::yield_now();
                }
            }
            self.listed.store(false, Ordering::SeqCst);
        }

        fn wake(&self, _channel: IoChannel) {
            if self.listed.load(Ordering::SeqCst) {
                self.woken.store(true, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn semaphore_starts_in_requested_state() {
        let sem = BinarySemaphore::new(IoChannel::SerialTx(0), true);
        assert!(sem.try_take());
        assert!(!sem.try_take());

        let sem = BinarySemaphore::new(IoChannel::SerialTx(0), false);
        assert!(!sem.is_available());
    }

    #[test]
    fn give_reports_whether_credit_was_consumed() {
        let sem = BinarySemaphore::new(IoChannel::SerialTx(0), true);
        assert!(!sem.give_from_isr(&SpinWait));
        assert!(sem.try_take());
        assert!(sem.give_from_isr(&SpinWait));
    }

    #[test]
    fn take_blocks_until_given() {
        let sem = Arc::new(BinarySemaphore::new(IoChannel::SerialTx(0), false));
        let giver = {
            let sem = sem.clone();
            thread::spawn(move || {
                thread::sleep(std::time::Duration::from_millis(10));
                sem.give_from_isr(&SpinWait);
            })
        };
        sem.take(&SpinWait);
        giver.join().unwrap();
        assert!(!sem.is_available());
    }

    #[test]
    fn give_before_listing_is_not_lost() {
        let sem = Arc::new(BinarySemaphore::new(IoChannel::SerialTx(0), false));
        let isr_sem = sem.clone();
        let waiter = ListedWait::new(move |w| {
            isr_sem.give_from_isr(w);
        });

        sem.take(&waiter);
        assert!(!sem.is_available());
    }

    #[test]
    fn byte_before_listing_is_not_lost() {
        let (tx, rx) = isr_channel::<2>(IoChannel::SerialRx(0));
        let waiter = ListedWait::new(move |w| {
            let mut tx = tx;
            assert_eq!(tx.send_from_isr(b'k', w), Ok(()));
        });

        assert_eq!(rx.recv(&waiter), b'k');
        assert!(rx.is_empty());
    }

    #[test]
    fn depth_one_channel_rejects_second_byte() {
        let (mut tx, rx) = isr_channel::<2>(IoChannel::SerialRx(0));
        assert_eq!(tx.send_from_isr(b'a', &SpinWait), Ok(()));
        assert!(tx.is_full());
        assert_eq!(tx.send_from_isr(b'b', &SpinWait), Err(b'b'));
        assert_eq!(rx.try_recv(), Some(b'a'));
        assert_eq!(rx.try_recv(), None);
        assert_eq!(tx.send_from_isr(b'c', &SpinWait), Ok(()));
        assert_eq!(rx.recv(&SpinWait), b'c');
    }
}
