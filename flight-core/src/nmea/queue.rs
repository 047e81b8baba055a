use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use super::Sentence;

pub const QUEUE_SLOTS: usize = 8;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEmpty;

/// Fixed capacity single-producer single-consumer sentence queue.
///
/// `put_count` is only written by the producer and `get_count` only by
/// the consumer. Both count up forever and wrap, `put_count - get_count`
/// is the number of queued sentences. Use [`SentenceQueue::split`] to get
/// the two halves, e.g. from a `static_cell::StaticCell` on the firmware
/// side so the halves are `'static`.
pub struct SentenceQueue {
    put_count: AtomicU32,
    get_count: AtomicU32,
    slots: [UnsafeCell<Sentence>; QUEUE_SLOTS],
}

// SAFETY: a slot is written only by the single producer while it is free,
// and read only by the single consumer while it is occupied. The counters
// publish the hand-over with release/acquire ordering.
unsafe impl Sync for SentenceQueue {}

impl SentenceQueue {
    pub const fn new() -> Self {
        Self {
            put_count: AtomicU32::new(0),
            get_count: AtomicU32::new(0),
            slots: [const { UnsafeCell::new(Sentence::new()) }; QUEUE_SLOTS],
        }
    }

    /// Holding `&mut self` guarantees there is only ever one producer and
    /// one consumer.
    pub fn split(&mut self) -> (SentenceProducer<'_>, SentenceConsumer<'_>) {
        let queue = &*self;
        (SentenceProducer { queue }, SentenceConsumer { queue })
    }

    /// Snapshot, may be stale by the time it's read.
    pub fn len(&self) -> usize {
        let put = self.put_count.load(Ordering::Acquire);
        let get = self.get_count.load(Ordering::Acquire);
        put.wrapping_sub(get) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, count: u32) -> &UnsafeCell<Sentence> {
        &self.slots[count as usize % QUEUE_SLOTS]
    }
}

impl Default for SentenceQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SentenceProducer<'a> {
    queue: &'a SentenceQueue,
}

impl SentenceProducer<'_> {
    /// Copies `sentence` into the next free slot. Never blocks.
    pub fn put(&mut self, sentence: &Sentence) -> Result<(), QueueFull> {
        let put = self.queue.put_count.load(Ordering::Relaxed);
        let get = self.queue.get_count.load(Ordering::Acquire);
        if put.wrapping_sub(get) as usize >= QUEUE_SLOTS {
            return Err(QueueFull);
        }

        // SAFETY: the slot at `put` is free, the consumer won't touch it
        // until `put_count` moves past it below.
        unsafe {
            (*self.queue.slot(put).get()).clone_from(sentence);
        }
        self.queue
            .put_count
            .store(put.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= QUEUE_SLOTS
    }
}

pub struct SentenceConsumer<'a> {
    queue: &'a SentenceQueue,
}

impl SentenceConsumer<'_> {
    /// Takes the oldest sentence. Never blocks.
    pub fn get(&mut self) -> Result<Sentence, QueueEmpty> {
        let get = self.queue.get_count.load(Ordering::Relaxed);
        let put = self.queue.put_count.load(Ordering::Acquire);
        if put == get {
            return Err(QueueEmpty);
        }

        // SAFETY: the slot at `get` is occupied, the producer won't reuse it
        // until `get_count` moves past it below.
        let sentence = unsafe { (*self.queue.slot(get).get()).clone() };
        self.queue
            .get_count
            .store(get.wrapping_add(1), Ordering::Release);
        Ok(sentence)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
