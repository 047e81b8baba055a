//! Byte-stream framing of NMEA sentences and the hand-off queue between
//! the receive interrupt and the main loop.

pub mod framer;
pub mod queue;

use heapless::Vec;

pub use framer::{FramerStats, NmeaFramer};
pub use queue::{
    QUEUE_SLOTS, QueueEmpty, QueueFull, SentenceConsumer, SentenceProducer, SentenceQueue,
};

/// Longest sentence accepted, counting the leading `$`/`!` and the
/// trailing `\n`.
pub const MAX_SENTENCE_LEN: usize = 82;

/// One complete sentence, start byte through line feed.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sentence(Vec<u8, MAX_SENTENCE_LEN>);

impl Sentence {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// `None` if `bytes` is longer than [`MAX_SENTENCE_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The sentence as text, `None` if the receiver picked up non UTF-8 noise.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn push(&mut self, byte: u8) -> Result<(), u8> {
        self.0.push(byte)
    }
}

impl AsRef<[u8]> for Sentence {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
