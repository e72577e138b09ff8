use super::matcher::find;
use heapless::Vec;

/// Capacity used by the modem engine unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 200;

/// Fixed-capacity window over the most recent bytes received from the modem.
///
/// Appending past capacity drops the oldest bytes, so the window always holds
/// the newest `N` bytes of the stream and never allocates.
#[derive(Debug, Clone, Default)]
pub struct RollingBuffer<const N: usize = DEFAULT_CAPACITY> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> RollingBuffer<N> {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn append(&mut self, incoming: &[u8]) {
        if incoming.len() >= N {
            self.bytes.clear();
            let _ = self.bytes.extend_from_slice(&incoming[incoming.len() - N..]);
            return;
        }

        let overflow = (self.bytes.len() + incoming.len()).saturating_sub(N);
        if overflow > 0 {
            self.consume(overflow);
        }
        // Fits: len + incoming <= N after the trim above
        let _ = self.bytes.extend_from_slice(incoming);
    }

    /// Drop the `count` oldest bytes.
    pub fn consume(&mut self, count: usize) {
        let len = self.bytes.len();
        let count = count.min(len);
        if count == 0 {
            return;
        }
        self.bytes.copy_within(count.., 0);
        self.bytes.truncate(len - count);
    }

    pub fn contains(&self, needle: &[u8]) -> bool {
        find(&self.bytes, needle).is_some()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}
