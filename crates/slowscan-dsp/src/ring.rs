//! Lapped circular sample buffer.
//!
//! [`LappedBuffer`] keeps the most recent audio in a fixed ring of capacity `C`
//! and duplicates every stored sample into a mirror region directly after the
//! ring. Any run of up to `C` samples starting anywhere in `[0, C)` is therefore
//! a single contiguous slice, so windowing code never has to handle wraparound.
//!
//! ```text
//!   storage: [ ring: 0 .. C ][ mirror: C .. 2C ]
//!                  ^tail          (copy of ring)
//!   window(len) = storage[tail .. tail + len]    (len <= C)
//! ```
//!
//! Positions:
//!
//! - `head` is where the next refill writes
//! - `tail` is the start of the current analysis window
//! - `fill` counts valid samples ahead of `tail`, capped at `C`

/// Fixed-capacity ring of 16-bit samples with a mirrored tail region.
#[derive(Debug, Clone)]
pub struct LappedBuffer {
    storage: Vec<i16>,
    capacity: usize,
    head: usize,
    tail: usize,
    fill: usize,
}

impl LappedBuffer {
    /// Creates an empty buffer holding up to `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Buffer capacity must be > 0");

        Self {
            storage: vec![0; capacity * 2],
            capacity,
            head: 0,
            tail: 0,
            fill: 0,
        }
    }

    /// Ring capacity `C` in samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Next write position in `[0, C)`.
    pub fn head(&self) -> usize {
        self.head
    }

    /// Start of the current read window in `[0, C)`.
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Valid samples available ahead of `tail`.
    pub fn fill_count(&self) -> usize {
        self.fill
    }

    /// Appends samples at `head`, wrapping and refreshing the mirror.
    ///
    /// The fill count grows by `samples.len()` but never exceeds the capacity.
    /// Writing more than the free space overwrites the oldest samples; the
    /// engine sizes its refills so that this does not happen.
    pub fn write(&mut self, samples: &[i16]) {
        let cap = self.capacity;

        for chunk in samples.chunks(cap) {
            let first = chunk.len().min(cap - self.head);
            let (before_wrap, after_wrap) = chunk.split_at(first);
            self.store(self.head, before_wrap);
            self.store(0, after_wrap);
            self.head = (self.head + chunk.len()) % cap;
        }

        self.fill = (self.fill + samples.len()).min(cap);
    }

    /// Copies `data` into the ring at `at` and into the mirror at `at + C`.
    #[inline]
    fn store(&mut self, at: usize, data: &[i16]) {
        if data.is_empty() {
            return;
        }
        let cap = self.capacity;
        self.storage[at..at + data.len()].copy_from_slice(data);
        self.storage[at + cap..at + cap + data.len()].copy_from_slice(data);
    }

    /// Consumes `n` samples from `tail`.
    ///
    /// `tail` wraps modulo the capacity; the fill count saturates at zero.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        self.tail = (self.tail + n) % self.capacity;
        self.fill = self.fill.saturating_sub(n);
    }

    /// Contiguous view of `len` samples starting at the current `tail`.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the capacity.
    #[inline]
    pub fn window(&self, len: usize) -> &[i16] {
        self.slice(self.tail, len)
    }

    /// Contiguous view of `len` samples starting at ring position `start`.
    ///
    /// # Panics
    ///
    /// Panics if `start >= C` or `len > C`.
    #[inline]
    pub fn slice(&self, start: usize, len: usize) -> &[i16] {
        assert!(start < self.capacity, "start {start} outside ring");
        assert!(len <= self.capacity, "window of {len} exceeds capacity");
        &self.storage[start..start + len]
    }

    /// Clears all samples and positions.
    pub fn reset(&mut self) {
        self.storage.fill(0);
        self.head = 0;
        self.tail = 0;
        self.fill = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: i16, len: usize) -> Vec<i16> {
        (0..len).map(|i| start.wrapping_add(i as i16)).collect()
    }

    #[test]
    fn test_write_updates_head_and_fill() {
        let mut buf = LappedBuffer::new(8);
        buf.write(&ramp(1, 5));
        assert_eq!(buf.head(), 5);
        assert_eq!(buf.fill_count(), 5);
        assert_eq!(buf.window(5), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_fill_capped_at_capacity() {
        let mut buf = LappedBuffer::new(8);
        buf.write(&ramp(0, 20));
        assert_eq!(buf.fill_count(), 8);
        assert_eq!(buf.head(), 20 % 8);
    }

    #[test]
    fn test_window_across_wrap_is_contiguous() {
        let mut buf = LappedBuffer::new(8);
        buf.write(&ramp(0, 6));
        buf.consume(5);
        buf.write(&ramp(6, 6)); // wraps: positions 6,7,0,1,2,3

        assert_eq!(buf.tail(), 5);
        assert_eq!(buf.window(7), &[5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_consume_wraps_tail_and_saturates() {
        let mut buf = LappedBuffer::new(4);
        buf.write(&[1, 2]);
        buf.consume(3);
        assert_eq!(buf.tail(), 3);
        assert_eq!(buf.fill_count(), 0);
        buf.consume(2);
        assert_eq!(buf.tail(), 1);
    }

    #[test]
    fn test_full_capacity_window_from_any_start() {
        let mut buf = LappedBuffer::new(5);
        buf.write(&ramp(10, 5));
        for start in 0..5 {
            let w = buf.slice(start, 5);
            for (k, &s) in w.iter().enumerate() {
                assert_eq!(s, 10 + ((start + k) % 5) as i16);
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_window_longer_than_capacity_panics() {
        let buf = LappedBuffer::new(4);
        let _ = buf.window(5);
    }

    #[test]
    fn test_reset() {
        let mut buf = LappedBuffer::new(4);
        buf.write(&[1, 2, 3]);
        buf.consume(1);
        buf.reset();
        assert_eq!(buf.head(), 0);
        assert_eq!(buf.tail(), 0);
        assert_eq!(buf.fill_count(), 0);
        assert_eq!(buf.window(4), &[0, 0, 0, 0]);
    }
}
