#[derive(Clone, Debug)]
pub(crate) struct RingBuffer {
    buffer: Vec<f64>,
    head: usize,
    len: usize,
    capacity: usize,
}

impl RingBuffer {
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            head: 0,
            len: 0,
            capacity,
        }
    }

    #[inline]
    pub(crate) fn is_ready(&self) -> bool {
        self.len == self.capacity
    }

    /// Appends a value, returning the evicted oldest value once full.
    #[inline]
    pub(crate) fn push(&mut self, value: f64) -> Option<f64> {
        if self.is_ready() {
            let old = self.buffer[self.head];

            self.buffer[self.head] = value;

            self.head += 1;
            if self.head == self.capacity {
                self.head = 0;
            }

            Some(old)
        } else {
            self.buffer[self.len] = value;
            self.len += 1;

            None
        }
    }
}

/// Fixed-length running sum over a [`RingBuffer`].
///
/// Tracks how many non-zero samples the window holds so that a window of
/// zeros reports exactly `0.0`, free of add/subtract rounding residue.
#[derive(Clone, Debug)]
pub(crate) struct RollingSum {
    buffer: RingBuffer,
    sum: f64,
    non_zero: usize,
}

impl RollingSum {
    #[must_use]
    pub(crate) fn new(length: usize) -> Self {
        Self {
            buffer: RingBuffer::new(length),
            sum: 0.0,
            non_zero: 0,
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, value: f64) {
        if let Some(old) = self.buffer.push(value) {
            self.sum -= old;
            if old != 0.0 {
                self.non_zero -= 1;
            }
        }

        self.sum += value;
        if value != 0.0 {
            self.non_zero += 1;
        }
    }

    /// Sum of the window, `None` until it holds `length` samples.
    #[inline]
    pub(crate) fn sum(&self) -> Option<f64> {
        if !self.buffer.is_ready() {
            return None;
        }

        Some(if self.non_zero == 0 { 0.0 } else { self.sum })
    }
}
