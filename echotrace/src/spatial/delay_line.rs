/// Stereo circular delay line with a shared write cursor.
///
/// Contributions are scattered ahead of the cursor with [`add`](Self::add).
/// [`read_and_advance`](Self::read_and_advance) returns the slot under the
/// cursor, clears it and moves on, so every slot is consumed exactly once per
/// wrap.
#[derive(Debug, Clone)]
pub struct DelayBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    cursor: usize,
}

impl DelayBuffer {
    /// Creates a silent buffer of `len` samples per ear. `len` must be non-zero.
    pub fn new(len: usize) -> Self {
        let len = len.max(1);
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Largest delay that can be represented.
    pub fn max_delay(&self) -> usize {
        self.len() - 1
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Accumulates one contribution per ear, `left_delay` and `right_delay`
    /// samples ahead of the cursor. Delays wrap around the buffer.
    #[inline]
    pub fn add(&mut self, left_delay: usize, left: f32, right_delay: usize, right: f32) {
        let len = self.len();
        self.left[(self.cursor + left_delay) % len] += left;
        self.right[(self.cursor + right_delay) % len] += right;
    }

    /// Reads both ears at the cursor, zeroes that slot and advances.
    #[inline]
    pub fn read_and_advance(&mut self) -> (f32, f32) {
        let out = (self.left[self.cursor], self.right[self.cursor]);
        self.left[self.cursor] = 0.0;
        self.right[self.cursor] = 0.0;
        self.cursor = (self.cursor + 1) % self.len();
        out
    }

    /// Silences the whole buffer without moving the cursor.
    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }
}
