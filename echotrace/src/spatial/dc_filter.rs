/// Default pole of the DC blocker.
pub const DEFAULT_DC_POLE: f32 = 0.995;

/// First-order DC blocking filter: `y[n] = x[n] - x[n-1] + r * y[n-1]`.
#[derive(Debug, Clone, Copy)]
pub struct DcBlocker {
    pole: f32,
    prev_input: f32,
    prev_output: f32,
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::new(DEFAULT_DC_POLE)
    }
}

impl DcBlocker {
    pub fn new(pole: f32) -> Self {
        Self {
            pole,
            prev_input: 0.0,
            prev_output: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input - self.prev_input + self.pole * self.prev_output;
        self.prev_input = input;
        self.prev_output = output;
        output
    }

    pub fn reset(&mut self) {
        self.prev_input = 0.0;
        self.prev_output = 0.0;
    }
}
