/// How multi-channel input is folded into the mono dry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downmix {
    /// Average of all channels, matching how the renderer derives `dry`
    Average,
    /// Keep a single channel (0-indexed) and drop the rest
    Channel(u16),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub downmix: Downmix,
    /// Scale the clip so its peak reaches this level. `None` keeps the
    /// decoded levels.
    pub normalize_peak: Option<f32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            downmix: Downmix::Average,
            normalize_peak: None,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downmix(mut self, downmix: Downmix) -> Self {
        self.downmix = downmix;
        self
    }

    pub fn normalize_peak(mut self, peak: f32) -> Self {
        self.normalize_peak = Some(peak);
        self
    }
}
