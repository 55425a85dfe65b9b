// Binaural rendering module
//
// Turns a path set into stereo audio: a per-path scatter into a circular
// delay line for streaming, plus a static impulse response for inspection.

mod binaural;
mod dc_filter;
mod delay_line;
mod impulse;

pub use binaural::{
    BinauralRenderer, MIN_AVERAGE_DISTANCE, PathTap, RenderParams, distance_attenuation,
    level_factor,
};
pub use dc_filter::{DEFAULT_DC_POLE, DcBlocker};
pub use delay_line::DelayBuffer;
pub use impulse::{IMPULSE_RESPONSE_LEN, ImpulseResponse, NEIGHBOR_TAP_WEIGHT};
