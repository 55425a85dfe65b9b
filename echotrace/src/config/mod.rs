mod acoustic_config;
mod world_desc;

pub use acoustic_config::{
    AcousticConfig, LEGACY_TWO_PATH_LEVEL_DIVISOR, MAX_BOUNCE_COUNT, MULTI_REFLECTION_LEVEL_DIVISOR,
};
pub use world_desc::EchoTraceWorldDesc;
