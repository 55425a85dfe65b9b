use crate::error::{EchoTraceError, Result};

/// Level-difference divisor for a renderer carrying only two paths
/// (direct + one reflection): `(dL - dR) / (2 * earDistance)`.
pub const LEGACY_TWO_PATH_LEVEL_DIVISOR: f32 = 2.0;

/// Level-difference divisor used when many reflections are rendered at once:
/// `(dL - dR) / (4 * earDistance)`. Halves the channel separation.
pub const MULTI_REFLECTION_LEVEL_DIVISOR: f32 = 4.0;

/// Upper bound for `bounce_count`.
pub const MAX_BOUNCE_COUNT: usize = 20;

/// Parameters of the propagation simulation and of the binaural renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct AcousticConfig {
    /// Number of directions sampled around the source/listener to find nearby surfaces
    pub sample_resolution: usize,
    /// Number of bounce iterations for higher-order reflections (0 disables them)
    pub bounce_count: usize,
    /// Distance between the two ears in meters
    pub ear_separation: f32,
    /// One-pole smoothing factor for per-path delays, in [0, 1].
    /// 1.0 jumps straight to the target delay, 0.0 freezes it.
    pub delay_smoothing: f32,
    /// Output gain applied to every path
    pub gain: f32,
    /// Energy retained per specular reflection (first order 0.8, second order 0.8²)
    pub reflection_absorption: f32,
    /// Energy retained after the first bounce of a traced higher-order chain
    pub higher_order_initial_absorption: f32,
    /// Divisor `k` in the level factor `(dL - dR) / (k * earDistance)`
    pub level_divisor: f32,
    /// Speed of sound in meters per second
    pub speed_of_sound: f32,
    /// Maximum distance of any collision query
    pub max_ray_distance: f32,
    /// Include the line-of-sight path
    pub enable_direct: bool,
    /// Include first-order image-source reflections
    pub enable_primary: bool,
    /// Include second-order image-source reflections
    pub enable_secondary: bool,
    /// Run a DC blocking filter on each ear's output
    pub dc_block: bool,
}

impl Default for AcousticConfig {
    fn default() -> Self {
        Self {
            sample_resolution: 256,
            bounce_count: 4,
            ear_separation: 0.2,
            delay_smoothing: 1.0,
            gain: 1.0,
            reflection_absorption: 0.8,
            higher_order_initial_absorption: 0.3,
            level_divisor: MULTI_REFLECTION_LEVEL_DIVISOR,
            speed_of_sound: 343.0,
            max_ray_distance: 1000.0,
            enable_direct: true,
            enable_primary: true,
            enable_secondary: true,
            dc_block: false,
        }
    }
}

impl AcousticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_resolution(mut self, resolution: usize) -> Self {
        self.sample_resolution = resolution;
        self
    }

    pub fn bounce_count(mut self, count: usize) -> Self {
        self.bounce_count = count;
        self
    }

    pub fn ear_separation(mut self, meters: f32) -> Self {
        self.ear_separation = meters;
        self
    }

    pub fn delay_smoothing(mut self, factor: f32) -> Self {
        self.delay_smoothing = factor;
        self
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn reflection_absorption(mut self, absorption: f32) -> Self {
        self.reflection_absorption = absorption;
        self
    }

    pub fn level_divisor(mut self, divisor: f32) -> Self {
        self.level_divisor = divisor;
        self
    }

    pub fn max_ray_distance(mut self, distance: f32) -> Self {
        self.max_ray_distance = distance;
        self
    }

    pub fn enable_direct(mut self, enable: bool) -> Self {
        self.enable_direct = enable;
        self
    }

    pub fn enable_primary(mut self, enable: bool) -> Self {
        self.enable_primary = enable;
        self
    }

    pub fn enable_secondary(mut self, enable: bool) -> Self {
        self.enable_secondary = enable;
        self
    }

    pub fn dc_block(mut self, enable: bool) -> Self {
        self.dc_block = enable;
        self
    }

    /// Checks every field against its documented range.
    pub fn validate(&self) -> Result<()> {
        if self.sample_resolution < 2 {
            return Err(EchoTraceError::Configuration(format!(
                "Sample resolution must be at least 2 (got {})",
                self.sample_resolution
            )));
        }
        if self.bounce_count > MAX_BOUNCE_COUNT {
            return Err(EchoTraceError::Configuration(format!(
                "Bounce count {} exceeds maximum of {}",
                self.bounce_count, MAX_BOUNCE_COUNT
            )));
        }
        if !(self.ear_separation > 0.0) {
            return Err(EchoTraceError::Configuration(format!(
                "Ear separation must be positive (got {})",
                self.ear_separation
            )));
        }
        if !(0.0..=1.0).contains(&self.delay_smoothing) {
            return Err(EchoTraceError::Configuration(format!(
                "Delay smoothing must be within [0, 1] (got {})",
                self.delay_smoothing
            )));
        }
        for (name, value) in [
            ("Reflection absorption", self.reflection_absorption),
            (
                "Higher-order initial absorption",
                self.higher_order_initial_absorption,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EchoTraceError::Configuration(format!(
                    "{} must be within [0, 1] (got {})",
                    name, value
                )));
            }
        }
        if !(self.level_divisor > 0.0) {
            return Err(EchoTraceError::Configuration(format!(
                "Level divisor must be positive (got {})",
                self.level_divisor
            )));
        }
        if !(self.speed_of_sound > 0.0) || !(self.max_ray_distance > 0.0) {
            return Err(EchoTraceError::Configuration(
                "Speed of sound and max ray distance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AcousticConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_single_sample() {
        let config = AcousticConfig::new().sample_resolution(1);
        assert!(matches!(
            config.validate(),
            Err(EchoTraceError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(AcousticConfig::new().delay_smoothing(1.5).validate().is_err());
        assert!(AcousticConfig::new().bounce_count(21).validate().is_err());
        assert!(AcousticConfig::new().ear_separation(0.0).validate().is_err());
        assert!(
            AcousticConfig::new()
                .reflection_absorption(-0.1)
                .validate()
                .is_err()
        );
        assert!(AcousticConfig::new().level_divisor(0.0).validate().is_err());
    }

    #[test]
    fn test_builder_chain() {
        let config = AcousticConfig::new()
            .bounce_count(6)
            .gain(0.5)
            .level_divisor(LEGACY_TWO_PATH_LEVEL_DIVISOR);
        assert_eq!(config.bounce_count, 6);
        assert_eq!(config.gain, 0.5);
        assert_eq!(config.level_divisor, 2.0);
    }
}
