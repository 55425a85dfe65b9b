use crate::acoustics::bounce::MultiBounceTracer;
use crate::acoustics::dedup::ReflectionDeduplicator;
use crate::acoustics::direct::find_direct_path;
use crate::acoustics::image_source::ImageSourceFinder;
use crate::acoustics::surfaces::probe_surfaces;
use crate::acoustics::{DirectionSampler, PathSet, PropagationPath};
use crate::config::AcousticConfig;
use crate::error::Result;
use crate::math::Vec3;
use crate::scene::CollisionOracle;

/// Runs one full path search per tick: direct, first order, second order and
/// multi-bounce, each deduplicated on its own.
///
/// The simulator owns nothing scene-related; the oracle is passed to every
/// [`tick`](Self::tick), so the scene may change between ticks.
pub struct AcousticSimulator {
    config: AcousticConfig,
    sampler: DirectionSampler,
}

impl AcousticSimulator {
    pub fn new(config: AcousticConfig) -> Result<Self> {
        config.validate()?;
        let sampler = DirectionSampler::new(config.sample_resolution);
        Ok(Self { config, sampler })
    }

    pub fn config(&self) -> &AcousticConfig {
        &self.config
    }

    /// Replaces the configuration, rebuilding the direction set if the
    /// resolution changed.
    pub fn set_config(&mut self, config: AcousticConfig) -> Result<()> {
        config.validate()?;
        if config.sample_resolution != self.sampler.len() {
            self.sampler = DirectionSampler::new(config.sample_resolution);
        }
        self.config = config;
        Ok(())
    }

    pub fn tick(&self, oracle: &dyn CollisionOracle, source: Vec3, listener: Vec3) -> PathSet {
        let config = &self.config;
        let max_distance = config.max_ray_distance;

        let direct = if config.enable_direct {
            find_direct_path(oracle, source, listener)
        } else {
            PropagationPath::invalid()
        };

        let needs_source_surfaces = config.enable_primary || config.enable_secondary;
        let source_surfaces = if needs_source_surfaces {
            probe_surfaces(oracle, &self.sampler, source, max_distance)
        } else {
            Vec::new()
        };

        let finder = ImageSourceFinder::new(
            oracle,
            source,
            listener,
            config.reflection_absorption,
            max_distance,
        );

        let primary = if config.enable_primary {
            ReflectionDeduplicator::new().dedup(finder.first_order(&source_surfaces), source)
        } else {
            Vec::new()
        };

        let secondary = if config.enable_secondary {
            let listener_surfaces = probe_surfaces(oracle, &self.sampler, listener, max_distance);
            let paths = finder.second_order(&source_surfaces, &listener_surfaces);
            ReflectionDeduplicator::new().dedup(paths, source)
        } else {
            Vec::new()
        };

        let higher_order = if config.bounce_count > 0 {
            let tracer = MultiBounceTracer::new(oracle, listener, config.bounce_count)
                .with_absorption(
                    config.higher_order_initial_absorption,
                    config.reflection_absorption,
                )
                .with_max_distance(max_distance);
            ReflectionDeduplicator::new().dedup(tracer.trace(source, &self.sampler), source)
        } else {
            Vec::new()
        };

        let paths = PathSet {
            direct,
            primary,
            secondary,
            higher_order,
        };
        log::debug!(
            "Simulated paths: direct={} primary={} secondary={} higher_order={}",
            paths.direct.valid,
            paths.primary.len(),
            paths.secondary.len(),
            paths.higher_order.len()
        );
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acoustics::PathCategory;
    use crate::scene::{AnalyticScene, Surface};

    fn config() -> AcousticConfig {
        AcousticConfig::default().sample_resolution(256).bounce_count(3)
    }

    #[test]
    fn test_empty_scene_direct_only() {
        let simulator = AcousticSimulator::new(config()).unwrap();
        let scene = AnalyticScene::new();
        let paths = simulator.tick(&scene, Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));

        assert!(paths.direct.valid);
        assert_eq!(paths.direct.image_position, Vec3::ZERO);
        assert_eq!(paths.direct.distance_to_image, 0.0);
        assert_eq!(paths.direct.absorption, 1.0);
        assert!(paths.primary.is_empty());
        assert!(paths.secondary.is_empty());
        assert!(paths.higher_order.is_empty());
        assert_eq!(paths.valid_count(), 1);
    }

    #[test]
    fn test_single_plane_one_primary_reflection() {
        let simulator = AcousticSimulator::new(config()).unwrap();
        let scene = AnalyticScene::new().with_surface(Surface::plane(Vec3::ZERO, Vec3::Y));
        let source = Vec3::new(0.0, 2.0, 0.0);
        let listener = Vec3::new(5.0, 2.0, 0.0);
        let paths = simulator.tick(&scene, source, listener);

        assert!(paths.direct.valid);
        assert_eq!(paths.count(PathCategory::Primary), 1);
        assert!(paths.secondary.is_empty());

        let reflection = paths.primary[0];
        assert!((reflection.absorption - 0.8).abs() < 1e-6);
        let mirrored_source = Vec3::new(0.0, -2.0, 0.0);
        let expected = mirrored_source.distance(listener);
        assert!((reflection.total_distance(listener) - expected).abs() < 1e-2);
        // The image lies on the mirror line between the mirrored source and the listener
        assert!(reflection.image_position.y.abs() < 1e-2);
    }

    #[test]
    fn test_absorption_ordering_in_shoebox() {
        let simulator = AcousticSimulator::new(config()).unwrap();
        let scene = AnalyticScene::shoebox(Vec3::ZERO, Vec3::new(10.0, 4.0, 8.0));
        let paths = simulator.tick(&scene, Vec3::new(3.0, 1.5, 4.0), Vec3::new(7.0, 1.5, 4.0));

        assert!(paths.direct.valid);
        assert!(!paths.primary.is_empty());
        assert!(!paths.secondary.is_empty());
        assert!(!paths.higher_order.is_empty());
        for path in &paths.primary {
            assert!((path.absorption - 0.8).abs() < 1e-6);
        }
        for path in &paths.secondary {
            assert!((path.absorption - 0.64).abs() < 1e-6);
        }
        for path in &paths.higher_order {
            assert!(path.absorption <= 0.3 + 1e-6);
        }
        assert!(paths.valid_paths().all(|p| p.absorption <= paths.direct.absorption));
    }

    #[test]
    fn test_category_toggles() {
        let config = config()
            .enable_direct(false)
            .enable_primary(false)
            .enable_secondary(false)
            .bounce_count(0);
        let simulator = AcousticSimulator::new(config).unwrap();
        let scene = AnalyticScene::shoebox(Vec3::ZERO, Vec3::new(10.0, 4.0, 8.0));
        let paths = simulator.tick(&scene, Vec3::new(3.0, 1.5, 4.0), Vec3::new(7.0, 1.5, 4.0));
        assert!(paths.is_silent());
    }

    #[test]
    fn test_primary_paths_are_unique() {
        let simulator = AcousticSimulator::new(config()).unwrap();
        let scene = AnalyticScene::shoebox(Vec3::ZERO, Vec3::new(10.0, 4.0, 8.0));
        let paths = simulator.tick(&scene, Vec3::new(3.0, 1.5, 4.0), Vec3::new(7.0, 1.5, 4.0));
        // One reflection per wall at most
        assert!(paths.primary.len() <= 6);
    }

    #[test]
    fn test_set_config_rebuilds_sampler() {
        let mut simulator = AcousticSimulator::new(config()).unwrap();
        simulator
            .set_config(config().sample_resolution(64))
            .unwrap();
        assert_eq!(simulator.config().sample_resolution, 64);
        assert!(simulator.set_config(config().bounce_count(100)).is_err());
    }
}
