use crate::math::Vec3;

/// Generates `count` unit directions spread over the sphere with golden-angle
/// (Fibonacci) spacing.
///
/// The set is deterministic. `count == 1` has no spacing to speak of and
/// returns straight up.
pub fn fibonacci_directions(count: usize) -> Vec<Vec3> {
    match count {
        0 => Vec::new(),
        1 => vec![Vec3::Y],
        _ => {
            let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
            let last = (count - 1) as f32;
            (0..count)
                .map(|i| {
                    let y = 1.0 - 2.0 * i as f32 / last;
                    let r = (1.0 - y * y).max(0.0).sqrt();
                    let theta = golden_angle * i as f32;
                    Vec3::new(theta.cos() * r, y, theta.sin() * r)
                })
                .collect()
        }
    }
}

/// Fixed set of probe directions used to discover surfaces around a point.
///
/// Built once and reused every tick.
#[derive(Debug, Clone)]
pub struct DirectionSampler {
    directions: Vec<Vec3>,
}

impl DirectionSampler {
    pub fn new(count: usize) -> Self {
        Self {
            directions: fibonacci_directions(count),
        }
    }

    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }
}
