use std::collections::HashSet;

use crate::acoustics::PropagationPath;
use crate::math::Vec3;

/// Quantization steps per unit of distance.
pub const DISTANCE_RESOLUTION: f32 = 1000.0;

/// Quantization steps per unit of each direction component.
pub const DIRECTION_RESOLUTION: f32 = 100.0;

/// Quantized identity of a propagation path.
///
/// Two paths sharing a key are treated as the same physical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub distance: i64,
    pub direction: [i32; 3],
}

/// Key of `path` as seen from `source`: the rounded distance to the image
/// plus the rounded unit direction from the source toward the image.
pub fn dedup_key(path: &PropagationPath, source: Vec3) -> DedupKey {
    let direction = (path.image_position - source).normalize_or_zero();
    DedupKey {
        distance: (path.distance_to_image * DISTANCE_RESOLUTION).round() as i64,
        direction: [
            (direction.x * DIRECTION_RESOLUTION).round() as i32,
            (direction.y * DIRECTION_RESOLUTION).round() as i32,
            (direction.z * DIRECTION_RESOLUTION).round() as i32,
        ],
    }
}

/// Drops paths whose key was already seen. The first occurrence wins.
///
/// Keys persist across calls, so one deduplicator can span several batches
/// (every bounce order of the multi-bounce tracer, for instance). Call
/// [`clear`](Self::clear) to start over.
#[derive(Debug, Default)]
pub struct ReflectionDeduplicator {
    seen: HashSet<DedupKey>,
}

impl ReflectionDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the paths of `paths` with an unseen key, in input order.
    pub fn dedup(&mut self, paths: Vec<PropagationPath>, source: Vec3) -> Vec<PropagationPath> {
        let before = paths.len();
        let unique: Vec<PropagationPath> = paths
            .into_iter()
            .filter(|path| self.seen.insert(dedup_key(path, source)))
            .collect();
        if unique.len() < before {
            log::trace!("Dropped {} duplicate paths", before - unique.len());
        }
        unique
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
