use crate::acoustics::PropagationPath;
use crate::math::Vec3;
use crate::scene::{CollisionOracle, RayQuery};

/// Line-of-sight test between source and listener.
///
/// Returns a path sitting on the source with no travelled distance and no
/// absorption when nothing blocks the segment, or an invalid path otherwise.
pub fn find_direct_path(
    oracle: &dyn CollisionOracle,
    source: Vec3,
    listener: Vec3,
) -> PropagationPath {
    let query = RayQuery::segment(source, listener);
    let occluded = if query.is_degenerate() {
        false
    } else {
        oracle.cast_batch(&[query])[0].hit
    };

    if occluded {
        log::trace!("Direct path from {:?} to {:?} is occluded", source, listener);
        PropagationPath::invalid()
    } else {
        PropagationPath::new(source, 0.0, 1.0)
    }
}
