//! Math types for EchoTrace

pub use glam::{Quat, Vec3};

/// Position and orientation of the listener (or any other oriented object).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * (-Vec3::Z)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }

    /// Rotates the pose so that it faces `target`. Leaves the rotation untouched
    /// when the target coincides with the position.
    pub fn look_at(&mut self, target: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        if forward != Vec3::ZERO {
            self.rotation = Quat::from_rotation_arc(-Vec3::Z, forward);
        }
    }

    /// Left and right ear positions for a head centered on this pose.
    ///
    /// `ear_separation` is the full distance between the two ears.
    pub fn ear_positions(&self, ear_separation: f32) -> (Vec3, Vec3) {
        let offset = self.right() * (ear_separation * 0.5);
        (self.position - offset, self.position + offset)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Mirrors `point` across the plane through `plane_point` with unit `normal`.
///
/// The plane is the perpendicular bisector of `point` and the result.
pub fn mirror_across_plane(point: Vec3, plane_point: Vec3, normal: Vec3) -> Vec3 {
    point - 2.0 * (point - plane_point).dot(normal) * normal
}

/// Specular reflection of `direction` off a surface with unit `normal`.
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Intersects the line `origin + t * direction` with a plane.
///
/// Returns `None` when the line runs parallel to the plane.
pub fn intersect_line_plane(
    origin: Vec3,
    direction: Vec3,
    plane_point: Vec3,
    normal: Vec3,
) -> Option<Vec3> {
    let denom = direction.dot(normal);
    if denom.abs() < f32::EPSILON {
        return None;
    }
    let t = normal.dot(plane_point - origin) / denom;
    Some(origin + direction * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_is_perpendicular_bisector() {
        let plane_point = Vec3::new(1.0, -2.0, 3.0);
        let normal = Vec3::new(1.0, 2.0, -0.5).normalize();
        let point = Vec3::new(4.0, 5.0, -6.0);

        let mirrored = mirror_across_plane(point, plane_point, normal);
        let before = (point - plane_point).dot(normal);
        let after = (mirrored - plane_point).dot(normal);

        assert!((after + before).abs() < 1e-4);
    }

    #[test]
    fn test_reflect_flips_normal_component() {
        let reflected = reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::Y);
        assert!((reflected - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_ear_positions_follow_rotation() {
        let pose = Pose::new(
            Vec3::new(0.0, 1.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let (left, right) = pose.ear_positions(0.2);

        assert!((left.distance(right) - 0.2).abs() < 1e-5);
        assert!(((left + right) * 0.5 - pose.position).length() < 1e-5);
        // Facing -X after a quarter turn, so the right ear points to -Z
        assert!(right.z < left.z);
    }

    #[test]
    fn test_intersect_line_plane_parallel() {
        let hit = intersect_line_plane(Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Y);
        assert!(hit.is_none());

        let hit = intersect_line_plane(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), Vec3::Y, Vec3::Y)
            .expect("line crosses plane");
        assert!((hit - Vec3::Y).length() < 1e-6);
    }
}
