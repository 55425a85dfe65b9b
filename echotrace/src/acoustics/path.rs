use crate::math::Vec3;

/// One acoustic propagation path from the source to the listener.
///
/// The renderer treats `image_position` as the last point the sound passes
/// through before reaching the ears. The full length of the path for an ear
/// is `distance_to_image + |image_position - ear|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationPath {
    /// Virtual source position (last reflection point, or the source itself)
    pub image_position: Vec3,
    /// Distance already travelled when reaching `image_position`
    pub distance_to_image: f32,
    /// Fraction of energy retained along the path, in [0, 1]
    pub absorption: f32,
    pub valid: bool,
}

impl PropagationPath {
    /// Creates a valid path. Non-finite input yields an invalid path instead.
    pub fn new(image_position: Vec3, distance_to_image: f32, absorption: f32) -> Self {
        let valid = image_position.is_finite() && distance_to_image.is_finite();
        Self {
            image_position,
            distance_to_image,
            absorption,
            valid,
        }
    }

    pub fn invalid() -> Self {
        Self {
            image_position: Vec3::ZERO,
            distance_to_image: 0.0,
            absorption: 0.0,
            valid: false,
        }
    }

    /// Length of the path ending at `receiver`.
    pub fn total_distance(&self, receiver: Vec3) -> f32 {
        self.distance_to_image + self.image_position.distance(receiver)
    }
}

impl Default for PropagationPath {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Path category, in the order paths are stored in a [`PathSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathCategory {
    Direct,
    Primary,
    Secondary,
    HigherOrder,
}

/// Every propagation path found during one simulation tick.
///
/// A `PathSet` is rebuilt from scratch each tick and never edited after being
/// published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSet {
    pub direct: PropagationPath,
    pub primary: Vec<PropagationPath>,
    pub secondary: Vec<PropagationPath>,
    pub higher_order: Vec<PropagationPath>,
}

impl PathSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All paths with their category, direct first.
    pub fn iter(&self) -> impl Iterator<Item = (PathCategory, &PropagationPath)> {
        std::iter::once((PathCategory::Direct, &self.direct))
            .chain(self.primary.iter().map(|p| (PathCategory::Primary, p)))
            .chain(self.secondary.iter().map(|p| (PathCategory::Secondary, p)))
            .chain(
                self.higher_order
                    .iter()
                    .map(|p| (PathCategory::HigherOrder, p)),
            )
    }

    /// Valid paths only, in storage order.
    pub fn valid_paths(&self) -> impl Iterator<Item = &PropagationPath> {
        self.iter().map(|(_, path)| path).filter(|path| path.valid)
    }

    pub fn valid_count(&self) -> usize {
        self.valid_paths().count()
    }

    pub fn count(&self, category: PathCategory) -> usize {
        match category {
            PathCategory::Direct => usize::from(self.direct.valid),
            PathCategory::Primary => self.primary.len(),
            PathCategory::Secondary => self.secondary.len(),
            PathCategory::HigherOrder => self.higher_order.len(),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.valid_paths().next().is_none()
    }
}
