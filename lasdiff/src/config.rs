use crate::DiffError;

/// Knobs for matching and edit-script generation.
///
/// Build with struct-update syntax over [`Default`] and check with
/// [`DiffConfig::validate`]; [`crate::diff_trees`] validates before it looks
/// at either tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffConfig {
    /// Fraction of a sibling list scanned outward from an anchor during
    /// candidate search.
    pub distance_threshold: f64,

    /// Levels of ancestor/descendant expansion during candidate search.
    pub depth_threshold: u32,

    /// Minimum Dice similarity accepted as a candidate match.
    pub similarity_threshold: f64,

    /// Run the exact (hash) matching phase.
    pub enable_exact_match: bool,

    /// Infer Replace operations from Delete/Insert/Move combinations.
    pub enable_replace: bool,

    /// Decompose every Move into a Delete and an Insert.
    pub enable_move_split: bool,

    /// Re-target a Replace between two blocks to their matched parents.
    pub enable_block_promotion: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.5,
            depth_threshold: 3,
            similarity_threshold: 0.65,
            enable_exact_match: true,
            enable_replace: true,
            enable_move_split: false,
            enable_block_promotion: true,
        }
    }
}

impl DiffConfig {
    /// Reject thresholds outside `0.0..=1.0` (NaN and infinities included).
    pub fn validate(&self) -> Result<(), DiffError> {
        if !is_fraction(self.distance_threshold) {
            return Err(DiffError::DistanceThresholdOutOfRange {
                value: self.distance_threshold,
            });
        }
        if !is_fraction(self.similarity_threshold) {
            return Err(DiffError::SimilarityThresholdOutOfRange {
                value: self.similarity_threshold,
            });
        }
        Ok(())
    }

    /// [`DiffConfig::validate`], returning the config on success.
    pub fn validated(self) -> Result<Self, DiffError> {
        self.validate()?;
        Ok(self)
    }
}

fn is_fraction(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
