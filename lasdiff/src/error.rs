use facet::Facet;

/// Errors that abort a diff before a script is produced.
#[derive(Facet, Debug)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum DiffError {
    /// distance threshold {value} must be a finite number in 0.0..=1.0
    DistanceThresholdOutOfRange { value: f64 },

    /// similarity threshold {value} must be a finite number in 0.0..=1.0
    SimilarityThresholdOutOfRange { value: f64 },

    /// {node} is already matched to {existing}, refusing to match it to {attempted}
    MatchInvariantViolation {
        node: String,
        existing: String,
        attempted: String,
    },
}
