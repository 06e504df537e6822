use thiserror::Error;

/// Errors surfaced by index construction, scoring, and snapshot persistence.
///
/// Every operation in this crate is a pure function of its inputs, so none of
/// these are retryable; they are fatal to the single operation in progress.
#[derive(Debug, Error)]
pub enum RecError {
    #[error("corpus contains no documents")]
    EmptyCorpus,

    #[error("ground-truth category set is empty")]
    EmptyGroundTruth,

    #[error("category `{0}` is not present in the centroid set")]
    UnknownCategory(String),

    #[error(
        "centroid set was built from a different index snapshot \
         (index fingerprint {index:#018x}, centroid fingerprint {centroids:#018x})"
    )]
    SnapshotMismatch { index: u64, centroids: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("artifact encoding failed: {0}")]
    Codec(#[from] bincode::Error),

    #[error("metadata encoding failed: {0}")]
    Meta(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecError>;
