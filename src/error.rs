use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    /// Fair share is `total / member_count`, undefined for an empty group.
    #[error("group has no members, fair share is undefined")]
    EmptyGroup,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to encode merchant directory: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed merchant directory snapshot: {0}")]
    Malformed(#[source] serde_json::Error),
}
