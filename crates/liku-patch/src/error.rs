/// Errors from applying or validating a patch against a document.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// `remove`/`replace`/`move`/`copy` source didn't resolve.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// `add`'s parent pointer didn't resolve to a container.
    #[error("parent not found: {0}")]
    ParentNotFound(String),

    /// An array index was out of range for `remove`/`replace`, or wasn't
    /// `-` or a valid index for `add`.
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),

    /// `test` failed: the value at `path` did not deep-equal the expected value.
    #[error("test failed at {0}")]
    TestFailed(String),

    /// A pointer segment was neither a valid array index nor `-`.
    #[error("invalid pointer segment: {0}")]
    InvalidPointer(String),
}
