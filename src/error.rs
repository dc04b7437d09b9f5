use thiserror::Error;

/// Errors surfaced by the tree. No internal retries: every variant bubbles
/// straight to the caller per the error handling policy.
#[derive(Error, Debug)]
pub enum TreeError {
    /// `put` was called with a value of zero. Zero is reserved as `ABSENT`.
    #[error("value must be non-zero")]
    InvalidArgument,

    /// `remove` is not supported by this tree.
    #[error("remove is not supported")]
    Unsupported,

    /// The backing store failed. State beyond the last successful `sync`
    /// is undefined; the tree should not be used again.
    #[error("storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    /// A page failed a structural check: bad header flags, an out-of-range
    /// `child_count`, a misaligned child address, or non-monotonic keys.
    #[error("corrupt page at address {address}: {reason}")]
    CorruptPage { address: i64, reason: String },
}

pub type Result<T> = std::result::Result<T, TreeError>;
