use thiserror::Error;

/// Error taxonomy for the record-decoding core.
///
/// Every fallible operation in this crate returns one of these variants;
/// none of them are recoverable by retrying with the same input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EseError {
    #[error("invalid argument: {what}")]
    ArgumentInvalid { what: String },

    #[error("{what} already set")]
    StateAlreadySet { what: &'static str },

    #[error("{what} missing")]
    StateMissing { what: &'static str },

    #[error("{what}: offset {offset} + length {length} exceeds blob of size {blob_size}")]
    BoundsExceeded {
        what: &'static str,
        offset: usize,
        length: usize,
        blob_size: usize,
    },

    #[error("catalog mismatch: {what}")]
    CatalogMismatch { what: String },

    #[error("unsupported: {what}")]
    Unsupported { what: String },

    #[error("allocation failure: {what}")]
    AllocationFailure { what: &'static str },
}

pub type Result<T> = std::result::Result<T, EseError>;
