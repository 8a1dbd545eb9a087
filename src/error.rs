use thiserror::Error;

/// Failures of the collaborator operations around validation: canonical encoding,
/// parsing hex-encoded values and decoding keys.
///
/// Rejected transactions are never reported through this type, see
/// [`ValidationError`](crate::ValidationError).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to encode transaction data: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Invalid hex string: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid length. Expected: {expected} bytes but got: {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid public key: {0}")]
    Key(#[from] ed25519_dalek::SignatureError),

    #[error("A transaction can have at most 2^32 outputs, got: {0}")]
    TooManyOutputs(usize),

    #[error("Input index: {index} is out of range for a transaction with {len} inputs")]
    InputIndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
