/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    // General errors
    #[error("null or empty input")]
    NullInput,
    #[error("invalid argument")]
    InvalidArg,
    #[error("operation not supported")]
    NotSupported,

    // Buffer errors
    #[error("buffer length not enough: need {need}, got {got}")]
    BufferTooSmall { need: usize, got: usize },
    #[error("input data too long")]
    InputOverflow,

    // Symmetric cipher errors
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("invalid block length: expected {expected}, got {got}")]
    InvalidBlockLength { expected: usize, got: usize },
    #[error("invalid iv length")]
    InvalidIvLength,
    #[error("invalid tag length")]
    InvalidTagLength,
    #[error("aead: tag verification failed")]
    AeadTagVerifyFail,

    // Backend dispatch errors
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
    #[error("backend {0} is not supported on this cpu")]
    BackendUnavailable(&'static str),
}

/// Self-test harness errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelfTestError {
    #[error("self-test: module is in the error state")]
    InvalidState,
    #[error("self-test: known answer test failed: {0}")]
    KatFailure(String),
    #[error("self-test: backend {backend} disagrees with reference: {detail}")]
    BackendMismatch {
        backend: &'static str,
        detail: String,
    },
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}
