use sigforge_crypto::CryptoError;

use crate::entropy::EntropyError;

#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("prefix is {len} bytes, at most {max} fit in front of the random padding")]
    PrefixTooLong { len: usize, max: usize },
    #[error("no padding can make this prefix recoverable: {0}")]
    UnrecoverablePrefix(#[source] CryptoError),
    #[error("randomness unavailable: {0}")]
    RandomnessUnavailable(#[from] EntropyError),
    #[error("message cannot be used for recovery: {0}")]
    InvalidMessage(#[source] CryptoError),
    #[error("search cancelled")]
    Cancelled,
    #[error("search timed out")]
    TimedOut,
    #[error("couldn't spawn any forging thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("forging thread panicked")]
    WorkerPanicked,
}
