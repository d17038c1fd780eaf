//! # sigforge
//!
//! Vanity ECDSA signatures: compact secp256k1 signatures whose `r ‖ s` bytes
//! start with caller-chosen content.
//!
//! Instead of signing, the forger treats `[header] ‖ prefix ‖ random padding`
//! as a candidate compact signature and runs public-key recovery on it. The
//! first candidate that recovers a key is a valid signature under that key.
//! The key is a byproduct of the search; nobody knows its private key.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! let message = [0x42u8; 34];
//! let forgery = sigforge::forge(b"hello, world", &message)?;
//!
//! assert_eq!(&forgery.tail[..12], b"hello, world");
//! assert!(forgery.verify(&sigforge::NativeCrypto, &message));
//! # Ok::<(), sigforge::ForgeError>(())
//! ```
//!
//! ## Modules
//!
//! - [`forger`]: the search loop, with cancellation and deadlines.
//! - [`parallel`]: races several forgers across threads.
//! - [`forgery`]: the result type and header re-derivation.
//! - [`entropy`]: injectable randomness.

pub mod entropy;
pub mod error;
pub mod forger;
pub mod forgery;
pub mod parallel;

use rand::rngs::OsRng;

pub use entropy::{Entropy, EntropyError};
pub use error::ForgeError;
pub use forger::Forger;
pub use forgery::{Forgery, find_header};
pub use parallel::ParallelForger;
pub use sigforge_crypto::{
    CompactLayout, CompactRecovery, CryptoError, K256Crypto, NativeCrypto, PublicKey,
};
pub use tokio_util::sync::CancellationToken;

/// Forges a signature over `message` whose `r ‖ s` starts with `prefix`.
///
/// Uses libsecp256k1 and the operating system's random source, and runs
/// until it succeeds. Use [`Forger`] for cancellation, deadlines or another
/// backend.
pub fn forge(prefix: &[u8], message: &[u8]) -> Result<Forgery, ForgeError> {
    Forger::new(&NativeCrypto).forge(prefix, message, &mut OsRng)
}
