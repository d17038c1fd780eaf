//! # sigforge-crypto
//!
//! Compact-signature public-key recovery for the sigforge vanity signature
//! forger.
//!
//! The forger never talks to a curve library directly. It depends on the
//! [`CompactRecovery`] trait, and this crate ships two implementations of it:
//!
//! - [`NativeCrypto`]: libsecp256k1 through the `secp256k1` crate (default).
//! - [`K256Crypto`]: the pure Rust `k256` crate.
//!
//! ## Quick Start
//!
//! ```rust
//! use sigforge_crypto::{CompactRecovery, NativeCrypto, RecoveryHeader};
//!
//! let crypto = NativeCrypto;
//! let header = RecoveryHeader { recovery_id: 0, compressed: true }.encode();
//! let rs = [0x42u8; 64];
//! let message = [0x42u8; 32];
//!
//! // Most arbitrary byte strings are not recoverable, which is fine.
//! let _ = crypto.recover_compact(header, &rs, &message);
//! ```
//!
//! ## Header byte
//!
//! The first byte of a compact signature follows the Bitcoin "signed message"
//! convention: `27 + recovery_id (+ 4 when the key is compressed)`. See
//! [`RecoveryHeader`].
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `secp256k1` | libsecp256k1 backend (default) |
//! | `k256` | Pure Rust backend (default) |

#[cfg(feature = "secp256k1")]
pub mod native;
pub mod provider;
#[cfg(feature = "k256")]
pub mod pure;

#[cfg(feature = "secp256k1")]
pub use native::NativeCrypto;
pub use provider::{
    CompactLayout, CompactRecovery, CryptoError, PublicKey, RecoveryHeader, message_digest,
};
#[cfg(feature = "k256")]
pub use pure::K256Crypto;
