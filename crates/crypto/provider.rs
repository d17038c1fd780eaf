use std::fmt;
use std::ops::RangeInclusive;

/// Errors from a single recovery attempt. Opaque, does not leak library-specific types.
///
/// Inside the search loop every variant just means "this candidate does not
/// work". `check_message` and `check_prefix` failures stop the search up front.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid recovery id header: {0:#04x}")]
    InvalidRecoveryId(u8),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("recovery failed")]
    RecoveryFailed,
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),
    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Smallest valid header byte.
pub const COMPACT_HEADER_BASE: u8 = 27;
/// Header bit telling the verifier to use the compressed key encoding.
pub const COMPRESSED_KEY_FLAG: u8 = 4;

/// secp256k1 group order `n`, big-endian.
pub const SECP256K1_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// Decoded first byte of a compact signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryHeader {
    /// Which of the (up to four) candidate points to reconstruct. Always `0..=3`.
    pub recovery_id: u8,
    pub compressed: bool,
}

impl RecoveryHeader {
    /// Decodes `27..=34`. Anything else is rejected.
    pub fn decode(header: u8) -> Result<Self, CryptoError> {
        let offset = header
            .checked_sub(COMPACT_HEADER_BASE)
            .filter(|offset| *offset < 2 * COMPRESSED_KEY_FLAG)
            .ok_or(CryptoError::InvalidRecoveryId(header))?;

        Ok(Self {
            recovery_id: offset & 3,
            compressed: offset & COMPRESSED_KEY_FLAG != 0,
        })
    }

    pub fn encode(self) -> u8 {
        let flag = if self.compressed { COMPRESSED_KEY_FLAG } else { 0 };
        COMPACT_HEADER_BASE + (self.recovery_id & 3) + flag
    }
}

/// Byte layout of a compact signature, excluding the header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactLayout {
    /// Length of the `r ‖ s` portion.
    pub signature_len: usize,
    /// Random bytes the forger always keeps for itself.
    pub min_padding: usize,
}

impl CompactLayout {
    /// Two 32-byte scalars, at least 8 bytes of random padding.
    pub const SECP256K1: Self = Self {
        signature_len: 64,
        min_padding: 8,
    };

    pub const fn max_prefix_len(&self) -> usize {
        self.signature_len.saturating_sub(self.min_padding)
    }

    /// Header byte plus `r ‖ s`.
    pub const fn candidate_len(&self) -> usize {
        self.signature_len + 1
    }
}

impl Default for CompactLayout {
    fn default() -> Self {
        Self::SECP256K1
    }
}

/// A recovered secp256k1 public key.
///
/// Stored as the 65-byte SEC1 uncompressed point. `compressed` records which
/// encoding the header byte asked for; it does not change the point, so it is
/// ignored by equality.
#[derive(Clone, Copy)]
pub struct PublicKey {
    uncompressed: [u8; 65],
    compressed: bool,
}

impl PublicKey {
    pub const fn from_uncompressed(uncompressed: [u8; 65], compressed: bool) -> Self {
        Self {
            uncompressed,
            compressed,
        }
    }

    pub const fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub const fn serialize_uncompressed(&self) -> [u8; 65] {
        self.uncompressed
    }

    pub fn serialize_compressed(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = 0x02 | (self.uncompressed[64] & 1);
        out[1..].copy_from_slice(&self.uncompressed[1..33]);
        out
    }

    /// Serializes in the encoding selected by the header byte.
    pub fn serialize(&self) -> Vec<u8> {
        if self.compressed {
            self.serialize_compressed().to_vec()
        } else {
            self.uncompressed.to_vec()
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.uncompressed == other.uncompressed
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.serialize()))
    }
}

/// Compact-signature recovery over a named curve.
///
/// Implementors provide the actual crypto. The forger depends only on this
/// trait, so any curve library (or a test double) can sit behind it.
///
/// Methods take `&self` to support `&dyn CompactRecovery` (dynamic dispatch).
/// Implementations are typically zero-sized structs.
pub trait CompactRecovery: Send + Sync + fmt::Debug {
    fn layout(&self) -> CompactLayout {
        CompactLayout::SECP256K1
    }

    /// Header bytes the forger sweeps for every padding draw.
    fn recovery_ids(&self) -> RangeInclusive<u8> {
        0..=u8::MAX
    }

    /// Rejects messages this backend can never recover against, so a caller
    /// can fail before entering an unbounded search.
    fn check_message(&self, _message: &[u8]) -> Result<(), CryptoError> {
        Ok(())
    }

    /// Rejects prefixes that make every candidate undecodable no matter what
    /// padding follows them.
    fn check_prefix(&self, _prefix: &[u8]) -> Result<(), CryptoError> {
        Ok(())
    }

    /// Recovers the public key for `header ‖ sig` over `message`.
    ///
    /// `message` is never hashed; see [`message_digest`] for how it becomes
    /// the ECDSA scalar.
    fn recover_compact(
        &self,
        header: u8,
        sig: &[u8],
        message: &[u8],
    ) -> Result<PublicKey, CryptoError>;

    /// Plain ECDSA verification of `sig` (`r ‖ s`) over `message`.
    ///
    /// High-`s` signatures are accepted: `(r, s)` and `(r, n - s)` are
    /// equally valid ECDSA signatures.
    fn verify(&self, sig: &[u8], message: &[u8], key: &PublicKey) -> bool;
}

/// Shared prefix check for secp256k1 backends.
///
/// The prefix bytes falling inside `r` must leave room for some `r < n`.
/// A prefix of 32 bytes or more pins `r`, and then recovery only works if `r`
/// (or `r + n`) is the x-coordinate of a curve point; `lifts` answers that.
/// Bytes past 32 pin the top of `s`, which must still be able to land below `n`.
pub fn check_fixed_scalars(
    prefix: &[u8],
    lifts: impl Fn(&[u8; 32]) -> bool,
) -> Result<(), CryptoError> {
    let (r_fixed, s_fixed) = prefix.split_at(prefix.len().min(32));

    // A partial r can still start at or above n for every padding
    let mut smallest_r = [0u8; 32];
    smallest_r[..r_fixed.len()].copy_from_slice(r_fixed);
    if smallest_r >= SECP256K1_ORDER {
        return Err(CryptoError::InvalidSignature);
    }

    if !s_fixed.is_empty() {
        let mut smallest_s = [0u8; 32];
        let len = s_fixed.len().min(32);
        smallest_s[..len].copy_from_slice(&s_fixed[..len]);
        if smallest_s >= SECP256K1_ORDER {
            return Err(CryptoError::InvalidSignature);
        }
    }

    let Ok(r) = <[u8; 32]>::try_from(r_fixed) else {
        return Ok(());
    };
    if r == [0u8; 32] {
        return Err(CryptoError::InvalidSignature);
    }
    if lifts(&r) || add_order(&r).is_some_and(|x| lifts(&x)) {
        Ok(())
    } else {
        Err(CryptoError::RecoveryFailed)
    }
}

/// Turns an arbitrary-length message into the 32 bytes ECDSA reads as its
/// message scalar: longer input keeps its leftmost 32 bytes, shorter input
/// is read as a big-endian integer (left padded with zeros).
pub fn message_digest(message: &[u8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    let len = message.len().min(32);
    digest[32 - len..].copy_from_slice(&message[..len]);
    digest
}

/// `x + n`, or `None` when it overflows 256 bits.
fn add_order(x: &[u8; 32]) -> Option<[u8; 32]> {
    let mut out = [0u8; 32];
    let mut carry = 0u16;
    for i in (0..32).rev() {
        let sum = u16::from(x[i]) + u16::from(SECP256K1_ORDER[i]) + carry;
        out[i] = sum.to_be_bytes()[1];
        carry = sum >> 8;
    }
    (carry == 0).then_some(out)
}
