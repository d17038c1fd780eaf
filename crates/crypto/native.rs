use secp256k1::{
    Message, SECP256K1,
    ecdsa::{RecoverableSignature, RecoveryId, Signature},
};

use crate::provider::{
    CompactRecovery, CryptoError, PublicKey, RecoveryHeader, check_fixed_scalars, message_digest,
};

/// Native crypto implementation using libsecp256k1.
///
/// Messages of any length are accepted and fitted to 32 bytes with
/// [`message_digest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCrypto;

fn digest(message: &[u8]) -> Message {
    Message::from_digest(message_digest(message))
}

impl CompactRecovery for NativeCrypto {
    fn check_prefix(&self, prefix: &[u8]) -> Result<(), CryptoError> {
        check_fixed_scalars(prefix, |x| {
            let mut compressed = [0x02; 33];
            compressed[1..].copy_from_slice(x);
            secp256k1::PublicKey::from_slice(&compressed).is_ok()
        })
    }

    fn recover_compact(
        &self,
        header: u8,
        sig: &[u8],
        message: &[u8],
    ) -> Result<PublicKey, CryptoError> {
        let decoded = RecoveryHeader::decode(header)?;
        let recovery_id = RecoveryId::from_i32(i32::from(decoded.recovery_id))
            .map_err(|_| CryptoError::InvalidRecoveryId(header))?;

        let recoverable_sig = RecoverableSignature::from_compact(sig, recovery_id)
            .map_err(|_| CryptoError::InvalidSignature)?;

        let public_key = SECP256K1
            .recover_ecdsa(&digest(message), &recoverable_sig)
            .map_err(|_| CryptoError::RecoveryFailed)?;

        Ok(PublicKey::from_uncompressed(
            public_key.serialize_uncompressed(),
            decoded.compressed,
        ))
    }

    fn verify(&self, sig: &[u8], message: &[u8], key: &PublicKey) -> bool {
        let message = digest(message);
        let Ok(mut signature) = Signature::from_compact(sig) else {
            return false;
        };
        // libsecp256k1 only verifies low-s signatures
        signature.normalize_s();

        let Ok(public_key) = secp256k1::PublicKey::from_slice(&key.serialize_uncompressed()) else {
            return false;
        };

        SECP256K1
            .verify_ecdsa(&message, &signature, &public_key)
            .is_ok()
    }
}
