use k256::ecdsa::{RecoveryId, Signature, VerifyingKey, signature::hazmat::PrehashVerifier};

use crate::provider::{
    CompactRecovery, CryptoError, PublicKey, RecoveryHeader, check_fixed_scalars, message_digest,
};

/// Pure Rust implementation using the `k256` crate.
///
/// The message goes through [`message_digest`] first, so it is read exactly
/// like the native backend reads it. `bits2field` on its own would refuse
/// anything shorter than 16 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct K256Crypto;

fn verifying_key(key: &PublicKey) -> Result<VerifyingKey, CryptoError> {
    VerifyingKey::from_sec1_bytes(&key.serialize_uncompressed())
        .map_err(|_| CryptoError::InvalidPublicKey)
}

impl CompactRecovery for K256Crypto {
    fn check_prefix(&self, prefix: &[u8]) -> Result<(), CryptoError> {
        check_fixed_scalars(prefix, |x| {
            let mut compressed = [0x02; 33];
            compressed[1..].copy_from_slice(x);
            k256::PublicKey::from_sec1_bytes(&compressed).is_ok()
        })
    }

    fn recover_compact(
        &self,
        header: u8,
        sig: &[u8],
        message: &[u8],
    ) -> Result<PublicKey, CryptoError> {
        let decoded = RecoveryHeader::decode(header)?;

        let mut signature = Signature::from_slice(sig).map_err(|_| CryptoError::InvalidSignature)?;

        // k256 only accepts low-s. Negating s mirrors R, so flip the y parity bit too.
        let mut recid = decoded.recovery_id;
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recid ^= 1;
        }
        let recovery_id =
            RecoveryId::from_byte(recid).ok_or(CryptoError::InvalidRecoveryId(header))?;

        let prehash = message_digest(message);
        let recovered = VerifyingKey::recover_from_prehash(&prehash, &signature, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;

        let uncompressed: [u8; 65] = recovered
            .to_encoded_point(false)
            .as_bytes()
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;

        Ok(PublicKey::from_uncompressed(uncompressed, decoded.compressed))
    }

    fn verify(&self, sig: &[u8], message: &[u8], key: &PublicKey) -> bool {
        let Ok(signature) = Signature::from_slice(sig) else {
            return false;
        };
        let signature = signature.normalize_s().unwrap_or(signature);
        let Ok(verifying_key) = verifying_key(key) else {
            return false;
        };

        verifying_key
            .verify_prehash(&message_digest(message), &signature)
            .is_ok()
    }
}
