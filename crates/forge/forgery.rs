use sigforge_crypto::{CompactRecovery, PublicKey};

/// Result of a successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forgery {
    /// Key recovered from the winning candidate. Nobody knows its private key.
    pub public_key: PublicKey,
    /// Winning recovery-id byte.
    pub header: u8,
    /// `prefix ‖ padding`, i.e. the `r ‖ s` portion of the signature.
    pub tail: Vec<u8>,
    /// Padding draws that were exhausted before the winning one.
    pub redraws: u64,
}

impl Forgery {
    /// The full compact signature, `header ‖ tail`.
    pub fn signature(&self) -> Vec<u8> {
        let mut signature = Vec::with_capacity(self.tail.len() + 1);
        signature.push(self.header);
        signature.extend_from_slice(&self.tail);
        signature
    }

    /// Checks both that `tail` is a valid ECDSA signature under `public_key`
    /// and that `header` recovers that same key.
    pub fn verify<C: CompactRecovery + ?Sized>(&self, crypto: &C, message: &[u8]) -> bool {
        crypto.verify(&self.tail, message, &self.public_key)
            && crypto
                .recover_compact(self.header, &self.tail, message)
                .is_ok_and(|recovered| recovered == self.public_key)
    }
}

/// Re-derives the header byte for a caller that only kept the tail.
///
/// Returns the lowest header that recovers `public_key`. For a tail produced
/// by the forger this is the header the forger picked.
pub fn find_header<C: CompactRecovery + ?Sized>(
    crypto: &C,
    tail: &[u8],
    message: &[u8],
    public_key: &PublicKey,
) -> Option<u8> {
    crypto.recovery_ids().find(|header| {
        crypto
            .recover_compact(*header, tail, message)
            .is_ok_and(|recovered| recovered == *public_key)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::forger::Forger;
    use rand::{SeedableRng, rngs::StdRng};
    use sigforge_crypto::NativeCrypto;

    const MESSAGE: [u8; 32] = [0x42; 32];

    fn forge(seed: u64) -> Forgery {
        Forger::new(&NativeCrypto)
            .forge(b"hello", &MESSAGE, &mut StdRng::seed_from_u64(seed))
            .expect("forging succeeds")
    }

    #[test]
    fn signature_prepends_header() {
        let forgery = forge(1);
        let signature = forgery.signature();

        assert_eq!(signature.len(), 65);
        assert_eq!(signature[0], forgery.header);
        assert_eq!(&signature[1..], &forgery.tail[..]);
        assert_eq!(&signature[1..6], b"hello");
    }

    #[test]
    fn find_header_matches_forged_header() {
        let forgery = forge(2);
        assert_eq!(
            find_header(&NativeCrypto, &forgery.tail, &MESSAGE, &forgery.public_key),
            Some(forgery.header)
        );
    }

    #[test]
    fn find_header_fails_for_foreign_key() {
        let forgery = forge(3);
        let other = forge(4);
        assert_ne!(forgery.public_key, other.public_key);
        assert_eq!(
            find_header(&NativeCrypto, &forgery.tail, &MESSAGE, &other.public_key),
            None
        );
    }

    #[test]
    fn tampered_tail_does_not_verify() {
        let mut forgery = forge(5);
        forgery.tail[63] ^= 0x01;
        assert!(!forgery.verify(&NativeCrypto, &MESSAGE));
    }

    #[test]
    fn does_not_verify_other_message() {
        let forgery = forge(6);
        assert!(!forgery.verify(&NativeCrypto, &[0x43; 32]));
    }
}
