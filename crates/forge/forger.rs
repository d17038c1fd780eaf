use std::time::{Duration, Instant};

use sigforge_crypto::CompactRecovery;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{entropy::Entropy, error::ForgeError, forgery::Forgery};

/// Searches for a compact signature that starts with a caller-chosen prefix.
///
/// The candidate is `[header] ‖ prefix ‖ padding`. For every padding draw all
/// header bytes are tried in ascending order; the first one for which public
/// key recovery succeeds wins. The loop has no upper bound, so it checks the
/// cancellation token and the optional deadline once per padding draw.
#[derive(Debug)]
pub struct Forger<'a, C: CompactRecovery + ?Sized> {
    crypto: &'a C,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl<'a, C: CompactRecovery + ?Sized> Forger<'a, C> {
    pub fn new(crypto: &'a C) -> Self {
        Self {
            crypto,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A timeout too large to represent as an `Instant` means no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn forge<E: Entropy + ?Sized>(
        &self,
        prefix: &[u8],
        message: &[u8],
        entropy: &mut E,
    ) -> Result<Forgery, ForgeError> {
        validate(self.crypto, prefix, message)?;

        let mut candidate = vec![0u8; self.crypto.layout().candidate_len()];
        let padding_start = 1 + prefix.len();
        candidate[1..padding_start].copy_from_slice(prefix);

        let mut redraws = 0u64;
        loop {
            self.check_interrupted()?;
            entropy.fill(&mut candidate[padding_start..])?;

            for header in self.crypto.recovery_ids() {
                candidate[0] = header;
                // Most candidates don't decode, that's expected
                let Ok(public_key) = self.crypto.recover_compact(header, &candidate[1..], message)
                else {
                    continue;
                };

                info!(redraws, header, public_key = %public_key, "Forged signature");
                return Ok(Forgery {
                    public_key,
                    header,
                    tail: candidate[1..].to_vec(),
                    redraws,
                });
            }

            redraws += 1;
            debug!(redraws, "No header byte recovered a key, drawing new padding");
        }
    }

    fn check_interrupted(&self) -> Result<(), ForgeError> {
        if self.cancel.is_cancelled() {
            return Err(ForgeError::Cancelled);
        }
        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Err(ForgeError::TimedOut);
        }
        Ok(())
    }
}

/// Checks everything that would make the search fail or never end, before
/// any randomness is drawn.
pub(crate) fn validate<C: CompactRecovery + ?Sized>(
    crypto: &C,
    prefix: &[u8],
    message: &[u8],
) -> Result<(), ForgeError> {
    let max = crypto.layout().max_prefix_len();
    if prefix.len() > max {
        return Err(ForgeError::PrefixTooLong {
            len: prefix.len(),
            max,
        });
    }
    crypto
        .check_prefix(prefix)
        .map_err(ForgeError::UnrecoverablePrefix)?;
    crypto
        .check_message(message)
        .map_err(ForgeError::InvalidMessage)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entropy::EntropyError;
    use rand::{SeedableRng, rngs::StdRng};
    use sigforge_crypto::{CryptoError, K256Crypto, NativeCrypto, PublicKey};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const MESSAGE: [u8; 32] = [0x42; 32];

    #[derive(Debug, Default)]
    struct CountingCrypto {
        attempts: AtomicUsize,
    }

    impl CompactRecovery for CountingCrypto {
        fn check_message(&self, message: &[u8]) -> Result<(), CryptoError> {
            NativeCrypto.check_message(message)
        }

        fn check_prefix(&self, prefix: &[u8]) -> Result<(), CryptoError> {
            NativeCrypto.check_prefix(prefix)
        }

        fn recover_compact(
            &self,
            header: u8,
            sig: &[u8],
            message: &[u8],
        ) -> Result<PublicKey, CryptoError> {
            self.attempts.fetch_add(1, Ordering::Relaxed);
            NativeCrypto.recover_compact(header, sig, message)
        }

        fn verify(&self, sig: &[u8], message: &[u8], key: &PublicKey) -> bool {
            NativeCrypto.verify(sig, message, key)
        }
    }

    /// Never recovers anything, so the search only ends when interrupted.
    #[derive(Debug)]
    struct Barren;

    impl CompactRecovery for Barren {
        fn recover_compact(
            &self,
            _header: u8,
            _sig: &[u8],
            _message: &[u8],
        ) -> Result<PublicKey, CryptoError> {
            Err(CryptoError::RecoveryFailed)
        }

        fn verify(&self, _sig: &[u8], _message: &[u8], _key: &PublicKey) -> bool {
            false
        }
    }

    /// Only takes 32-byte digests, like a backend without message fitting.
    #[derive(Debug)]
    struct DigestOnly;

    impl CompactRecovery for DigestOnly {
        fn check_message(&self, message: &[u8]) -> Result<(), CryptoError> {
            if message.len() != 32 {
                return Err(CryptoError::InvalidMessage("expected a 32-byte digest"));
            }
            Ok(())
        }

        fn recover_compact(
            &self,
            header: u8,
            sig: &[u8],
            message: &[u8],
        ) -> Result<PublicKey, CryptoError> {
            NativeCrypto.recover_compact(header, sig, message)
        }

        fn verify(&self, sig: &[u8], message: &[u8], key: &PublicKey) -> bool {
            NativeCrypto.verify(sig, message, key)
        }
    }

    struct CountingEntropy {
        inner: StdRng,
        draws: usize,
    }

    impl Entropy for CountingEntropy {
        fn fill(&mut self, buf: &mut [u8]) -> Result<(), EntropyError> {
            self.draws += 1;
            self.inner.fill(buf)
        }
    }

    struct BrokenEntropy;

    impl Entropy for BrokenEntropy {
        fn fill(&mut self, _buf: &mut [u8]) -> Result<(), EntropyError> {
            Err(EntropyError::new("device unplugged"))
        }
    }

    #[test]
    fn forged_signature_verifies() {
        let prefix = [0xabu8; 44];
        let forgery = Forger::new(&NativeCrypto)
            .forge(&prefix, &MESSAGE, &mut StdRng::seed_from_u64(1))
            .expect("forging succeeds");

        assert_eq!(forgery.tail.len(), 64);
        assert_eq!(&forgery.tail[..44], &prefix);
        assert!(forgery.verify(&NativeCrypto, &MESSAGE));
    }

    #[test]
    fn rejects_prefix_one_over_the_limit() {
        let crypto = CountingCrypto::default();
        let mut entropy = CountingEntropy {
            inner: StdRng::seed_from_u64(0),
            draws: 0,
        };

        let err = Forger::new(&crypto)
            .forge(&[0u8; 57], &MESSAGE, &mut entropy)
            .expect_err("57 bytes leave too little padding");

        assert!(matches!(
            err,
            ForgeError::PrefixTooLong { len: 57, max: 56 }
        ));
        assert_eq!(entropy.draws, 0);
        assert_eq!(crypto.attempts.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn accepts_prefix_at_the_limit() {
        // Pins r and most of s, only the last 8 bytes are random
        let prefix = [0xabu8; 56];
        let forgery = Forger::new(&NativeCrypto)
            .forge(&prefix, &MESSAGE, &mut StdRng::seed_from_u64(2))
            .expect("forging succeeds");

        assert_eq!(forgery.tail.len(), 64);
        assert_eq!(&forgery.tail[..56], &prefix);
        assert!(forgery.verify(&NativeCrypto, &MESSAGE));
    }

    #[test]
    fn empty_prefix_is_all_padding() {
        let forgery = Forger::new(&NativeCrypto)
            .forge(&[], &MESSAGE, &mut StdRng::seed_from_u64(3))
            .expect("forging succeeds");

        assert_eq!(forgery.tail.len(), 64);
        assert!(forgery.verify(&NativeCrypto, &MESSAGE));
    }

    #[test]
    fn sweeps_headers_in_ascending_order() {
        let crypto = CountingCrypto::default();
        let mut entropy = CountingEntropy {
            inner: StdRng::seed_from_u64(4),
            draws: 0,
        };

        let forgery = Forger::new(&crypto)
            .forge(&[0x42; 8], &MESSAGE, &mut entropy)
            .expect("forging succeeds");

        // Only 27..=34 decode, and the uncompressed ids come first
        assert!((27..=30).contains(&forgery.header));
        assert_eq!(entropy.draws as u64, forgery.redraws + 1);
        let attempts = crypto.attempts.load(Ordering::Relaxed);
        assert_eq!(
            attempts as u64,
            forgery.redraws * 256 + u64::from(forgery.header) + 1
        );
    }

    #[test]
    fn seeded_entropy_is_deterministic() {
        let prefix = b"sigforge";
        let first = Forger::new(&NativeCrypto)
            .forge(prefix, &MESSAGE, &mut StdRng::seed_from_u64(7))
            .expect("forging succeeds");
        let second = Forger::new(&NativeCrypto)
            .forge(prefix, &MESSAGE, &mut StdRng::seed_from_u64(7))
            .expect("forging succeeds");

        assert_eq!(first, second);
    }

    #[test]
    fn backends_forge_the_same_signature() {
        let prefix = b"same seed, same curve";
        let native = Forger::new(&NativeCrypto)
            .forge(prefix, &MESSAGE, &mut StdRng::seed_from_u64(8))
            .expect("forging succeeds");
        let pure = Forger::new(&K256Crypto)
            .forge(prefix, &MESSAGE, &mut StdRng::seed_from_u64(8))
            .expect("forging succeeds");

        assert_eq!(native, pure);
    }

    #[test]
    fn prefix_pinning_invalid_r_fails_fast() {
        let crypto = CountingCrypto::default();
        let mut entropy = CountingEntropy {
            inner: StdRng::seed_from_u64(14),
            draws: 0,
        };

        // 0x42..42 is not an x-coordinate, no padding can ever help
        let err = Forger::new(&crypto)
            .forge(&[0x42; 44], &MESSAGE, &mut entropy)
            .expect_err("r is pinned to a non-curve value");

        assert!(matches!(err, ForgeError::UnrecoverablePrefix(_)));
        assert_eq!(entropy.draws, 0);
        assert_eq!(crypto.attempts.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn prefix_forcing_r_above_order_fails_fast() {
        let crypto = CountingCrypto::default();
        let mut entropy = CountingEntropy {
            inner: StdRng::seed_from_u64(15),
            draws: 0,
        };

        // Every r starting with 16 0xff bytes is at least n
        let err = Forger::new(&crypto)
            .forge(&[0xff; 16], &MESSAGE, &mut entropy)
            .expect_err("r can never be below n");

        assert!(matches!(
            err,
            ForgeError::UnrecoverablePrefix(CryptoError::InvalidSignature)
        ));
        assert_eq!(entropy.draws, 0);
        assert_eq!(crypto.attempts.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn message_longer_than_a_digest_forges() {
        let prefix = [0xabu8; 44];
        let message = [0x42u8; 34];
        let forgery = Forger::new(&NativeCrypto)
            .forge(&prefix, &message, &mut StdRng::seed_from_u64(16))
            .expect("forging succeeds");

        assert_eq!(&forgery.tail[..44], &prefix);
        assert!(forgery.verify(&NativeCrypto, &message));
        assert!(forgery.verify(&K256Crypto, &message));
    }

    #[test]
    fn entropy_failure_is_surfaced() {
        let crypto = CountingCrypto::default();
        let err = Forger::new(&crypto)
            .forge(&[0x42; 10], &MESSAGE, &mut BrokenEntropy)
            .expect_err("entropy is broken");

        assert!(matches!(err, ForgeError::RandomnessUnavailable(_)));
        assert_eq!(crypto.attempts.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn rejects_message_backend_cannot_use() {
        let err = Forger::new(&DigestOnly)
            .forge(&[0x42; 10], &[0x42; 20], &mut StdRng::seed_from_u64(9))
            .expect_err("backend only takes 32-byte digests");

        assert!(matches!(err, ForgeError::InvalidMessage(_)));
    }

    #[test]
    fn cancelled_before_start() {
        let crypto = CountingCrypto::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Forger::new(&crypto)
            .with_cancellation(cancel)
            .forge(&[0x42; 10], &MESSAGE, &mut StdRng::seed_from_u64(10))
            .expect_err("token is already cancelled");

        assert!(matches!(err, ForgeError::Cancelled));
        assert_eq!(crypto.attempts.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn cancellation_interrupts_running_search() {
        let cancel = CancellationToken::new();
        let forger = Forger::new(&Barren).with_cancellation(cancel.clone());

        let result = thread::scope(|scope| {
            let search = scope
                .spawn(|| forger.forge(&[0x42; 10], &MESSAGE, &mut StdRng::seed_from_u64(11)));
            thread::sleep(Duration::from_millis(20));
            cancel.cancel();
            search.join().expect("search thread")
        });

        assert!(matches!(result, Err(ForgeError::Cancelled)));
    }

    #[test]
    fn zero_timeout_times_out() {
        let err = Forger::new(&Barren)
            .with_timeout(Duration::ZERO)
            .forge(&[0x42; 10], &MESSAGE, &mut StdRng::seed_from_u64(12))
            .expect_err("deadline already passed");

        assert!(matches!(err, ForgeError::TimedOut));
    }

    #[test]
    fn timeout_stops_barren_search() {
        let err = Forger::new(&Barren)
            .with_timeout(Duration::from_millis(30))
            .forge(&[0x42; 10], &MESSAGE, &mut StdRng::seed_from_u64(13))
            .expect_err("nothing is ever recovered");

        assert!(matches!(err, ForgeError::TimedOut));
    }
}
