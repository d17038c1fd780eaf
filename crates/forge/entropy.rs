use rand::{CryptoRng, RngCore, SeedableRng, rngs::OsRng, rngs::StdRng};

#[derive(Debug, thiserror::Error)]
#[error("entropy source failed: {reason}")]
pub struct EntropyError {
    reason: String,
}

impl EntropyError {
    pub fn new(reason: impl ToString) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// Source of the random padding.
///
/// Every `RngCore + CryptoRng` is one, so production code passes `OsRng` (or
/// a generator seeded from it) and tests pass a seeded `StdRng`.
pub trait Entropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), EntropyError>;
}

impl<R: RngCore + CryptoRng + ?Sized> Entropy for R {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), EntropyError> {
        self.try_fill_bytes(buf).map_err(EntropyError::new)
    }
}

/// A fresh CSPRNG seeded from the operating system, one per worker.
pub fn seeded_from_os() -> Result<StdRng, EntropyError> {
    StdRng::from_rng(OsRng).map_err(EntropyError::new)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        StdRng::seed_from_u64(42).fill(&mut first).expect("fill");
        StdRng::seed_from_u64(42).fill(&mut second).expect("fill");
        assert_eq!(first, second);
    }

    #[test]
    fn os_seeded_streams_differ() {
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        seeded_from_os().expect("os entropy").fill(&mut first).expect("fill");
        seeded_from_os().expect("os entropy").fill(&mut second).expect("fill");
        assert_ne!(first, second);
    }
}
