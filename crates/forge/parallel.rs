use std::num::NonZeroUsize;
use std::thread::{self, Builder};
use std::time::{Duration, Instant};

use sigforge_crypto::CompactRecovery;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{
    entropy::{self, Entropy, EntropyError},
    error::ForgeError,
    forger::{Forger, validate},
    forgery::Forgery,
};

/// Races independent [`Forger`]s on scoped threads and keeps the first success.
///
/// Workers share nothing but a cancellation token, which is a child of the
/// caller's token: the first worker to finish (successfully or with a hard
/// error) cancels its siblings, and cancelling the caller's token stops all
/// of them.
#[derive(Debug)]
pub struct ParallelForger<'a, C: CompactRecovery + ?Sized> {
    crypto: &'a C,
    workers: NonZeroUsize,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl<'a, C: CompactRecovery + ?Sized> ParallelForger<'a, C> {
    pub fn new(crypto: &'a C, workers: NonZeroUsize) -> Self {
        Self {
            crypto,
            workers,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// One worker per available core.
    pub fn with_available_parallelism(crypto: &'a C) -> Self {
        let workers = thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self::new(crypto, workers)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Every worker draws from its own OS-seeded generator.
    pub fn forge(&self, prefix: &[u8], message: &[u8]) -> Result<Forgery, ForgeError> {
        self.forge_with(prefix, message, |_| entropy::seeded_from_os())
    }

    /// `make_entropy` is called once per worker, on that worker's thread.
    pub fn forge_with<E, F>(
        &self,
        prefix: &[u8],
        message: &[u8],
        make_entropy: F,
    ) -> Result<Forgery, ForgeError>
    where
        E: Entropy,
        F: Fn(usize) -> Result<E, EntropyError> + Sync,
    {
        validate(self.crypto, prefix, message)?;

        let race = self.cancel.child_token();
        let make_entropy = &make_entropy;

        let (results, spawn_error) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.workers.get());
            let mut spawn_error = None;

            for worker in 0..self.workers.get() {
                let mut forger = Forger::new(self.crypto).with_cancellation(race.clone());
                if let Some(deadline) = self.deadline {
                    forger = forger.with_deadline(deadline);
                }
                let race = race.clone();

                let spawned = Builder::new()
                    .name(format!("sigforge worker {worker}"))
                    .spawn_scoped(scope, move || {
                        let result = make_entropy(worker)
                            .map_err(ForgeError::from)
                            .and_then(|mut entropy| forger.forge(prefix, message, &mut entropy));
                        match &result {
                            Ok(forgery) => {
                                debug!(worker, redraws = forgery.redraws, "Worker found a signature");
                                race.cancel();
                            }
                            Err(ForgeError::Cancelled | ForgeError::TimedOut) => {}
                            Err(err) => {
                                warn!(worker, %err, "Worker failed, stopping siblings");
                                race.cancel();
                            }
                        }
                        result
                    })
                    .inspect_err(|err| error!(worker, error=%err, "Couldn't spawn forging thread"));

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => spawn_error = Some(err),
                }
            }

            let results: Vec<_> = handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(Err(ForgeError::WorkerPanicked)))
                .collect();
            (results, spawn_error)
        });

        if results.is_empty() {
            if let Some(err) = spawn_error {
                return Err(ForgeError::WorkerSpawn(err));
            }
        }

        let mut failure = None;
        for result in results {
            match result {
                Ok(forgery) => return Ok(forgery),
                // Stopped by a sibling, not by the caller
                Err(ForgeError::Cancelled) if !self.cancel.is_cancelled() => {}
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        Err(failure.unwrap_or(ForgeError::Cancelled))
    }
}
