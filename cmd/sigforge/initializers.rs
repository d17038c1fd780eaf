use std::{num::NonZeroUsize, time::Duration};

use sigforge::{CompactRecovery, ForgeError, Forgery, ParallelForger};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Directive, fmt, layer::SubscriberExt,
};

use crate::cli::Options;

/// Logs go to stderr so stdout only carries the forged signature.
pub fn init_tracing(opts: &Options) {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(log_filter);
    let subscriber = Registry::default().with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Blocks until a signature is found, `cancel` fires or `timeout` passes.
pub fn run_search(
    crypto: &dyn CompactRecovery,
    workers: NonZeroUsize,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    prefix: &[u8],
    message: &[u8],
) -> Result<Forgery, ForgeError> {
    info!(
        prefix_len = prefix.len(),
        message_len = message.len(),
        workers = workers.get(),
        "Starting signature search"
    );

    let mut forger = ParallelForger::new(crypto, workers).with_cancellation(cancel);
    if let Some(timeout) = timeout {
        forger = forger.with_timeout(timeout);
    }
    forger.forge(prefix, message)
}

#[cfg(test)]
mod test {
    use super::*;
    use sigforge::NativeCrypto;

    #[test]
    fn search_returns_verifiable_forgery() {
        let message = [0x42u8; 32];
        let forgery = run_search(
            &NativeCrypto,
            NonZeroUsize::MIN,
            Some(Duration::from_secs(60)),
            CancellationToken::new(),
            b"cli",
            &message,
        )
        .expect("forging succeeds");

        assert!(forgery.verify(&NativeCrypto, &message));
    }

    #[test]
    fn search_honours_cancelled_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_search(
            &NativeCrypto,
            NonZeroUsize::MIN,
            None,
            cancel,
            b"cli",
            &[0x42u8; 32],
        )
        .expect_err("cancelled before start");

        assert!(matches!(err, ForgeError::Cancelled));
    }
}
