use clap::Parser;
use sigforge_cli::{
    cli::Options,
    initializers::{init_tracing, run_search},
    output::Report,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let opts = Options::parse();
    init_tracing(&opts);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl-C, cancelling search");
                cancel.cancel();
            }
        }
    });

    let prefix = opts.prefix_bytes();
    let message = opts.message.0.clone();
    let (backend, workers, timeout) = (opts.backend, opts.workers, opts.timeout());

    let forgery = tokio::task::spawn_blocking(move || {
        run_search(backend.crypto(), workers, timeout, cancel, &prefix, &message)
    })
    .await??;

    info!(redraws = forgery.redraws, "Search finished");

    let report = Report::new(backend.name(), &forgery);
    if opts.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }
    Ok(())
}
