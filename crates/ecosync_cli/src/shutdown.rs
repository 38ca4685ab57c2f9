use ecosync::sync::{Shutdown, shutdown_channel};

/// Install the Ctrl+C handler and return the stop signal it drives.
///
/// The first Ctrl+C lets running repositories finish and stops the loop
/// between repositories. A second Ctrl+C exits immediately with status 130.
pub(crate) fn setup_shutdown_handler() -> Shutdown {
    let (trigger, shutdown) = shutdown_channel();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }

        tracing::warn!("Shutdown requested, finishing current repositories (Ctrl+C again to force quit)");
        trigger.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Force quit");
            std::process::exit(130);
        }
    });

    shutdown
}
