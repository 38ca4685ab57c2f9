use std::sync::Arc;

use ecosync::github::GitHubClient;
use ecosync::sync::{PassReport, Scheduler, Shutdown, SyncEngine};
use ecosync::{ApiRateLimiter, RateLimitedClient, db};

use crate::config::Config;

type GitHubEngine = SyncEngine<RateLimitedClient<GitHubClient>>;

async fn build_engine(
    config: &Config,
    database_url: &str,
) -> Result<GitHubEngine, Box<dyn std::error::Error>> {
    let token = config
        .github_token()
        .ok_or("GitHub token is required: set github.token or ECOSYNC_GITHUB_TOKEN")?;

    let db = db::connect_and_migrate(database_url).await?;
    let client = GitHubClient::new(&token, config.github.api_url.as_deref())?;
    let limiter = ApiRateLimiter::new(config.sync.requests_per_second);
    let client = RateLimitedClient::new(client, limiter);

    Ok(SyncEngine::new(
        Arc::new(client),
        Arc::new(db),
        config.sync.options(),
    ))
}

fn print_report(report: &PassReport) {
    println!(
        "Pass {}: {} visited, {} changed, {} unchanged, {} skipped, {} failed",
        report.pass_id,
        report.visited,
        report.changed,
        report.unchanged,
        report.skipped,
        report.failed
    );
    println!(
        "  {} commits inserted, {} contributions written in {:.1?}",
        report.commits_inserted, report.contributions_written, report.elapsed
    );
    if report.partial > 0 {
        println!(
            "  {} repositories had undecodable pages and will be retried",
            report.partial
        );
    }
    if !report.refreshed.is_empty() {
        println!("  refreshed {}", report.refreshed.join(", "));
    }
    for failure in &report.errors {
        println!("  failed {failure}");
    }
    if report.interrupted {
        println!("  interrupted before every repository was started");
    }
}

/// Run a single pass and print its report.
pub(crate) async fn handle_sync(
    config: &Config,
    database_url: &str,
    shutdown: Shutdown,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(config, database_url).await?;
    let report = engine.run_pass(&shutdown).await?;
    print_report(&report);
    Ok(())
}

/// Run passes until Ctrl+C.
pub(crate) async fn handle_run(
    config: &Config,
    database_url: &str,
    shutdown: Shutdown,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(config, database_url).await?;
    let interval = config.sync.interval();
    tracing::info!(
        interval_secs = interval.as_secs(),
        concurrency = engine.options().concurrency,
        "Starting sync loop"
    );

    let passes = Scheduler::new(engine, interval).run(shutdown).await;
    println!("Stopped after {passes} passes.");
    Ok(())
}
