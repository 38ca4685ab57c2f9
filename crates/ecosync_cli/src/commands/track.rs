use ecosync::{RepoType, TrackRequest, db, store};

use crate::config::Config;

/// Add repositories to the tracked set.
///
/// With `from_config`, every `[[repositories]]` entry is tracked; otherwise
/// the single repository given on the command line.
pub(crate) async fn handle_track(
    target: Option<(String, String)>,
    repo_type: RepoType,
    dependencies: Vec<String>,
    from_config: bool,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let requests: Vec<TrackRequest> = if from_config {
        config.repositories.clone()
    } else {
        let (organization, name) =
            target.ok_or("an organization and repository name are required")?;
        vec![
            TrackRequest::new(organization, name)
                .with_type(repo_type)
                .with_dependencies(dependencies),
        ]
    };

    if requests.is_empty() {
        println!("No repositories configured.");
        return Ok(());
    }

    let db = db::connect_and_migrate(database_url).await?;
    for request in requests {
        let tracked = store::track(&db, request).await?;
        println!("Tracking {} ({})", tracked.full_name(), tracked.repo_type);
    }

    Ok(())
}
