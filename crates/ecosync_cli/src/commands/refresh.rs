use std::sync::Arc;

use ecosync::{ViewRefresher, db};

pub(crate) async fn handle_refresh(
    views: Vec<String>,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect_and_migrate(database_url).await?;
    let names: Vec<&str> = views.iter().map(String::as_str).collect();

    let refreshed = ViewRefresher::new(Arc::new(db)).refresh(&names).await?;
    for view in refreshed {
        println!("Refreshed {view}");
    }

    Ok(())
}
