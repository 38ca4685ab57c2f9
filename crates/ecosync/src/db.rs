//! Database connection utilities.

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Configure SQLite pragmas for concurrent writers.
///
/// - `journal_mode=WAL` - readers don't block writers
/// - `busy_timeout=5000` - wait up to 5 seconds for locks instead of failing
/// - `synchronous=NORMAL` - safe with WAL
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in [
        "PRAGMA journal_mode=WAL",
        "PRAGMA busy_timeout=5000",
        "PRAGMA synchronous=NORMAL",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }

    Ok(())
}

fn is_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}

/// Each connection to an in-memory SQLite database sees its own database.
fn is_sqlite_memory(database_url: &str) -> bool {
    is_sqlite(database_url)
        && (database_url.contains(":memory:") || database_url.contains("mode=memory"))
}

fn connect_options(database_url: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);

    if is_sqlite_memory(database_url) {
        options.max_connections(1).min_connections(1);
    }

    options
}

/// Establish a connection to the database.
///
/// File-backed SQLite databases get WAL mode, a 5 second busy timeout and
/// NORMAL synchronous mode. In-memory SQLite uses a single pooled connection
/// so every query sees the same database.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(database_url)).await?;

    if is_sqlite(database_url) && !is_sqlite_memory(database_url) {
        configure_sqlite(&db).await?;
    }

    tracing::debug!(backend = ?db.get_database_backend(), "Connected to database");
    Ok(db)
}

/// Establish a connection and run all pending migrations.
///
/// # Example
/// ```ignore
/// let db = ecosync::connect_and_migrate("sqlite::memory:").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
