use rocket_db_pools::{Database, sqlx};

#[derive(Database)]
#[database("watchlist_db")]
pub struct WatchlistDb(sqlx::PgPool);

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations. Called from an ignite fairing so the server
/// refuses to start against an unmigrated database.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
