use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

pub mod photos;

#[derive(Error, Debug)]
pub enum Error {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub async fn get_pool(database_url: &str) -> Result<PgPool, Error> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections((num_cpus::get_physical() * 2) as u32)
        .acquire_timeout(Duration::from_secs(2))
        .connect(database_url)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
