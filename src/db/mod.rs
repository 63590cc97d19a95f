use anyhow::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::env;

pub mod query;

/// Connects to PostgreSQL and brings the schema up to date.
///
/// Panics if DATABASE_URL isn't set; there is nothing useful the server can
/// do without a database.
pub async fn connect() -> Result<PgPool> {
    let url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
