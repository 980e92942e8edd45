use std::{convert::Infallible, sync::Arc};

use log::info;
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions},
    Pool, Sqlite,
};
use warp::Filter;

use crate::{config::Config, error::QueryError, media::MediaStorage};

/// Everything a request handler needs: the storage handle, settings and media store.
pub struct AppState {
    pub pool: Pool<Sqlite>,
    pub config: Config,
    pub media: MediaStorage,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, QueryError> {
        let pool = connect(&config.database_url, config.max_connections).await?;
        Ok(Self::with_pool(pool, config))
    }

    pub fn with_pool(pool: Pool<Sqlite>, config: Config) -> Arc<Self> {
        let media = MediaStorage::new(config.media_root.clone());

        Arc::new(Self {
            pool,
            config,
            media,
        })
    }
}

/// Opens the pool and brings the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, QueryError> {
    info!("Connecting to {database_url}");
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// A private database living in a single, never-recycled connection.
pub async fn connect_in_memory() -> Result<SqlitePool, QueryError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<(), QueryError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
