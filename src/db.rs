//! SQLite connection pool helpers.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;

use crate::errors::{Error, RepositoryError};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const SCHEMA: &str = include_str!("schema.sql");

/// Builds an r2d2 pool for the SQLite database at `database_url`.
pub fn establish_connection_pool(database_url: &str) -> Result<DbPool, Error> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Ok(Pool::builder().build(manager)?)
}

/// Creates any missing tables and indexes.
pub fn init_schema(pool: &DbPool) -> Result<(), Error> {
    let mut conn = pool.get()?;
    conn.batch_execute(SCHEMA).map_err(RepositoryError::from)?;
    Ok(())
}
