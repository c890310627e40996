use duckdb::Connection;
use r2d2::ManageConnection;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Path that selects a private in-process database.
pub const IN_MEMORY: &str = ":memory:";

/// r2d2 manager handing out connections to a single DuckDB database.
///
/// The database is opened once; every pooled connection is a clone of that
/// handle, so pooled connections see the same data (in-memory databases
/// included) and never fight over the file lock.
pub struct DuckDBConnectionManager {
    base: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: impl Into<String>) -> Result<Self, duckdb::Error> {
        let connection_string = connection_string.into();
        let base = if connection_string.is_empty() || connection_string == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open(&connection_string)?
        };
        debug!("Opened DuckDB database at {}", display_target(&connection_string));
        Ok(Self {
            base: Mutex::new(base),
        })
    }
}

fn display_target(connection_string: &str) -> &str {
    if connection_string.is_empty() {
        IN_MEMORY
    } else {
        connection_string
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        // The base handle is never left half-updated, so a poisoned lock is safe to reuse.
        self.base
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use r2d2::Pool;

    #[test]
    fn pooled_connections_share_one_in_memory_database() {
        let pool = Pool::builder()
            .max_size(2)
            .build(DuckDBConnectionManager::new(IN_MEMORY).unwrap())
            .unwrap();

        let first = pool.get().unwrap();
        first
            .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (42);")
            .unwrap();

        let second = pool.get().unwrap();
        let x: i32 = second
            .query_row("SELECT x FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(x, 42);
    }

    #[test]
    fn empty_connection_string_means_in_memory() {
        let manager = DuckDBConnectionManager::new("").unwrap();
        let mut conn = manager.connect().unwrap();
        assert!(manager.is_valid(&mut conn).is_ok());
    }
}
