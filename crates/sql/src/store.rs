//! SQLite-backed city statistics store.

use crate::records::{seed_records, CityRecord, TABLE_NAME};
use cityq_core::config::SeedMode;
use cityq_core::{AppError, AppResult};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Where the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Recreated on every process start
    Memory,
    /// Created once and reused across runs
    File(PathBuf),
}

/// Column names plus values of a read-only query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Render rows as `column: value` lines, one row per line.
    pub fn render(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| format!("{}: {}", column, render_value(value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

/// City statistics store.
///
/// The connection sits behind a mutex so the store can be shared between
/// the engine and the CLI; it is never held across an `.await`.
pub struct CityStore {
    conn: Mutex<Connection>,
    target: DatabaseTarget,
}

impl CityStore {
    /// Open (or create) the store.
    pub fn open(target: DatabaseTarget) -> AppResult<Self> {
        let conn = match &target {
            DatabaseTarget::Memory => Connection::open_in_memory(),
            DatabaseTarget::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::Structured(format!("Failed to create database directory: {}", e))
                    })?;
                }
                Connection::open(path)
            }
        }
        .map_err(|e| AppError::Structured(format!("Failed to open city store: {}", e)))?;

        tracing::debug!("Opened city store at {:?}", target);

        Ok(Self {
            conn: Mutex::new(conn),
            target,
        })
    }

    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Structured("City store lock poisoned".to_string()))
    }

    /// Create the table if absent and write the seed records.
    ///
    /// Returns the number of seed rows written. With [`SeedMode::Upsert`] this
    /// is idempotent; with [`SeedMode::Insert`] a populated table yields a
    /// uniqueness violation and nothing is written.
    pub fn migrate(&self, mode: SeedMode) -> AppResult<usize> {
        let mut conn = self.lock()?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                city_name TEXT PRIMARY KEY,
                population INTEGER NOT NULL,
                state TEXT NOT NULL
            );",
            TABLE_NAME
        ))
        .map_err(|e| AppError::Structured(format!("Failed to create {}: {}", TABLE_NAME, e)))?;

        let sql = match mode {
            SeedMode::Upsert => format!(
                "INSERT INTO {} (city_name, population, state) VALUES (?1, ?2, ?3)
                 ON CONFLICT(city_name) DO UPDATE SET
                    population = excluded.population,
                    state = excluded.state",
                TABLE_NAME
            ),
            SeedMode::Insert => format!(
                "INSERT INTO {} (city_name, population, state) VALUES (?1, ?2, ?3)",
                TABLE_NAME
            ),
        };

        let tx = conn
            .transaction()
            .map_err(|e| AppError::Structured(format!("Failed to begin seed transaction: {}", e)))?;

        let records = seed_records();
        {
            let mut stmt = tx
                .prepare(&sql)
                .map_err(|e| AppError::Structured(format!("Failed to prepare seed insert: {}", e)))?;

            for record in &records {
                stmt.execute(params![record.city_name, record.population, record.state])
                    .map_err(|e| seed_error(record, e))?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Structured(format!("Failed to commit seed rows: {}", e)))?;

        tracing::info!("Seeded {} rows into {} ({:?})", records.len(), TABLE_NAME, mode);
        Ok(records.len())
    }

    /// Number of rows in the city table.
    pub fn count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME), [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| AppError::Structured(format!("Failed to count rows: {}", e)))
    }

    /// All records ordered by city name.
    pub fn all(&self) -> AppResult<Vec<CityRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT city_name, population, state FROM {} ORDER BY city_name",
                TABLE_NAME
            ))
            .map_err(|e| AppError::Structured(format!("Failed to prepare query: {}", e)))?;

        let records = stmt
            .query_map([], |row| {
                Ok(CityRecord {
                    city_name: row.get(0)?,
                    population: row.get(1)?,
                    state: row.get(2)?,
                })
            })
            .map_err(|e| AppError::Structured(format!("Failed to query cities: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Structured(format!("Failed to read city row: {}", e)))?;

        Ok(records)
    }

    /// Look up one city by exact name.
    pub fn get(&self, city_name: &str) -> AppResult<Option<CityRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT city_name, population, state FROM {} WHERE city_name = ?1",
                TABLE_NAME
            ),
            params![city_name],
            |row| {
                Ok(CityRecord {
                    city_name: row.get(0)?,
                    population: row.get(1)?,
                    state: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Structured(format!("Failed to look up '{}': {}", city_name, e)))
    }

    /// The `CREATE TABLE` statement, as handed to the SQL translator.
    pub fn schema_description(&self) -> AppResult<String> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![TABLE_NAME],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| AppError::Structured(format!("Failed to read schema: {}", e)))?
        .ok_or_else(|| {
            AppError::Structured(format!("Table {} does not exist; run the migration first", TABLE_NAME))
        })
    }

    /// Execute a single read-only statement and collect its rows.
    pub fn query(&self, sql: &str) -> AppResult<QueryRows> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::Structured(format!("Invalid SQL '{}': {}", sql, e)))?;

        if !stmt.readonly() {
            return Err(AppError::Structured(format!(
                "Refusing to execute a statement that modifies data: {}",
                sql
            )));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(value_to_json))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| AppError::Structured(format!("Failed to execute '{}': {}", sql, e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Structured(format!("Failed to read row: {}", e)))?;

        tracing::debug!("Query returned {} rows", rows.len());

        Ok(QueryRows { columns, rows })
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("<{} bytes>", bytes.len())),
    }
}

fn seed_error(record: &CityRecord, err: rusqlite::Error) -> AppError {
    match err {
        rusqlite::Error::SqliteFailure(ref code, _) if code.code == ErrorCode::ConstraintViolation => {
            AppError::Structured(format!(
                "Seed row '{}' already exists (uniqueness violation): {}",
                record.city_name, err
            ))
        }
        other => AppError::Structured(format!(
            "Failed to seed '{}': {}",
            record.city_name, other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded() -> CityStore {
        let store = CityStore::open(DatabaseTarget::Memory).unwrap();
        store.migrate(SeedMode::Upsert).unwrap();
        store
    }

    #[test]
    fn test_migrate_creates_six_rows() {
        let store = seeded();
        assert_eq!(store.count().unwrap(), 6);
    }

    #[test]
    fn test_upsert_seed_is_idempotent() {
        let store = seeded();
        store.migrate(SeedMode::Upsert).unwrap();
        assert_eq!(store.count().unwrap(), 6);
    }

    #[test]
    fn test_plain_insert_on_populated_table_violates_uniqueness() {
        let store = seeded();
        let err = store.migrate(SeedMode::Insert).unwrap_err();
        assert!(err.to_string().contains("uniqueness violation"));
        // The failed seed rolled back; nothing was duplicated.
        assert_eq!(store.count().unwrap(), 6);
    }

    #[test]
    fn test_plain_insert_on_empty_table_succeeds() {
        let store = CityStore::open(DatabaseTarget::Memory).unwrap();
        assert_eq!(store.migrate(SeedMode::Insert).unwrap(), 6);
        assert_eq!(store.count().unwrap(), 6);
    }

    #[test]
    fn test_upsert_restores_modified_rows() {
        let store = seeded();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE city_stats SET population = 1 WHERE city_name = 'Miami'",
                [],
            )
            .unwrap();
        }
        store.migrate(SeedMode::Upsert).unwrap();
        assert_eq!(store.get("Miami").unwrap().unwrap().population, 449_514);
    }

    #[test]
    fn test_file_store_persists_between_opens() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/city_stats.sqlite");

        {
            let store = CityStore::open(DatabaseTarget::File(path.clone())).unwrap();
            store.migrate(SeedMode::Upsert).unwrap();
        }

        let reopened = CityStore::open(DatabaseTarget::File(path.clone())).unwrap();
        assert_eq!(reopened.count().unwrap(), 6);
        assert!(reopened.migrate(SeedMode::Insert).is_err());
    }

    #[test]
    fn test_all_and_get() {
        let store = seeded();
        let all = store.all().unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].city_name, "Chicago");
        assert!(store.get("Atlantis").unwrap().is_none());
    }

    #[test]
    fn test_schema_description() {
        let store = seeded();
        let schema = store.schema_description().unwrap();
        assert!(schema.contains("city_name TEXT PRIMARY KEY"));
        assert!(schema.contains("state TEXT NOT NULL"));
    }

    #[test]
    fn test_schema_description_before_migration() {
        let store = CityStore::open(DatabaseTarget::Memory).unwrap();
        assert!(store.schema_description().is_err());
    }

    #[test]
    fn test_query_and_render() {
        let store = seeded();
        let rows = store
            .query("SELECT city_name, population FROM city_stats WHERE state = 'Florida'")
            .unwrap();

        assert_eq!(rows.columns, vec!["city_name", "population"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.render(), "city_name: Miami, population: 449514");
    }

    #[test]
    fn test_query_rejects_writes() {
        let store = seeded();
        assert!(store.query("DELETE FROM city_stats").is_err());
        assert_eq!(store.count().unwrap(), 6);
    }

    #[test]
    fn test_query_invalid_sql() {
        let store = seeded();
        let err = store.query("SELECT nope FROM nowhere").unwrap_err();
        assert!(matches!(err, AppError::Structured(_)));
    }
}
