//! SQLite reading store -- schema, queries, migrations.

pub mod schema;

use std::path::Path;

use anyhow::Result;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::detect::Reading;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &Path) -> Result<Pool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Insert (or replace) a reading keyed by its id.
pub fn save_reading(pool: &Pool, r: &Reading) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT OR REPLACE INTO sensor_readings (id, temperature, humidity, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![r.id, r.temperature, r.humidity, r.timestamp],
    )?;
    Ok(())
}

/// Insert a batch of readings in one transaction. Returns the number written.
pub fn save_readings(pool: &Pool, readings: &[Reading]) -> Result<usize> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO sensor_readings (id, temperature, humidity, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in readings {
            stmt.execute(params![r.id, r.temperature, r.humidity, r.timestamp])?;
        }
    }
    tx.commit()?;
    Ok(readings.len())
}

/// The `limit` most recent readings, newest first.
pub fn recent_readings(pool: &Pool, limit: usize) -> Result<Vec<Reading>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, temperature, humidity, created_at FROM sensor_readings
         ORDER BY created_at DESC, id DESC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map([limit as i64], |row| {
        Ok(Reading::new(
            row.get::<_, i64>(0)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<f64>>(1)?,
            row.get::<_, Option<f64>>(2)?,
        ))
    })?;

    let mut readings = Vec::new();
    for r in rows {
        readings.push(r?);
    }
    Ok(readings)
}
