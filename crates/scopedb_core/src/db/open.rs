//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or shared in-memory SQLite connections.
//! - Configure connection pragmas required by every session.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections carry the configured busy timeout.

use super::DbResult;
use crate::config::StoreConfig;
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

/// Opens and configures one connection to `target`.
///
/// `target` is a filesystem path or a `file:` URI naming a shared in-memory
/// database. Schema migrations are not applied here.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection(target: impl AsRef<Path>, config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = config.location.mode();
    debug!("event=db_open module=db status=start mode={mode}");

    let mut conn = match Connection::open(target) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    if let Err(err) = configure_connection(&mut conn, config) {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_configure_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err);
    }

    debug!(
        "event=db_open module=db status=ok mode={} duration_ms={}",
        mode,
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

/// Opens a connection and applies pending migrations.
///
/// Used once per engine to bring the store to the latest schema.
pub fn bootstrap(target: impl AsRef<Path>, config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mut conn = open_connection(target, config)?;
    match super::migrations::apply_migrations(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_bootstrap module=db status=ok mode={} duration_ms={}",
                config.location.mode(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_bootstrap module=db status=error mode={} duration_ms={} error_code=db_migrate_failed error={}",
                config.location.mode(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(conn: &mut Connection, config: &StoreConfig) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(config.busy_timeout)?;
    if config.echo {
        conn.trace(Some(echo_statement));
    }
    Ok(())
}

fn echo_statement(sql: &str) {
    debug!("event=sql_echo module=db sql={}", sql.replace(['\n', '\r'], " "));
}
