//! Live handle to a configured backing store.
//!
//! # Responsibility
//! - Validate the store location and bring its schema up to date once.
//! - Hand out sessions, each on its own connection.
//! - Track session acquisition/release counts.
//!
//! # Invariants
//! - In-memory stores live exactly as long as their `Engine`.
//! - `opened - closed` equals the number of sessions not yet closed.

use crate::config::{StoreConfig, StoreLocation};
use crate::db::{bootstrap, DbResult};
use crate::session::Session;
use log::info;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Session acquisition/release counters of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub opened: u64,
    pub closed: u64,
}

impl SessionStats {
    /// Sessions acquired but not yet closed.
    pub fn open(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

/// Factory of sessions bound to one backing store.
pub struct Engine {
    config: StoreConfig,
    target: PathBuf,
    // Keeps a shared in-memory database alive between sessions.
    _anchor: Option<Mutex<Connection>>,
    opened: AtomicU64,
    closed: AtomicU64,
}

impl Engine {
    /// Creates an engine from a location string with default tuning.
    ///
    /// See [`StoreLocation::parse`] for accepted forms.
    pub fn connect(location: &str) -> DbResult<Self> {
        Self::with_config(StoreConfig::parse(location)?)
    }

    /// Creates an engine and applies pending schema migrations.
    ///
    /// # Errors
    /// - Store not reachable (for example, missing parent directory).
    /// - Store schema newer than this binary supports.
    pub fn with_config(config: StoreConfig) -> DbResult<Self> {
        let (target, anchor) = match &config.location {
            StoreLocation::Memory => {
                // memdb databases named with a leading `/` are shared by every
                // connection in the process and use ordinary database locks,
                // so the busy timeout applies between sessions.
                let target = PathBuf::from(format!(
                    "file:/scopedb-{}?vfs=memdb",
                    Uuid::new_v4().simple()
                ));
                let anchor = bootstrap(&target, &config)?;
                (target, Some(Mutex::new(anchor)))
            }
            StoreLocation::File(path) => {
                let conn = bootstrap(path, &config)?;
                conn.close().map_err(|(_, err)| err)?;
                (path.clone(), None)
            }
        };

        info!(
            "event=engine_ready module=engine status=ok mode={} echo={}",
            config.location.mode(),
            config.echo
        );

        Ok(Self {
            config,
            target,
            _anchor: anchor,
            opened: AtomicU64::new(0),
            closed: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Acquires a new session with an open transaction.
    ///
    /// The caller owns finalization: `commit()`, `rollback()`, or drop
    /// (which rolls back).
    pub fn session(&self) -> DbResult<Session<'_>> {
        Session::begin(self)
    }

    pub fn session_stats(&self) -> SessionStats {
        SessionStats {
            opened: self.opened.load(Ordering::SeqCst),
            closed: self.closed.load(Ordering::SeqCst),
        }
    }

    /// Number of sessions acquired but not yet closed.
    pub fn open_sessions(&self) -> u64 {
        self.session_stats().open()
    }

    pub(crate) fn target(&self) -> &Path {
        self.target.as_path()
    }

    /// Records one acquisition and returns its session id.
    pub(crate) fn register_open(&self) -> u64 {
        self.opened.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn register_close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
