//! Unit-of-work sessions and the transaction scope around them.
//!
//! # Responsibility
//! - Bind one SQLite connection and one transaction to a `Session`.
//! - Provide `Engine::with_scope`: commit on success, roll back on failure,
//!   always close.
//!
//! # Invariants
//! - States move `Created -> Active -> {Committing -> Closed}` or
//!   `Active -> Failed -> RollingBack -> Closed`.
//! - `Closed` is entered exactly once per session, on every exit path
//!   including early return and unwinding.
//! - Body failures are returned unchanged; only cleanup failures are
//!   converted into the caller's error type.

use crate::db::{open_connection, DbError, DbResult};
use crate::engine::Engine;
use crate::repo::post_repo::SqlitePostRepository;
use crate::repo::user_repo::SqliteUserRepository;
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::cell::Cell;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection acquired, transaction not yet started.
    Created,
    /// Transaction open; caller work may run.
    Active,
    /// Commit in progress.
    Committing,
    /// Caller work or commit failed; rollback pending.
    Failed,
    /// Rollback in progress.
    RollingBack,
    /// Connection released. Terminal.
    Closed,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Committing => "committing",
            Self::Failed => "failed",
            Self::RollingBack => "rolling_back",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// A unit of work bound to one connection and one open transaction.
///
/// Obtain one through [`Engine::session`] and finish it with
/// [`Session::commit`] or [`Session::rollback`], or let
/// [`Engine::with_scope`] drive it. Dropping an unfinished session rolls
/// back and closes it.
pub struct Session<'engine> {
    engine: &'engine Engine,
    conn: Option<Connection>,
    state: Cell<SessionState>,
    id: u64,
    started_at: Instant,
}

impl<'engine> Session<'engine> {
    pub(crate) fn begin(engine: &'engine Engine) -> DbResult<Self> {
        let conn = open_connection(engine.target(), engine.config())?;
        let id = engine.register_open();
        let mut session = Self {
            engine,
            conn: Some(conn),
            state: Cell::new(SessionState::Created),
            id,
            started_at: Instant::now(),
        };

        // On failure `session` drops here and is closed without a rollback.
        session.connection()?.execute_batch("BEGIN DEFERRED;")?;
        session.state.set(SessionState::Active);
        info!(
            "event=scope_begin module=session status=ok session_id={} mode={}",
            id,
            engine.config().location.mode()
        );
        Ok(session)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Returns the underlying connection for arbitrary SQL.
    ///
    /// Statements run inside the session transaction.
    pub fn connection(&self) -> DbResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| DbError::SessionFinished(self.state.get()))
    }

    /// Users/addresses repository bound to this session.
    pub fn users(&self) -> DbResult<SqliteUserRepository<'_>> {
        Ok(SqliteUserRepository::new(self.active_connection()?))
    }

    /// Posts/keywords repository bound to this session.
    pub fn posts(&self) -> DbResult<SqlitePostRepository<'_>> {
        Ok(SqlitePostRepository::new(self.active_connection()?))
    }

    /// Commits pending changes and immediately opens a new transaction.
    ///
    /// Work done before the checkpoint survives a later rollback of this
    /// session.
    ///
    /// If no new transaction can be opened the session becomes `Failed` and
    /// refuses further work.
    pub fn checkpoint(&self) -> DbResult<()> {
        self.active_connection()?.execute_batch("COMMIT;")?;
        self.reopen_transaction("checkpoint")
    }

    /// Discards pending changes since the last commit point and opens a new
    /// transaction. The session stays active.
    pub fn discard_pending(&self) -> DbResult<()> {
        let conn = self.active_connection()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK;")?;
        }
        self.reopen_transaction("discard")
    }

    /// Commits pending changes and closes the session.
    ///
    /// When `COMMIT` fails the transaction is rolled back, the session is
    /// closed and the failure is returned. A failure on the cleanup path
    /// replaces the commit failure.
    ///
    /// A session that already failed is rolled back and closed instead, and
    /// `SessionFinished(Failed)` is returned.
    pub fn commit(mut self) -> DbResult<()> {
        let state = self.state.get();
        if state != SessionState::Active {
            self.roll_back("not_active")?;
            self.close()?;
            return Err(DbError::SessionFinished(state));
        }
        self.state.set(SessionState::Committing);
        let committed = self.connection()?.execute_batch("COMMIT;");
        match committed {
            Ok(()) => {
                info!(
                    "event=scope_commit module=session status=ok session_id={} duration_ms={}",
                    self.id,
                    self.started_at.elapsed().as_millis()
                );
                self.close()
            }
            Err(err) => {
                self.state.set(SessionState::Failed);
                error!(
                    "event=scope_commit module=session status=error session_id={} duration_ms={} error={}",
                    self.id,
                    self.started_at.elapsed().as_millis(),
                    err
                );
                self.roll_back("commit_failed")?;
                self.close()?;
                Err(err.into())
            }
        }
    }

    /// Discards pending changes and closes the session.
    pub fn rollback(mut self) -> DbResult<()> {
        self.state.set(SessionState::Failed);
        self.roll_back("requested")?;
        self.close()
    }

    fn active_connection(&self) -> DbResult<&Connection> {
        let state = self.state.get();
        if state != SessionState::Active {
            return Err(DbError::SessionFinished(state));
        }
        self.connection()
    }

    /// Opens the next transaction after a mid-scope `COMMIT` or `ROLLBACK`.
    fn reopen_transaction(&self, step: &str) -> DbResult<()> {
        let begun = self
            .active_connection()?
            .execute_batch("BEGIN DEFERRED;")
            .map_err(DbError::from);
        self.settle_reopen(step, begun)
    }

    // Without an open transaction later writes would autocommit.
    fn settle_reopen(&self, step: &str, begun: DbResult<()>) -> DbResult<()> {
        match begun {
            Ok(()) => {
                debug!(
                    "event=scope_{} module=session status=ok session_id={}",
                    step, self.id
                );
                Ok(())
            }
            Err(err) => {
                self.state.set(SessionState::Failed);
                error!(
                    "event=scope_{} module=session status=error session_id={} error={}",
                    step, self.id, err
                );
                Err(err)
            }
        }
    }

    /// Runs `ROLLBACK`. Closes the session on failure so `Closed` is still
    /// reached on this path.
    fn roll_back(&mut self, reason: &str) -> DbResult<()> {
        self.state.set(SessionState::RollingBack);
        let result = match self.connection() {
            // SQLite may already have rolled back on its own after some errors.
            Ok(conn) if conn.is_autocommit() => Ok(()),
            Ok(conn) => conn.execute_batch("ROLLBACK;").map_err(DbError::from),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                info!(
                    "event=scope_rollback module=session status=ok session_id={} reason={} duration_ms={}",
                    self.id,
                    reason,
                    self.started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=scope_rollback module=session status=error session_id={} reason={} error={}",
                    self.id, reason, err
                );
                if let Err(close_err) = self.close() {
                    error!(
                        "event=scope_close module=session status=error session_id={} error={}",
                        self.id, close_err
                    );
                }
                Err(err)
            }
        }
    }

    fn close(&mut self) -> DbResult<()> {
        if self.state.get() == SessionState::Closed {
            return Ok(());
        }
        self.state.set(SessionState::Closed);
        self.engine.register_close();

        let result = match self.conn.take() {
            // The returned connection is dropped, which closes it anyway.
            Some(conn) => conn.close().map_err(|(_, err)| DbError::from(err)),
            None => Ok(()),
        };
        match &result {
            Ok(()) => debug!(
                "event=scope_close module=session status=ok session_id={} duration_ms={}",
                self.id,
                self.started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=scope_close module=session status=error session_id={} error={}",
                self.id, err
            ),
        }
        result
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        let state = self.state.get();
        if state == SessionState::Closed {
            return;
        }
        if matches!(state, SessionState::Active | SessionState::Failed) {
            let reason = if std::thread::panicking() {
                "panic"
            } else {
                "dropped"
            };
            warn!(
                "event=scope_abandoned module=session status=rollback session_id={} reason={}",
                self.id, reason
            );
            self.state.set(SessionState::Failed);
            // Errors are already logged and the session is closed on failure.
            if self.roll_back(reason).is_err() {
                return;
            }
        }
        let _ = self.close();
    }
}

impl Engine {
    /// Runs `body` inside one transactional scope.
    ///
    /// A new session is acquired and handed to `body`. When `body` returns
    /// `Ok`, pending changes are committed; when it returns `Err` (or
    /// panics), they are rolled back and the original failure is returned
    /// (or the panic resumes). The session is closed on every path.
    ///
    /// # Errors
    /// - Acquisition failures, before `body` runs.
    /// - The error returned by `body`, unchanged.
    /// - Commit, rollback or close failures, converted through
    ///   `From<DbError>`. A cleanup failure replaces an earlier body failure.
    pub fn with_scope<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&Session<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let session = self.session()?;
        let session_id = session.id();

        match body(&session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(err) => match session.rollback() {
                Ok(()) => Err(err),
                Err(cleanup_err) => {
                    error!(
                        "event=scope_failure_masked module=session status=error session_id={} error={}",
                        session_id, cleanup_err
                    );
                    Err(cleanup_err.into())
                }
            },
        }
    }
}
