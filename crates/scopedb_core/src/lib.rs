//! Transactional scopes over an example SQLite blog schema.
//!
//! An [`Engine`] owns the store configuration; [`Engine::with_scope`] runs a
//! closure inside one unit-of-work [`Session`], committing on `Ok`, rolling
//! back on `Err` or panic, and closing the session on every path.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use config::{ConfigError, StoreConfig, StoreLocation, MEMORY_LOCATION};
pub use db::{DbError, DbResult};
pub use engine::{Engine, SessionStats};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingConfig,
    LoggingError,
};
pub use model::post::{BlogPost, Keyword, KeywordId, NewPost, PostId};
pub use model::user::{Address, AddressId, NewUser, User, UserId};
pub use model::ModelValidationError;
pub use repo::post_repo::{PostRepository, SqlitePostRepository};
pub use repo::user_repo::{SqliteUserRepository, UserQuery, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::blog_service::{
    BlogService, DirectoryEntry, PublishPostRequest, PublishedPost, ServiceError, ServiceResult,
};
pub use session::{Session, SessionState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
