//! Blog use-case service.
//!
//! # Responsibility
//! - Expose user/post use cases without leaking sessions to callers.
//! - Run every use case inside its own `Engine::with_scope` call.
//!
//! # Invariants
//! - A use case either commits all of its writes or none of them.
//! - Repository errors pass through unchanged except unknown author names,
//!   which become `ServiceError::UnknownUser`.

use crate::db::DbError;
use crate::engine::Engine;
use crate::model::post::{BlogPost, Keyword, NewPost};
use crate::model::user::{Address, NewUser, User, UserId};
use crate::repo::post_repo::PostRepository;
use crate::repo::user_repo::{UserQuery, UserRepository};
use crate::repo::RepoError;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for blog use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// No user carries the given name.
    UnknownUser(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUser(name) => write!(f, "unknown user `{name}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownUser(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

/// Request model for publishing a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishPostRequest {
    pub author_name: String,
    pub headline: String,
    pub body: Option<String>,
    pub date: Option<NaiveDate>,
    /// Attached in sorted order; duplicates collapse.
    pub keywords: Vec<String>,
}

/// A published post with its attached keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub post: BlogPost,
    pub keywords: Vec<Keyword>,
}

/// One user with all of its addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub user: User,
    pub addresses: Vec<Address>,
}

/// Use-case service over one engine.
pub struct BlogService<'engine> {
    engine: &'engine Engine,
}

impl<'engine> BlogService<'engine> {
    pub fn new(engine: &'engine Engine) -> Self {
        Self { engine }
    }

    /// Registers one user with its addresses and returns the stored row.
    pub fn register_user(&self, user: &NewUser) -> ServiceResult<User> {
        self.engine.with_scope(|session| {
            let users = session.users()?;
            let id = users.add_user(user)?;
            let stored = users
                .get_user(id)?
                .ok_or_else(|| RepoError::not_found("user", id))?;
            Ok(stored)
        })
    }

    /// Registers several users; one invalid user rejects the whole batch.
    pub fn register_users(&self, users: &[NewUser]) -> ServiceResult<Vec<UserId>> {
        self.engine
            .with_scope(|session| Ok(session.users()?.add_users(users)?))
    }

    /// Deletes the only user named `name` together with its addresses.
    pub fn remove_user_by_name(&self, name: &str) -> ServiceResult<User> {
        self.engine.with_scope(|session| {
            let users = session.users()?;
            let user = find_author(&users, name)?;
            users.delete_user(user.id)?;
            Ok(user)
        })
    }

    /// Publishes a post for the named author and attaches its keywords.
    ///
    /// # Errors
    /// - `UnknownUser` when no user has `author_name`.
    /// - Validation errors for headline or any keyword; nothing is written.
    pub fn publish_post(&self, request: &PublishPostRequest) -> ServiceResult<PublishedPost> {
        self.engine.with_scope(|session| {
            let author = find_author(&session.users()?, &request.author_name)?;
            let posts = session.posts()?;

            let mut new_post = NewPost::new(author.id, request.headline.as_str());
            new_post.body = request.body.clone();
            new_post.date = request.date;
            let post_id = posts.add_post(&new_post)?;

            let unique: BTreeSet<&str> = request.keywords.iter().map(String::as_str).collect();
            let keywords = unique
                .into_iter()
                .map(|keyword| posts.attach_keyword(post_id, keyword))
                .collect::<Result<Vec<_>, _>>()?;

            let post = posts
                .get_post(post_id)?
                .ok_or_else(|| RepoError::not_found("post", post_id))?;
            Ok(PublishedPost { post, keywords })
        })
    }

    /// Lists posts carrying `keyword`.
    pub fn posts_tagged(&self, keyword: &str) -> ServiceResult<Vec<BlogPost>> {
        self.engine
            .with_scope(|session| Ok(session.posts()?.posts_with_keyword(keyword)?))
    }

    /// Lists all users ordered by name, each with its addresses.
    pub fn directory(&self) -> ServiceResult<Vec<DirectoryEntry>> {
        self.engine.with_scope(|session| {
            let users = session.users()?;
            users
                .list_users(&UserQuery::default())?
                .into_iter()
                .map(|user| -> ServiceResult<DirectoryEntry> {
                    let addresses = users.addresses_for(user.id)?;
                    Ok(DirectoryEntry { user, addresses })
                })
                .collect()
        })
    }
}

fn find_author(users: &impl UserRepository, name: &str) -> ServiceResult<User> {
    match users.find_one_by_name(name) {
        Ok(user) => Ok(user),
        Err(RepoError::NotFound { .. }) => Err(ServiceError::UnknownUser(name.to_string())),
        Err(err) => Err(err.into()),
    }
}
