//! Post/keyword repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist posts against existing authors.
//! - Own the `post_keywords` association table (many-to-many).
//!
//! # Invariants
//! - Keywords are shared: attaching an existing keyword reuses its row.
//! - Attaching the same keyword to a post twice is a no-op.

use super::{count_rows, row_exists, RepoError, RepoResult};
use crate::model::post::{validate_keyword, BlogPost, Keyword, NewPost, PostId};
use crate::model::user::{User, UserId};
use rusqlite::{params, Connection, Params, Row};

const POST_SELECT_SQL: &str = "SELECT
    posts.id AS post_id,
    posts.headline,
    posts.body,
    posts.date,
    users.id AS author_id,
    users.name AS author_name,
    users.fullname AS author_fullname,
    users.nickname AS author_nickname
FROM posts
LEFT JOIN users ON users.id = posts.user_id";

/// Repository interface for posts and keywords.
pub trait PostRepository {
    /// Inserts a post for an existing author.
    fn add_post(&self, post: &NewPost) -> RepoResult<PostId>;
    fn get_post(&self, id: PostId) -> RepoResult<Option<BlogPost>>;
    fn posts_by_author(&self, author_id: UserId) -> RepoResult<Vec<BlogPost>>;
    fn count_posts(&self) -> RepoResult<u64>;
    /// Links `keyword` to the post, creating the keyword row when missing.
    fn attach_keyword(&self, post_id: PostId, keyword: &str) -> RepoResult<Keyword>;
    /// Removes the link; returns whether a link existed. The keyword row stays.
    fn detach_keyword(&self, post_id: PostId, keyword: &str) -> RepoResult<bool>;
    fn keywords_for(&self, post_id: PostId) -> RepoResult<Vec<Keyword>>;
    fn find_keyword(&self, keyword: &str) -> RepoResult<Option<Keyword>>;
    /// Posts linked to at least one keyword equal to `keyword`.
    fn posts_with_keyword(&self, keyword: &str) -> RepoResult<Vec<BlogPost>>;
}

/// SQLite-backed post repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_posts<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<BlogPost>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(row)?);
        }
        Ok(posts)
    }

    fn ensure_post_exists(&self, post_id: PostId) -> RepoResult<()> {
        if !row_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1);",
            post_id,
        )? {
            return Err(RepoError::not_found("post", post_id));
        }
        Ok(())
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn add_post(&self, post: &NewPost) -> RepoResult<PostId> {
        post.validate()?;
        if !row_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            post.author_id,
        )? {
            return Err(RepoError::not_found("user", post.author_id));
        }

        self.conn.execute(
            "INSERT INTO posts (user_id, headline, body, date) VALUES (?1, ?2, ?3, ?4);",
            params![
                post.author_id,
                post.headline.as_str(),
                post.body.as_deref(),
                post.date,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_post(&self, id: PostId) -> RepoResult<Option<BlogPost>> {
        let posts = self.query_posts(&format!("{POST_SELECT_SQL} WHERE posts.id = ?1;"), [id])?;
        Ok(posts.into_iter().next())
    }

    fn posts_by_author(&self, author_id: UserId) -> RepoResult<Vec<BlogPost>> {
        self.query_posts(
            &format!("{POST_SELECT_SQL} WHERE posts.user_id = ?1 ORDER BY posts.id ASC;"),
            [author_id],
        )
    }

    fn count_posts(&self) -> RepoResult<u64> {
        count_rows(self.conn, "SELECT COUNT(*) FROM posts;", "posts")
    }

    fn attach_keyword(&self, post_id: PostId, keyword: &str) -> RepoResult<Keyword> {
        validate_keyword(keyword)?;
        self.ensure_post_exists(post_id)?;

        self.conn.execute(
            "INSERT OR IGNORE INTO keywords (keyword) VALUES (?1);",
            [keyword],
        )?;
        let stored = self
            .find_keyword(keyword)?
            .ok_or_else(|| RepoError::InvalidData(format!("keyword `{keyword}` vanished")))?;
        self.conn.execute(
            "INSERT OR IGNORE INTO post_keywords (post_id, keyword_id) VALUES (?1, ?2);",
            params![post_id, stored.id],
        )?;
        Ok(stored)
    }

    fn detach_keyword(&self, post_id: PostId, keyword: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM post_keywords
             WHERE post_id = ?1
               AND keyword_id IN (SELECT id FROM keywords WHERE keyword = ?2);",
            params![post_id, keyword],
        )?;
        Ok(changed > 0)
    }

    fn keywords_for(&self, post_id: PostId) -> RepoResult<Vec<Keyword>> {
        let mut stmt = self.conn.prepare(
            "SELECT keywords.id, keywords.keyword
             FROM keywords
             INNER JOIN post_keywords ON post_keywords.keyword_id = keywords.id
             WHERE post_keywords.post_id = ?1
             ORDER BY keywords.keyword ASC;",
        )?;
        let mut rows = stmt.query([post_id])?;
        let mut keywords = Vec::new();
        while let Some(row) = rows.next()? {
            keywords.push(Keyword {
                id: row.get(0)?,
                keyword: row.get(1)?,
            });
        }
        Ok(keywords)
    }

    fn find_keyword(&self, keyword: &str) -> RepoResult<Option<Keyword>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, keyword FROM keywords WHERE keyword = ?1;")?;
        let mut rows = stmt.query([keyword])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(Keyword {
                id: row.get(0)?,
                keyword: row.get(1)?,
            }));
        }
        Ok(None)
    }

    fn posts_with_keyword(&self, keyword: &str) -> RepoResult<Vec<BlogPost>> {
        self.query_posts(
            &format!(
                "{POST_SELECT_SQL}
                 WHERE EXISTS (
                    SELECT 1
                    FROM post_keywords
                    INNER JOIN keywords ON keywords.id = post_keywords.keyword_id
                    WHERE post_keywords.post_id = posts.id
                      AND keywords.keyword = ?1
                 )
                 ORDER BY posts.id ASC;"
            ),
            [keyword],
        )
    }
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<BlogPost> {
    let author = match row.get::<_, Option<UserId>>("author_id")? {
        Some(id) => Some(User {
            id,
            name: row.get("author_name")?,
            fullname: row.get("author_fullname")?,
            nickname: row.get("author_nickname")?,
        }),
        None => None,
    };

    Ok(BlogPost {
        id: row.get("post_id")?,
        headline: row.get("headline")?,
        body: row.get("body")?,
        date: row.get("date")?,
        author,
    })
}
