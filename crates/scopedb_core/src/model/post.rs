//! Blog posts and keywords (many-to-many through `post_keywords`).
//!
//! # Invariants
//! - `headline` is non-empty and at most 255 characters.
//! - `keyword` is non-empty, at most 50 characters and unique per store.
//! - A post/keyword pair is linked at most once.

use super::user::{User, UserId};
use super::{
    require_max_chars, require_non_empty, ModelValidationError, OptionalText, QuotedText,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type PostId = i64;
pub type KeywordId = i64;

pub const HEADLINE_MAX_CHARS: usize = 255;
pub const KEYWORD_MAX_CHARS: usize = 50;

/// Persisted `posts` row joined with its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: PostId,
    pub headline: String,
    pub body: Option<String>,
    pub date: Option<NaiveDate>,
    /// `None` when the post has no author or the author row is gone.
    pub author: Option<User>,
}

impl Display for BlogPost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlogPost({}, {}, ",
            QuotedText(&self.headline),
            OptionalText(&self.body)
        )?;
        match &self.author {
            Some(author) => write!(f, "{author})"),
            None => f.write_str("None)"),
        }
    }
}

/// Insert input for a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub author_id: UserId,
    pub headline: String,
    pub body: Option<String>,
    pub date: Option<NaiveDate>,
}

impl NewPost {
    pub fn new(author_id: UserId, headline: impl Into<String>) -> Self {
        Self {
            author_id,
            headline: headline.into(),
            body: None,
            date: None,
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("posts.headline", &self.headline)?;
        require_max_chars("posts.headline", &self.headline, HEADLINE_MAX_CHARS)
    }
}

/// Persisted `keywords` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: KeywordId,
    pub keyword: String,
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keyword({})", QuotedText(&self.keyword))
    }
}

/// Checks the `keywords.keyword` contract.
pub fn validate_keyword(value: &str) -> Result<(), ModelValidationError> {
    require_non_empty("keywords.keyword", value)?;
    require_max_chars("keywords.keyword", value, KEYWORD_MAX_CHARS)
}

#[cfg(test)]
mod tests {
    use super::{validate_keyword, BlogPost, NewPost};
    use crate::model::user::User;
    use crate::model::ModelValidationError;

    #[test]
    fn post_display_includes_author() {
        let post = BlogPost {
            id: 1,
            headline: "Wendy's Blog Post".to_string(),
            body: Some("This is a test".to_string()),
            date: None,
            author: Some(User {
                id: 3,
                name: "wendy".to_string(),
                fullname: Some("Wendy Williams".to_string()),
                nickname: Some("windy".to_string()),
            }),
        };
        assert_eq!(
            post.to_string(),
            "BlogPost(\"Wendy's Blog Post\", 'This is a test', \
             <User(name='wendy', fullname='Wendy Williams', nickname='windy')>)"
        );
    }

    #[test]
    fn headline_length_is_bounded() {
        let post = NewPost::new(1, "x".repeat(256));
        assert_eq!(
            post.validate(),
            Err(ModelValidationError::TooLong {
                field: "posts.headline",
                max_chars: 255,
                actual_chars: 256,
            })
        );
        assert!(NewPost::new(1, "x".repeat(255)).validate().is_ok());
    }

    #[test]
    fn keyword_must_be_non_empty_and_short() {
        assert!(validate_keyword("firstpost").is_ok());
        assert!(matches!(
            validate_keyword(""),
            Err(ModelValidationError::EmptyField("keywords.keyword"))
        ));
        assert!(matches!(
            validate_keyword(&"k".repeat(51)),
            Err(ModelValidationError::TooLong { .. })
        ));
    }
}
