//! User/address repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist users together with their addresses (cascade save).
//! - Provide name lookups with `all`/`first`/`one`/`one_or_none` semantics.
//! - Provide the join queries over `users` and `addresses`.
//!
//! # Invariants
//! - Deleting a user deletes its addresses (`ON DELETE CASCADE`) and
//!   detaches its posts (`posts.user_id` becomes NULL).
//! - User lists are ordered by `name ASC, id ASC`.

use super::{count_rows, row_exists, RepoError, RepoResult};
use crate::model::user::{validate_email, Address, AddressId, NewUser, User, UserId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    users.id,
    users.name,
    users.fullname,
    users.nickname
FROM users";

/// Query options for listing users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    /// Exact name match (`filter_by(name=...)`).
    pub name: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl UserQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Repository interface for users and their addresses.
pub trait UserRepository {
    /// Inserts one user and all of its addresses.
    fn add_user(&self, user: &NewUser) -> RepoResult<UserId>;
    /// Inserts users in order; ids are returned in input order.
    fn add_users(&self, users: &[NewUser]) -> RepoResult<Vec<UserId>>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Deletes one user; its addresses go with it.
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
    fn list_users(&self, query: &UserQuery) -> RepoResult<Vec<User>>;
    fn count_users(&self) -> RepoResult<u64>;
    /// Returns the only user with `name`; errors on zero or several matches.
    fn find_one_by_name(&self, name: &str) -> RepoResult<User>;
    /// Like `find_one_by_name` but zero matches yields `None`.
    fn find_one_or_none_by_name(&self, name: &str) -> RepoResult<Option<User>>;
    /// Returns the lowest-id user with `name`, if any.
    fn find_first_by_name(&self, name: &str) -> RepoResult<Option<User>>;
    fn add_address(&self, user_id: UserId, email_address: &str) -> RepoResult<AddressId>;
    fn addresses_for(&self, user_id: UserId) -> RepoResult<Vec<Address>>;
    /// Explicit join: every `(user, address)` pair where the address matches.
    fn users_with_address(&self, email_address: &str) -> RepoResult<Vec<(User, Address)>>;
    /// Relationship join: users owning an address equal to `email_address`.
    fn users_joined_on_address(&self, email_address: &str) -> RepoResult<Vec<User>>;
    /// Joins `addresses` twice to find users owning both addresses.
    ///
    /// Returns `(name, first_email, second_email)` triples.
    fn users_with_both_addresses(
        &self,
        first_email: &str,
        second_email: &str,
    ) -> RepoResult<Vec<(String, String, String)>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_users(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn users_named(&self, name: &str, limit: u32) -> RepoResult<Vec<User>> {
        self.query_users(
            &format!("{USER_SELECT_SQL} WHERE users.name = ? ORDER BY users.id ASC LIMIT ?"),
            vec![
                Value::Text(name.to_string()),
                Value::Integer(i64::from(limit)),
            ],
        )
    }

    fn insert_address(&self, user_id: UserId, email_address: &str) -> RepoResult<AddressId> {
        self.conn.execute(
            "INSERT INTO addresses (email_address, user_id) VALUES (?1, ?2);",
            params![email_address, user_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn add_user(&self, user: &NewUser) -> RepoResult<UserId> {
        user.validate()?;

        self.conn.execute(
            "INSERT INTO users (name, fullname, nickname) VALUES (?1, ?2, ?3);",
            params![
                user.name.as_str(),
                user.fullname.as_deref(),
                user.nickname.as_deref(),
            ],
        )?;
        let user_id = self.conn.last_insert_rowid();

        for email in &user.addresses {
            self.insert_address(user_id, email)?;
        }

        Ok(user_id)
    }

    fn add_users(&self, users: &[NewUser]) -> RepoResult<Vec<UserId>> {
        users.iter().map(|user| self.add_user(user)).collect()
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let users = self.query_users(
            &format!("{USER_SELECT_SQL} WHERE users.id = ?"),
            vec![Value::Integer(id)],
        )?;
        Ok(users.into_iter().next())
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        // Posts outlive their author; addresses cascade.
        self.conn
            .execute("UPDATE posts SET user_id = NULL WHERE user_id = ?1;", [id])?;
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn list_users(&self, query: &UserQuery) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = query.name.as_ref() {
            sql.push_str(" AND users.name = ?");
            bind_values.push(Value::Text(name.clone()));
        }

        sql.push_str(" ORDER BY users.name ASC, users.id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        self.query_users(&sql, bind_values)
    }

    fn count_users(&self) -> RepoResult<u64> {
        count_rows(self.conn, "SELECT COUNT(*) FROM users;", "users")
    }

    fn find_one_by_name(&self, name: &str) -> RepoResult<User> {
        self.find_one_or_none_by_name(name)?
            .ok_or_else(|| RepoError::not_found("user", name))
    }

    fn find_one_or_none_by_name(&self, name: &str) -> RepoResult<Option<User>> {
        let mut users = self.users_named(name, 2)?;
        if users.len() > 1 {
            return Err(RepoError::MultipleResults {
                entity: "user",
                key: name.to_string(),
            });
        }
        Ok(users.pop())
    }

    fn find_first_by_name(&self, name: &str) -> RepoResult<Option<User>> {
        Ok(self.users_named(name, 1)?.into_iter().next())
    }

    fn add_address(&self, user_id: UserId, email_address: &str) -> RepoResult<AddressId> {
        validate_email(email_address)?;
        if !row_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            user_id,
        )? {
            return Err(RepoError::not_found("user", user_id));
        }
        self.insert_address(user_id, email_address)
    }

    fn addresses_for(&self, user_id: UserId) -> RepoResult<Vec<Address>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email_address, user_id
             FROM addresses
             WHERE user_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut addresses = Vec::new();
        while let Some(row) = rows.next()? {
            addresses.push(Address {
                id: row.get("id")?,
                email_address: row.get("email_address")?,
                user_id: row.get("user_id")?,
            });
        }
        Ok(addresses)
    }

    fn users_with_address(&self, email_address: &str) -> RepoResult<Vec<(User, Address)>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                users.id,
                users.name,
                users.fullname,
                users.nickname,
                addresses.id AS address_id,
                addresses.email_address
             FROM users, addresses
             WHERE users.id = addresses.user_id
               AND addresses.email_address = ?1
             ORDER BY users.id ASC, addresses.id ASC;",
        )?;
        let mut rows = stmt.query([email_address])?;
        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            let user = parse_user_row(row)?;
            let address = Address {
                id: row.get("address_id")?,
                email_address: row.get("email_address")?,
                user_id: Some(user.id),
            };
            pairs.push((user, address));
        }
        Ok(pairs)
    }

    fn users_joined_on_address(&self, email_address: &str) -> RepoResult<Vec<User>> {
        self.query_users(
            "SELECT DISTINCT
                users.id,
                users.name,
                users.fullname,
                users.nickname
             FROM users
             INNER JOIN addresses ON addresses.user_id = users.id
             WHERE addresses.email_address = ?
             ORDER BY users.id ASC",
            vec![Value::Text(email_address.to_string())],
        )
    }

    fn users_with_both_addresses(
        &self,
        first_email: &str,
        second_email: &str,
    ) -> RepoResult<Vec<(String, String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT users.name, first.email_address, second.email_address
             FROM users
             INNER JOIN addresses AS first ON first.user_id = users.id
             INNER JOIN addresses AS second ON second.user_id = users.id
             WHERE first.email_address = ?1
               AND second.email_address = ?2
             ORDER BY users.id ASC;",
        )?;
        let mut rows = stmt.query(params![first_email, second_email])?;
        let mut triples = Vec::new();
        while let Some(row) = rows.next()? {
            triples.push((row.get(0)?, row.get(1)?, row.get(2)?));
        }
        Ok(triples)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let name: String = row.get("name")?;
    if name.trim().is_empty() {
        return Err(RepoError::InvalidData(
            "empty name in users.name".to_string(),
        ));
    }
    Ok(User {
        id: row.get("id")?,
        name,
        fullname: row.get("fullname")?,
        nickname: row.get("nickname")?,
    })
}
