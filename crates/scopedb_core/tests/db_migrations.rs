use rusqlite::Connection;
use scopedb_core::db::migrations::{current_user_version, latest_version};
use scopedb_core::db::{bootstrap, open_connection};
use scopedb_core::{DbError, Engine, StoreConfig, StoreLocation};

#[test]
fn engine_bootstrap_applies_all_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blog.db");
    let _engine = Engine::connect(path.to_str().unwrap()).unwrap();

    let conn = Connection::open(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    for table in ["users", "addresses", "posts", "keywords", "post_keywords"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn connecting_to_same_file_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("blog.db");
    let location = location.to_str().unwrap();

    drop(Engine::connect(location).unwrap());
    let engine = Engine::connect(location).unwrap();

    let version = engine
        .with_scope(|session| current_user_version(session.connection()?))
        .unwrap();
    assert_eq!(version, latest_version());
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = Engine::connect(path.to_str().unwrap())
        .err()
        .expect("newer schema must be rejected");
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn session_connections_enforce_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fk.db");
    let config = StoreConfig::new(StoreLocation::File(path.clone()));
    drop(bootstrap(&path, &config).unwrap());

    let conn = open_connection(&path, &config).unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO addresses (email_address, user_id) VALUES ('a@b.io', 42);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn blank_location_is_a_config_error() {
    assert!(matches!(Engine::connect("  "), Err(DbError::Config(_))));
}

#[test]
fn echo_mode_still_opens_a_working_engine() {
    let engine = Engine::with_config(StoreConfig::default().echo(true)).unwrap();
    assert!(engine.config().echo);
    let version = engine
        .with_scope(|session| current_user_version(session.connection()?))
        .unwrap();
    assert_eq!(version, latest_version());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
