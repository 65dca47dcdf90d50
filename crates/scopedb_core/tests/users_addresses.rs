use scopedb_core::{
    Engine, ModelValidationError, NewUser, RepoError, RepoResult, UserQuery, UserRepository,
};

fn seeded_engine() -> Engine {
    let engine = Engine::connect(":memory:").unwrap();
    engine
        .with_scope(|session| -> RepoResult<()> {
            let users = session.users()?;
            users.add_user(
                &NewUser::new("ed")
                    .fullname("Ed Jones")
                    .nickname("edsnickname"),
            )?;
            users.add_user(
                &NewUser::new("jack")
                    .fullname("Jack Bean")
                    .nickname("Jake")
                    .address("jack@google.com")
                    .address("j25@yahoo.com"),
            )?;
            users.add_users(&[
                NewUser::new("wendy")
                    .fullname("Wendy Williams")
                    .nickname("windy"),
                NewUser::new("mary").fullname("Mary Contrary").nickname("mary"),
                NewUser::new("fred")
                    .fullname("Fred Flintstone")
                    .nickname("freddy"),
            ])?;
            Ok(())
        })
        .unwrap();
    engine
}

#[test]
fn users_are_listed_in_name_order() {
    let engine = seeded_engine();

    let names: Vec<String> = engine
        .with_scope(|session| session.users()?.list_users(&UserQuery::default()))
        .unwrap()
        .into_iter()
        .map(|user| user.name)
        .collect();

    assert_eq!(names, vec!["ed", "fred", "jack", "mary", "wendy"]);
}

#[test]
fn list_supports_name_filter_and_pagination() {
    let engine = seeded_engine();

    engine
        .with_scope(|session| -> RepoResult<()> {
            let users = session.users()?;

            let eds = users.list_users(&UserQuery::by_name("ed"))?;
            assert_eq!(eds.len(), 1);
            assert_eq!(
                eds[0].to_string(),
                "<User(name='ed', fullname='Ed Jones', nickname='edsnickname')>"
            );

            let page = users.list_users(&UserQuery {
                limit: Some(2),
                offset: 1,
                ..UserQuery::default()
            })?;
            let names: Vec<_> = page.iter().map(|user| user.name.as_str()).collect();
            assert_eq!(names, vec!["fred", "jack"]);

            let tail = users.list_users(&UserQuery {
                offset: 3,
                ..UserQuery::default()
            })?;
            assert_eq!(tail.len(), 2);
            Ok(())
        })
        .unwrap();
}

#[test]
fn deleting_a_user_cascades_to_addresses() {
    let engine = seeded_engine();

    engine
        .with_scope(|session| -> RepoResult<()> {
            let users = session.users()?;
            let jack = users.find_one_by_name("jack")?;
            assert_eq!(users.addresses_for(jack.id)?.len(), 2);

            users.delete_user(jack.id)?;
            assert!(users.get_user(jack.id)?.is_none());
            assert!(users.addresses_for(jack.id)?.is_empty());
            assert_eq!(users.count_users()?, 4);
            Ok(())
        })
        .unwrap();

    let remaining_addresses: i64 = engine
        .with_scope(|session| -> RepoResult<i64> {
            Ok(session
                .connection()?
                .query_row("SELECT COUNT(*) FROM addresses;", [], |row| row.get(0))?)
        })
        .unwrap();
    assert_eq!(remaining_addresses, 0);
}

#[test]
fn delete_missing_user_returns_not_found() {
    let engine = seeded_engine();

    let result = engine.with_scope(|session| session.users()?.delete_user(9_999));
    assert!(matches!(
        result,
        Err(RepoError::NotFound { entity: "user", .. })
    ));
}

#[test]
fn one_first_and_one_or_none_follow_row_counts() {
    let engine = seeded_engine();

    engine
        .with_scope(|session| -> RepoResult<()> {
            let users = session.users()?;
            users.add_user(&NewUser::new("ed").fullname("Ed Other"))?;

            assert!(matches!(
                users.find_one_by_name("ed"),
                Err(RepoError::MultipleResults { entity: "user", .. })
            ));
            let first = users.find_first_by_name("ed")?.unwrap();
            assert_eq!(first.fullname.as_deref(), Some("Ed Jones"));

            assert!(matches!(
                users.find_one_by_name("nobody"),
                Err(RepoError::NotFound { .. })
            ));
            assert!(users.find_one_or_none_by_name("nobody")?.is_none());
            assert_eq!(users.find_one_by_name("mary")?.name, "mary");
            Ok(())
        })
        .unwrap();
}

#[test]
fn explicit_and_relationship_joins_find_address_owner() {
    let engine = seeded_engine();

    engine
        .with_scope(|session| -> RepoResult<()> {
            let users = session.users()?;

            let pairs = users.users_with_address("jack@google.com")?;
            assert_eq!(pairs.len(), 1);
            assert_eq!(pairs[0].0.name, "jack");
            assert_eq!(
                pairs[0].1.to_string(),
                "<Address(email_address='jack@google.com')>"
            );

            let joined = users.users_joined_on_address("jack@google.com")?;
            assert_eq!(joined, vec![pairs[0].0.clone()]);

            assert!(users.users_joined_on_address("nobody@example.com")?.is_empty());
            Ok(())
        })
        .unwrap();
}

#[test]
fn aliased_join_requires_both_addresses() {
    let engine = seeded_engine();

    engine
        .with_scope(|session| -> RepoResult<()> {
            let users = session.users()?;

            let rows = users.users_with_both_addresses("jack@google.com", "j25@yahoo.com")?;
            assert_eq!(
                rows,
                vec![(
                    "jack".to_string(),
                    "jack@google.com".to_string(),
                    "j25@yahoo.com".to_string()
                )]
            );

            assert!(users
                .users_with_both_addresses("jack@google.com", "other@yahoo.com")?
                .is_empty());
            Ok(())
        })
        .unwrap();
}

#[test]
fn add_address_validates_email_and_owner() {
    let engine = seeded_engine();

    engine
        .with_scope(|session| -> RepoResult<()> {
            let users = session.users()?;
            let ed = users.find_one_by_name("ed")?;

            let id = users.add_address(ed.id, "ed@example.com")?;
            let stored = users.addresses_for(ed.id)?;
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].id, id);
            assert_eq!(stored[0].user_id, Some(ed.id));

            assert!(matches!(
                users.add_address(ed.id, "not-an-email"),
                Err(RepoError::Validation(ModelValidationError::InvalidEmail(_)))
            ));
            assert!(matches!(
                users.add_address(9_999, "ghost@example.com"),
                Err(RepoError::NotFound { entity: "user", .. })
            ));
            Ok(())
        })
        .unwrap();
}

#[test]
fn invalid_address_in_batch_rolls_back_every_user() {
    let engine = Engine::connect(":memory:").unwrap();

    let result = engine.with_scope(|session| {
        session.users()?.add_users(&[
            NewUser::new("ok").address("ok@example.com"),
            NewUser::new("broken").address("   "),
        ])
    });

    assert!(matches!(
        result,
        Err(RepoError::Validation(ModelValidationError::EmptyField(
            "addresses.email_address"
        )))
    ));
    let count = engine
        .with_scope(|session| session.users()?.count_users())
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn user_serialization_uses_column_names() {
    let engine = seeded_engine();
    let wendy = engine
        .with_scope(|session| session.users()?.find_one_by_name("wendy"))
        .unwrap();

    let json = serde_json::to_value(&wendy).unwrap();
    assert_eq!(json["name"], "wendy");
    assert_eq!(json["fullname"], "Wendy Williams");
    assert_eq!(json["nickname"], "windy");
    assert_eq!(json["id"], wendy.id);
}
