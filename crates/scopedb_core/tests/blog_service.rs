use scopedb_core::{
    BlogService, Engine, NewUser, PostRepository, PublishPostRequest, RepoError, ServiceError,
};

fn request(author: &str, keywords: &[&str]) -> PublishPostRequest {
    PublishPostRequest {
        author_name: author.to_string(),
        headline: "Wendy's Blog Post".to_string(),
        body: Some("This is a test".to_string()),
        date: None,
        keywords: keywords.iter().map(|value| value.to_string()).collect(),
    }
}

#[test]
fn register_and_list_directory() {
    let engine = Engine::connect(":memory:").unwrap();
    let service = BlogService::new(&engine);

    let jack = service
        .register_user(&NewUser::new("jack").address("jack@google.com"))
        .unwrap();
    service
        .register_users(&[NewUser::new("ed"), NewUser::new("wendy")])
        .unwrap();

    let directory = service.directory().unwrap();
    let names: Vec<_> = directory
        .iter()
        .map(|entry| entry.user.name.as_str())
        .collect();
    assert_eq!(names, vec!["ed", "jack", "wendy"]);

    let jack_entry = directory
        .iter()
        .find(|entry| entry.user.id == jack.id)
        .unwrap();
    assert_eq!(jack_entry.addresses.len(), 1);
    assert_eq!(engine.open_sessions(), 0);
}

#[test]
fn publish_post_attaches_deduplicated_keywords() {
    let engine = Engine::connect(":memory:").unwrap();
    let service = BlogService::new(&engine);
    service.register_user(&NewUser::new("wendy")).unwrap();

    let published = service
        .publish_post(&request("wendy", &["wendy", "firstpost", "wendy"]))
        .unwrap();

    let keywords: Vec<_> = published
        .keywords
        .iter()
        .map(|keyword| keyword.keyword.as_str())
        .collect();
    assert_eq!(keywords, vec!["firstpost", "wendy"]);
    assert_eq!(
        published.post.author.as_ref().map(|user| user.name.as_str()),
        Some("wendy")
    );

    let tagged = service.posts_tagged("firstpost").unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, published.post.id);
}

#[test]
fn publish_for_unknown_author_is_reported() {
    let engine = Engine::connect(":memory:").unwrap();
    let service = BlogService::new(&engine);

    let err = service.publish_post(&request("ghost", &[])).unwrap_err();
    assert!(matches!(err, ServiceError::UnknownUser(name) if name == "ghost"));
}

#[test]
fn failed_publish_leaves_no_post_behind() {
    let engine = Engine::connect(":memory:").unwrap();
    let service = BlogService::new(&engine);
    service.register_user(&NewUser::new("wendy")).unwrap();

    let err = service
        .publish_post(&request("wendy", &["ok", ""]))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Repo(RepoError::Validation(_))));

    let posts = engine
        .with_scope(|session| session.posts()?.count_posts())
        .unwrap();
    assert_eq!(posts, 0);
}

#[test]
fn remove_user_by_name_deletes_user() {
    let engine = Engine::connect(":memory:").unwrap();
    let service = BlogService::new(&engine);
    service
        .register_users(&[NewUser::new("fred"), NewUser::new("mary")])
        .unwrap();

    let removed = service.remove_user_by_name("fred").unwrap();
    assert_eq!(removed.name, "fred");

    let names: Vec<_> = service
        .directory()
        .unwrap()
        .into_iter()
        .map(|entry| entry.user.name)
        .collect();
    assert_eq!(names, vec!["mary"]);

    assert!(matches!(
        service.remove_user_by_name("fred"),
        Err(ServiceError::UnknownUser(_))
    ));
}

#[test]
fn removing_an_author_keeps_their_posts_without_author() {
    let engine = Engine::connect(":memory:").unwrap();
    let service = BlogService::new(&engine);
    service.register_user(&NewUser::new("wendy")).unwrap();
    let published = service
        .publish_post(&request("wendy", &["firstpost"]))
        .unwrap();

    let removed = service.remove_user_by_name("wendy").unwrap();
    assert_eq!(removed.name, "wendy");

    let post = engine
        .with_scope(|session| session.posts()?.get_post(published.post.id))
        .unwrap()
        .unwrap();
    assert_eq!(post.headline, "Wendy's Blog Post");
    assert_eq!(post.author, None);

    let tagged = service.posts_tagged("firstpost").unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].author, None);
    assert_eq!(engine.open_sessions(), 0);
}
