//! Sample session walkthrough.
//!
//! Everything runs in a single scope for brevity; real callers should keep
//! each scope as short as the unit of work it covers.

use scopedb_core::{
    Engine, NewPost, NewUser, PostRepository, RepoResult, User, UserQuery, UserRepository,
};

pub fn run(engine: &Engine) -> RepoResult<()> {
    engine.with_scope(|session| {
        let users = session.users()?;
        let posts = session.posts()?;

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

        let fred = users.find_one_by_name("fred")?;
        users.delete_user(fred.id)?;

        let everyone = users.list_users(&UserQuery::default())?;
        for user in &everyone {
            println!("{} {}", user.name, fullname_or_none(user));
        }
        for user in &everyone {
            println!("{} {}", fullname_or_none(user), user.name);
        }

        println!("filter_by()");
        print_list(&users.list_users(&UserQuery::by_name("ed"))?);

        println!("JOIN");
        for (user, address) in users.users_with_address("jack@google.com")? {
            println!("{user}");
            println!("{address}");
        }
        print_list(&users.users_joined_on_address("jack@google.com")?);

        for (name, first, second) in
            users.users_with_both_addresses("jack@google.com", "j25@yahoo.com")?
        {
            println!("{name} {first} {second}");
        }

        let wendy = users.find_one_by_name("wendy")?;
        let post_id = posts.add_post(
            &NewPost::new(wendy.id, "Wendy's Blog Post").body("This is a test"),
        )?;
        posts.attach_keyword(post_id, "wendy")?;
        posts.attach_keyword(post_id, "firstpost")?;

        print_list(&posts.posts_with_keyword("firstpost")?);
        println!("{}", posts.count_posts()?);
        Ok(())
    })
}

fn fullname_or_none(user: &User) -> &str {
    user.fullname.as_deref().unwrap_or("None")
}

fn print_list<T: std::fmt::Display>(items: &[T]) {
    let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
    println!("[{}]", rendered.join(", "));
}

#[cfg(test)]
mod tests {
    use super::{fullname_or_none, run};
    use scopedb_core::{Engine, User};

    #[test]
    fn walkthrough_runs_against_a_fresh_memory_store() {
        let engine = Engine::connect(":memory:").unwrap();
        run(&engine).unwrap();
        assert_eq!(engine.open_sessions(), 0);
    }

    #[test]
    fn missing_fullname_prints_as_none() {
        let user = User {
            id: 1,
            name: "ed".to_string(),
            fullname: None,
            nickname: None,
        };
        assert_eq!(fullname_or_none(&user), "None");
    }
}
