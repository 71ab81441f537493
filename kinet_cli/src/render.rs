use kinet_frontend::models::{Comment, Post, User};
use kinet_frontend::{ApiClient, Session};

pub fn user_line(user: &User) -> String {
    format!("[{}] {}", user.id, user.display_name())
}

pub fn profile(user: &User, api: &ApiClient, followers: usize) -> String {
    let mut out = user_line(user);
    out.push_str(&format!("\n  followers: {followers}"));
    if let Some(picture) = &user.profile_picture {
        out.push_str(&format!("\n  picture: {}", api.asset_url(picture)));
    }
    out
}

pub fn post(post: &Post, session: &Session) -> String {
    let author = session.display_author(&post.author);
    let liked = session
        .user_id()
        .is_some_and(|me| post.liked_by(me));
    let mut out = format!(
        "#{} {}  ({} like{}{}, {} comment{})",
        post.id,
        author.display_name(),
        post.like_count(),
        plural(post.like_count()),
        if liked { ", including you" } else { "" },
        post.comments.len(),
        plural(post.comments.len()),
    );
    for line in post.content.lines() {
        out.push_str("\n    ");
        out.push_str(line);
    }
    out
}

pub fn posts(posts: &[Post], session: &Session) -> String {
    if posts.is_empty() {
        return "No posts yet.".to_string();
    }
    posts
        .iter()
        .map(|p| post(p, session))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn comments(comments: &[Comment], session: &Session) -> String {
    if comments.is_empty() {
        return "No comments yet.".to_string();
    }
    comments
        .iter()
        .map(|c| {
            let who = c
                .author
                .as_ref()
                .map(|a| session.display_author(a).display_name())
                .unwrap_or_else(|| "unknown".to_string());
            format!("  ({}) {who}: {}", c.id, c.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn users(users: &[User]) -> String {
    if users.is_empty() {
        return "Nobody here.".to_string();
    }
    users.iter().map(user_line).collect::<Vec<_>>().join("\n")
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
