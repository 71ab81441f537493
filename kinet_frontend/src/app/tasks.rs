use std::sync::mpsc::Sender;
use std::thread;

use log::error;

use crate::api::SocialApi;
use crate::feed::{FeedKind, FeedTicket, LikeToggle};
use crate::models::{CommentId, PostId, UserId};

use super::messages::AppMessage;
use super::state::ViewId;

fn deliver(tx: &Sender<AppMessage>, message: AppMessage) {
    if tx.send(message).is_err() {
        // The app was dropped while the request was in flight.
        error!("failed to deliver task result; receiver is gone");
    }
}

pub fn load_current_user<A: SocialApi>(client: A, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = client.current_user();
        deliver(&tx, AppMessage::CurrentUserLoaded(result));
    });
}

pub fn load_feed<A: SocialApi>(client: A, tx: Sender<AppMessage>, ticket: FeedTicket) {
    thread::spawn(move || {
        let result = match &ticket.kind {
            FeedKind::Recent => client.fetch_posts(ticket.page),
            FeedKind::Mine => client.fetch_my_posts(),
            FeedKind::User(user_id) => client.fetch_user_posts(user_id),
        };
        deliver(&tx, AppMessage::FeedLoaded { ticket, result });
    });
}

pub fn create_post<A: SocialApi>(client: A, tx: Sender<AppMessage>, content: String) {
    thread::spawn(move || {
        let result = client.create_post(&content);
        deliver(&tx, AppMessage::PostCreated(result));
    });
}

pub fn toggle_like<A: SocialApi>(client: A, tx: Sender<AppMessage>, toggle: LikeToggle) {
    thread::spawn(move || {
        let result = if toggle.was_liked {
            client.unlike_post(toggle.post_id)
        } else {
            client.like_post(toggle.post_id)
        };
        deliver(&tx, AppMessage::LikeToggled { toggle, result });
    });
}

pub fn add_comment<A: SocialApi>(
    client: A,
    tx: Sender<AppMessage>,
    origin: FeedKind,
    view: Option<ViewId>,
    post_id: PostId,
    content: String,
) {
    thread::spawn(move || {
        let result = client.add_comment(post_id, &content);
        deliver(
            &tx,
            AppMessage::CommentAdded {
                origin,
                view,
                post_id,
                result,
            },
        );
    });
}

pub fn update_comment<A: SocialApi>(
    client: A,
    tx: Sender<AppMessage>,
    view: ViewId,
    comment_id: CommentId,
    content: String,
) {
    thread::spawn(move || {
        let result = client.update_comment(comment_id, &content);
        deliver(
            &tx,
            AppMessage::CommentUpdated {
                view,
                comment_id,
                content,
                result,
            },
        );
    });
}

pub fn load_profile<A: SocialApi>(client: A, tx: Sender<AppMessage>, user_id: UserId) {
    thread::spawn(move || {
        let result = client.fetch_user(&user_id);
        deliver(&tx, AppMessage::ProfileLoaded { user_id, result });
    });
}

pub fn load_followers<A: SocialApi>(client: A, tx: Sender<AppMessage>, user_id: UserId) {
    thread::spawn(move || {
        let result = client.followers(&user_id);
        deliver(&tx, AppMessage::FollowersLoaded { user_id, result });
    });
}

pub fn load_following<A: SocialApi>(client: A, tx: Sender<AppMessage>, user_id: UserId) {
    thread::spawn(move || {
        let result = client.following(&user_id);
        deliver(&tx, AppMessage::FollowingLoaded { user_id, result });
    });
}

pub fn change_follow<A: SocialApi>(
    client: A,
    tx: Sender<AppMessage>,
    user_id: UserId,
    follower_id: UserId,
    follow: bool,
) {
    thread::spawn(move || {
        let result = if follow {
            client.follow(&user_id, &follower_id)
        } else {
            client.unfollow(&user_id, &follower_id)
        };
        deliver(
            &tx,
            AppMessage::FollowChanged {
                user_id,
                follow,
                result,
            },
        );
    });
}

pub fn search_users<A: SocialApi>(client: A, tx: Sender<AppMessage>, query: String) {
    thread::spawn(move || {
        let result = client.search_users(&query);
        deliver(&tx, AppMessage::SearchCompleted { query, result });
    });
}
