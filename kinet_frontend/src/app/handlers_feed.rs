use log::{debug, error, info, warn};

use crate::api::SocialApi;
use crate::error::ApiError;
use crate::feed::{Applied, FeedTicket, LikeToggle};
use crate::models::{Post, User};

use super::KinetApp;

impl<A: SocialApi> KinetApp<A> {
    pub(super) fn handle_current_user_loaded(&mut self, result: Result<User, ApiError>) {
        self.current_user_loading = false;
        match result {
            Ok(user) => {
                info!("signed in as {} ({})", user.username, user.id);
                self.session.set_user(Some(user));
            }
            Err(err) => {
                error!("failed to fetch current user: {err}");
                self.info_banner = Some("Failed to fetch user information.".into());
            }
        }
    }

    pub(super) fn handle_feed_loaded(
        &mut self,
        ticket: FeedTicket,
        result: Result<Vec<Post>, ApiError>,
    ) {
        let Some(store) = self.store_mut(&ticket.kind) else {
            debug!("{} feed closed before page {} arrived", ticket.kind, ticket.page);
            return;
        };
        match store.apply_page(&ticket, result) {
            Ok(Applied::Stale) => {}
            Ok(Applied::Replaced { total }) => {
                debug!("{} feed reset with {total} posts", ticket.kind);
                self.sync_comment_views(&ticket.kind);
            }
            Ok(Applied::Appended { added, updated }) => {
                debug!(
                    "{} page {}: {added} new, {updated} updated",
                    ticket.kind, ticket.page
                );
                self.sync_comment_views(&ticket.kind);
            }
            Err(err) => {
                warn!("failed to load {} page {}: {err}", ticket.kind, ticket.page);
            }
        }
    }

    pub(super) fn handle_post_created(&mut self, result: Result<Post, ApiError>) {
        self.create_post.submitting = false;
        match result {
            Ok(post) => {
                info!("created post {}", post.id);
                self.create_post.content.clear();
                self.create_post.error = None;
                if let Some(profile) = self
                    .profile
                    .as_mut()
                    .filter(|p| p.user_id == post.author.id)
                {
                    profile.posts.prepend(post.clone());
                }
                self.my_posts.prepend(post.clone());
                self.feed.prepend(post);
            }
            Err(err) => {
                error!("failed to create post: {err}");
                self.create_post.error = Some(err.user_message());
            }
        }
    }

    pub(super) fn handle_like_toggled(&mut self, toggle: LikeToggle, result: Result<(), ApiError>) {
        let succeeded = result.is_ok();
        match self.store_mut(&toggle.kind) {
            Some(store) => store.finish_like_toggle(&toggle, succeeded),
            None => debug!(
                "{} feed closed before like on post {} settled",
                toggle.kind, toggle.post_id
            ),
        }
        match result {
            Ok(()) => {
                self.refresh(&toggle.kind);
            }
            Err(err) => {
                error!("failed to update like on post {}: {err}", toggle.post_id);
                self.info_banner = Some("Failed to update like.".into());
            }
        }
    }
}
