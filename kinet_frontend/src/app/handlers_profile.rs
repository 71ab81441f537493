use log::{debug, error, info};

use crate::api::SocialApi;
use crate::error::ApiError;
use crate::models::{User, UserId};

use super::state::ProfileState;
use super::KinetApp;

impl<A: SocialApi> KinetApp<A> {
    fn profile_for(&mut self, user_id: &UserId) -> Option<&mut ProfileState> {
        let profile = self.profile.as_mut().filter(|p| &p.user_id == user_id);
        if profile.is_none() {
            debug!("profile {user_id} closed; dropping result");
        }
        profile
    }

    pub(super) fn handle_profile_loaded(
        &mut self,
        user_id: UserId,
        result: Result<User, ApiError>,
    ) {
        let Some(profile) = self.profile_for(&user_id) else {
            return;
        };
        profile.user_loading = false;
        match result {
            Ok(user) => {
                profile.user = Some(user);
                profile.error = None;
            }
            Err(err) => {
                error!("failed to load profile {user_id}: {err}");
                profile.error = Some(err.user_message());
            }
        }
    }

    pub(super) fn handle_followers_loaded(
        &mut self,
        user_id: UserId,
        result: Result<Vec<User>, ApiError>,
    ) {
        let me = self.session.user_id().cloned();
        let Some(profile) = self.profile_for(&user_id) else {
            return;
        };
        profile.followers_loading = false;
        match result {
            Ok(followers) => {
                profile.is_following = me
                    .as_ref()
                    .is_some_and(|me| followers.iter().any(|u| &u.id == me));
                profile.followers = followers;
            }
            Err(err) => {
                error!("failed to load followers of {user_id}: {err}");
                profile.error = Some(err.user_message());
            }
        }
    }

    pub(super) fn handle_following_loaded(
        &mut self,
        user_id: UserId,
        result: Result<Vec<User>, ApiError>,
    ) {
        let Some(profile) = self.profile_for(&user_id) else {
            return;
        };
        profile.following_loading = false;
        match result {
            Ok(following) => profile.following = following,
            Err(err) => {
                error!("failed to load accounts followed by {user_id}: {err}");
                profile.error = Some(err.user_message());
            }
        }
    }

    /// Follower lists are re-read after every change, including a 409 that
    /// says the relationship already exists.
    pub(super) fn handle_follow_changed(
        &mut self,
        user_id: UserId,
        follow: bool,
        result: Result<(), ApiError>,
    ) {
        let Some(profile) = self.profile_for(&user_id) else {
            return;
        };
        profile.follow_in_flight = false;
        match result {
            Ok(()) => {
                info!("{} {user_id}", if follow { "followed" } else { "unfollowed" });
            }
            Err(err) if follow && err.is_conflict() => {
                self.info_banner = Some("You are already following this user.".into());
            }
            Err(err) => {
                error!("failed to change follow state for {user_id}: {err}");
                let message = match err.status() {
                    Some(422) => "Invalid user information.".to_string(),
                    _ if follow => "Failed to follow user.".to_string(),
                    _ => "Failed to unfollow user.".to_string(),
                };
                profile.error = Some(message.clone());
                self.info_banner = Some(message);
                return;
            }
        }
        self.spawn_load_followers();
    }

    pub(super) fn handle_search_completed(
        &mut self,
        query: String,
        result: Result<Vec<User>, ApiError>,
    ) {
        if query != self.search.query {
            debug!("dropping results for superseded search {query:?}");
            return;
        }
        self.search.is_loading = false;
        match result {
            Ok(users) => {
                self.search.results = users;
                self.search.error = None;
            }
            Err(err) => {
                error!("search for {query:?} failed: {err}");
                self.search.results.clear();
                self.search.error = Some(err.user_message());
            }
        }
    }
}
