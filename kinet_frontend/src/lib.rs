//! Client core for the Kinet social network: typed API access, paginated
//! feeds with optimistic likes, and comment threads that reconcile local
//! edits with the server's copy.

pub mod api;
pub mod app;
pub mod error;
pub mod feed;
pub mod models;
pub mod session;

pub use api::{ApiClient, SocialApi};
pub use app::KinetApp;
pub use error::{ApiError, ApiResult};
pub use session::{Session, TokenStore};
