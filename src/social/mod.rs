//! Users, follows, posts and reactions, and the feeds built from them.

pub mod content;
pub mod emoji;
pub mod error;
pub mod feed;
pub mod graph;
pub mod identity;
pub mod reactions;

pub use emoji::Emoji;
pub use error::{ServiceError, ServiceResult};
