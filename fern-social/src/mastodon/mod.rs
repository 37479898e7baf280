//! Mastodon API integration surface exposed to the UI layer.
//!
//! Submodules provide the REST client over `fern-http`, strongly typed
//! response models with pagination helpers, and the feed pipeline that
//! correlates and normalises remote collections.
pub mod client;
pub mod feed;
pub mod types;

pub use client::MastodonApi;
pub use feed::{
    AccountCategory, FeedClient, FeedError, FeedItem, FeedItemKind, FeedSource, Provenance,
    StatusCategory, UserProfile,
};
pub use types::{
    Account, Conversation, List, Notification, Page, Pagination, Relationship, Status, StatusEdit,
    Tag, ThreadContext,
};
