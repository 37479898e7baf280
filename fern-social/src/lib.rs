//! Mastodon-compatible client plumbing for Fern.
//!
//! The [`mastodon`] module holds the strongly typed wire records, the REST
//! client, and the feed pipeline that turns remote collections into
//! display-ready feed items for the UI layer.
pub mod mastodon;
