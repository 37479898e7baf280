use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
}

/// The viewer's relation toward one account. Only ever fetched in batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    #[serde(default)]
    pub following: bool,
    #[serde(default)]
    pub followed_by: bool,
    #[serde(default)]
    pub showing_reblogs: bool,
    #[serde(default)]
    pub notifying: bool,
    #[serde(default)]
    pub blocking: bool,
    #[serde(default)]
    pub blocked_by: bool,
    #[serde(default)]
    pub muting: bool,
    #[serde(default)]
    pub muting_notifications: bool,
    #[serde(default)]
    pub requested: bool,
    #[serde(default)]
    pub domain_blocking: bool,
    #[serde(default)]
    pub endorsed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub url: Option<String>,
    pub account: Account,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub edited_at: Option<String>,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    #[serde(default)]
    pub in_reply_to_account_id: Option<String>,
    #[serde(default)]
    pub reblog: Option<Box<Status>>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub spoiler_text: String,
    #[serde(default)]
    pub reblogs_count: u64,
    #[serde(default)]
    pub favourites_count: u64,
    #[serde(default)]
    pub replies_count: u64,
    #[serde(default)]
    pub favourited: Option<bool>,
    #[serde(default)]
    pub reblogged: Option<bool>,
    #[serde(default)]
    pub bookmarked: Option<bool>,
    #[serde(default)]
    pub pinned: Option<bool>,
    #[serde(default)]
    pub media_attachments: Vec<MediaAttachment>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub tags: Vec<StatusTag>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub id: String,
    #[serde(default)]
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub acct: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusTag {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// One revision from a status' edit history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusEdit {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub spoiler_text: String,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    pub account: Account,
    #[serde(default)]
    pub media_attachments: Vec<MediaAttachment>,
}

/// Ancestors and descendants of a focal status, as returned by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadContext {
    #[serde(default)]
    pub ancestors: Vec<Status>,
    #[serde(default)]
    pub descendants: Vec<Status>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub created_at: Option<String>,
    pub account: Account,
    #[serde(default)]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub following: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub replies_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub unread: bool,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub last_status: Option<Status>,
}

/// Opaque two-sided pagination cursor.
///
/// The ids inside are never interpreted by the feed layer; they come from
/// the server's `Link` response header and go back out as query params on
/// the next call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub max_id: Option<String>,
    pub since_id: Option<String>,
    pub min_id: Option<String>,
    pub limit: Option<u32>,
}

impl Pagination {
    /// Render the cursor as request query params.
    pub fn to_query(&self) -> Vec<(&'static str, Cow<'static, str>)> {
        let mut q: Vec<(&'static str, Cow<'static, str>)> = Vec::new();
        if let Some(v) = &self.max_id {
            q.push(("max_id", Cow::Owned(v.clone())));
        }
        if let Some(v) = &self.since_id {
            q.push(("since_id", Cow::Owned(v.clone())));
        }
        if let Some(v) = &self.min_id {
            q.push(("min_id", Cow::Owned(v.clone())));
        }
        if let Some(limit) = self.limit {
            q.push(("limit", Cow::Owned(limit.to_string())));
        }
        q
    }

    /// Parse a `Link` response header into the cursor for the surrounding
    /// pages: `rel="next"` carries `max_id`, `rel="prev"` carries
    /// `since_id`/`min_id`. Unknown segments are ignored.
    pub fn from_link(raw: &str) -> Self {
        let mut pg = Pagination::default();
        for part in raw.split(',') {
            let mut target: Option<Url> = None;
            let mut rel: Option<&str> = None;
            for seg in part.split(';') {
                let seg = seg.trim();
                if let Some(inner) = seg.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                    target = Url::parse(inner).ok();
                } else if let Some(v) = seg.strip_prefix("rel=") {
                    rel = Some(v.trim_matches('"'));
                }
            }
            let Some(url) = target else { continue };
            match rel {
                Some("next") => {
                    pg.max_id = query_param(&url, "max_id").or(pg.max_id);
                }
                Some("prev") => {
                    pg.since_id = query_param(&url, "since_id").or(pg.since_id);
                    pg.min_id = query_param(&url, "min_id").or(pg.min_id);
                }
                _ => {}
            }
        }
        pg
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.into_owned())
}

/// A fetched collection plus the cursor for the following page.
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Pagination,
}
