//! The feed pipeline: fetch remote collections, correlate accounts with the
//! viewer's relationships, and normalise everything into [`FeedItem`]s.
//!
//! Each operation is one or two sequential round trips against a
//! [`FeedSource`]: the primary fetch, then (for account and notification
//! feeds only) a single batched relationship lookup joined by account id.
//! The pipeline holds no state between calls and never retries; transport
//! failures surface unchanged.

use async_trait::async_trait;
use fern_config::NotificationKind;
use thiserror::Error;

use crate::mastodon::types::{
    Account, Conversation, List, Notification, Page, Pagination, Relationship, Status, StatusEdit,
    Tag, ThreadContext,
};

/// Account searches request at most this many results.
const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Http(#[from] fern_http::HttpError),
    /// Failure reported by a non-HTTP source (in-memory, test doubles).
    #[error("{0}")]
    Remote(String),
}

/// Which status collection to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCategory {
    Home,
    Federated,
    Local,
    Favourites,
    Bookmarks,
    /// Statuses authored by one account.
    Account(String),
    /// Statuses the account has pinned to its profile.
    Pinned(String),
}

/// Which account collection to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCategory {
    BoostedBy(String),
    FavouritedBy(String),
    Followers(String),
    Following(String),
    Blocked,
    Muted,
    FollowRequests,
}

/// Typed fetch operations against the remote service. Implemented by
/// [`MastodonApi`](crate::mastodon::client::MastodonApi) for real servers
/// and by in-memory sources in tests.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn statuses(
        &self,
        category: StatusCategory,
        page: &Pagination,
    ) -> Result<Page<Status>, FeedError>;

    async fn accounts(
        &self,
        category: AccountCategory,
        page: &Pagination,
    ) -> Result<Page<Account>, FeedError>;

    /// Batched lookup of the viewer's relation to each given account id.
    async fn relationships(&self, ids: &[String]) -> Result<Vec<Relationship>, FeedError>;

    async fn notifications(
        &self,
        exclude_kinds: &[String],
        page: &Pagination,
    ) -> Result<Page<Notification>, FeedError>;

    async fn followed_tags(&self, page: &Pagination) -> Result<Page<Tag>, FeedError>;

    async fn lists(&self) -> Result<Vec<List>, FeedError>;

    async fn status_history(&self, status_id: &str) -> Result<Vec<StatusEdit>, FeedError>;

    async fn status_context(&self, status_id: &str) -> Result<ThreadContext, FeedError>;

    async fn conversations(&self, page: &Pagination) -> Result<Page<Conversation>, FeedError>;

    async fn list_timeline(
        &self,
        list_id: &str,
        page: &Pagination,
    ) -> Result<Page<Status>, FeedError>;

    async fn list_members(&self, list_id: &str) -> Result<Vec<Account>, FeedError>;

    async fn hashtag_timeline(
        &self,
        tag: &str,
        local_only: bool,
        any_tags: &[String],
        page: &Pagination,
    ) -> Result<Page<Status>, FeedError>;

    async fn search_accounts(
        &self,
        query: &str,
        limit: u32,
        exact: bool,
    ) -> Result<Vec<Account>, FeedError>;
}

/// Why an account showed up in a feed.
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    Home,
    Public,
    /// The account appeared through membership of this list.
    List(List),
}

/// An account joined with the viewer's relationship record.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub account: Account,
    pub relation: Relationship,
    pub context: Option<Provenance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedItemKind {
    Status,
    StatusHistory,
    User,
    Notification,
    Tag,
    List,
}

/// One display-ready entry in a feed.
#[derive(Debug, Clone)]
pub enum FeedItem {
    Status { status: Status, pinned: bool },
    StatusHistory(StatusEdit),
    User(UserProfile),
    Notification { notification: Notification, author: UserProfile },
    Tag(Tag),
    List(List),
}

impl FeedItem {
    pub fn kind(&self) -> FeedItemKind {
        match self {
            FeedItem::Status { .. } => FeedItemKind::Status,
            FeedItem::StatusHistory(_) => FeedItemKind::StatusHistory,
            FeedItem::User(_) => FeedItemKind::User,
            FeedItem::Notification { .. } => FeedItemKind::Notification,
            FeedItem::Tag(_) => FeedItemKind::Tag,
            FeedItem::List(_) => FeedItemKind::List,
        }
    }

    /// True only for statuses fetched from a profile's pinned collection.
    pub fn pinned(&self) -> bool {
        matches!(self, FeedItem::Status { pinned: true, .. })
    }
}

fn statuses_to_items(statuses: Vec<Status>, pinned: bool) -> Vec<FeedItem> {
    statuses
        .into_iter()
        .map(|status| FeedItem::Status { status, pinned })
        .collect()
}

/// Feed pipeline over a [`FeedSource`]. One method per feed kind; paginated
/// operations hand the source's next-page cursor back unchanged.
pub struct FeedClient<S> {
    source: S,
}

impl<S: FeedSource> FeedClient<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    async fn status_feed(
        &self,
        category: StatusCategory,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        let fetched = self.source.statuses(category, page).await?;
        Ok(Page {
            items: statuses_to_items(fetched.items, false),
            next: fetched.next,
        })
    }

    async fn account_feed(
        &self,
        category: AccountCategory,
        page: &Pagination,
        context: Option<Provenance>,
    ) -> Result<Page<FeedItem>, FeedError> {
        let fetched = self.source.accounts(category, page).await?;
        let items = self.correlate(fetched.items, context).await?;
        Ok(Page {
            items,
            next: fetched.next,
        })
    }

    /// Join accounts with the viewer's relationship records.
    ///
    /// One batched lookup covers every account; matches are found by id, so
    /// the response may be unordered or partial. Accounts with no matching
    /// record are dropped. Input order is preserved.
    async fn correlate(
        &self,
        accounts: Vec<Account>,
        context: Option<Provenance>,
    ) -> Result<Vec<FeedItem>, FeedError> {
        if accounts.is_empty() {
            // Some servers reject an empty id[] batch; skip the round trip.
            return Ok(Vec::new());
        }

        let ids: Vec<String> = accounts.iter().map(|a| a.id.clone()).collect();
        let relations = self.source.relationships(&ids).await?;

        let mut items = Vec::with_capacity(accounts.len());
        for account in accounts {
            match relations.iter().find(|r| r.id == account.id) {
                Some(relation) => items.push(FeedItem::User(UserProfile {
                    account,
                    relation: relation.clone(),
                    context: context.clone(),
                })),
                None => tracing::debug!(
                    account_id = %account.id,
                    "relationship batch had no entry for account, dropping"
                ),
            }
        }
        Ok(items)
    }

    pub async fn home_timeline(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        self.status_feed(StatusCategory::Home, page).await
    }

    pub async fn federated_timeline(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        self.status_feed(StatusCategory::Federated, page).await
    }

    pub async fn local_timeline(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        self.status_feed(StatusCategory::Local, page).await
    }

    pub async fn favourites(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        self.status_feed(StatusCategory::Favourites, page).await
    }

    pub async fn bookmarks(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        self.status_feed(StatusCategory::Bookmarks, page).await
    }

    /// Statuses authored by one account.
    pub async fn account_statuses(
        &self,
        account_id: &str,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        self.status_feed(StatusCategory::Account(account_id.to_string()), page)
            .await
    }

    /// Statuses the account pinned to its profile. The only operation that
    /// marks items pinned.
    pub async fn pinned_statuses(&self, account_id: &str) -> Result<Vec<FeedItem>, FeedError> {
        let fetched = self
            .source
            .statuses(
                StatusCategory::Pinned(account_id.to_string()),
                &Pagination::default(),
            )
            .await?;
        Ok(statuses_to_items(fetched.items, true))
    }

    /// Notifications joined with the viewer's relation to each author. A
    /// notification whose author has no relationship record is dropped.
    pub async fn notifications(
        &self,
        hide: &[NotificationKind],
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        let exclude: Vec<String> = hide.iter().map(|k| k.as_str().to_string()).collect();
        let fetched = self.source.notifications(&exclude, page).await?;
        if fetched.items.is_empty() {
            return Ok(Page {
                items: Vec::new(),
                next: fetched.next,
            });
        }

        let ids: Vec<String> = fetched.items.iter().map(|n| n.account.id.clone()).collect();
        let relations = self.source.relationships(&ids).await?;

        let mut items = Vec::with_capacity(fetched.items.len());
        for notification in fetched.items {
            match relations.iter().find(|r| r.id == notification.account.id) {
                Some(relation) => {
                    let author = UserProfile {
                        account: notification.account.clone(),
                        relation: relation.clone(),
                        context: None,
                    };
                    items.push(FeedItem::Notification {
                        notification,
                        author,
                    });
                }
                None => tracing::debug!(
                    notification_id = %notification.id,
                    "relationship batch had no entry for author, dropping notification"
                ),
            }
        }
        Ok(Page {
            items,
            next: fetched.next,
        })
    }

    /// Direct-message conversations, represented by their last status.
    pub async fn conversations(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        let fetched = self.source.conversations(page).await?;
        let items = fetched
            .items
            .into_iter()
            .filter_map(|c| c.last_status)
            .map(|status| FeedItem::Status {
                status,
                pinned: false,
            })
            .collect();
        Ok(Page {
            items,
            next: fetched.next,
        })
    }

    /// Search for accounts. A query shaped like `@user@domain` first tries
    /// exact resolution; on error or an empty result it falls back to a
    /// fuzzy search on the same string.
    pub async fn search_users(&self, query: &str) -> Result<Vec<FeedItem>, FeedError> {
        let looks_like_handle = query.starts_with('@') && query.split('@').count() == 3;

        let mut found = Vec::new();
        if looks_like_handle {
            found = self
                .source
                .search_accounts(query, SEARCH_LIMIT, true)
                .await
                .unwrap_or_default();
        }
        if found.is_empty() {
            found = self.source.search_accounts(query, SEARCH_LIMIT, false).await?;
        }
        self.correlate(found, None).await
    }

    pub async fn boosters_of(
        &self,
        status_id: &str,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        self.account_feed(
            AccountCategory::BoostedBy(status_id.to_string()),
            page,
            None,
        )
        .await
    }

    pub async fn favouriters_of(
        &self,
        status_id: &str,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        self.account_feed(
            AccountCategory::FavouritedBy(status_id.to_string()),
            page,
            None,
        )
        .await
    }

    pub async fn followers(
        &self,
        account_id: &str,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        self.account_feed(
            AccountCategory::Followers(account_id.to_string()),
            page,
            None,
        )
        .await
    }

    pub async fn following(
        &self,
        account_id: &str,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        self.account_feed(
            AccountCategory::Following(account_id.to_string()),
            page,
            None,
        )
        .await
    }

    pub async fn blocked(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        self.account_feed(AccountCategory::Blocked, page, None).await
    }

    pub async fn muted(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        self.account_feed(AccountCategory::Muted, page, None).await
    }

    pub async fn follow_requests(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        self.account_feed(AccountCategory::FollowRequests, page, None)
            .await
    }

    pub async fn followed_tags(&self, page: &Pagination) -> Result<Page<FeedItem>, FeedError> {
        let fetched = self.source.followed_tags(page).await?;
        Ok(Page {
            items: fetched.items.into_iter().map(FeedItem::Tag).collect(),
            next: fetched.next,
        })
    }

    pub async fn lists(&self) -> Result<Vec<FeedItem>, FeedError> {
        let lists = self.source.lists().await?;
        Ok(lists.into_iter().map(FeedItem::List).collect())
    }

    pub async fn list_timeline(
        &self,
        list_id: &str,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        let fetched = self.source.list_timeline(list_id, page).await?;
        Ok(Page {
            items: statuses_to_items(fetched.items, false),
            next: fetched.next,
        })
    }

    /// Members of a list, each tagged with the list they came from.
    pub async fn list_members(&self, list: &List) -> Result<Vec<FeedItem>, FeedError> {
        let accounts = self.source.list_members(&list.id).await?;
        self.correlate(accounts, Some(Provenance::List(list.clone())))
            .await
    }

    /// The viewer's follows, tagged with a list for add-to-list flows.
    pub async fn following_for_list(
        &self,
        account_id: &str,
        list: &List,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        self.account_feed(
            AccountCategory::Following(account_id.to_string()),
            page,
            Some(Provenance::List(list.clone())),
        )
        .await
    }

    pub async fn hashtag_timeline(
        &self,
        tag: &str,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        let fetched = self
            .source
            .hashtag_timeline(tag, false, &[], page)
            .await?;
        Ok(Page {
            items: statuses_to_items(fetched.items, false),
            next: fetched.next,
        })
    }

    /// Timeline for several tags at once. The first space-separated token
    /// is the primary tag; every further non-empty token widens the query.
    pub async fn multi_hashtag_timeline(
        &self,
        query: &str,
        page: &Pagination,
    ) -> Result<Page<FeedItem>, FeedError> {
        let mut parts = query.split(' ');
        let primary = parts.next().unwrap_or_default();
        let any: Vec<String> = parts
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        let fetched = self
            .source
            .hashtag_timeline(primary, false, &any, page)
            .await?;
        Ok(Page {
            items: statuses_to_items(fetched.items, false),
            next: fetched.next,
        })
    }

    /// Edit history of one status, oldest revision first as the server
    /// returns it.
    pub async fn status_history(&self, status_id: &str) -> Result<Vec<FeedItem>, FeedError> {
        let edits = self.source.status_history(status_id).await?;
        Ok(edits.into_iter().map(FeedItem::StatusHistory).collect())
    }

    /// The conversation around a focal status: ancestors, then the focal
    /// status itself, then descendants. The focal status is synthesised
    /// into the sequence; the fetched context never carries it.
    pub async fn thread(&self, status: &Status) -> Result<Vec<FeedItem>, FeedError> {
        let context = self.source.status_context(&status.id).await?;

        let mut items =
            Vec::with_capacity(context.ancestors.len() + 1 + context.descendants.len());
        items.extend(statuses_to_items(context.ancestors, false));
        items.push(FeedItem::Status {
            status: status.clone(),
            pinned: false,
        });
        items.extend(statuses_to_items(context.descendants, false));
        Ok(items)
    }
}
