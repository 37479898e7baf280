//! REST client for Mastodon-compatible servers.
//!
//! Maps each [`FeedSource`] operation onto its `/api/v1/` endpoint,
//! delegating transport concerns (auth, retries, timeouts) to the shared
//! HTTP client and turning the `Link` response header into the next-page
//! cursor.

use std::borrow::Cow;

use async_trait::async_trait;
use fern_http::{Fetched, HttpClient, HttpError, RequestOpts};
use serde::de::DeserializeOwned;

use crate::mastodon::feed::{AccountCategory, FeedError, FeedSource, StatusCategory};
use crate::mastodon::types::{
    Account, Conversation, List, Notification, Page, Pagination, Relationship, Status, StatusEdit,
    Tag, ThreadContext,
};

type Query = Vec<(&'static str, Cow<'static, str>)>;

#[derive(Clone)]
pub struct MastodonApi {
    http: HttpClient,
}

impl MastodonApi {
    /// Build a client for one instance. `server` is the base URL, e.g.
    /// `https://example.social`.
    pub fn new(server: &str, access_token: &str) -> Result<Self, HttpError> {
        let base = format!("{}/api/v1/", server.trim_end_matches('/'));
        let http = HttpClient::new(&base)?.with_bearer(access_token)?;
        Ok(Self { http })
    }

    async fn fetch_page<T>(
        &self,
        path: &str,
        page: &Pagination,
        mut extra: Query,
    ) -> Result<Page<T>, FeedError>
    where
        T: DeserializeOwned,
    {
        let mut query = page.to_query();
        query.append(&mut extra);

        let fetched: Fetched<Vec<T>> = self
            .http
            .get_json_linked(
                path,
                RequestOpts {
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await?;

        let mut next = fetched
            .link
            .as_deref()
            .map(Pagination::from_link)
            .unwrap_or_default();
        next.limit = page.limit;

        Ok(Page {
            items: fetched.body,
            next,
        })
    }

    async fn fetch<T>(&self, path: &str, query: Query) -> Result<T, FeedError>
    where
        T: DeserializeOwned,
    {
        let opts = RequestOpts {
            query: if query.is_empty() { None } else { Some(query) },
            ..Default::default()
        };
        Ok(self.http.get_json(path, opts).await?)
    }
}

#[async_trait]
impl FeedSource for MastodonApi {
    async fn statuses(
        &self,
        category: StatusCategory,
        page: &Pagination,
    ) -> Result<Page<Status>, FeedError> {
        match category {
            StatusCategory::Home => self.fetch_page("timelines/home", page, Vec::new()).await,
            StatusCategory::Federated => {
                self.fetch_page("timelines/public", page, Vec::new()).await
            }
            StatusCategory::Local => {
                self.fetch_page("timelines/public", page, vec![("local", "true".into())])
                    .await
            }
            StatusCategory::Favourites => self.fetch_page("favourites", page, Vec::new()).await,
            StatusCategory::Bookmarks => self.fetch_page("bookmarks", page, Vec::new()).await,
            StatusCategory::Account(id) => {
                self.fetch_page(&format!("accounts/{id}/statuses"), page, Vec::new())
                    .await
            }
            StatusCategory::Pinned(id) => {
                self.fetch_page(
                    &format!("accounts/{id}/statuses"),
                    page,
                    vec![("pinned", "true".into())],
                )
                .await
            }
        }
    }

    async fn accounts(
        &self,
        category: AccountCategory,
        page: &Pagination,
    ) -> Result<Page<Account>, FeedError> {
        let path = match category {
            AccountCategory::BoostedBy(id) => format!("statuses/{id}/reblogged_by"),
            AccountCategory::FavouritedBy(id) => format!("statuses/{id}/favourited_by"),
            AccountCategory::Followers(id) => format!("accounts/{id}/followers"),
            AccountCategory::Following(id) => format!("accounts/{id}/following"),
            AccountCategory::Blocked => "blocks".to_string(),
            AccountCategory::Muted => "mutes".to_string(),
            AccountCategory::FollowRequests => "follow_requests".to_string(),
        };
        self.fetch_page(&path, page, Vec::new()).await
    }

    async fn relationships(&self, ids: &[String]) -> Result<Vec<Relationship>, FeedError> {
        let query: Query = ids
            .iter()
            .map(|id| ("id[]", Cow::Owned(id.clone())))
            .collect();
        self.fetch("accounts/relationships", query).await
    }

    async fn notifications(
        &self,
        exclude_kinds: &[String],
        page: &Pagination,
    ) -> Result<Page<Notification>, FeedError> {
        let extra: Query = exclude_kinds
            .iter()
            .map(|kind| ("exclude_types[]", Cow::Owned(kind.clone())))
            .collect();
        self.fetch_page("notifications", page, extra).await
    }

    async fn followed_tags(&self, page: &Pagination) -> Result<Page<Tag>, FeedError> {
        self.fetch_page("followed_tags", page, Vec::new()).await
    }

    async fn lists(&self) -> Result<Vec<List>, FeedError> {
        self.fetch("lists", Vec::new()).await
    }

    async fn status_history(&self, status_id: &str) -> Result<Vec<StatusEdit>, FeedError> {
        self.fetch(&format!("statuses/{status_id}/history"), Vec::new())
            .await
    }

    async fn status_context(&self, status_id: &str) -> Result<ThreadContext, FeedError> {
        self.fetch(&format!("statuses/{status_id}/context"), Vec::new())
            .await
    }

    async fn conversations(&self, page: &Pagination) -> Result<Page<Conversation>, FeedError> {
        self.fetch_page("conversations", page, Vec::new()).await
    }

    async fn list_timeline(
        &self,
        list_id: &str,
        page: &Pagination,
    ) -> Result<Page<Status>, FeedError> {
        self.fetch_page(&format!("timelines/list/{list_id}"), page, Vec::new())
            .await
    }

    async fn list_members(&self, list_id: &str) -> Result<Vec<Account>, FeedError> {
        self.fetch(&format!("lists/{list_id}/accounts"), Vec::new())
            .await
    }

    async fn hashtag_timeline(
        &self,
        tag: &str,
        local_only: bool,
        any_tags: &[String],
        page: &Pagination,
    ) -> Result<Page<Status>, FeedError> {
        let mut extra: Query = Vec::new();
        if local_only {
            extra.push(("local", "true".into()));
        }
        for extra_tag in any_tags {
            extra.push(("any[]", Cow::Owned(extra_tag.clone())));
        }
        self.fetch_page(&format!("timelines/tag/{tag}"), page, extra)
            .await
    }

    async fn search_accounts(
        &self,
        query: &str,
        limit: u32,
        exact: bool,
    ) -> Result<Vec<Account>, FeedError> {
        let params: Query = vec![
            ("q", Cow::Owned(query.to_string())),
            ("limit", Cow::Owned(limit.to_string())),
            ("resolve", Cow::Owned(exact.to_string())),
        ];
        self.fetch("accounts/search", params).await
    }
}
