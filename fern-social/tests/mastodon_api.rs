mod common;

use fern_config::NotificationKind;
use fern_http::HttpError;
use fern_social::mastodon::{FeedClient, FeedError, FeedItem, FeedItemKind, MastodonApi, Pagination};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn status_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "content": format!("<p>status {id}</p>"),
        "account": { "id": "9", "username": "ada", "acct": "ada@example.social" },
    })
}

fn account_json(id: &str) -> serde_json::Value {
    json!({ "id": id, "username": format!("user-{id}"), "acct": format!("user-{id}") })
}

fn relationship_json(id: &str) -> serde_json::Value {
    json!({ "id": id, "following": true })
}

async fn feed_for(server: &MockServer) -> FeedClient<MastodonApi> {
    let api = MastodonApi::new(&server.uri(), "test-token").expect("client should build");
    FeedClient::new(api)
}

#[tokio::test]
async fn home_timeline_decodes_items_and_next_cursor() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/timelines/home"))
        .and(query_param("limit", "2"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([status_json("2"), status_json("1")]))
                .insert_header(
                    "Link",
                    "<https://example.social/api/v1/timelines/home?max_id=1>; rel=\"next\", \
                     <https://example.social/api/v1/timelines/home?min_id=2>; rel=\"prev\"",
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_for(&server).await;
    let page = feed
        .home_timeline(&Pagination {
            limit: Some(2),
            ..Pagination::default()
        })
        .await
        .expect("home timeline should fetch");

    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|i| i.kind() == FeedItemKind::Status));
    assert_eq!(page.next.max_id.as_deref(), Some("1"));
    assert_eq!(page.next.min_id.as_deref(), Some("2"));
    assert_eq!(page.next.limit, Some(2));
}

#[tokio::test]
async fn followers_are_joined_against_one_relationship_batch() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/7/followers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([account_json("1"), account_json("2")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/relationships"))
        .and(query_param("id[]", "1"))
        .and(query_param("id[]", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([relationship_json("2")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_for(&server).await;
    let page = feed
        .followers("7", &Pagination::default())
        .await
        .expect("followers should fetch");

    // Account 1 has no relationship record and is dropped.
    assert_eq!(page.items.len(), 1);
    match &page.items[0] {
        FeedItem::User(profile) => {
            assert_eq!(profile.account.id, "2");
            assert!(profile.relation.following);
        }
        other => panic!("expected user item, got {:?}", other.kind()),
    }
}

#[tokio::test]
async fn remote_error_surfaces_with_status_and_message() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/favourites"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({
                "error": "The access token is invalid"
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_for(&server).await;
    let err = feed
        .favourites(&Pagination::default())
        .await
        .expect_err("fetch should fail");

    match err {
        FeedError::Http(HttpError::Api { status, message }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "The access token is invalid");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn handle_search_falls_back_to_fuzzy_resolution() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/search"))
        .and(query_param("q", "@alice@example.social"))
        .and(query_param("limit", "10"))
        .and(query_param("resolve", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/search"))
        .and(query_param("resolve", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([account_json("1")])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/relationships"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([relationship_json("1")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_for(&server).await;
    let items = feed
        .search_users("@alice@example.social")
        .await
        .expect("search should fall back");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind(), FeedItemKind::User);
}

#[tokio::test]
async fn notification_filter_reaches_the_server_unchanged() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/notifications"))
        .and(query_param("exclude_types[]", "reblog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "n1",
            "type": "mention",
            "account": account_json("5"),
        }])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/relationships"))
        .and(query_param("id[]", "5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([relationship_json("5")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_for(&server).await;
    let page = feed
        .notifications(&[NotificationKind::Boost], &Pagination::default())
        .await
        .expect("notifications should fetch");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].kind(), FeedItemKind::Notification);
}

#[tokio::test]
async fn thread_inserts_the_focal_status_between_context_halves() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/statuses/focal/context"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ancestors": [status_json("a1")],
            "descendants": [status_json("d1"), status_json("d2")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_for(&server).await;
    let focal: fern_social::mastodon::Status =
        serde_json::from_value(status_json("focal")).unwrap();
    let items = feed.thread(&focal).await.expect("thread should fetch");

    let ids: Vec<&str> = items
        .iter()
        .map(|item| match item {
            FeedItem::Status { status, .. } => status.id.as_str(),
            other => panic!("expected status item, got {:?}", other.kind()),
        })
        .collect();
    assert_eq!(ids, ["a1", "focal", "d1", "d2"]);
}
