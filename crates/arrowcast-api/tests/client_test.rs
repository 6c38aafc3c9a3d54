#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use arrowcast_api::{ApiClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Tournaments ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_tournaments_map_shape() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/tournaments/",
        json!({
            "tournaments": {
                "df-1": {"id": "df-1", "dbid": 1, "name": "DrunkenFall 2026", "matches": null},
                "rf-2": {"id": "rf-2", "dbid": 2, "name": "Rookie Fall", "matches": [
                    {"index": 0, "kind": "playoff", "started": "2026-03-01T20:00:00Z"}
                ]}
            }
        }),
    )
    .await;

    let list = client.tournaments().await.unwrap();
    let mut tournaments = list.tournaments.into_vec();
    tournaments.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(tournaments.len(), 2);
    assert_eq!(tournaments[0].id.as_deref(), Some("df-1"));
    assert!(tournaments[0].matches.is_empty());
    assert_eq!(tournaments[1].matches.len(), 1);
}

#[tokio::test]
async fn test_tournaments_list_shape() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/tournaments/",
        json!({"tournaments": [{"id": "df-1"}, {"id": "df-2"}]}),
    )
    .await;

    let list = client.tournaments().await.unwrap();
    assert_eq!(list.tournaments.into_vec().len(), 2);
}

// ── User & people ───────────────────────────────────────────────────

#[tokio::test]
async fn test_user_unauthenticated() {
    let (server, client) = setup().await;
    mount_json(&server, "/api/user/", json!({"authenticated": false})).await;

    let user = client.user().await.unwrap();
    assert_eq!(user.authenticated, Some(false));
    assert!(user.id.is_none());
}

#[tokio::test]
async fn test_user_signed_in() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/user/",
        json!({
            "id": "1001",
            "name": "Lowe Thiderman",
            "nick": "thiderman",
            "userlevel": 100,
            "color_preference": ["green", "blue"],
            "facebook_id": "1001"
        }),
    )
    .await;

    let user = client.user().await.unwrap();
    assert_eq!(user.nick.as_deref(), Some("thiderman"));
    assert_eq!(user.userlevel, Some(100));
    assert_eq!(user.color_preference, vec!["green", "blue"]);
}

#[tokio::test]
async fn test_people() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/people/",
        json!({"people": [{"id": "1", "nick": "a"}, {"id": 2, "nick": "b"}]}),
    )
    .await;

    let people = client.people().await.unwrap().people;
    assert_eq!(people.len(), 2);
    assert_eq!(people[1].id.as_deref(), Some("2"));
}

// ── Stats & credits ─────────────────────────────────────────────────

#[tokio::test]
async fn test_stats() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/people/stats/",
        json!({
            "1001": {
                "person": {"id": "1001", "nick": "thiderman"},
                "total": {"kills": 40, "self": 3, "playtime": 90_000_000, "wins": 2},
                "rank": 1,
                "tournaments": {"df-1": {"kills": 40}}
            }
        }),
    )
    .await;

    let stats = client.stats().await.unwrap();
    let entry = &stats["1001"];
    assert_eq!(entry.rank, 1);
    let total = entry.total.as_ref().unwrap();
    assert_eq!(total.self_kills, 3);
    assert_eq!(total.playtime, 90_000_000);
}

#[tokio::test]
async fn test_credits() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "/api/tournaments/df-1/credits/",
        json!({
            "executive": {"id": "1", "nick": "exec"},
            "producers": [{"id": "2"}],
            "players": null,
            "archers_harmed": 1234
        }),
    )
    .await;

    let credits = client.credits("df-1").await.unwrap();
    assert_eq!(credits.archers_harmed, 1234);
    assert_eq!(credits.producers.len(), 1);
    assert!(credits.players.is_empty());
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_error_status() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/people/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client.people().await;
    match result {
        Err(ref e @ Error::Status { status, .. }) => {
            assert_eq!(status, 503);
            assert!(e.is_transient());
        }
        other => panic!("expected Status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tournaments/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.tournaments().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}
