//! Router tests against in-memory stores and upstream doubles. No Docker.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use jobboard_core::kernel::test_dependencies::{
    reddit_post, web_subscription, MockRedditClient, MockWeb3CareerClient,
};
use jobboard_core::kernel::TestDependencies;
use jobboard_core::server::build_app;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(test_deps: &TestDependencies) -> Router {
    build_app(Arc::new(test_deps.clone().into_deps()), &[])
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Runs one ingest so the in-memory store holds `count` jobs.
async fn seed_jobs(test_deps: &TestDependencies, count: usize) {
    let posts = (0..count)
        .map(|i| {
            reddit_post(
                "forhire",
                &format!("[Hiring] Engineer {}", i),
                &format!("https://x/{}", i),
                "u1",
            )
        })
        .collect();
    let seeded = test_deps
        .clone()
        .mock_reddit(MockRedditClient::new().with_posts("forhire", posts));
    let (status, _) = send(app(&seeded), get("/jobs/fetch")).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Jobs
// =============================================================================

#[tokio::test]
async fn jobs_page_past_the_end_is_empty_with_total() {
    let test_deps = TestDependencies::new();
    seed_jobs(&test_deps, 3).await;

    let (status, body) = send(app(&test_deps), get("/jobs?page=5&pageSize=2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["hasNextPage"], false);
}

#[tokio::test]
async fn jobs_page_size_defaults_and_is_capped() {
    let test_deps = TestDependencies::new();
    seed_jobs(&test_deps, 12).await;

    let (_, body) = send(app(&test_deps), get("/jobs?pageSize=oops")).await;
    assert_eq!(body["pageSize"], 10);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
    assert_eq!(body["hasNextPage"], true);

    let (_, body) = send(app(&test_deps), get("/jobs?pageSize=1000")).await;
    assert_eq!(body["pageSize"], 100);
    assert_eq!(body["data"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn job_lookup_rejects_bad_ids_and_reports_missing_ones() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(app(&test_deps), get("/jobs/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid job id.");

    let missing = format!("/jobs/{}", uuid::Uuid::new_v4());
    let (status, body) = send(app(&test_deps), get(&missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Job not found.");
}

#[tokio::test]
async fn job_lookup_returns_relations() {
    let test_deps = TestDependencies::new();
    seed_jobs(&test_deps, 1).await;
    let stored = test_deps.jobs.find_by_url("https://x/0").unwrap();

    let (status, body) = send(app(&test_deps), get(&format!("/jobs/{}", stored.job.id))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "[Hiring] Engineer 0");
    assert_eq!(body["tags"][0]["name"], "forhire");
}

#[tokio::test]
async fn fetch_route_runs_the_pipeline() {
    let test_deps = TestDependencies::new().mock_reddit(MockRedditClient::new().with_posts(
        "forhire",
        vec![reddit_post("forhire", "[Hiring] Backend Engineer", "https://x/1", "u1")],
    ));
    test_deps.subscriptions.insert(web_subscription("https://push/a"));

    let (status, body) = send(app(&test_deps), get("/jobs/fetch")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All jobs fetched and stored successfully.");
    assert_eq!(body["summary"]["sources"][0]["source"], "reddit");
    assert_eq!(body["summary"]["sources"][0]["inserted"], 1);
    assert_eq!(body["summary"]["notifications"]["delivered"], 1);
    assert_eq!(test_deps.web_push.sent().len(), 1);
}

#[tokio::test]
async fn fetch_route_fails_when_subscriptions_cannot_load() {
    let test_deps = TestDependencies::new().mock_reddit(MockRedditClient::new().with_posts(
        "forhire",
        vec![reddit_post("forhire", "[Hiring] Backend Engineer", "https://x/1", "u1")],
    ));
    test_deps.subscriptions.fail_loads();

    let (status, body) = send(app(&test_deps), get("/jobs/fetch")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "An error occurred while fetching jobs.");
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn subscribe_validates_and_stores() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(
        app(&test_deps),
        post_json("/notifications/subscribe", r#"{"type":"web"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid subscription data.");

    let (status, _) = send(
        app(&test_deps),
        post_json("/notifications/subscribe", "{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = json!({
        "type": "web",
        "endpoint": "https://push/a",
        "keys": {"p256dh": "p", "auth": "a"}
    });
    let (status, body) = send(
        app(&test_deps),
        post_json("/notifications/subscribe", &request.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Subscription added.");
    assert_eq!(test_deps.subscriptions.len(), 1);

    send(
        app(&test_deps),
        post_json("/notifications/subscribe", &request.to_string()),
    )
    .await;
    assert_eq!(test_deps.subscriptions.len(), 1);
}

#[tokio::test]
async fn public_key_is_served() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(app(&test_deps), get("/notifications/get-public-key")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicKey"], "test-vapid-public-key");
}

#[tokio::test]
async fn mass_notification_requires_all_fields() {
    let test_deps = TestDependencies::new();
    test_deps.subscriptions.insert(web_subscription("https://push/a"));
    test_deps.subscriptions.insert(web_subscription("https://push/b"));

    let (status, body) = send(
        app(&test_deps),
        post_json("/notifications/send", r#"{"title":"Hi","body":"There"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert!(test_deps.web_push.sent().is_empty());

    let (status, body) = send(
        app(&test_deps),
        post_json(
            "/notifications/send",
            r#"{"title":"Hi","body":"There","url":"https://jobs.test"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["attempted"], 2);
    assert_eq!(test_deps.web_push.sent().len(), 2);
}

// =============================================================================
// Client reports
// =============================================================================

#[tokio::test]
async fn error_report_without_message_is_rejected() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(
        app(&test_deps),
        post_json("/errors", r#"{"platform":"ios"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid error report payload. \"message\" is required."
    );
}

#[tokio::test]
async fn location_requires_an_object_and_a_token() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(app(&test_deps), post_json("/location", "[1, 2]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid location data.");

    let (status, body) = send(
        app(&test_deps),
        post_json("/location", r#"{"subscriptionId":"  ","latitude":1.0}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Subscription not found.");
}

// =============================================================================
// Upstream proxies
// =============================================================================

#[tokio::test]
async fn web3career_proxy_maps_listings() {
    let test_deps = TestDependencies::new().mock_web3career(MockWeb3CareerClient::new().with_jobs(
        vec![
            json!({"id": 7, "title": "Solidity Dev", "company": "Chain", "city": "Berlin"}),
            json!({"title": "No id"}),
        ],
    ));

    let (status, body) = send(app(&test_deps), get("/web3career")).await;

    assert_eq!(status, StatusCode::OK);
    let listings = body.as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["id"], 7);
    assert_eq!(listings[0]["location"], "Berlin");
}

#[tokio::test]
async fn web3career_proxy_reports_upstream_failure() {
    let test_deps =
        TestDependencies::new().mock_web3career(MockWeb3CareerClient::new().with_failure());

    let (status, body) = send(app(&test_deps), get("/web3career")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "An error occurred while fetching data");
}

#[tokio::test]
async fn reddit_inbox_check_needs_credentials() {
    let test_deps =
        TestDependencies::new().mock_reddit(MockRedditClient::new().without_credentials());

    let (status, body) = send(app(&test_deps), get("/reddit/messages/fetch")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to check Reddit messages:"));
}

#[tokio::test]
async fn reddit_messages_reject_unknown_type() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(app(&test_deps), get("/reddit/messages?type=bogus")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid message type.");
}
