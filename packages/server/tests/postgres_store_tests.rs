//! Postgres-backed model tests. They need Docker:
//! `cargo test -p jobboard-server -- --ignored`

mod common;

use std::sync::Arc;

use axum::{body::Body, http::Request, http::StatusCode};
use common::{job_input, unique_url, TestHarness};
use jobboard_core::common::ValidatedPageArgs;
use jobboard_core::domains::error_reports::models::{ErrorReport, NewErrorReport};
use jobboard_core::domains::jobs::activities::ingest_jobs;
use jobboard_core::domains::jobs::models::{Job, JobInput, MetadataKey};
use jobboard_core::domains::locations::models::{Location, LocationReport};
use jobboard_core::domains::notifications::models::{NewSubscription, Subscription, SubscriptionType};
use jobboard_core::domains::reddit::activities::{check_messages, fetch_and_store_posts};
use jobboard_core::domains::reddit::models::{NewRedditMessage, RedditMessage, RedditPost};
use jobboard_core::kernel::test_dependencies::{inbox_item, reddit_post, MockRedditClient};
use jobboard_core::kernel::TestDependencies;
use jobboard_core::server::build_app;
use reddit::InboxFilter;
use serde_json::{json, Value};
use sqlx::PgPool;
use test_context::test_context;
use tower::ServiceExt;

/// A web subscription only this test knows the endpoint of.
async fn seed_web_subscription(pool: &PgPool) -> Subscription {
    let input = NewSubscription {
        subscription_type: SubscriptionType::Web,
        endpoint: unique_url("push"),
        keys: json!({ "p256dh": "p256dh-key", "auth": "auth-key" }),
        ip_address: None,
    };
    Subscription::upsert(&input, pool).await.unwrap()
}

/// Titles pushed to one endpoint. Other tests share the database, so
/// deliveries to their subscriptions are ignored.
fn titles_sent_to(test_deps: &TestDependencies, endpoint: &str) -> Vec<String> {
    let mut titles: Vec<String> = test_deps
        .web_push
        .sent()
        .into_iter()
        .filter(|sent| sent.endpoint == endpoint)
        .map(|sent| {
            let body: Value = serde_json::from_slice(&sent.payload).unwrap();
            body["title"].as_str().unwrap().to_string()
        })
        .collect();
    titles.sort();
    titles
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn upserting_same_url_twice_keeps_one_row(ctx: &mut TestHarness) {
    let url = unique_url("idempotent");
    let input = job_input("Rust Engineer", &url);

    let first = Job::upsert(&input, &ctx.db_pool).await.unwrap();
    let second = Job::upsert(&input, &ctx.db_pool).await.unwrap();

    assert!(first.inserted);
    assert!(!second.inserted);
    assert_eq!(first.job.id, second.job.id);

    let loaded = Job::load_relations(vec![second.job], &ctx.db_pool)
        .await
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(loaded.tags.len(), 2);
    assert_eq!(loaded.metadata.len(), 2);
    assert_eq!(loaded.company.map(|c| c.name).as_deref(), Some("Acme"));
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn missing_fields_leave_stored_values_untouched(ctx: &mut TestHarness) {
    let url = unique_url("coalesce");
    Job::upsert(&job_input("Original", &url), &ctx.db_pool)
        .await
        .unwrap();

    let sparse = JobInput {
        title: "Renamed".to_string(),
        url: url.clone(),
        ..JobInput::default()
    };
    let outcome = Job::upsert(&sparse, &ctx.db_pool).await.unwrap();

    assert_eq!(outcome.job.title, "Renamed");
    assert_eq!(outcome.job.description.as_deref(), Some("Build things"));
    assert_eq!(outcome.job.is_remote, Some(true));
    assert!(outcome.job.company_id.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn metadata_value_is_overwritten_on_resighting(ctx: &mut TestHarness) {
    let url = unique_url("metadata");
    Job::upsert(&job_input("Meta", &url), &ctx.db_pool).await.unwrap();

    let mut changed = job_input("Meta", &url);
    changed.metadata.insert(MetadataKey::City, "Saint Paul");
    let outcome = Job::upsert(&changed, &ctx.db_pool).await.unwrap();

    let loaded = Job::load_relations(vec![outcome.job], &ctx.db_pool)
        .await
        .unwrap()
        .pop()
        .unwrap();
    let metadata = loaded.metadata_map();
    assert_eq!(metadata.get(&MetadataKey::City), Some("Saint Paul"));
    assert_eq!(metadata.len(), 2);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn page_past_the_end_is_empty_with_total(ctx: &mut TestHarness) {
    Job::upsert(&job_input("Paged", &unique_url("paged")), &ctx.db_pool)
        .await
        .unwrap();
    let total = Job::count(&ctx.db_pool).await.unwrap();

    let args = ValidatedPageArgs {
        page: 10_000,
        page_size: 10,
    };
    let (jobs, counted) = Job::find_page(&args, &ctx.db_pool).await.unwrap();

    assert!(jobs.is_empty());
    assert_eq!(counted, total);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn ingestion_against_postgres_stores_and_notifies(ctx: &mut TestHarness) {
    let url = unique_url("ingest");
    let test_deps = TestDependencies::new().mock_reddit(MockRedditClient::new().with_posts(
        "forhire",
        vec![reddit_post("forhire", "[Hiring] Backend Engineer", &url, "u1")],
    ));
    let deps = ctx.deps(test_deps.clone());

    let summary = ingest_jobs(&deps).await.unwrap();

    let job = Job::find_by_url(&url, &ctx.db_pool).await.unwrap().unwrap();
    assert_eq!(job.source.as_deref(), Some("reddit"));
    assert_eq!(summary.source("reddit").unwrap().inserted, 1);
    assert_eq!(
        summary.notifications.delivered,
        test_deps.web_push.sent().len() + test_deps.fcm.sent().len()
    );
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn subscription_upsert_is_keyed_by_endpoint_and_type(ctx: &mut TestHarness) {
    let token = format!("token-{}", uuid::Uuid::new_v4());
    let input = NewSubscription {
        subscription_type: SubscriptionType::Fcm,
        endpoint: format!("fcm:{}", token),
        keys: json!({ "token": token }),
        ip_address: Some("127.0.0.1".to_string()),
    };

    let first = Subscription::upsert(&input, &ctx.db_pool).await.unwrap();
    let second = Subscription::upsert(&input, &ctx.db_pool).await.unwrap();
    assert_eq!(first.id, second.id);

    let found = Subscription::find_by_token(&token, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);

    let report = LocationReport {
        subscription_id: Some(token.clone()),
        latitude: Some(44.97),
        longitude: Some(-93.26),
        ..LocationReport::default()
    };
    let location = Location::create(found.id, &report, Some("10.0.0.1"), &ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(location.subscription_id, found.id);
    assert!(!location.mocked);

    assert!(Subscription::delete(first.id, &ctx.db_pool).await.unwrap());
    assert!(!Subscription::delete(first.id, &ctx.db_pool).await.unwrap());
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn reddit_archive_skips_known_items(ctx: &mut TestHarness) {
    let name = format!("t4_{}", uuid::Uuid::new_v4().simple());
    let input = NewRedditMessage::from_inbox_item(&inbox_item(&name, Some("alice"), "hi"));

    assert!(RedditMessage::insert(&input, &ctx.db_pool).await.unwrap().is_some());
    assert!(RedditMessage::insert(&input, &ctx.db_pool).await.unwrap().is_none());

    let post = reddit_post("forhire", "[Hiring] Archivist", &unique_url("post"), "bob");
    assert!(RedditPost::insert_from_post(&post, &ctx.db_pool).await.unwrap().is_some());
    assert!(RedditPost::insert_from_post(&post, &ctx.db_pool).await.unwrap().is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn error_report_keeps_full_payload(ctx: &mut TestHarness) {
    let body = json!({"message": "boom", "platform": "android", "options": {"isFatal": true}});
    let input = NewErrorReport::from_payload(&body).unwrap();

    let report = ErrorReport::create(&input, &ctx.db_pool).await.unwrap();

    assert_eq!(report.payload, body);
    assert_eq!(report.is_fatal, Some(true));
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn inbox_check_archives_and_announces_new_items_once(ctx: &mut TestHarness) {
    let message_name = format!("t4_{}", uuid::Uuid::new_v4().simple());
    let comment_name = format!("t1_{}", uuid::Uuid::new_v4().simple());
    let subscription = seed_web_subscription(&ctx.db_pool).await;
    let test_deps = TestDependencies::new().mock_reddit(
        MockRedditClient::new()
            .with_inbox(
                InboxFilter::Messages,
                vec![inbox_item(&message_name, Some("alice"), "Are you hiring?")],
            )
            .with_inbox(
                InboxFilter::Comments,
                vec![inbox_item(&comment_name, Some("bob"), "Interested")],
            ),
    );
    let deps = ctx.deps(test_deps.clone());

    let stored = check_messages(&deps).await.unwrap();

    assert_eq!(stored.len(), 2);
    let comment = stored.iter().find(|m| m.reddit_id == comment_name).unwrap();
    assert_eq!(comment.message_type, "comment");
    assert_eq!(
        comment.context_url.as_deref(),
        Some(format!("https://www.reddit.com/r/forhire/comments/{}/", comment_name).as_str())
    );
    let message = stored.iter().find(|m| m.reddit_id == message_name).unwrap();
    assert_eq!(message.message_type, "private_message");
    assert_eq!(
        titles_sent_to(&test_deps, &subscription.endpoint),
        vec![
            "New comment from /u/bob".to_string(),
            "New private_message from /u/alice".to_string(),
        ]
    );

    let again = check_messages(&deps).await.unwrap();

    assert!(again.is_empty());
    assert_eq!(titles_sent_to(&test_deps, &subscription.endpoint).len(), 2);
    Subscription::delete(subscription.id, &ctx.db_pool).await.unwrap();
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn post_fetch_archives_hiring_posts_once(ctx: &mut TestHarness) {
    let hiring_url = unique_url("legacy-hiring");
    let subscription = seed_web_subscription(&ctx.db_pool).await;
    let test_deps = TestDependencies::new().mock_reddit(MockRedditClient::new().with_posts(
        "forhire",
        vec![
            reddit_post("forhire", "[Hiring] Rust Engineer", &hiring_url, "carol"),
            reddit_post("forhire", "[For Hire] Designer", &unique_url("legacy-for-hire"), "dave"),
        ],
    ));
    let deps = ctx.deps(test_deps.clone());

    let summary = fetch_and_store_posts(&deps).await.unwrap();

    assert_eq!((summary.fetched, summary.hiring, summary.stored), (2, 1, 1));
    assert_eq!(
        titles_sent_to(&test_deps, &subscription.endpoint),
        vec!["New [Hiring] post in forhire".to_string()]
    );

    let again = fetch_and_store_posts(&deps).await.unwrap();

    assert_eq!(again.stored, 0);
    assert_eq!(again.notifications.attempted, 0);
    assert_eq!(titles_sent_to(&test_deps, &subscription.endpoint).len(), 1);
    Subscription::delete(subscription.id, &ctx.db_pool).await.unwrap();
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn health_reports_database_and_last_run(ctx: &mut TestHarness) {
    let deps = Arc::new(ctx.deps(TestDependencies::new()));
    ingest_jobs(&deps).await.unwrap();
    let app = build_app(deps, &[]);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["ok"], true);
    assert_eq!(body["lastIngestion"]["inserted"], 0);
}
