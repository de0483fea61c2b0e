//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use reddit::{RedditOptions, RedditService};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::sources::{RedditJobSource, Web3CareerJobSource};
use crate::kernel::{
    BaseFcmService, BaseJobSource, DisabledFcmService, FcmService, PostgresJobStore,
    PostgresSubscriptionStore, RedditAdapter, ServerDeps, ServiceAccount, VapidKeys,
    Web3CareerClient, WebPushService,
};
use crate::server::middleware::extract_client_ip;
use crate::server::routes::{
    errors, health_handler, jobs, locations, notifications, reddit as reddit_routes, web3career,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
}

/// Build every client from configuration and wire them into ServerDeps.
pub fn build_server_deps(pool: PgPool, config: &Config) -> Result<ServerDeps> {
    let reddit_service = RedditService::new(RedditOptions {
        user_agent: config.reddit_user_agent.clone(),
        credentials: config.reddit_credentials.clone(),
    })
    .context("Failed to create Reddit client")?;
    if !reddit_service.has_credentials() {
        tracing::warn!("Reddit credentials not set; inbox checks are disabled");
    }
    let reddit = Arc::new(RedditAdapter::new(Arc::new(reddit_service)));

    let web3career = Arc::new(Web3CareerClient::new(config.web3career_api_token.clone())?);

    let web_push = Arc::new(WebPushService::new(VapidKeys {
        public_key: config.vapid_public_key.clone(),
        private_key: config.vapid_private_key.clone(),
        subject: config.vapid_subject.clone(),
    }));

    let fcm: Arc<dyn BaseFcmService> = match &config.fcm_service_account_path {
        Some(path) => {
            let account = ServiceAccount::from_file(path)?;
            tracing::info!(project_id = %account.project_id, "FCM enabled");
            Arc::new(FcmService::new(account)?)
        }
        None => {
            tracing::warn!("FCM_SERVICE_ACCOUNT_PATH not set; FCM deliveries will fail");
            Arc::new(DisabledFcmService)
        }
    };

    let job_sources: Vec<Arc<dyn BaseJobSource>> = vec![
        Arc::new(RedditJobSource::new(
            reddit.clone(),
            config.job_subreddits.clone(),
            config.hiring_marker.clone(),
            config.notification_icon_url.clone(),
        )),
        Arc::new(Web3CareerJobSource::new(web3career.clone())),
    ];

    Ok(ServerDeps::new(
        pool.clone(),
        Arc::new(PostgresJobStore::new(pool.clone())),
        Arc::new(PostgresSubscriptionStore::new(pool)),
        reddit,
        web3career,
        job_sources,
        web_push,
        fcm,
        config.vapid_public_key.clone(),
        config.notification_icon_url.clone(),
        config.job_subreddits.clone(),
        config.hiring_marker.clone(),
    ))
}

/// Any origin when none are configured.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>, allowed_origins: &[String]) -> Router {
    let app_state = AxumAppState { deps };

    Router::new()
        .route("/health", get(health_handler))
        // Jobs
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/fetch", get(jobs::fetch_jobs))
        .route("/jobs/:id", get(jobs::get_job))
        // Notifications
        .route("/notifications/subscribe", post(notifications::subscribe))
        .route(
            "/notifications/get-public-key",
            get(notifications::get_public_key),
        )
        .route("/notifications/send", post(notifications::send_notification))
        // Client reports
        .route("/errors", post(errors::report_error))
        .route("/location", post(locations::report_location))
        // Legacy reddit archive
        .route("/reddit/messages", get(reddit_routes::list_messages))
        .route("/reddit/messages/fetch", get(reddit_routes::fetch_messages))
        .route("/reddit/posts", get(reddit_routes::list_posts))
        .route("/reddit/posts/fetch", get(reddit_routes::fetch_posts))
        .route("/web3career", get(web3career::list_web3career_jobs))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(extract_client_ip))
        .layer(Extension(app_state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
