//! Fan a notification out to every subscription.
//!
//! Deliveries run concurrently and are joined before returning. A failing
//! subscription never affects the others; subscriptions the provider reports
//! as gone are deleted.

use anyhow::Context;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::SubscriptionId;
use crate::domains::notifications::models::{NotificationPayload, PushTarget, Subscription};
use crate::kernel::{PushError, ServerDeps};

/// What happened to one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Provider reported the subscription gone and it was deleted
    Pruned,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub subscription_id: SubscriptionId,
    pub outcome: DeliveryOutcome,
}

/// Counters for one or more dispatches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub attempted: usize,
    pub delivered: usize,
    pub pruned: usize,
    pub failed: usize,
}

impl DispatchSummary {
    pub fn from_results(results: &[DeliveryResult]) -> Self {
        let mut summary = Self {
            attempted: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.outcome {
                DeliveryOutcome::Delivered => summary.delivered += 1,
                DeliveryOutcome::Pruned => summary.pruned += 1,
                DeliveryOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn merge(&mut self, other: DispatchSummary) {
        self.attempted += other.attempted;
        self.delivered += other.delivered;
        self.pruned += other.pruned;
        self.failed += other.failed;
    }
}

async fn deliver(
    subscription: &Subscription,
    payload: &NotificationPayload,
    deps: &ServerDeps,
) -> Result<(), PushError> {
    let target = subscription
        .target()
        .map_err(|e| PushError::InvalidKeys(e.to_string()))?;

    match target {
        PushTarget::Web {
            endpoint,
            p256dh,
            auth,
        } => {
            let body = serde_json::to_vec(payload)
                .map_err(|e| PushError::Transport(e.to_string()))?;
            deps.web_push.send(&endpoint, &p256dh, &auth, &body).await
        }
        PushTarget::Fcm { token } => {
            deps.fcm
                .send(&token, &payload.title, &payload.body, &payload.url)
                .await
        }
    }
}

/// Deliver to one subscription, pruning it when the provider says it is gone.
pub async fn send_to_subscription(
    subscription: &Subscription,
    payload: &NotificationPayload,
    deps: &ServerDeps,
) -> DeliveryOutcome {
    match deliver(subscription, payload, deps).await {
        Ok(()) => {
            debug!(subscription_id = %subscription.id, "Notification delivered");
            DeliveryOutcome::Delivered
        }
        Err(PushError::Gone) => match deps.subscriptions.delete(subscription.id).await {
            Ok(_) => {
                info!(
                    subscription_id = %subscription.id,
                    subscription_type = %subscription.subscription_type,
                    "Removed expired subscription"
                );
                DeliveryOutcome::Pruned
            }
            Err(e) => {
                warn!(subscription_id = %subscription.id, error = %e, "Failed to remove expired subscription");
                DeliveryOutcome::Failed(format!("prune failed: {}", e))
            }
        },
        Err(e) => {
            warn!(
                subscription_id = %subscription.id,
                subscription_type = %subscription.subscription_type,
                error = %e,
                "Failed to send notification"
            );
            DeliveryOutcome::Failed(e.to_string())
        }
    }
}

/// Send one payload to every given subscription concurrently.
pub async fn dispatch(
    subscriptions: &[Subscription],
    payload: &NotificationPayload,
    deps: &ServerDeps,
) -> Vec<DeliveryResult> {
    let payload = payload.clone().with_default_icon(&deps.notification_icon_url);

    let deliveries = subscriptions.iter().map(|subscription| {
        let payload = &payload;
        async move {
            DeliveryResult {
                subscription_id: subscription.id,
                outcome: send_to_subscription(subscription, payload, deps).await,
            }
        }
    });

    join_all(deliveries).await
}

/// Send several payloads in order. Subscriptions pruned by one payload are
/// skipped for the rest.
pub async fn dispatch_all(
    mut subscriptions: Vec<Subscription>,
    payloads: &[NotificationPayload],
    deps: &ServerDeps,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for payload in payloads {
        if subscriptions.is_empty() {
            break;
        }

        let results = dispatch(&subscriptions, payload, deps).await;
        let pruned: Vec<SubscriptionId> = results
            .iter()
            .filter(|r| r.outcome == DeliveryOutcome::Pruned)
            .map(|r| r.subscription_id)
            .collect();
        subscriptions.retain(|s| !pruned.contains(&s.id));

        summary.merge(DispatchSummary::from_results(&results));
    }

    summary
}

/// Load the subscriptions once and send every payload to them. Nothing is
/// loaded when there is nothing to send.
pub async fn notify_subscribers(
    payloads: &[NotificationPayload],
    deps: &ServerDeps,
) -> anyhow::Result<DispatchSummary> {
    if payloads.is_empty() {
        return Ok(DispatchSummary::default());
    }

    let subscriptions = deps
        .subscriptions
        .find_all()
        .await
        .context("Failed to load subscriptions")?;
    info!(
        subscriptions = subscriptions.len(),
        notifications = payloads.len(),
        "Sending notifications"
    );

    Ok(dispatch_all(subscriptions, payloads, deps).await)
}

/// Mass notification: one payload to every subscription.
pub async fn notify_all_subscribers(
    payload: &NotificationPayload,
    deps: &ServerDeps,
) -> anyhow::Result<DispatchSummary> {
    notify_subscribers(std::slice::from_ref(payload), deps).await
}
