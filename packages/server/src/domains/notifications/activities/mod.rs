pub mod dispatch;

pub use dispatch::{
    dispatch, dispatch_all, notify_all_subscribers, notify_subscribers, send_to_subscription,
    DeliveryOutcome, DeliveryResult, DispatchSummary,
};
