//! Browser push over the Web Push protocol (VAPID + aes128gcm).

use async_trait::async_trait;
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder,
};

use super::{BaseWebPushService, PushError};

/// VAPID key pair as produced by `web-push generate-vapid-keys` (base64url).
#[derive(Debug, Clone)]
pub struct VapidKeys {
    pub public_key: String,
    pub private_key: String,
    /// `mailto:` or `https:` contact
    pub subject: String,
}

pub struct WebPushService {
    keys: VapidKeys,
    client: HyperWebPushClient,
}

impl WebPushService {
    pub fn new(keys: VapidKeys) -> Self {
        Self {
            keys,
            client: HyperWebPushClient::new(),
        }
    }

    pub fn public_key(&self) -> &str {
        &self.keys.public_key
    }

    fn build_message(
        &self,
        info: &SubscriptionInfo,
        payload: &[u8],
    ) -> Result<web_push::WebPushMessage, WebPushError> {
        let mut signature = VapidSignatureBuilder::from_base64(&self.keys.private_key, info)?;
        signature.add_claim("sub", self.keys.subject.as_str());

        let mut builder = WebPushMessageBuilder::new(info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature.build()?);
        builder.build()
    }
}

#[async_trait]
impl BaseWebPushService for WebPushService {
    async fn send(
        &self,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
        payload: &[u8],
    ) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(endpoint, p256dh, auth);
        let message = self.build_message(&info, payload).map_err(classify)?;

        self.client.send(message).await.map_err(classify)
    }
}

/// 410 is the only answer that removes a subscription.
fn classify(err: WebPushError) -> PushError {
    match err {
        WebPushError::EndpointNotValid { .. } => PushError::Gone,
        WebPushError::InvalidCryptoKeys { .. } | WebPushError::InvalidUri { .. } => {
            PushError::InvalidKeys(err.to_string())
        }
        WebPushError::EndpointNotFound { .. } => PushError::Rejected {
            status: 404,
            message: err.to_string(),
        },
        WebPushError::Unauthorized { .. } => PushError::Rejected {
            status: 401,
            message: err.to_string(),
        },
        WebPushError::BadRequest { .. } => PushError::Rejected {
            status: 400,
            message: err.to_string(),
        },
        WebPushError::PayloadTooLarge { .. } => PushError::Rejected {
            status: 413,
            message: err.to_string(),
        },
        WebPushError::ServerError { .. } => PushError::Rejected {
            status: 500,
            message: err.to_string(),
        },
        other => PushError::Transport(other.to_string()),
    }
}
