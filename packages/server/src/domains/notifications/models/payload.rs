use serde::{Deserialize, Serialize};

/// What a subscriber sees. Serialized as-is for web-push; FCM uses title/body/url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            url: url.into(),
            icon: None,
            badge: None,
        }
    }

    /// Use the same image for icon and badge.
    pub fn with_icon(mut self, icon_url: &str) -> Self {
        self.icon = Some(icon_url.to_string());
        self.badge = Some(icon_url.to_string());
        self
    }

    /// Fill icon/badge only where the payload has none.
    pub fn with_default_icon(mut self, icon_url: &str) -> Self {
        self.icon.get_or_insert_with(|| icon_url.to_string());
        self.badge.get_or_insert_with(|| icon_url.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_icon_does_not_override() {
        let mut payload = NotificationPayload::new("t", "b", "u");
        payload.icon = Some("custom".to_string());
        let payload = payload.with_default_icon("logo");
        assert_eq!(payload.icon.as_deref(), Some("custom"));
        assert_eq!(payload.badge.as_deref(), Some("logo"));
    }

    #[test]
    fn serializes_web_push_shape() {
        let payload = NotificationPayload::new("t", "b", "https://x/1").with_icon("logo");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "title": "t", "body": "b", "url": "https://x/1", "icon": "logo", "badge": "logo"
            })
        );
    }
}
