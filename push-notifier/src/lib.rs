use async_trait::async_trait;
use postwatch_core::{NotificationPayload, NotifyError, PushoverConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;

    fn name(&self) -> &'static str;
}

/// Form body of a Pushover `messages.json` request.
#[derive(Debug, Serialize)]
struct PushoverMessage<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: i64,
    #[serde(default)]
    errors: Vec<String>,
}

pub struct PushoverNotifier {
    http_client: Client,
    endpoint: Url,
    token: String,
    user: String,
}

impl PushoverNotifier {
    pub fn new(config: &PushoverConfig, endpoint: Url) -> Result<Self, NotifyError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            endpoint,
            token: config.token.clone(),
            user: config.user.clone(),
        })
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let message = PushoverMessage {
            token: &self.token,
            user: &self.user,
            title: &payload.title,
            message: &payload.message,
            url: payload.link.as_ref().map(Url::as_str),
        };

        debug!("Sending push notification: {}", payload.title);
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .form(&message)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status_code: status.as_u16(),
                body,
            });
        }

        // Pushover reports failures inside a 200 response as `status != 1`.
        if let Ok(parsed) = serde_json::from_str::<PushoverResponse>(&body) {
            if parsed.status != 1 {
                return Err(NotifyError::Rejected {
                    status_code: status.as_u16(),
                    body: parsed.errors.join("; "),
                });
            }
        }

        info!("Notification sent: {}", payload.message.lines().next().unwrap_or_default());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pushover"
    }
}
