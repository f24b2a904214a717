use anyhow::{Context, Result};
use reqwest::Client;

use super::{AlertMessage, Notifier};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    /// Errors never carry the webhook URL; its path is the credential.
    async fn send(&self, msg: &AlertMessage) -> Result<()> {
        let body = serde_json::json!({ "text": msg.text });
        self.client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("slack post")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }

    fn recipients(&self) -> Vec<String> {
        vec!["slack".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn posts_text_payload() {
        let server = MockServer::start_async().await;
        let hook = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/hook")
                    .json_body(serde_json::json!({ "text": "hello" }));
                then.status(200).body("ok");
            })
            .await;

        let slack = SlackNotifier::new(server.url("/hook"));
        let msg = AlertMessage {
            subject: "s".into(),
            text: "hello".into(),
            html: None,
        };
        slack.send(&msg).await.unwrap();
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_is_an_error_without_the_webhook_path() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/services/T000/B000/XOXsecret");
                then.status(500);
            })
            .await;
        let slack = SlackNotifier::new(server.url("/services/T000/B000/XOXsecret"));
        let msg = AlertMessage {
            subject: "s".into(),
            text: "t".into(),
            html: None,
        };
        let err = slack.send(&msg).await.unwrap_err();
        let debug = format!("{err:?}");
        assert!(debug.contains("500"), "{debug}");
        assert!(!debug.contains("XOXsecret"), "{debug}");
        assert!(!format!("{err:#}").contains("XOXsecret"));
    }
}
