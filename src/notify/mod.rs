//! Alert delivery. `AlertSink` is what a scan talks to; `NotifierMux` fans a
//! rendered message out to every configured `Notifier` and records the outcome.

pub mod email;
pub mod render;
pub mod slack;

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;

use crate::analyze::TrendAnalysis;
use crate::store::{AlertRecord, DynScanStore};

/// Rendered alert, channel agnostic.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// One delivery channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &AlertMessage) -> anyhow::Result<()>;
    fn name(&self) -> &'static str;
    /// Who receives it, for the alert log.
    fn recipients(&self) -> Vec<String>;
}

/// Alert contract used by the scan pipeline. Failures are logged, never retried
/// and never fatal; the return value says whether anything went out.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, analysis: &TrendAnalysis, scan_id: Option<&str>) -> bool;
    async fn send_error(&self, errors: &[String]) -> bool;
}

pub type DynAlertSink = Arc<dyn AlertSink>;

pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
    log: Option<DynScanStore>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels, log: None }
    }

    /// Email and Slack, each only when its environment is configured.
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(e) = email::EmailNotifier::from_env() {
            channels.push(Box::new(e));
        }
        if let Some(s) = slack::SlackNotifier::from_env() {
            channels.push(Box::new(s));
        }
        if channels.is_empty() {
            tracing::info!(target: "notify", "no alert channels configured");
        }
        Self::new(channels)
    }

    /// Record every urgent trend announced (or not) in `store`.
    pub fn with_log(mut self, store: DynScanStore) -> Self {
        self.log = Some(store);
        self
    }

    pub fn recipients(&self) -> Vec<String> {
        self.channels.iter().flat_map(|c| c.recipients()).collect()
    }

    /// True if at least one channel accepted the message.
    async fn fan_out(&self, msg: &AlertMessage) -> bool {
        let mut any = false;
        for ch in &self.channels {
            match ch.send(msg).await {
                Ok(()) => {
                    tracing::info!(target: "notify", channel = ch.name(), subject = %msg.subject, "alert sent");
                    any = true;
                }
                Err(e) => {
                    tracing::warn!(target: "notify", channel = ch.name(), error = ?e, "alert delivery failed")
                }
            }
        }
        any
    }
}

#[async_trait::async_trait]
impl AlertSink for NotifierMux {
    async fn send(&self, analysis: &TrendAnalysis, scan_id: Option<&str>) -> bool {
        let urgent: Vec<_> = analysis.urgent_trends().collect();
        let Some(first) = urgent.first() else {
            tracing::debug!(target: "notify", "no urgent trends; alert skipped");
            return false;
        };
        let recipients = self.recipients();
        if recipients.is_empty() {
            tracing::debug!(target: "notify", "no recipients; alert skipped");
            return false;
        }

        let now = Utc::now();
        let counts = analysis.urgency_counts();
        let subject = render::alert_subject(&counts, &first.trend);
        let msg = AlertMessage {
            text: render::alert_text(analysis, &subject),
            html: Some(render::alert_html(analysis, &counts, now)),
            subject,
        };
        let sent = self.fan_out(&msg).await;
        counter!("radar_alerts_total", "kind" => "content", "sent" => sent.to_string()).increment(1);

        if let Some(store) = &self.log {
            for t in &urgent {
                let rec = AlertRecord {
                    scan_id: scan_id.map(str::to_string),
                    recipients: recipients.clone(),
                    trend_name: t.trend.clone(),
                    urgency: t.urgency,
                    content_brief: Some(t.content_brief.clone()).filter(|b| !b.is_empty()),
                    email_sent: sent,
                    created_at: now,
                };
                if let Err(e) = store.insert_alert(rec).await {
                    tracing::warn!(target: "notify", error = %e, "alert log write failed");
                }
            }
        }
        sent
    }

    async fn send_error(&self, errors: &[String]) -> bool {
        if self.channels.is_empty() {
            return false;
        }
        let text = render::error_text(errors);
        let msg = AlertMessage {
            subject: render::error_subject(Utc::now()),
            text,
            html: None,
        };
        let sent = self.fan_out(&msg).await;
        counter!("radar_alerts_total", "kind" => "error", "sent" => sent.to_string()).increment(1);
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{TopTrend, Urgency};
    use crate::store::{MemoryScanStore, ScanStore};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        fail: bool,
        seen: Arc<Mutex<Vec<AlertMessage>>>,
    }

    #[async_trait::async_trait]
    impl Notifier for Recorder {
        async fn send(&self, msg: &AlertMessage) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(msg.clone());
            if self.fail {
                anyhow::bail!("smtp down");
            }
            Ok(())
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
        fn recipients(&self) -> Vec<String> {
            vec!["ops@example.com".into()]
        }
    }

    fn analysis(urgencies: &[Urgency]) -> TrendAnalysis {
        TrendAnalysis {
            summary: "s".into(),
            top_trends: urgencies
                .iter()
                .enumerate()
                .map(|(i, u)| TopTrend {
                    trend: format!("trend {i}"),
                    why: "w".into(),
                    urgency: *u,
                    platforms: vec![],
                    content_brief: "b".into(),
                    restaurants: None,
                    sources: None,
                })
                .collect(),
            generated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn urgent_alert_is_sent_and_logged_per_trend() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(MemoryScanStore::new());
        let mux = NotifierMux::new(vec![Box::new(Recorder {
            fail: false,
            seen: seen.clone(),
        })])
        .with_log(store.clone());

        let a = analysis(&[Urgency::Watch, Urgency::FilmNow, Urgency::ThisWeek]);
        assert!(mux.send(&a, Some("scan-1")).await);

        let msgs = seen.lock().unwrap().clone();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].subject, "1 to FILM NOW + 1 this week - trend 1");

        let log = store.query_alerts(Utc::now() - chrono::Duration::hours(1), 50).await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|r| r.email_sent && r.scan_id.as_deref() == Some("scan-1")));
    }

    #[tokio::test]
    async fn failed_delivery_is_logged_not_raised() {
        let store = Arc::new(MemoryScanStore::new());
        let mux = NotifierMux::new(vec![Box::new(Recorder {
            fail: true,
            ..Default::default()
        })])
        .with_log(store.clone());

        assert!(!mux.send(&analysis(&[Urgency::FilmNow]), None).await);
        let log = store.query_alerts(Utc::now() - chrono::Duration::hours(1), 50).await.unwrap();
        assert_eq!(log.len(), 1);
        assert!(!log[0].email_sent);
        assert!(log[0].scan_id.is_none());
    }

    #[tokio::test]
    async fn nothing_urgent_or_nobody_to_tell() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mux = NotifierMux::new(vec![Box::new(Recorder {
            fail: false,
            seen: seen.clone(),
        })]);
        assert!(!mux.send(&analysis(&[Urgency::Watch]), None).await);
        assert!(seen.lock().unwrap().is_empty());

        let empty = NotifierMux::new(Vec::new());
        assert!(!empty.send(&analysis(&[Urgency::FilmNow]), None).await);
        assert!(!empty.send_error(&["x".into()]).await);
    }
}
