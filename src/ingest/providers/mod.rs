pub mod reddit;
pub mod trends;
pub mod youtube;

use std::time::Duration;

use crate::config::radar::HttpConfig;
use crate::error::SourceError;

/// HTTP client with request and connect timeouts; every connector goes
/// through one of these so no call can hang a scan.
pub fn http_client(cfg: &HttpConfig, user_agent: &str) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .build()
        .map_err(|e| SourceError::Unavailable(format!("http client: {e}")))
}

/// Serializes sub-queries against one host: sleeps `delay` before every
/// request but the first. Hosts start rejecting silently without it.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

/// Counts sub-query outcomes so a connector can tell "some failed" (fine)
/// from "the host is unreachable" (source unavailable).
#[derive(Debug, Default)]
pub(crate) struct SubQueryTally {
    pub attempted: usize,
    pub transport_failures: usize,
    pub last_error: Option<String>,
}

impl SubQueryTally {
    pub fn record(&mut self, source: &'static str, query: &str, result: &Result<usize, SourceError>) {
        self.attempted += 1;
        match result {
            Ok(n) => tracing::debug!(target: "ingest", source, query, items = n, "sub-query ok"),
            Err(e) => {
                tracing::warn!(target: "ingest", source, query, error = %e, "sub-query skipped");
                if matches!(e, SourceError::Unavailable(_) | SourceError::Timeout(_)) {
                    self.transport_failures += 1;
                    self.last_error = Some(e.to_string());
                }
            }
        }
    }

    /// Every attempted sub-query failed at the transport level.
    pub fn into_result(self, source: &'static str) -> Result<(), SourceError> {
        if self.attempted > 0 && self.transport_failures == self.attempted {
            return Err(SourceError::Unavailable(format!(
                "{source}: all {} sub-queries failed (last: {})",
                self.attempted,
                self.last_error.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_only_fails_when_every_query_failed_at_transport() {
        let mut t = SubQueryTally::default();
        t.record("reddit", "a", &Err(SourceError::Unavailable("503".into())));
        t.record("reddit", "b", &Ok(3));
        assert!(t.into_result("reddit").is_ok());

        let mut t = SubQueryTally::default();
        t.record("reddit", "a", &Err(SourceError::Unavailable("503".into())));
        t.record("reddit", "b", &Err(SourceError::Parse("bad json".into())));
        assert!(t.into_result("reddit").is_ok());

        let mut t = SubQueryTally::default();
        t.record("reddit", "a", &Err(SourceError::Unavailable("503".into())));
        t.record("reddit", "b", &Err(SourceError::Unavailable("503".into())));
        assert!(matches!(t.into_result("reddit"), Err(SourceError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_skips_first_delay() {
        let mut p = Pacer::from_millis(200);
        let t0 = tokio::time::Instant::now();
        p.wait().await;
        assert_eq!(t0.elapsed(), Duration::ZERO);
        p.wait().await;
        p.wait().await;
        assert!(t0.elapsed() >= Duration::from_millis(400));
    }
}
