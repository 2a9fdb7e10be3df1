//! Loki-backed [`LogSource`], grounded in
//! `original_source/packages/copilot/src/copilot/activities/loki.py`'s
//! `_query_loki`/`_detect_patterns`: a `/loki/api/v1/query_range` call
//! over a trailing lookback window, then substring-matched against the
//! caller's `NarrativePatternEntry` catalogue and tallied per
//! `(service, pattern)` pair.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::observation::error::ObservationError;
use crate::observation::traits::LogSource;
use crate::types::signals::{LogPattern, NarrativePatternEntry};

const LOOKBACK: chrono::Duration = chrono::Duration::minutes(10);
const QUERY_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    data: QueryRangeData,
}

#[derive(Debug, Deserialize)]
struct QueryRangeData {
    result: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
struct StreamResult {
    stream: HashMap<String, String>,
    values: Vec<(String, String)>,
}

pub struct LokiLogSource {
    http: reqwest::Client,
    loki_url: String,
}

impl LokiLogSource {
    pub fn new(loki_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(crate::config::defaults::FETCH_HTTP_TIMEOUT_SECS))
            .build()
            .expect("failed to build Loki HTTP client");

        Self { http, loki_url: loki_url.into().trim_end_matches('/').to_string() }
    }

    async fn query_range(&self) -> Result<Vec<(String, String)>, ObservationError> {
        let end = Utc::now();
        let start = end - LOOKBACK;

        let resp = self
            .http
            .get(format!("{}/loki/api/v1/query_range", self.loki_url))
            .query(&[
                ("query", "{job=~\".+\"}".to_string()),
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
                ("limit", QUERY_LIMIT.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ObservationError::FetchFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ObservationError::FetchFailed(format!("loki returned {}", resp.status())));
        }

        let body: QueryRangeResponse =
            resp.json().await.map_err(|e| ObservationError::FetchFailed(e.to_string()))?;

        if body.status != "success" {
            return Err(ObservationError::FetchFailed(format!("loki query status {}", body.status)));
        }

        let mut entries = Vec::new();
        for stream in body.data.result {
            let service = stream
                .stream
                .get("service_name")
                .or_else(|| stream.stream.get("job"))
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            for (_timestamp, message) in stream.values {
                entries.push((service.clone(), message));
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl LogSource for LokiLogSource {
    async fn fetch_recent_patterns(
        &self,
        patterns: &[NarrativePatternEntry],
    ) -> Result<Vec<LogPattern>, ObservationError> {
        let entries = match self.query_range().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "loki query failed, returning no patterns this tick");
                return Ok(Vec::new());
            }
        };

        let mut tallies: HashMap<(String, String), (u64, String)> = HashMap::new();
        for (service, message) in &entries {
            let lower = message.to_lowercase();
            for entry in patterns {
                if *service != entry.service || !lower.contains(&entry.pattern.to_lowercase()) {
                    continue;
                }
                let key = (entry.service.clone(), entry.pattern.clone());
                let slot = tallies.entry(key).or_insert((0, message.clone()));
                slot.0 += 1;
            }
        }

        Ok(tallies
            .into_iter()
            .map(|((service, pattern), (count, sample))| LogPattern { service, pattern, count, sample })
            .collect())
    }
}

/// Used when `log_source.endpoint` is unset. The deep narrator still
/// runs, just with an empty log-pattern list.
pub struct NoOpLogSource;

#[async_trait]
impl LogSource for NoOpLogSource {
    async fn fetch_recent_patterns(
        &self,
        _patterns: &[NarrativePatternEntry],
    ) -> Result<Vec<LogPattern>, ObservationError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_log_source_returns_empty() {
        let source = NoOpLogSource;
        let patterns = vec![NarrativePatternEntry {
            service: "history".to_string(),
            pattern: "shard lost".to_string(),
            description: "history shard ownership lost".to_string(),
        }];
        let out = source.fetch_recent_patterns(&patterns).await.unwrap();
        assert!(out.is_empty());
    }
}
