//! Generic HTTP-backed [`KnowledgeBaseClient`], grounded in
//! `fleet::client::FleetClient`'s `reqwest::Client` builder shape. Posts
//! the contributing factors to a configured retrieval endpoint and reads
//! back a flat list of snippet strings; per the trait's contract, any
//! failure degrades to an empty result rather than propagating.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::assessment::knowledge::KnowledgeBaseClient;

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    contributing_factors: &'a [String],
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    snippets: Vec<String>,
}

pub struct HttpKnowledgeBase {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpKnowledgeBase {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(crate::config::defaults::FETCH_HTTP_TIMEOUT_SECS))
            .build()
            .expect("failed to build knowledge base HTTP client");

        Self { http, endpoint: endpoint.into().trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl KnowledgeBaseClient for HttpKnowledgeBase {
    async fn retrieve(&self, contributing_factors: &[String], max_results: usize) -> Vec<String> {
        let req = RetrieveRequest { contributing_factors, max_results };

        let resp = match self.http.post(format!("{}/retrieve", self.endpoint)).json(&req).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "knowledge base request failed, continuing with no context");
                return Vec::new();
            }
        };

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "knowledge base returned non-success, continuing with no context");
            return Vec::new();
        }

        match resp.json::<RetrieveResponse>().await {
            Ok(body) => body.snippets,
            Err(e) => {
                tracing::warn!(error = %e, "knowledge base response was malformed, continuing with no context");
                Vec::new()
            }
        }
    }
}
