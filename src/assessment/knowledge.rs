//! Retrieval seam for the deep narration path, mirroring the teacher's
//! `context::knowledge_store::KnowledgeStore` split between a real backend
//! and a `NoOpStore` for when no knowledge base is configured. Here the
//! query is always "what do we know about these contributing factors",
//! so the trait is async (a real backend is a remote vector/keyword
//! service) rather than the teacher's synchronous in-process search.

use async_trait::async_trait;

#[async_trait]
pub trait KnowledgeBaseClient: Send + Sync {
    /// Returns up to `max_results` context snippets relevant to the given
    /// contributing factors. Never fails the pipeline: a client that can't
    /// reach its backend should return `Ok(vec![])`, not an error — the
    /// deep narrator must still run with whatever context it has.
    async fn retrieve(&self, contributing_factors: &[String], max_results: usize) -> Vec<String>;
}

/// Used when no knowledge base is configured. Always returns no context,
/// never fails.
pub struct NoOpKnowledgeBase;

#[async_trait]
impl KnowledgeBaseClient for NoOpKnowledgeBase {
    async fn retrieve(&self, _contributing_factors: &[String], _max_results: usize) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_always_returns_empty() {
        let kb = NoOpKnowledgeBase;
        let out = kb.retrieve(&["dsql_pool_exhaustion".to_string()], 5).await;
        assert!(out.is_empty());
    }
}
