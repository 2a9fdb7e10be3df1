//! Where a finished [`crate::types::assessment::Assessment`] (and the
//! `Issue`s it fans out into) actually gets written. Distinct from
//! [`crate::observation::traits::AssessmentRecordStore`]: that trait is
//! the narrow slice the observation loops need (latest assessment for
//! startup reconciliation, dedup window checks); this one is the
//! pipeline's own full read/write surface, including the Read API's
//! timeline/summary queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::assessment::Assessment;

#[derive(Debug, thiserror::Error)]
pub enum AssessmentStoreError {
    #[error("assessment store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn persist(&self, assessment: &Assessment) -> Result<(), AssessmentStoreError>;

    async fn latest(&self) -> Result<Option<Assessment>, AssessmentStoreError>;

    async fn timeline(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Assessment>, AssessmentStoreError>;
}
