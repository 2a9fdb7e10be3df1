//! Concrete Postgres (DSQL-compatible) implementations of every
//! persistence trait the rest of the crate only ever depends on through
//! its trait object: [`crate::observation::traits::AssessmentRecordStore`],
//! [`crate::observation::traits::WorkflowLeaseStore`],
//! [`crate::assessment::store::AssessmentStore`], and
//! [`crate::profiles::store::BehaviourProfileStore`]. Nothing outside this
//! module and `src/bin/copilot_db.rs` imports `sqlx` directly.

pub mod assessment;
pub mod assessment_record;
pub mod lease;
pub mod pool;
pub mod profile;

pub use assessment::PgAssessmentStore;
pub use assessment_record::PgAssessmentRecordStore;
pub use lease::PgWorkflowLeaseStore;
pub use pool::{create_pool, run_migrations};
pub use profile::PgBehaviourProfileStore;
