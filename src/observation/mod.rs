//! The three fixed-logical-id long-running tasks: the Observation Loop,
//! the Log Watcher, and the Scheduled Assessment backstop. Each is the
//! idiomatic-Rust stand-in for a Temporal workflow with
//! `WorkflowIDConflictPolicy::UseExisting` — see [`lease::start_or_adopt`].

pub mod error;
pub mod lease;
pub mod log_watcher;
pub mod observation_loop;
pub mod scheduled;
pub mod sliding_window;
pub mod traits;

pub use error::ObservationError;
pub use lease::{
    start_or_adopt, LEASE_TTL, LOG_WATCHER_LOGICAL_ID, OBSERVATION_LOOP_LOGICAL_ID,
    SCHEDULED_ASSESSMENT_LOGICAL_ID,
};
pub use log_watcher::{LogWatcher, LogWatcherHandle};
pub use observation_loop::{ObservationLoop, ObservationLoopHandle};
pub use scheduled::ScheduledAssessment;
pub use sliding_window::SlidingWindow;
pub use traits::{AssessmentRecordStore, AssessmentRunner, LogSource, SignalSource, WorkflowLeaseStore};
