//! Job control: pause gate, run log, leases, the scheduler and the admin
//! surface.

pub mod admin;
pub mod gate;
pub mod lease;
pub mod names;
pub mod run_log;
pub mod runner;
pub mod scheduler;
pub mod tasks;

pub use admin::{AdminService, JobStatus, RunSummary};
pub use gate::JobGate;
pub use lease::{ttl_from_secs, LeaseGuard, LeaseManager};
pub use run_log::{JobRunGuard, RunId, RunLogger};
pub use runner::{Firing, Job, JobRunner};
pub use scheduler::Scheduler;
pub use tasks::{AggregationJob, ExtractionJob, PreprocessJob, PurgeJob, WindowSpec};
