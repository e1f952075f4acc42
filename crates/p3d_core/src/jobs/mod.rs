//! Background job launching and identification.

mod launcher;

pub use launcher::{next_job_id, JobLauncher, JobOutcome};
