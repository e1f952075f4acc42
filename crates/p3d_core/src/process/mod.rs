//! External process execution.

mod runner;

pub use runner::{ProcessError, ProcessOutput, ProcessRunner, SystemRunner};
