//! Job scheduling: decomposition of pending jobs into tasks, dispatch to the
//! worker pool, and completion polling.

pub mod backoff;
pub mod client;
pub mod completion;
pub mod config;
pub mod decomposition;
pub mod dispatch;
pub mod error;
pub mod runner;
pub mod shutdown;

pub use backoff::{Backoff, BackoffPolicy};
pub use client::{HttpWorkerClient, WorkerClient};
pub use completion::{poll_one, PollOutcome};
pub use config::SchedulerConfig;
pub use decomposition::{decompose_next, DecomposeOutcome};
pub use dispatch::{dispatch_one, DispatchOutcome};
pub use error::{ClientError, ConfigError, SchedulerError};
pub use runner::{Scheduler, SchedulerHandle};
pub use shutdown::Shutdown;
