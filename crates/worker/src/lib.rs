//! Worker node: accepts component tasks over HTTP, runs them in per-task
//! workspaces and reports their state when polled.

pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod runner;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{ExecError, RunnerError, WorkspaceError};
pub use executor::{CommandExecutor, ComponentStats, Executor, StatsExecutor};
pub use http::{build_router, serve};
pub use runner::{DrainReport, WorkerRunner};
pub use workspace::{TaskDir, TaskState, Workspace};
