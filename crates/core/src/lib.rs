pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod protocol;
pub mod status;

pub use config::Config;
pub use error::*;
pub use model::*;
pub use notify::{job_channel, JobNotifier, JobSignals};
pub use status::Status;
