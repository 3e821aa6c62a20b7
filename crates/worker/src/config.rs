use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Component worker: runs one graph component per task over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "graphsplit-worker", version, about)]
pub struct WorkerConfig {
    /// Address to bind.
    #[arg(long, env = "WORKER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "WORKER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Root directory for per-task workspaces.
    #[arg(long, env = "WORKER_DIR", default_value = "data/worker")]
    pub dir: PathBuf,

    /// Tasks allowed to run at once; further starts are refused.
    #[arg(long, env = "WORKER_MAX_CONCURRENT", default_value_t = 1)]
    pub max_concurrent: u32,

    /// How long shutdown waits for running tasks.
    #[arg(long, env = "WORKER_SHUTDOWN_GRACE_SECS", default_value_t = 5)]
    pub shutdown_grace_secs: u64,

    /// External program (with arguments) run per task. Without it the
    /// built-in statistics executor is used.
    #[arg(long, env = "WORKER_COMMAND")]
    pub command: Option<String>,
}

impl WorkerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// `command` split on whitespace into program and arguments.
    pub fn command_line(&self) -> Option<(String, Vec<String>)> {
        let mut parts = self.command.as_deref()?.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some((program, parts.collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::parse_from(["graphsplit-worker"]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert!(config.command_line().is_none());
    }

    #[test]
    fn test_command_line_split() {
        let config = WorkerConfig::parse_from([
            "graphsplit-worker",
            "--command",
            "python3 solve.py --fast",
            "--port",
            "9001",
        ]);
        let (program, args) = config.command_line().unwrap();
        assert_eq!(program, "python3");
        assert_eq!(args, vec!["solve.py", "--fast"]);
        assert_eq!(config.addr(), "0.0.0.0:9001");
    }

    #[test]
    fn test_blank_command_is_none() {
        let config = WorkerConfig::parse_from(["graphsplit-worker", "--command", "   "]);
        assert!(config.command_line().is_none());
    }
}
