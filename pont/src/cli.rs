//! # CLI
//!
//! This module defines the configuration of `pont` using `clap`.
//!
//! Every option can also be set through its environment variable, which is how the gateway is
//! usually configured when deployed as a sidecar next to the gRPC server.
use clap::{Parser, ValueEnum};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "pont", version, about = "HTTP/JSON gateway for gRPC servers")]
pub struct Cli {
    /// The HTTP port the gateway listens on
    #[arg(long, env = "PORT", default_value_t = 6666)]
    pub port: u16,

    /// Host of the upstream gRPC server
    #[arg(long, env = "GRPC_SERVER_HOST", default_value = "127.0.0.1")]
    pub grpc_server_host: String,

    /// Port of the upstream gRPC server
    #[arg(long, env = "GRPC_SERVER_PORT", default_value_t = 9090)]
    pub grpc_server_port: u16,

    /// Log level: DEBUG, INFO or ERROR
    #[arg(long, env = "LOG_LEVEL", value_enum, ignore_case = true, default_value = "INFO")]
    pub log_level: LogLevel,

    /// Deadline applied to every call, reflection included (milliseconds)
    #[arg(long = "call-timeout-ms", env = "GRPC_CALL_TIMEOUT_MS", value_parser = parse_millis)]
    pub call_timeout: Option<Duration>,

    /// How often the upstream connection is probed (milliseconds)
    #[arg(
        long = "probe-interval-ms",
        env = "UPSTREAM_PROBE_INTERVAL_MS",
        value_parser = parse_millis,
        default_value = "5000"
    )]
    pub probe_interval: Duration,
}

impl Cli {
    /// The upstream gRPC server URI (e.g. `http://127.0.0.1:9090`).
    pub fn upstream_uri(&self) -> String {
        format!("http://{}:{}", self.grpc_server_host, self.grpc_server_port)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

fn parse_millis(value: &str) -> Result<Duration, String> {
    let millis: u64 = value
        .trim()
        .parse()
        .map_err(|e| format!("Invalid number of milliseconds '{value}': {e}"))?;

    if millis == 0 {
        return Err("Duration must be greater than zero".to_string());
    }

    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pont"]).unwrap();

        assert_eq!(cli.port, 6666);
        assert_eq!(cli.upstream_uri(), "http://127.0.0.1:9090");
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.call_timeout, None);
        assert_eq!(cli.probe_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_arguments() {
        let cli = Cli::try_parse_from([
            "pont",
            "--port",
            "8080",
            "--grpc-server-host",
            "backend",
            "--grpc-server-port",
            "50051",
            "--log-level",
            "debug",
            "--call-timeout-ms",
            "1500",
        ])
        .unwrap();

        assert_eq!(cli.port, 8080);
        assert_eq!(cli.upstream_uri(), "http://backend:50051");
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.call_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let result = Cli::try_parse_from(["pont", "--log-level", "TRACE"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = Cli::try_parse_from(["pont", "--call-timeout-ms", "0"]);

        assert!(result.is_err());
    }
}
