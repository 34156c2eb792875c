//! Command-line surface of the monitor.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use conmon_common::config::{ConfigOptions, LogDriverRequest};
use conmon_common::error::{ConfigError, ConfigResult};
use conmon_common::types::ApiVersion;
use tracing::level_filters::LevelFilter;

/// Per-container monitor for OCI runtimes.
#[derive(Parser, Debug)]
#[command(name = "conmon", about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Print the version and commit, then exit.
    #[arg(long)]
    pub version: bool,

    /// Container ID.
    #[arg(short = 'c', long = "cid")]
    pub cid: Option<String>,

    /// Container UUID.
    #[arg(short = 'u', long = "cuuid")]
    pub cuuid: Option<String>,

    /// Container name.
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Path to the OCI runtime binary.
    #[arg(short = 'r', long)]
    pub runtime: Option<PathBuf>,

    /// Additional argument passed to the runtime (repeatable).
    #[arg(long = "runtime-arg")]
    pub runtime_args: Vec<String>,

    /// OCI bundle directory.
    #[arg(short = 'b', long)]
    pub bundle: Option<PathBuf>,

    /// Log destination as `[driver:]target` or `journald` (repeatable).
    #[arg(short = 'l', long = "log-path")]
    pub log_path: Vec<String>,

    /// Identifier attached to journal entries.
    #[arg(long)]
    pub log_tag: Option<String>,

    /// Monitor log level: error, warn, info, debug, or trace.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Run an exec session instead of the container's init process.
    #[arg(short = 'e', long)]
    pub exec: bool,

    /// Allow attaching to the exec session.
    #[arg(long)]
    pub exec_attach: bool,

    /// Process spec for the exec session.
    #[arg(long)]
    pub exec_process_spec: Option<PathBuf>,

    /// Restore the container from a checkpoint image.
    #[arg(long)]
    pub restore: Option<PathBuf>,

    /// Caller API version: 0 for legacy, 1 or higher for v1.
    #[arg(long, default_value_t = 0)]
    pub api_version: u32,

    /// Allocate a terminal for the container process.
    #[arg(short = 't', long)]
    pub terminal: bool,

    /// Keep standard input open.
    #[arg(short = 'i', long)]
    pub stdin: bool,

    /// Directory receiving the container's exit file.
    #[arg(long)]
    pub exit_dir: Option<PathBuf>,

    /// Program run after the container exits.
    #[arg(long)]
    pub exit_command: Option<PathBuf>,

    /// Argument for the exit command (repeatable).
    #[arg(long = "exit-command-arg")]
    pub exit_command_args: Vec<String>,

    /// File receiving the monitor's pid.
    #[arg(short = 'P', long)]
    pub conmon_pidfile: Option<PathBuf>,

    /// Kill the container after this many seconds; 0 disables the limit.
    #[arg(short = 'T', long, default_value_t = 0)]
    pub timeout: u64,
}

impl Cli {
    /// Converts parsed flags into invocation options.
    #[must_use]
    pub fn into_options(self) -> ConfigOptions {
        let mut builder = ConfigOptions::builder()
            .exec(self.exec)
            .exec_attach(self.exec_attach)
            .api_version(ApiVersion::from(self.api_version))
            .terminal(self.terminal)
            .stdin(self.stdin);

        if let Some(cid) = self.cid {
            builder = builder.container_id(cid);
        }
        if let Some(cuuid) = self.cuuid {
            builder = builder.container_uuid(cuuid);
        }
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        if let Some(runtime) = self.runtime {
            builder = builder.runtime_path(runtime);
        }
        for arg in self.runtime_args {
            builder = builder.runtime_arg(arg);
        }
        if let Some(bundle) = self.bundle {
            builder = builder.bundle(bundle);
        }
        for value in &self.log_path {
            let req = parse_log_path(value);
            builder = builder.log_driver(req.driver, req.target);
        }
        if let Some(tag) = self.log_tag {
            builder = builder.log_tag(tag);
        }
        if let Some(spec) = self.exec_process_spec {
            builder = builder.exec_process_spec(spec);
        }
        if let Some(restore) = self.restore {
            builder = builder.restore(restore);
        }
        if let Some(dir) = self.exit_dir {
            builder = builder.exit_dir(dir);
        }
        if let Some(command) = self.exit_command {
            builder = builder.exit_command(command);
        }
        for arg in self.exit_command_args {
            builder = builder.exit_command_arg(arg);
        }
        if let Some(pidfile) = self.conmon_pidfile {
            builder = builder.conmon_pidfile(pidfile);
        }
        if self.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(self.timeout));
        }
        builder.build()
    }
}

/// Splits a `--log-path` value into driver and target.
///
/// A value without `:` is a file path, except the bare word `journald`.
/// The driver name is kept verbatim so unknown names surface later.
#[must_use]
pub fn parse_log_path(value: &str) -> LogDriverRequest {
    match value.split_once(':') {
        Some((driver, target)) => {
            let target = (!target.is_empty()).then(|| PathBuf::from(target));
            LogDriverRequest::new(driver, target)
        }
        None if value == "journald" => LogDriverRequest::new(value, None),
        None => LogDriverRequest::new("", Some(PathBuf::from(value))),
    }
}

/// Maps a `--log-level` value to a filter. Defaults to warn.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownLogLevel`] for unrecognised names.
pub fn parse_log_level(level: Option<&str>) -> ConfigResult<LevelFilter> {
    let Some(level) = level else {
        return Ok(LevelFilter::WARN);
    };
    match level.to_ascii_lowercase().as_str() {
        "error" | "fatal" | "panic" => Ok(LevelFilter::ERROR),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        _ => Err(ConfigError::UnknownLogLevel {
            level: level.to_string(),
        }),
    }
}
