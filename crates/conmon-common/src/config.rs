//! Invocation options for a single monitor run.
//!
//! [`ConfigOptions`] is plain data assembled one setting at a time through
//! [`ConfigOptionsBuilder`]. Nothing is checked here: required fields and
//! cross-field rules are enforced by the validator in `conmon-runtime`.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::ApiVersion;

/// A requested log destination, before the driver name is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDriverRequest {
    /// Driver name exactly as supplied (`""`, `path`, `k8s-file`, `journald`, ...).
    pub driver: String,
    /// Optional filesystem target.
    pub target: Option<PathBuf>,
}

impl LogDriverRequest {
    /// Creates a request for the named driver.
    #[must_use]
    pub fn new(driver: impl Into<String>, target: Option<PathBuf>) -> Self {
        Self {
            driver: driver.into(),
            target,
        }
    }
}

/// Every setting a monitor invocation can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOptions {
    /// Container ID (`--cid`).
    pub container_id: Option<String>,
    /// Container UUID (`--cuuid`).
    pub container_uuid: Option<String>,
    /// Human-readable container name.
    pub name: Option<String>,
    /// OCI runtime binary (`--runtime`).
    pub runtime_path: Option<PathBuf>,
    /// Extra arguments placed before the runtime subcommand.
    pub runtime_args: Vec<String>,
    /// OCI bundle directory.
    pub bundle: Option<PathBuf>,
    /// Log destinations, in the order given.
    pub log_drivers: Vec<LogDriverRequest>,
    /// Identifier attached to journal entries.
    pub log_tag: Option<String>,
    /// Run an exec session rather than the container's init process.
    pub exec: bool,
    /// Allow callers to attach to the exec session.
    pub exec_attach: bool,
    /// Process spec for the exec session.
    pub exec_process_spec: Option<PathBuf>,
    /// Checkpoint image to restore from.
    pub restore: Option<PathBuf>,
    /// Caller-facing API version.
    pub api_version: ApiVersion,
    /// Allocate a terminal for the container process.
    pub terminal: bool,
    /// Keep standard input open for the container process.
    pub stdin: bool,
    /// Directory receiving a file named after the container holding its exit code.
    pub exit_dir: Option<PathBuf>,
    /// Program run once the container has exited.
    pub exit_command: Option<PathBuf>,
    /// Arguments for the exit command.
    pub exit_command_args: Vec<String>,
    /// File receiving the monitor's own pid.
    pub conmon_pidfile: Option<PathBuf>,
    /// Supervision limit; the runtime is killed once it is exceeded.
    pub timeout: Option<Duration>,
}

impl ConfigOptions {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> ConfigOptionsBuilder {
        ConfigOptionsBuilder::default()
    }

    /// Returns `true` if a container ID was supplied and is non-empty.
    #[must_use]
    pub fn has_container_id(&self) -> bool {
        self.container_id.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns `true` if a container UUID was supplied and is non-empty.
    #[must_use]
    pub fn has_container_uuid(&self) -> bool {
        self.container_uuid.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns `true` for an exec session on the legacy API.
    #[must_use]
    pub fn is_legacy_exec(&self) -> bool {
        self.exec && self.api_version == ApiVersion::Legacy
    }
}

/// Accumulates [`ConfigOptions`] one setting at a time.
#[derive(Debug, Default)]
pub struct ConfigOptionsBuilder {
    options: ConfigOptions,
}

impl ConfigOptionsBuilder {
    /// Sets the container ID.
    #[must_use]
    pub fn container_id(mut self, id: impl Into<String>) -> Self {
        self.options.container_id = Some(id.into());
        self
    }

    /// Sets the container UUID.
    #[must_use]
    pub fn container_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.options.container_uuid = Some(uuid.into());
        self
    }

    /// Sets the container name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    /// Sets the OCI runtime binary.
    #[must_use]
    pub fn runtime_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.runtime_path = Some(path.into());
        self
    }

    /// Appends an argument passed to the runtime before its subcommand.
    #[must_use]
    pub fn runtime_arg(mut self, arg: impl Into<String>) -> Self {
        self.options.runtime_args.push(arg.into());
        self
    }

    /// Sets the OCI bundle directory.
    #[must_use]
    pub fn bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.bundle = Some(path.into());
        self
    }

    /// Appends a log destination.
    #[must_use]
    pub fn log_driver(mut self, driver: impl Into<String>, target: Option<PathBuf>) -> Self {
        self.options
            .log_drivers
            .push(LogDriverRequest::new(driver, target));
        self
    }

    /// Sets the journal identifier.
    #[must_use]
    pub fn log_tag(mut self, tag: impl Into<String>) -> Self {
        self.options.log_tag = Some(tag.into());
        self
    }

    /// Requests an exec session.
    #[must_use]
    pub const fn exec(mut self, exec: bool) -> Self {
        self.options.exec = exec;
        self
    }

    /// Requests an attachable exec session.
    #[must_use]
    pub const fn exec_attach(mut self, attach: bool) -> Self {
        self.options.exec_attach = attach;
        self
    }

    /// Sets the exec process spec.
    #[must_use]
    pub fn exec_process_spec(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.exec_process_spec = Some(path.into());
        self
    }

    /// Sets the checkpoint image to restore from.
    #[must_use]
    pub fn restore(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.restore = Some(path.into());
        self
    }

    /// Sets the caller-facing API version.
    #[must_use]
    pub const fn api_version(mut self, version: ApiVersion) -> Self {
        self.options.api_version = version;
        self
    }

    /// Requests a terminal.
    #[must_use]
    pub const fn terminal(mut self, terminal: bool) -> Self {
        self.options.terminal = terminal;
        self
    }

    /// Keeps standard input open.
    #[must_use]
    pub const fn stdin(mut self, stdin: bool) -> Self {
        self.options.stdin = stdin;
        self
    }

    /// Sets the exit file directory.
    #[must_use]
    pub fn exit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.exit_dir = Some(dir.into());
        self
    }

    /// Sets the exit command.
    #[must_use]
    pub fn exit_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.options.exit_command = Some(command.into());
        self
    }

    /// Appends an exit command argument.
    #[must_use]
    pub fn exit_command_arg(mut self, arg: impl Into<String>) -> Self {
        self.options.exit_command_args.push(arg.into());
        self
    }

    /// Sets the file receiving the monitor's pid.
    #[must_use]
    pub fn conmon_pidfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.conmon_pidfile = Some(path.into());
        self
    }

    /// Kills the runtime if it is still running after `limit`.
    #[must_use]
    pub const fn timeout(mut self, limit: Duration) -> Self {
        self.options.timeout = Some(limit);
        self
    }

    /// Returns the accumulated options. Never fails.
    #[must_use]
    pub fn build(self) -> ConfigOptions {
        self.options
    }
}
