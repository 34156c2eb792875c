//! Error types for the conmon workspace.
//!
//! [`ConfigError`] messages are printed verbatim on standard error and
//! callers match on their text, so the wording is part of the external
//! interface.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ContainerStatus;

/// A monitor invocation that must be rejected before anything is launched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No container ID given.
    #[error("Container ID not provided. Use --cid")]
    MissingContainerId,

    /// No container UUID given where one is required.
    #[error("Container UUID not provided. Use --cuuid")]
    MissingContainerUuid,

    /// No OCI runtime given.
    #[error("Runtime path not provided. Use --runtime")]
    MissingRuntimePath,

    /// The OCI runtime path does not resolve to a usable entry.
    #[error("Runtime path {} is not valid", path.display())]
    InvalidRuntimePath {
        /// Path as supplied.
        path: PathBuf,
    },

    /// No log driver given.
    #[error("Log driver not provided. Use --log-path")]
    MissingLogDriver,

    /// Two modes that exclude each other were both requested.
    #[error("Cannot use '{first}' and '{second}' at the same time")]
    ConflictingModes {
        /// First mode.
        first: &'static str,
        /// Second mode.
        second: &'static str,
    },

    /// Attach requested outside an exec session.
    #[error("Attach can only be specified with exec")]
    AttachWithoutExec,

    /// Attach requested for a legacy exec session.
    #[error("Attach can only be specified for a non-legacy exec session")]
    AttachRequiresNonLegacyExec,

    /// Exec requested without a process spec.
    #[error("Exec process spec path not provided. Use --exec-process-spec")]
    MissingExecProcessSpec,

    /// A log driver name that is not supported.
    #[error("No such log driver {kind}")]
    UnknownLogDriver {
        /// Driver name exactly as supplied.
        kind: String,
    },

    /// A file-backed log driver could not open its target.
    #[error("Failed to open log file {}: {source}", path.display())]
    LogFileOpenFailed {
        /// Target that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file-backed log driver was given without a target.
    #[error("Log driver {kind} requires a path")]
    MissingLogTarget {
        /// Driver name.
        kind: String,
    },

    /// The container ID is too short to be logged to the journal.
    #[error("Container ID must be longer than 12 characters")]
    ContainerIdTooShort,

    /// An unrecognised `--log-level` value.
    #[error("No such log level {level}")]
    UnknownLogLevel {
        /// Level exactly as supplied.
        level: String,
    },
}

/// Violation of the container lifecycle state machine.
///
/// These indicate a caller bug rather than a runtime condition.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The requested transition is not allowed from the current status.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Status at the time of the call.
        from: ContainerStatus,
        /// Requested status.
        to: ContainerStatus,
    },

    /// A thread panicked while holding the container lock.
    #[error("container lock poisoned")]
    LockPoisoned,
}

/// Failure while supervising the container after validation succeeded.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Invocation was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Container state machine was misused.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// The OCI runtime could not be spawned.
    #[error("failed to spawn runtime {}: {source}", runtime.display())]
    Spawn {
        /// Runtime binary.
        runtime: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The bundle's runtime spec could not be parsed.
    #[error("invalid runtime spec {}: {source}", path.display())]
    Spec {
        /// Spec file.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// Waiting on the supervised process failed.
    #[error("failed to wait for container process: {0}")]
    Wait(std::io::Error),
}

/// Result alias for invocation validation.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias used by the monitor.
pub type Result<T> = std::result::Result<T, MonitorError>;
