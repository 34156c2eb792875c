//! Domain primitive types used across the conmon workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::SHORT_ID_LEN;

/// Externally supplied identifier of the monitored container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the truncated form used as the journal's `CONTAINER_ID`.
    ///
    /// At most [`SHORT_ID_LEN`] bytes are kept. A multi-byte character that
    /// would be cut in half is dropped entirely.
    #[must_use]
    pub fn short(&self) -> &str {
        let mut end = self.0.len().min(SHORT_ID_LEN);
        while !self.0.is_char_boundary(end) {
            end -= 1;
        }
        &self.0[..end]
    }

    /// Returns the length of the ID in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version of the caller-facing monitor API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiVersion {
    /// Original protocol; exec sessions can not be attached to.
    #[default]
    Legacy,
    /// First versioned protocol.
    V1,
}

impl From<u32> for ApiVersion {
    fn from(raw: u32) -> Self {
        if raw == 0 { Self::Legacy } else { Self::V1 }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::V1 => write!(f, "v1"),
        }
    }
}

/// Kind of a container log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogDriverKind {
    /// Bare file path, written in the CRI log format.
    Path,
    /// systemd journal.
    Journald,
    /// Kubernetes CRI log file.
    K8sFile,
}

impl LogDriverKind {
    /// Returns `true` if the driver writes to a file on disk.
    #[must_use]
    pub const fn is_file(self) -> bool {
        matches!(self, Self::Path | Self::K8sFile)
    }
}

impl FromStr for LogDriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "path" => Ok(Self::Path),
            "journald" => Ok(Self::Journald),
            "k8s-file" => Ok(Self::K8sFile),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for LogDriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Journald => write!(f, "journald"),
            Self::K8sFile => write!(f, "k8s-file"),
        }
    }
}

/// Lifecycle phase of the monitored container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Container entity exists but the runtime process has not been observed.
    #[default]
    Created,
    /// Runtime process has been observed started.
    Running,
    /// Supervised process has exited. Terminal.
    Stopped,
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Output stream of the supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}
