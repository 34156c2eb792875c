//! Lifecycle state of the monitored container.
//!
//! `created → running → stopped`, each step taken at most once. The
//! transitions here are plain field updates; [`crate::container::Container`]
//! serialises them behind its lock.

use chrono::{DateTime, Utc};
use conmon_common::error::ContainerError;
use conmon_common::types::ContainerStatus;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the container's process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    /// Current phase.
    pub status: ContainerStatus,
    /// PID of the supervised process, once started.
    pub pid: Option<u32>,
    /// Exit code, set only once stopped.
    pub exit_code: Option<i32>,
    /// When the process was observed started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the process was observed exited.
    pub finished_at: Option<DateTime<Utc>>,
}

impl ContainerState {
    /// Moves `created → running`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidTransition`] from any other status;
    /// the state is left untouched.
    pub fn start(&mut self, pid: u32, at: DateTime<Utc>) -> Result<(), ContainerError> {
        self.require(ContainerStatus::Created, ContainerStatus::Running)?;
        self.status = ContainerStatus::Running;
        self.pid = Some(pid);
        self.started_at = Some(at);
        Ok(())
    }

    /// Moves `running → stopped`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidTransition`] from any other status,
    /// including a second call once stopped.
    pub fn stop(&mut self, exit_code: i32, at: DateTime<Utc>) -> Result<(), ContainerError> {
        self.require(ContainerStatus::Running, ContainerStatus::Stopped)?;
        self.status = ContainerStatus::Stopped;
        self.exit_code = Some(exit_code);
        self.finished_at = Some(at);
        Ok(())
    }

    /// Checks that the container may still be started.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidTransition`] unless the container is
    /// still `created`.
    pub fn check_start(&self) -> Result<(), ContainerError> {
        self.require(ContainerStatus::Created, ContainerStatus::Running)
    }

    fn require(&self, from: ContainerStatus, to: ContainerStatus) -> Result<(), ContainerError> {
        if self.status == from {
            Ok(())
        } else {
            Err(ContainerError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}
