//! The container entity supervised by the monitor.
//!
//! Identity, metadata, and the runtime spec are fixed at construction and
//! read without locking. Everything mutated afterwards sits behind a single
//! read-write lock shared by the supervision, exec-attach, and status-query
//! paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use conmon_common::error::ContainerError;
use conmon_common::types::ContainerId;

use crate::spec::RuntimeSpec;
use crate::state::ContainerState;
use crate::validate::ValidatedConfig;

/// Immutable identity of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerIdentity {
    /// Externally supplied ID.
    pub id: ContainerId,
    /// Externally supplied UUID; empty for legacy exec sessions.
    pub uuid: String,
    /// Human-readable name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// OCI bundle directory.
    pub bundle_path: PathBuf,
    /// Runtime handler name.
    pub runtime_handler: String,
    /// Labels.
    pub labels: HashMap<String, String>,
    /// Annotations.
    pub annotations: HashMap<String, String>,
}

/// Pod-level metadata of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerMetadata {
    /// Name within the pod.
    pub name: String,
    /// Restart attempt counter.
    pub attempt: u32,
}

#[derive(Debug, Default)]
struct Mutable {
    state: ContainerState,
    mount_point: Option<PathBuf>,
    created: bool,
}

/// A monitored container.
#[derive(Debug)]
pub struct Container {
    identity: ContainerIdentity,
    metadata: ContainerMetadata,
    spec: RuntimeSpec,
    op_lock: RwLock<Mutable>,
}

impl Container {
    /// Creates a container in the `created` status.
    #[must_use]
    pub fn new(identity: ContainerIdentity, metadata: ContainerMetadata, spec: RuntimeSpec) -> Self {
        Self {
            identity,
            metadata,
            spec,
            op_lock: RwLock::new(Mutable::default()),
        }
    }

    /// Creates a container from a validated invocation.
    ///
    /// Annotations are taken from the runtime spec.
    #[must_use]
    pub fn from_config(config: &ValidatedConfig, spec: RuntimeSpec) -> Self {
        let name = config.name.clone().unwrap_or_default();
        let identity = ContainerIdentity {
            id: config.container_id(),
            uuid: config.container_uuid.clone().unwrap_or_default(),
            name: name.clone(),
            bundle_path: config.bundle.clone().unwrap_or_default(),
            runtime_handler: config
                .runtime_path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            annotations: spec.annotations.clone(),
            ..ContainerIdentity::default()
        };
        let metadata = ContainerMetadata { name, attempt: 0 };
        Self::new(identity, metadata, spec)
    }

    /// Returns the container ID.
    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.identity.id
    }

    /// Returns the immutable identity.
    #[must_use]
    pub const fn identity(&self) -> &ContainerIdentity {
        &self.identity
    }

    /// Returns the pod metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ContainerMetadata {
        &self.metadata
    }

    /// Returns the runtime spec.
    #[must_use]
    pub const fn spec(&self) -> &RuntimeSpec {
        &self.spec
    }

    /// Records that the supervised process started.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidTransition`] unless the container
    /// is `created`.
    pub fn mark_started(&self, pid: u32, at: DateTime<Utc>) -> Result<(), ContainerError> {
        self.write()?.state.start(pid, at)?;
        tracing::info!(id = %self.identity.id, pid, "container started");
        Ok(())
    }

    /// Records that the supervised process exited.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidTransition`] unless the container
    /// is `running`; a second call always fails.
    pub fn mark_stopped(&self, exit_code: i32) -> Result<(), ContainerError> {
        self.write()?.state.stop(exit_code, Utc::now())?;
        tracing::info!(id = %self.identity.id, exit_code, "container stopped");
        Ok(())
    }

    /// Returns a copy of the current state.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::LockPoisoned`] if a writer panicked.
    pub fn snapshot(&self) -> Result<ContainerState, ContainerError> {
        Ok(self.read()?.state.clone())
    }

    /// Records the root filesystem mount point.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::LockPoisoned`] if a writer panicked.
    pub fn set_mount_point(&self, path: &Path) -> Result<(), ContainerError> {
        self.write()?.mount_point = Some(path.to_path_buf());
        Ok(())
    }

    /// Returns the root filesystem mount point, if recorded.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::LockPoisoned`] if a writer panicked.
    pub fn mount_point(&self) -> Result<Option<PathBuf>, ContainerError> {
        Ok(self.read()?.mount_point.clone())
    }

    /// Flags the container as created by the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::LockPoisoned`] if a writer panicked.
    pub fn mark_created(&self) -> Result<(), ContainerError> {
        self.write()?.created = true;
        Ok(())
    }

    /// Returns `true` once the runtime created the container.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::LockPoisoned`] if a writer panicked.
    pub fn is_created(&self) -> Result<bool, ContainerError> {
        Ok(self.read()?.created)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Mutable>, ContainerError> {
        self.op_lock.read().map_err(|_| ContainerError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Mutable>, ContainerError> {
        self.op_lock.write().map_err(|_| ContainerError::LockPoisoned)
    }
}
