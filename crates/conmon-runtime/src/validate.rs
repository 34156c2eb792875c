//! Cross-field validation of monitor invocation options.
//!
//! Checks run in a fixed order and stop at the first failure; only that
//! failure is reported.

use std::ops::Deref;
use std::path::Path;

use conmon_common::config::ConfigOptions;
use conmon_common::error::{ConfigError, ConfigResult};
use conmon_common::types::ContainerId;
use nix::unistd::{AccessFlags, access};

/// Options that passed every invocation check.
///
/// Only [`validate`] produces this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    options: ConfigOptions,
}

impl ValidatedConfig {
    /// Returns the container ID. Guaranteed non-empty.
    #[must_use]
    pub fn container_id(&self) -> ContainerId {
        ContainerId::new(self.options.container_id.clone().unwrap_or_default())
    }

    /// Returns the runtime binary. Guaranteed to exist.
    #[must_use]
    pub fn runtime_path(&self) -> &Path {
        self.options.runtime_path.as_deref().unwrap_or(Path::new(""))
    }

    /// Returns the underlying options.
    #[must_use]
    pub fn into_options(self) -> ConfigOptions {
        self.options
    }
}

impl Deref for ValidatedConfig {
    type Target = ConfigOptions;

    fn deref(&self) -> &Self::Target {
        &self.options
    }
}

/// Validates invocation options.
///
/// # Checks performed
///
/// 1. Container ID is present.
/// 2. Container UUID is present, unless this is a legacy exec session.
/// 3. Runtime path is present and resolves to an executable entry.
/// 4. At least one log driver is requested.
/// 5. Exec session constraints, see [`crate::exec::check`].
///
/// Log drivers are only counted here; [`crate::logs::resolve`] opens them.
///
/// # Errors
///
/// Returns the [`ConfigError`] of the first failing check.
pub fn validate(options: ConfigOptions) -> ConfigResult<ValidatedConfig> {
    check_container_id(&options)?;
    check_container_uuid(&options)?;
    check_runtime_path(&options)?;
    check_log_drivers(&options)?;
    crate::exec::check(&options)?;
    tracing::debug!(
        cid = options.container_id.as_deref().unwrap_or_default(),
        drivers = options.log_drivers.len(),
        "invocation validated"
    );
    Ok(ValidatedConfig { options })
}

fn check_container_id(options: &ConfigOptions) -> ConfigResult<()> {
    if options.has_container_id() {
        Ok(())
    } else {
        Err(ConfigError::MissingContainerId)
    }
}

// Legacy exec sessions predate the UUID; the exec stage re-checks it for v1.
fn check_container_uuid(options: &ConfigOptions) -> ConfigResult<()> {
    if options.has_container_uuid() || options.is_legacy_exec() {
        Ok(())
    } else {
        Err(ConfigError::MissingContainerUuid)
    }
}

fn check_runtime_path(options: &ConfigOptions) -> ConfigResult<()> {
    let path = options
        .runtime_path
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(ConfigError::MissingRuntimePath)?;
    if access(path, AccessFlags::X_OK).is_err() {
        return Err(ConfigError::InvalidRuntimePath {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn check_log_drivers(options: &ConfigOptions) -> ConfigResult<()> {
    if options.log_drivers.is_empty() {
        Err(ConfigError::MissingLogDriver)
    } else {
        Ok(())
    }
}
