//! Exec session constraints.
//!
//! Evaluated in order; the first match wins:
//!
//! | condition                         | error                          |
//! |-----------------------------------|--------------------------------|
//! | exec ∧ restore                    | `ConflictingModes`             |
//! | attach ∧ ¬exec                    | `AttachWithoutExec`            |
//! | attach ∧ legacy API               | `AttachRequiresNonLegacyExec`  |
//! | exec ∧ v1 API ∧ no UUID           | `MissingContainerUuid`         |
//! | exec ∧ no process spec            | `MissingExecProcessSpec`       |

use conmon_common::config::ConfigOptions;
use conmon_common::error::{ConfigError, ConfigResult};
use conmon_common::types::ApiVersion;

/// Checks the exec, restore, and attach settings of an invocation.
///
/// # Errors
///
/// Returns the first violated constraint from the table above.
pub fn check(options: &ConfigOptions) -> ConfigResult<()> {
    if options.exec && options.restore.is_some() {
        return Err(ConfigError::ConflictingModes {
            first: "exec",
            second: "restore",
        });
    }
    if options.exec_attach {
        if !options.exec {
            return Err(ConfigError::AttachWithoutExec);
        }
        if options.api_version == ApiVersion::Legacy {
            return Err(ConfigError::AttachRequiresNonLegacyExec);
        }
    }
    if options.exec {
        if options.api_version == ApiVersion::V1 && !options.has_container_uuid() {
            return Err(ConfigError::MissingContainerUuid);
        }
        if options.exec_process_spec.is_none() {
            return Err(ConfigError::MissingExecProcessSpec);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_options() -> conmon_common::config::ConfigOptionsBuilder {
        ConfigOptions::builder()
            .container_id("abcdefghijklm")
            .container_uuid("abcdefghijklm")
            .exec(true)
            .exec_process_spec("/tmp/process.json")
    }

    #[test]
    fn plain_container_passes() {
        assert!(check(&ConfigOptions::default()).is_ok());
    }

    #[test]
    fn exec_and_restore_conflict() {
        let opts = exec_options()
            .restore("/tmp/checkpoint")
            .exec_attach(true)
            .build();
        let err = check(&opts).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot use 'exec' and 'restore' at the same time"
        );
    }

    #[test]
    fn restore_alone_passes() {
        let opts = ConfigOptions::builder().restore("/tmp/checkpoint").build();
        assert!(check(&opts).is_ok());
    }

    #[test]
    fn attach_without_exec_fails_for_every_api_version() {
        for version in [ApiVersion::Legacy, ApiVersion::V1] {
            let opts = ConfigOptions::builder()
                .exec_attach(true)
                .api_version(version)
                .build();
            let err = check(&opts).unwrap_err();
            assert!(matches!(err, ConfigError::AttachWithoutExec), "{version}");
        }
    }

    #[test]
    fn attach_on_legacy_exec_fails() {
        let opts = exec_options().exec_attach(true).build();
        let err = check(&opts).unwrap_err();
        assert!(matches!(err, ConfigError::AttachRequiresNonLegacyExec));
    }

    #[test]
    fn attach_on_legacy_exec_without_uuid_still_reports_attach() {
        let mut opts = exec_options().exec_attach(true).build();
        opts.container_uuid = None;
        let err = check(&opts).unwrap_err();
        assert!(matches!(err, ConfigError::AttachRequiresNonLegacyExec));
    }

    #[test]
    fn v1_exec_without_uuid_fails() {
        let mut opts = exec_options()
            .exec_attach(true)
            .api_version(ApiVersion::V1)
            .build();
        opts.container_uuid = None;
        let err = check(&opts).unwrap_err();
        assert!(matches!(err, ConfigError::MissingContainerUuid));
    }

    #[test]
    fn v1_attached_exec_passes() {
        let opts = exec_options()
            .exec_attach(true)
            .api_version(ApiVersion::V1)
            .build();
        assert!(check(&opts).is_ok());
    }

    #[test]
    fn exec_without_process_spec_fails() {
        let mut opts = exec_options().build();
        opts.exec_process_spec = None;
        let err = check(&opts).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Exec process spec path not provided. Use --exec-process-spec"
        );
    }
}
