//! Subset of the OCI runtime specification read from a bundle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use conmon_common::constants::BUNDLE_CONFIG;
use conmon_common::error::{MonitorError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Runtime configuration of the container, as found in `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    /// Version of the OCI specification the bundle targets.
    #[serde(default)]
    pub oci_version: String,
    /// Init process.
    #[serde(default)]
    pub process: Option<ProcessSpec>,
    /// Container hostname.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Arbitrary metadata.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

/// Process section of a runtime spec; also the format of exec process specs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpec {
    /// Command and arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// `KEY=value` environment entries.
    #[serde(default)]
    pub env: Vec<String>,
    /// Working directory.
    #[serde(default)]
    pub cwd: String,
    /// Whether a terminal is attached.
    #[serde(default)]
    pub terminal: bool,
}

impl RuntimeSpec {
    /// Reads `config.json` from a bundle directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be read or parsed.
    pub fn load(bundle: &Path) -> Result<Self> {
        let path = bundle.join(BUNDLE_CONFIG);
        read_json(&path)
    }
}

impl ProcessSpec {
    /// Reads an exec process spec.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| MonitorError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| MonitorError::Spec {
        path: PathBuf::from(path),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reads_bundle_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("config.json"),
            r#"{
                "ociVersion": "1.0.2",
                "process": {"args": ["/bin/sh"], "cwd": "/", "terminal": false},
                "hostname": "box",
                "annotations": {"io.example/role": "web"},
                "linux": {"namespaces": []}
            }"#,
        )
        .expect("write");

        let spec = RuntimeSpec::load(dir.path()).expect("load");
        assert_eq!(spec.oci_version, "1.0.2");
        assert_eq!(spec.process.expect("process").args, vec!["/bin/sh"]);
        assert_eq!(spec.hostname.as_deref(), Some("box"));
        assert_eq!(
            spec.annotations.get("io.example/role").map(String::as_str),
            Some("web")
        );
    }

    #[test]
    fn load_missing_config_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = RuntimeSpec::load(dir.path()).unwrap_err();
        assert!(matches!(err, MonitorError::Io { .. }));
    }

    #[test]
    fn load_malformed_config_is_spec_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("config.json"), "{not json").expect("write");
        let err = RuntimeSpec::load(dir.path()).unwrap_err();
        assert!(matches!(err, MonitorError::Spec { .. }));
    }

    #[test]
    fn process_spec_loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("process.json");
        std::fs::write(&path, r#"{"args": ["ls", "-l"], "env": ["A=1"]}"#).expect("write");
        let spec = ProcessSpec::load(&path).expect("load");
        assert_eq!(spec.args, vec!["ls", "-l"]);
        assert_eq!(spec.env, vec!["A=1"]);
    }
}
