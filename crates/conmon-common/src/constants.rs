//! Process-wide constants.

/// Name used as the prefix of every message printed on standard error.
pub const APP_NAME: &str = "conmon";

/// Crate version reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source revision reported by `--version`, injected at build time.
pub const COMMIT: &str = match option_env!("CONMON_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

/// Width of the short container ID written to the journal.
///
/// Journald logging requires the full ID to be strictly longer than this.
pub const SHORT_ID_LEN: usize = 12;

/// Native protocol socket of systemd-journald.
pub const JOURNAL_SOCKET: &str = "/run/systemd/journal/socket";

/// Name of the OCI runtime configuration file inside a bundle.
pub const BUNDLE_CONFIG: &str = "config.json";

/// Exit code reported when the process status can not be decoded.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Offset added to a terminating signal number to form the exit code.
pub const SIGNAL_EXIT_OFFSET: i32 = 128;

/// Largest piece of container output read and forwarded at once.
///
/// Longer lines reach the log drivers as several partial records.
pub const LOG_CHUNK_SIZE: usize = 8192;
