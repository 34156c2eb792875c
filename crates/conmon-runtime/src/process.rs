//! Spawning and signalling the OCI runtime process.

use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use conmon_common::constants::{SIGNAL_EXIT_OFFSET, UNKNOWN_EXIT_CODE};
use conmon_common::error::{ContainerError, MonitorError, Result};
use conmon_common::types::ContainerStatus;
use nix::errno::Errno;
use nix::sys::signal::{SigSet, Signal, kill};
use nix::unistd::Pid;

use crate::container::Container;
use crate::validate::ValidatedConfig;

/// Starts the process the monitor supervises.
///
/// The returned child must have its stdout and stderr piped if container
/// output should reach the log drivers.
pub trait RuntimeLauncher {
    /// Spawns the runtime for a validated invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the process can not be spawned.
    fn launch(&self, config: &ValidatedConfig) -> Result<Child>;
}

/// Launches the configured OCI runtime binary in the foreground.
#[derive(Debug, Default, Clone, Copy)]
pub struct OciRuntimeLauncher;

impl OciRuntimeLauncher {
    /// Builds the runtime command line for an invocation.
    ///
    /// - container: `<runtime> [args] run [--bundle B] <cid>`
    /// - exec: `<runtime> [args] exec --process <spec> <cid>`
    /// - restore: `<runtime> [args] restore --image-path <P> [--bundle B] <cid>`
    #[must_use]
    pub fn command(config: &ValidatedConfig) -> Command {
        let mut cmd = Command::new(config.runtime_path());
        let _ = cmd.args(&config.runtime_args);

        if config.exec {
            let _ = cmd.arg("exec");
            if let Some(spec) = &config.exec_process_spec {
                let _ = cmd.arg("--process").arg(spec);
            }
        } else {
            if let Some(image) = &config.restore {
                let _ = cmd.arg("restore").arg("--image-path").arg(image);
            } else {
                let _ = cmd.arg("run");
            }
            if let Some(bundle) = &config.bundle {
                let _ = cmd.arg("--bundle").arg(bundle);
            }
        }
        let _ = cmd.arg(config.container_id().as_str());

        let stdin = if config.stdin {
            Stdio::inherit()
        } else {
            Stdio::null()
        };
        let _ = cmd.stdin(stdin).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }
}

impl RuntimeLauncher for OciRuntimeLauncher {
    fn launch(&self, config: &ValidatedConfig) -> Result<Child> {
        let mut cmd = Self::command(config);
        tracing::debug!(command = ?cmd, "spawning runtime");
        cmd.spawn().map_err(|source| MonitorError::Spawn {
            runtime: config.runtime_path().to_path_buf(),
            source,
        })
    }
}

/// Converts a wait status to the code reported for the container.
///
/// Normal exit yields its code, death by signal `128 + signal`, and
/// anything else `-1`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| SIGNAL_EXIT_OFFSET + sig))
        .unwrap_or(UNKNOWN_EXIT_CODE)
}

/// Sends `signal` to the container process if it is running.
///
/// Returns `true` if a signal was delivered.
///
/// # Errors
///
/// Returns an error if the container lock is poisoned.
pub fn forward_signal(
    container: &Container,
    signal: Signal,
) -> std::result::Result<bool, ContainerError> {
    let state = container.snapshot()?;
    let Some(pid) = state.pid.filter(|_| state.status == ContainerStatus::Running) else {
        return Ok(false);
    };
    match signal_pid(pid, signal) {
        Ok(()) => {
            tracing::info!(pid, ?signal, "forwarded signal to container");
            Ok(true)
        }
        Err(e) => {
            tracing::warn!(pid, ?signal, error = %e, "failed to forward signal");
            Ok(false)
        }
    }
}

/// Signals the monitor relays to the container instead of acting on.
pub const FORWARDED_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

/// Relays every [`FORWARDED_SIGNALS`] delivery to the container.
///
/// The signals are blocked in the calling thread and picked up by a
/// dedicated thread with `sigwait`, so each one reaches the container as
/// the signal that was received. Call this before spawning other threads;
/// threads inherit the mask, and a thread that leaves a signal unblocked
/// would take the default action. Spawned children start with an empty
/// mask.
///
/// # Errors
///
/// Returns an error if the signal mask can not be changed.
pub fn spawn_signal_forwarder(container: Arc<Container>) -> nix::Result<JoinHandle<()>> {
    let mut set = SigSet::empty();
    for signal in FORWARDED_SIGNALS {
        set.add(signal);
    }
    set.thread_block()?;

    Ok(thread::spawn(move || {
        loop {
            match set.wait() {
                Ok(signal) => {
                    if let Err(e) = forward_signal(&container, signal) {
                        tracing::warn!(?signal, error = %e, "signal forwarding failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "waiting for signals failed");
                    break;
                }
            }
        }
    }))
}

/// Sends `signal` to a raw process ID.
///
/// # Errors
///
/// Returns `ESRCH` for a PID outside the kernel's range, or the error of
/// the underlying `kill(2)`.
pub fn signal_pid(pid: u32, signal: Signal) -> nix::Result<()> {
    let raw = i32::try_from(pid).map_err(|_| Errno::ESRCH)?;
    kill(Pid::from_raw(raw), signal)
}

/// Runs the post-exit command and waits for it.
///
/// Failures are logged; the container's exit code is already final.
pub fn run_exit_command(command: &Path, args: &[String]) {
    match Command::new(command).args(args).status() {
        Ok(status) if status.success() => {
            tracing::debug!(command = %command.display(), "exit command finished");
        }
        Ok(status) => {
            tracing::warn!(
                command = %command.display(),
                code = exit_code(status),
                "exit command failed"
            );
        }
        Err(e) => {
            tracing::warn!(command = %command.display(), error = %e, "failed to run exit command");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::os::unix::thread::JoinHandleExt;

    use chrono::Utc;
    use conmon_common::config::ConfigOptions;
    use nix::sys::pthread::pthread_kill;

    use super::*;

    fn args(cmd: &Command) -> Vec<&OsStr> {
        cmd.get_args().collect()
    }

    fn config(builder: conmon_common::config::ConfigOptionsBuilder) -> ValidatedConfig {
        let dir = std::env::temp_dir();
        let opts = builder
            .container_id("abcdefghijklm")
            .container_uuid("abcdefghijklm")
            .runtime_path(dir)
            .log_driver("journald", None)
            .build();
        crate::validate::validate(opts).expect("valid")
    }

    #[test]
    fn run_command_includes_bundle_and_id() {
        let cfg = config(ConfigOptions::builder().bundle("/b").runtime_arg("--debug"));
        let cmd = OciRuntimeLauncher::command(&cfg);
        assert_eq!(
            args(&cmd),
            vec!["--debug", "run", "--bundle", "/b", "abcdefghijklm"]
        );
    }

    #[test]
    fn exec_command_passes_process_spec() {
        let cfg = config(
            ConfigOptions::builder()
                .exec(true)
                .exec_process_spec("/p.json"),
        );
        let cmd = OciRuntimeLauncher::command(&cfg);
        assert_eq!(
            args(&cmd),
            vec!["exec", "--process", "/p.json", "abcdefghijklm"]
        );
    }

    #[test]
    fn restore_command_passes_image_path() {
        let cfg = config(ConfigOptions::builder().restore("/ckpt").bundle("/b"));
        let cmd = OciRuntimeLauncher::command(&cfg);
        assert_eq!(
            args(&cmd),
            vec!["restore", "--image-path", "/ckpt", "--bundle", "/b", "abcdefghijklm"]
        );
    }

    #[test]
    fn exit_code_of_normal_exit() {
        let status = Command::new("sh").args(["-c", "exit 3"]).status().expect("sh");
        assert_eq!(exit_code(status), 3);
    }

    #[test]
    fn exit_code_of_signal_death_adds_offset() {
        let status = Command::new("sh")
            .args(["-c", "kill -KILL $$"])
            .status()
            .expect("sh");
        assert_eq!(exit_code(status), 128 + 9);
    }

    #[test]
    fn forward_signal_skips_containers_not_running() {
        let container = Container::new(
            crate::container::ContainerIdentity::default(),
            crate::container::ContainerMetadata::default(),
            crate::spec::RuntimeSpec::default(),
        );
        assert!(!forward_signal(&container, Signal::SIGTERM).expect("forward"));
    }

    #[test]
    fn forward_signal_terminates_running_process() {
        let mut child = Command::new("sleep").arg("30").spawn().expect("sleep");
        let container = Container::new(
            crate::container::ContainerIdentity::default(),
            crate::container::ContainerMetadata::default(),
            crate::spec::RuntimeSpec::default(),
        );
        container.mark_started(child.id(), Utc::now()).expect("start");
        assert!(forward_signal(&container, Signal::SIGTERM).expect("forward"));
        let status = child.wait().expect("wait");
        assert_eq!(exit_code(status), 128 + 15);
    }

    #[test]
    fn forwarder_relays_the_signal_it_received() {
        let mut child = Command::new("sleep").arg("30").spawn().expect("sleep");
        let container = Arc::new(Container::new(
            crate::container::ContainerIdentity::default(),
            crate::container::ContainerMetadata::default(),
            crate::spec::RuntimeSpec::default(),
        ));
        container.mark_started(child.id(), Utc::now()).expect("start");

        // Runs on its own thread so the blocked mask stays out of the harness.
        let forwarder = thread::spawn(move || {
            spawn_signal_forwarder(container).expect("forwarder")
        })
        .join()
        .expect("setup thread");
        pthread_kill(forwarder.as_pthread_t(), Signal::SIGINT).expect("pthread_kill");

        let status = child.wait().expect("wait");
        assert_eq!(exit_code(status), 128 + 2);
    }

    #[test]
    fn signal_pid_rejects_out_of_range_pid() {
        assert_eq!(signal_pid(u32::MAX, Signal::SIGTERM), Err(Errno::ESRCH));
    }

    #[test]
    fn exit_command_runs_with_args() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("ran");
        run_exit_command(
            Path::new("/bin/sh"),
            &["-c".to_string(), format!("touch {}", marker.display())],
        );
        assert!(marker.exists());
    }
}
