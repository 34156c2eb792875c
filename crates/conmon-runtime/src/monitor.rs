//! Supervision of one container or exec session.
//!
//! A [`Monitor`] is built once validation and log setup succeeded, then
//! [`Monitor::run`] launches the runtime, pumps its output into the log
//! fan-out, and blocks until the process exits.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::Child;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use conmon_common::config::ConfigOptions;
use conmon_common::constants::LOG_CHUNK_SIZE;
use conmon_common::error::{MonitorError, Result};
use conmon_common::types::Stream;
use nix::sys::signal::Signal;

use crate::container::Container;
use crate::logs::{self, LogFanout, LogRecord};
use crate::process::{self, RuntimeLauncher};
use crate::spec::{ProcessSpec, RuntimeSpec};
use crate::validate::{self, ValidatedConfig};

/// Supervises a single container.
#[derive(Debug)]
pub struct Monitor {
    config: ValidatedConfig,
    container: Arc<Container>,
    logs: Arc<LogFanout>,
}

impl Monitor {
    /// Validates options, opens log drivers, and builds the container.
    ///
    /// The bundle's `config.json` is loaded when a bundle is given. For exec
    /// sessions the process spec is read up front so a bad spec fails before
    /// anything is launched.
    ///
    /// # Errors
    ///
    /// Returns the first validation, log driver, or spec loading failure.
    pub fn prepare(options: ConfigOptions) -> Result<Self> {
        let config = validate::validate(options)?;
        let logs = logs::resolve(&config)?;

        if config.exec {
            if let Some(path) = &config.exec_process_spec {
                let process = ProcessSpec::load(path)?;
                tracing::debug!(args = ?process.args, "exec process spec loaded");
            }
        }
        let spec = match &config.bundle {
            Some(bundle) => RuntimeSpec::load(bundle)?,
            None => RuntimeSpec::default(),
        };

        let container = Container::from_config(&config, spec);
        Ok(Self::new(config, container, logs))
    }

    /// Assembles a monitor from already prepared parts.
    #[must_use]
    pub fn new(config: ValidatedConfig, container: Container, logs: LogFanout) -> Self {
        Self {
            config,
            container: Arc::new(container),
            logs: Arc::new(logs),
        }
    }

    /// Returns a shared handle to the supervised container.
    #[must_use]
    pub fn container(&self) -> Arc<Container> {
        Arc::clone(&self.container)
    }

    /// Returns the validated invocation.
    #[must_use]
    pub const fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Launches the runtime and blocks until it exits.
    ///
    /// Returns the container's exit code. With a timeout configured, a
    /// runtime still running when it expires is killed and its death by
    /// `SIGKILL` is recorded as the exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the container was already started, the pidfile
    /// or exit file can not be written, the runtime can not be spawned, or
    /// waiting on it fails.
    pub fn run(&self, launcher: &dyn RuntimeLauncher) -> Result<i32> {
        self.container.snapshot()?.check_start()?;

        if let Some(pidfile) = &self.config.conmon_pidfile {
            write_file(pidfile, &std::process::id().to_string())?;
        }

        let mut child = launcher.launch(&self.config)?;
        if let Err(e) = self.container.mark_started(child.id(), Utc::now()) {
            reap(&mut child);
            return Err(e.into());
        }

        let pumps: Vec<JoinHandle<()>> = [
            child
                .stdout
                .take()
                .map(|out| spawn_pump(Stream::Stdout, out, Arc::clone(&self.logs))),
            child
                .stderr
                .take()
                .map(|err| spawn_pump(Stream::Stderr, err, Arc::clone(&self.logs))),
        ]
        .into_iter()
        .flatten()
        .collect();

        let watchdog = self
            .config
            .timeout
            .map(|limit| Watchdog::spawn(child.id(), limit));
        let status = child.wait().map_err(MonitorError::Wait);
        let timed_out = watchdog.is_some_and(Watchdog::finish);
        let status = status?;

        if timed_out {
            // Processes forked by the runtime may still hold the pipes open.
            tracing::info!(id = %self.container.id(), "timed out, not waiting for log pumps");
        } else {
            for pump in pumps {
                if pump.join().is_err() {
                    tracing::warn!(id = %self.container.id(), "log pump panicked");
                }
            }
        }

        let code = process::exit_code(status);
        if code != 0 {
            tracing::info!(id = %self.container.id(), code, "container exited with non-zero status");
        }
        self.container.mark_stopped(code)?;

        if let Some(dir) = &self.config.exit_dir {
            let path = dir.join(self.container.id().as_str());
            write_file(&path, &code.to_string())?;
        }
        if let Some(command) = &self.config.exit_command {
            process::run_exit_command(command, &self.config.exit_command_args);
        }
        Ok(code)
    }
}

/// Kills the supervised process once the timeout expires.
struct Watchdog {
    done: Sender<()>,
    handle: JoinHandle<bool>,
}

impl Watchdog {
    fn spawn(pid: u32, limit: Duration) -> Self {
        let (done, expired) = mpsc::channel();
        let handle = thread::spawn(move || match expired.recv_timeout(limit) {
            Err(RecvTimeoutError::Timeout) => {
                tracing::info!(pid, ?limit, "timed out, killing runtime");
                if let Err(e) = process::signal_pid(pid, Signal::SIGKILL) {
                    tracing::warn!(pid, error = %e, "failed to kill runtime");
                }
                true
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        });
        Self { done, handle }
    }

    /// Stops the watchdog and reports whether it fired.
    fn finish(self) -> bool {
        let _ = self.done.send(());
        self.handle.join().unwrap_or(false)
    }
}

// Kills and waits on a runtime that will not be supervised.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(pid = child.id(), error = %e, "failed to kill runtime");
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = child.id(), error = %e, "failed to reap runtime");
    }
}

fn spawn_pump<R>(stream: Stream, source: R, logs: Arc<LogFanout>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || pump(stream, source, &logs))
}

/// Forwards `source` to the fan-out one line at a time.
///
/// A line longer than [`LOG_CHUNK_SIZE`] is forwarded in pieces, each
/// marked partial, so memory use stays bounded.
fn pump(stream: Stream, source: impl Read, logs: &LogFanout) {
    let mut reader = BufReader::with_capacity(LOG_CHUNK_SIZE, source);
    let mut buf = Vec::with_capacity(LOG_CHUNK_SIZE);
    loop {
        buf.clear();
        match (&mut reader)
            .take(LOG_CHUNK_SIZE as u64)
            .read_until(b'\n', &mut buf)
        {
            Ok(0) => break,
            Ok(_) => {
                let partial = buf.last() != Some(&b'\n');
                let message = if partial { &buf[..] } else { &buf[..buf.len() - 1] };
                let record = LogRecord {
                    stream,
                    message,
                    partial,
                };
                if let Err(e) = logs.write(&record) {
                    tracing::warn!(%stream, error = %e, "failed to write container log");
                }
            }
            Err(e) => {
                tracing::warn!(%stream, error = %e, "failed to read container output");
                break;
            }
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| MonitorError::Io {
        path: path.to_path_buf(),
        source,
    })
}
