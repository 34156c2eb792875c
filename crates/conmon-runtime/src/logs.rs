//! Container log drivers.
//!
//! Every requested driver becomes an open [`LogSink`]; a [`LogFanout`]
//! duplicates each record to all of them in request order.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use conmon_common::config::LogDriverRequest;
use conmon_common::constants::{JOURNAL_SOCKET, SHORT_ID_LEN};
use conmon_common::error::{ConfigError, ConfigResult};
use conmon_common::types::{LogDriverKind, Stream};

use crate::validate::ValidatedConfig;

/// A log driver request whose kind has been recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDriverSpec {
    /// Driver kind.
    pub kind: LogDriverKind,
    /// Filesystem target, required for file-backed kinds.
    pub target: Option<PathBuf>,
}

/// One chunk of container output.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    /// Stream the chunk was read from.
    pub stream: Stream,
    /// Chunk contents without the trailing newline.
    pub message: &'a [u8],
    /// `true` if the chunk was not newline-terminated.
    pub partial: bool,
}

/// An open log destination.
pub trait LogSink: Send + Sync + fmt::Debug {
    /// Driver kind backing this sink.
    fn kind(&self) -> LogDriverKind;

    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination rejects the write.
    fn write(&self, record: &LogRecord<'_>) -> io::Result<()>;
}

/// Parses driver names without touching the filesystem.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownLogDriver`] for the first unrecognised
/// name in list order.
pub fn parse_specs(requests: &[LogDriverRequest]) -> ConfigResult<Vec<LogDriverSpec>> {
    requests
        .iter()
        .map(|req| -> ConfigResult<LogDriverSpec> {
            let kind = req
                .driver
                .parse::<LogDriverKind>()
                .map_err(|kind| ConfigError::UnknownLogDriver { kind })?;
            Ok(LogDriverSpec {
                kind,
                target: req.target.clone(),
            })
        })
        .collect()
}

/// Opens every log driver of a validated invocation.
///
/// Resolution happens in three passes so the reported error does not
/// depend on driver order:
///
/// 1. Driver names are parsed (`UnknownLogDriver`).
/// 2. If journald is requested, the container ID must be longer than
///    12 bytes (`ContainerIdTooShort`).
/// 3. Sinks are opened in request order (`LogFileOpenFailed`).
///
/// # Errors
///
/// Returns the first failure. Sinks opened before a failure are closed,
/// but files they created stay on disk.
pub fn resolve(config: &ValidatedConfig) -> ConfigResult<LogFanout> {
    let specs = parse_specs(&config.log_drivers)?;

    let id = config.container_id();
    let wants_journal = specs.iter().any(|s| s.kind == LogDriverKind::Journald);
    if wants_journal && id.byte_len() <= SHORT_ID_LEN {
        return Err(ConfigError::ContainerIdTooShort);
    }

    let mut sinks: Vec<Box<dyn LogSink>> = Vec::with_capacity(specs.len());
    for spec in &specs {
        let sink: Box<dyn LogSink> = match spec.kind {
            LogDriverKind::Path | LogDriverKind::K8sFile => {
                let target = spec
                    .target
                    .as_deref()
                    .filter(|p| !p.as_os_str().is_empty())
                    .ok_or_else(|| ConfigError::MissingLogTarget {
                        kind: spec.kind.to_string(),
                    })?;
                Box::new(FileSink::open(spec.kind, target)?)
            }
            LogDriverKind::Journald => {
                if let Some(target) = &spec.target {
                    tracing::debug!(target = %target.display(), "journald ignores log target");
                }
                Box::new(JournaldSink::new(config)?)
            }
        };
        tracing::debug!(kind = %spec.kind, "log driver opened");
        sinks.push(sink);
    }
    Ok(LogFanout { sinks })
}

/// Duplicates each record to every open sink.
#[derive(Debug, Default)]
pub struct LogFanout {
    sinks: Vec<Box<dyn LogSink>>,
}

impl LogFanout {
    /// Creates a fan-out over already opened sinks.
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    /// Returns the driver kinds in write order.
    #[must_use]
    pub fn kinds(&self) -> Vec<LogDriverKind> {
        self.sinks.iter().map(|s| s.kind()).collect()
    }

    /// Returns the number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns `true` if there are no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Writes a record to every sink.
    ///
    /// A failing sink does not stop the others from receiving the record.
    ///
    /// # Errors
    ///
    /// Returns the first sink error after all sinks were attempted.
    pub fn write(&self, record: &LogRecord<'_>) -> io::Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.write(record) {
                tracing::trace!(kind = %sink.kind(), error = %e, "log sink write failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// File sink writing the CRI log format.
#[derive(Debug)]
pub struct FileSink {
    kind: LogDriverKind,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Creates or opens `path` for appending. Parent directories are not created.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LogFileOpenFailed`] if the file can not be opened.
    pub fn open(kind: LogDriverKind, path: &Path) -> ConfigResult<Self> {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ConfigError::LogFileOpenFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            kind,
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn kind(&self) -> LogDriverKind {
        self.kind
    }

    fn write(&self, record: &LogRecord<'_>) -> io::Result<()> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        let tag = if record.partial { 'P' } else { 'F' };
        let mut line = format!("{timestamp} {} {tag} ", record.stream).into_bytes();
        line.extend_from_slice(record.message);
        line.push(b'\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        file.write_all(&line)
    }
}

/// Sink speaking the journald native protocol.
#[derive(Debug)]
pub struct JournaldSink {
    socket: UnixDatagram,
    socket_path: PathBuf,
    fields: Vec<(&'static str, String)>,
}

impl JournaldSink {
    /// Creates a sink tagged with the invocation's container identity.
    ///
    /// The journal socket is only contacted on write, so this succeeds on
    /// hosts without journald.
    ///
    /// # Errors
    ///
    /// Returns an error if a datagram socket can not be created.
    pub fn new(config: &ValidatedConfig) -> ConfigResult<Self> {
        Self::with_socket_path(config, Path::new(JOURNAL_SOCKET))
    }

    /// Like [`JournaldSink::new`] with an explicit socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if a datagram socket can not be created.
    pub fn with_socket_path(config: &ValidatedConfig, socket_path: &Path) -> ConfigResult<Self> {
        let socket = UnixDatagram::unbound().map_err(|source| ConfigError::LogFileOpenFailed {
            path: socket_path.to_path_buf(),
            source,
        })?;

        let id = config.container_id();
        let mut fields = vec![
            ("CONTAINER_ID", id.short().to_string()),
            ("CONTAINER_ID_FULL", id.to_string()),
        ];
        if let Some(name) = &config.name {
            fields.push(("CONTAINER_NAME", name.clone()));
        }
        if let Some(tag) = &config.log_tag {
            fields.push(("SYSLOG_IDENTIFIER", tag.clone()));
        }

        Ok(Self {
            socket,
            socket_path: socket_path.to_path_buf(),
            fields,
        })
    }

    fn encode(&self, record: &LogRecord<'_>) -> Vec<u8> {
        let mut buf = Vec::with_capacity(record.message.len() + 128);
        encode_field(&mut buf, "MESSAGE", record.message);
        let priority = match record.stream {
            Stream::Stdout => "6",
            Stream::Stderr => "3",
        };
        encode_field(&mut buf, "PRIORITY", priority.as_bytes());
        if record.partial {
            encode_field(&mut buf, "CONTAINER_PARTIAL_MESSAGE", b"true");
        }
        for (key, value) in &self.fields {
            encode_field(&mut buf, key, value.as_bytes());
        }
        buf
    }
}

impl LogSink for JournaldSink {
    fn kind(&self) -> LogDriverKind {
        LogDriverKind::Journald
    }

    fn write(&self, record: &LogRecord<'_>) -> io::Result<()> {
        let payload = self.encode(record);
        let _ = self.socket.send_to(&payload, &self.socket_path)?;
        Ok(())
    }
}

// Values containing a newline use the length-prefixed binary form.
fn encode_field(buf: &mut Vec<u8>, key: &str, value: &[u8]) {
    buf.extend_from_slice(key.as_bytes());
    if value.contains(&b'\n') {
        buf.push(b'\n');
        buf.extend_from_slice(&(value.len() as u64).to_le_bytes());
    } else {
        buf.push(b'=');
    }
    buf.extend_from_slice(value);
    buf.push(b'\n');
}
