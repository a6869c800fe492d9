//! Rolling Logger
//!
//! Installs a `tracing` subscriber that writes to stderr and to
//! `<dir>/<name>.log`. When the active file would exceed the size limit it is
//! shifted to `<name>.log.1`, older files move up by one and the oldest is
//! dropped, so at most `max_files` rotated files are kept.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("log directory {0}: {1}")]
    Io(PathBuf, #[source] io::Error),
    #[error("a global logger is already installed")]
    AlreadyInstalled,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub max_file_bytes: u64,
    pub max_files: usize,
    /// Used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            default_filter: "info".to_string(),
        }
    }
}

/// Initialize logging with the default size limits.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(log_dir, app_name, LoggerConfig::default())
}

pub fn init_logger_with(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    config: LoggerConfig,
) -> Result<(), LoggerError> {
    let writer = RollingFileWriter::new(
        log_dir.as_ref(),
        app_name,
        config.max_file_bytes,
        config.max_files,
    )?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_writer(io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|_| LoggerError::AlreadyInstalled)?;

    tracing::info!(dir = %log_dir.as_ref().display(), "logger initialized for {}", app_name);
    Ok(())
}

/// Local wall-clock timestamps with milliseconds
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

struct ActiveFile {
    file: File,
    written: u64,
}

/// Size-rotated log file with a fixed ring of backups
pub struct RollingFileWriter {
    dir: PathBuf,
    base_name: String,
    max_file_bytes: u64,
    max_files: usize,
    active: Mutex<ActiveFile>,
}

impl RollingFileWriter {
    pub fn new(
        dir: &Path,
        app_name: &str,
        max_file_bytes: u64,
        max_files: usize,
    ) -> Result<Self, LoggerError> {
        fs::create_dir_all(dir).map_err(|e| LoggerError::Io(dir.to_path_buf(), e))?;
        let base_name = format!("{app_name}.log");
        let path = dir.join(&base_name);
        let file = open_append(&path).map_err(|e| LoggerError::Io(path.clone(), e))?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            dir: dir.to_path_buf(),
            base_name,
            max_file_bytes: max_file_bytes.max(1),
            max_files,
            active: Mutex::new(ActiveFile { file, written }),
        })
    }

    pub fn active_path(&self) -> PathBuf {
        self.dir.join(&self.base_name)
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}", self.base_name, index))
    }

    fn write_record(&self, buf: &[u8]) -> io::Result<usize> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;

        if active.written > 0 && active.written + buf.len() as u64 > self.max_file_bytes {
            active.file.flush()?;
            self.rotate()?;
            active.file = open_append(&self.active_path())?;
            active.written = 0;
        }

        active.file.write_all(buf)?;
        active.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn rotate(&self) -> io::Result<()> {
        if self.max_files == 0 {
            return fs::remove_file(self.active_path());
        }

        let oldest = self.rotated_path(self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_files).rev() {
            let from = self.rotated_path(index);
            if from.exists() {
                fs::rename(&from, self.rotated_path(index + 1))?;
            }
        }
        fs::rename(self.active_path(), self.rotated_path(1))
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Per-event handle handed out to the fmt layer
pub struct RollingHandle<'a> {
    writer: &'a RollingFileWriter,
}

impl Write for RollingHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write_record(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut active = self
            .writer
            .active
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        active.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingFileWriter {
    type Writer = RollingHandle<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RollingHandle { writer: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_line(writer: &RollingFileWriter, line: &str) {
        writer.make_writer().write_all(line.as_bytes()).unwrap();
    }

    #[test]
    fn test_writes_to_active_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RollingFileWriter::new(dir.path(), "Kanban", 1024, 3).unwrap();
        write_line(&writer, "hello\n");

        let content = fs::read_to_string(dir.path().join("Kanban.log")).unwrap();
        assert_eq!(content, "hello\n");
    }

    #[test]
    fn test_rotates_into_fixed_ring() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RollingFileWriter::new(dir.path(), "Kanban", 16, 2).unwrap();

        for i in 0..5 {
            write_line(&writer, &format!("line number {i}\n"));
        }

        let active = fs::read_to_string(dir.path().join("Kanban.log")).unwrap();
        let first = fs::read_to_string(dir.path().join("Kanban.log.1")).unwrap();
        let second = fs::read_to_string(dir.path().join("Kanban.log.2")).unwrap();
        assert_eq!(active, "line number 4\n");
        assert_eq!(first, "line number 3\n");
        assert_eq!(second, "line number 2\n");
        assert!(!dir.path().join("Kanban.log.3").exists());
    }

    #[test]
    fn test_existing_file_size_counts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Kanban.log"), "0123456789").unwrap();

        let writer = RollingFileWriter::new(dir.path(), "Kanban", 12, 1).unwrap();
        write_line(&writer, "abc");

        assert_eq!(
            fs::read_to_string(dir.path().join("Kanban.log.1")).unwrap(),
            "0123456789"
        );
        assert_eq!(fs::read_to_string(dir.path().join("Kanban.log")).unwrap(), "abc");
    }
}
