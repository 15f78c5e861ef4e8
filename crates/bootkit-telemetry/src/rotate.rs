//! Size-bounded log file with timestamped, optionally compressed backups.
//!
//! # Design
//! - The active file keeps its configured name; rotated files become
//!   `{stem}-{UTC timestamp}.{ext}` next to it, with a `-N` suffix on collision.
//! - After each rotation, backups beyond the count or age bounds are removed and
//!   the survivors are gzipped when compression is enabled.
//! - The handle is cheap to clone and safe to share across writer threads.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDateTime, TimeDelta, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::RotationPolicy;
use crate::error::{Result, TelemetryError};

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESSED_SUFFIX: &str = ".gz";

/// Shared handle to a rotating log file.
#[derive(Clone, Debug)]
pub struct RotatingFile {
    inner: Arc<Mutex<RotatingState>>,
}

#[derive(Debug)]
struct RotatingState {
    path: PathBuf,
    policy: RotationPolicy,
    file: File,
    size: u64,
}

/// A rotated file found next to the active log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Location on disk.
    pub path: PathBuf,
    /// Rotation time encoded in the file name.
    pub rotated_at: NaiveDateTime,
    /// Collision counter for rotations within the same millisecond.
    pub sequence: u32,
    /// Whether the backup has been gzipped.
    pub compressed: bool,
}

impl RotatingFile {
    /// Open `path` for appending, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or file cannot be created.
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self> {
        let path = path.into();
        let open_failed = |source| TelemetryError::LogFileOpen {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_failed)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_failed)?;
        let size = file.metadata().map_err(open_failed)?.len();

        Ok(Self {
            inner: Arc::new(Mutex::new(RotatingState {
                path,
                policy,
                file,
                size,
            })),
        })
    }

    /// Path of the active log file.
    ///
    /// # Errors
    ///
    /// Returns an error if a writer panicked while holding the file lock.
    pub fn path(&self) -> io::Result<PathBuf> {
        Ok(self.lock()?.path.clone())
    }

    /// Roll the active file over immediately.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be renamed or reopened.
    pub fn rotate(&self) -> io::Result<()> {
        self.lock()?.rotate()
    }

    /// Rotated files for this log, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the log directory cannot be read.
    pub fn backups(&self) -> io::Result<Vec<Backup>> {
        self.lock()?.backups()
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, RotatingState>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("rotating log file lock poisoned"))
    }
}

impl Write for &RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = &'a Self;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

impl RotatingState {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let incoming = u64::try_from(buf.len()).unwrap_or(u64::MAX);
        let rotated = if self.policy.max_size > 0
            && self.size > 0
            && self.size.saturating_add(incoming) > self.policy.max_size
        {
            self.rotate()
        } else {
            Ok(())
        };
        self.file.write_all(buf)?;
        self.size = self.size.saturating_add(incoming);

        // The line is already on disk; an Interrupted kind would make callers retry it.
        rotated.map(|()| buf.len()).map_err(|err| match err.kind() {
            io::ErrorKind::Interrupted => io::Error::other(err),
            _ => err,
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.path.exists() {
            let backup = self.next_backup_path()?;
            fs::rename(&self.path, &backup)?;
        }
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.size = 0;
        self.prune_and_compress()
    }

    fn name_parts(&self) -> (String, String) {
        let stem = self
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        (stem, ext)
    }

    fn directory(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn next_backup_path(&self) -> io::Result<PathBuf> {
        let (stem, ext) = self.name_parts();
        let stamp = Utc::now().format(BACKUP_TIME_FORMAT).to_string();
        let dir = self.directory();
        let first = self
            .backups()?
            .iter()
            .filter(|backup| backup.rotated_at.format(BACKUP_TIME_FORMAT).to_string() == stamp)
            .map(|backup| backup.sequence.saturating_add(1))
            .max()
            .unwrap_or(0);

        for sequence in first..u32::MAX {
            let name = if sequence == 0 {
                format!("{stem}-{stamp}{ext}")
            } else {
                format!("{stem}-{stamp}-{sequence}{ext}")
            };
            let candidate = dir.join(&name);
            let compressed = dir.join(format!("{name}{COMPRESSED_SUFFIX}"));
            if !candidate.exists() && !compressed.exists() {
                return Ok(candidate);
            }
        }
        Err(io::Error::other("exhausted backup names for rotation"))
    }

    fn backups(&self) -> io::Result<Vec<Backup>> {
        let (stem, ext) = self.name_parts();
        let mut backups = Vec::new();
        for entry in fs::read_dir(self.directory())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(backup) = parse_backup(&entry.path(), &name, &stem, &ext) {
                backups.push(backup);
            }
        }
        backups.sort_by(|a, b| {
            (b.rotated_at, b.sequence).cmp(&(a.rotated_at, a.sequence))
        });
        Ok(backups)
    }

    fn prune_and_compress(&self) -> io::Result<()> {
        let mut backups = self.backups()?;
        let mut expired = Vec::new();

        if self.policy.max_backups > 0 && backups.len() > self.policy.max_backups {
            expired.extend(backups.split_off(self.policy.max_backups));
        }
        if !self.policy.max_age.is_zero() {
            let window = TimeDelta::from_std(self.policy.max_age).unwrap_or(TimeDelta::MAX);
            if let Some(cutoff) = Utc::now().naive_utc().checked_sub_signed(window) {
                let (stale, fresh): (Vec<_>, Vec<_>) = backups
                    .into_iter()
                    .partition(|backup| backup.rotated_at < cutoff);
                expired.extend(stale);
                backups = fresh;
            }
        }

        for backup in expired {
            remove_if_present(&backup.path)?;
        }
        if self.policy.compress {
            for backup in backups.iter().filter(|backup| !backup.compressed) {
                compress(&backup.path)?;
            }
        }
        Ok(())
    }
}

fn parse_backup(path: &Path, name: &str, stem: &str, ext: &str) -> Option<Backup> {
    let rest = name.strip_prefix(stem)?.strip_prefix('-')?;
    let (rest, compressed) = rest
        .strip_suffix(COMPRESSED_SUFFIX)
        .map_or((rest, false), |trimmed| (trimmed, true));
    let rest = rest.strip_suffix(ext)?;

    let (rotated_at, sequence) = match NaiveDateTime::parse_from_str(rest, BACKUP_TIME_FORMAT) {
        Ok(stamp) => (stamp, 0),
        Err(_) => {
            let (stamp, sequence) = rest.rsplit_once('-')?;
            (
                NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT).ok()?,
                sequence.parse().ok()?,
            )
        }
    };

    Some(Backup {
        path: path.to_path_buf(),
        rotated_at,
        sequence,
        compressed,
    })
}

fn compress(path: &Path) -> io::Result<()> {
    let mut target = path.as_os_str().to_owned();
    target.push(COMPRESSED_SUFFIX);
    let target = PathBuf::from(target);

    match write_gzip(path, &target) {
        Ok(()) => fs::remove_file(path),
        Err(err) => {
            remove_if_present(&target)?;
            Err(err)
        }
    }
}

fn write_gzip(source: &Path, target: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let mut encoder = GzEncoder::new(File::create(target)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
