//! Directional file storage with lazy, listing-driven expiry
//!
//! Each stored file lives in one of two flat directories. The file's own
//! modification time is its creation record; there is no metadata store.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::domain::utils::{epoch_seconds, validate_file_name};
use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Files pushed by the secondary device, picked up on the desktop.
    Inbound,
    /// Files shared from the desktop for pickup by the secondary device.
    Outbound,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Inbound, Direction::Outbound];

    pub fn url_prefix(self) -> &'static str {
        match self {
            Self::Inbound => "/received_files/",
            Self::Outbound => "/shared_files/",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Each file lives for the window, counted from its modification time.
    Ttl(Duration),
    /// Files modified within the trailing window are kept.
    RollingCutoff(Duration),
}

impl ExpiryPolicy {
    pub fn window(&self) -> Duration {
        match self {
            Self::Ttl(window) | Self::RollingCutoff(window) => *window,
        }
    }

    /// Whole seconds left before `created_at` expires; 0 means the file is dead.
    pub fn expires_in(&self, created_at: SystemTime, now: SystemTime) -> u64 {
        let remaining =
            epoch_seconds(created_at) + self.window().as_secs_f64() - epoch_seconds(now);
        if remaining <= 0.0 {
            return 0;
        }

        match self {
            Self::Ttl(_) => remaining.floor() as u64,
            Self::RollingCutoff(_) => remaining.ceil() as u64,
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub inbound_dir: PathBuf,
    pub outbound_dir: PathBuf,
    pub expiry: ExpiryPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: SystemTime,
    pub direction: Direction,
    pub expires_in: u64,
}

impl StoredFile {
    pub fn url_path(&self) -> String {
        format!("{}{}", self.direction.url_prefix(), self.name)
    }
}

/// A live file resolved for download.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

pub struct Store {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
}

impl Store {
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn directory(&self, direction: Direction) -> &Path {
        match direction {
            Direction::Inbound => &self.config.inbound_dir,
            Direction::Outbound => &self.config.outbound_dir,
        }
    }

    pub async fn ensure_directories(&self) -> Result<(), StoreError> {
        for direction in Direction::ALL {
            let directory = self.directory(direction);
            fs::create_dir_all(directory)
                .await
                .map_err(|source| StoreError::Write {
                    name: directory.display().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Lists live files newest first, deleting any that have expired.
    ///
    /// A missing or unreadable directory lists as empty. Expired entries are
    /// left out whether or not their deletion succeeds.
    pub async fn list_and_reap(&self, direction: Direction) -> Vec<StoredFile> {
        let directory = self.directory(direction);
        let mut entries = match fs::read_dir(directory).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(
                    directory = %directory.display(),
                    error = %err,
                    "failed to read storage directory"
                );
                return Vec::new();
            }
        };

        let now = self.clock.now();
        let mut files = Vec::new();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(
                        directory = %directory.display(),
                        error = %err,
                        "directory scan stopped early"
                    );
                    break;
                }
            };

            let path = entry.path();
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "entry vanished during scan");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let created_at = match metadata.modified() {
                Ok(modified) => modified,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "missing modification time");
                    continue;
                }
            };

            let expires_in = self.config.expiry.expires_in(created_at, now);
            if expires_in == 0 {
                reap(&path).await;
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %path.display(), "skipping non UTF-8 file name");
                continue;
            };

            files.push(StoredFile {
                name,
                size_bytes: metadata.len(),
                created_at,
                direction,
                expires_in,
            });
        }

        files.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        files
    }

    /// Writes `bytes` under `name`, replacing any existing file and restarting its expiry.
    pub async fn store(
        &self,
        direction: Direction,
        name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StoreError> {
        let name = validate_file_name(name)?;
        let directory = self.directory(direction);
        let write_error = |source: io::Error| StoreError::Write {
            name: name.to_string(),
            source,
        };

        fs::create_dir_all(directory).await.map_err(write_error)?;

        let path = directory.join(name);
        fs::write(&path, bytes).await.map_err(write_error)?;

        let metadata = fs::metadata(&path).await.map_err(|source| StoreError::Read {
            name: name.to_string(),
            source,
        })?;
        let now = self.clock.now();
        let created_at = metadata.modified().unwrap_or(now);

        info!(
            direction = direction.as_str(),
            file = %name,
            size_bytes = metadata.len(),
            "file saved"
        );

        Ok(StoredFile {
            name: name.to_string(),
            size_bytes: metadata.len(),
            created_at,
            direction,
            expires_in: self.config.expiry.expires_in(created_at, now),
        })
    }

    /// Resolves a live regular file for download.
    ///
    /// Files past their expiry are reported missing even before a listing
    /// reaps them.
    pub async fn open(&self, direction: Direction, name: &str) -> Result<ResolvedFile, StoreError> {
        let not_found = || StoreError::NotFound(name.to_string());
        let name = validate_file_name(name).map_err(|_| not_found())?;
        let path = self.directory(direction).join(name);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(not_found()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(source) => {
                return Err(StoreError::Read {
                    name: name.to_string(),
                    source,
                })
            }
        };

        if let Ok(created_at) = metadata.modified() {
            if self.config.expiry.expires_in(created_at, self.clock.now()) == 0 {
                debug!(path = %path.display(), "refusing to serve expired file");
                return Err(not_found());
            }
        }

        Ok(ResolvedFile {
            path,
            size_bytes: metadata.len(),
        })
    }
}

async fn reap(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "deleted expired file"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "expired file already removed")
        }
        Err(err) => warn!(path = %path.display(), error = %err, "failed to delete expired file"),
    }
}
