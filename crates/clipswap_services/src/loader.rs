//! Clip loader
//!
//! Loads replacement clips from `<data root>/<folder>/<file>`. Checks run in
//! a fixed order: location, directory, file, decode. A missing folder is
//! created on the spot so the next attempt only needs the file dropped in,
//! but the current attempt still fails.
//!
//! File reads go through `tokio::fs` and decoding runs on the blocking pool;
//! the calling task awaits the result instead of spinning on a flag. There is
//! no built-in timeout, see [`ClipLoader::load_with_timeout`].

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tokio::task::JoinError;

use clipswap_core::{AudioFormat, ClipHandle};

use crate::decoder::{AudioDecoder, WavDecoder};

/// Kind of load failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadErrorKind {
    /// Folder or file name is empty, absolute, or escapes the data root
    InvalidLocation,
    /// Folder did not exist (it has been created since)
    MissingDirectory,
    /// Folder exists, file does not
    MissingFile,
    /// The file could not be read or decoded
    DecodeFailed,
    /// The decoder blew up
    Unexpected,
    /// The caller's deadline passed first
    Timeout,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidLocation => "invalid location",
            Self::MissingDirectory => "missing directory",
            Self::MissingFile => "missing file",
            Self::DecodeFailed => "decode failed",
            Self::Unexpected => "unexpected error",
            Self::Timeout => "timed out",
        };
        f.write_str(text)
    }
}

/// A failed load
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type LoadResult = Result<ClipHandle, LoadError>;

/// Where to load a clip from, relative to the data root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadRequest {
    pub base_directory: String,
    pub asset_name: String,
}

impl LoadRequest {
    pub fn new(base_directory: impl Into<String>, asset_name: impl Into<String>) -> Self {
        Self {
            base_directory: base_directory.into(),
            asset_name: asset_name.into(),
        }
    }

    /// Name given to the decoded clip: the file name without extension
    pub fn clip_name(&self) -> &str {
        Path::new(&self.asset_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.asset_name)
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.asset_name.is_empty() {
            return Err(LoadError::new(LoadErrorKind::InvalidLocation, "no file name given"));
        }
        for part in [&self.base_directory, &self.asset_name] {
            if !stays_relative(Path::new(part)) {
                return Err(LoadError::new(
                    LoadErrorKind::InvalidLocation,
                    format!("'{}' must be a relative path inside the data root", part),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base_directory, self.asset_name)
    }
}

fn stays_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Loader statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderStats {
    /// Loads attempted
    pub requested: u64,
    /// Loads that produced a clip
    pub loaded: u64,
    /// Loads that failed, including timeouts
    pub failed: u64,
    /// Bytes read from disk by successful loads
    pub bytes_read: u64,
    /// Failures since the last successful load
    pub consecutive_failures: u64,
}

/// Loads clips from the data root
pub struct ClipLoader {
    root: PathBuf,
    format: AudioFormat,
    decoder: Arc<dyn AudioDecoder>,
    stats: Mutex<LoaderStats>,
    last_error: Mutex<Option<LoadError>>,
}

impl ClipLoader {
    /// Create a WAV loader rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_decoder(root, Arc::new(WavDecoder::new()))
    }

    /// Create a loader that decodes through `decoder`
    pub fn with_decoder(root: impl Into<PathBuf>, decoder: Arc<dyn AudioDecoder>) -> Self {
        Self {
            root: root.into(),
            format: AudioFormat::Wav,
            decoder,
            stats: Mutex::new(LoaderStats::default()),
            last_error: Mutex::new(None),
        }
    }

    /// Data root all requests are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Container format requested from the decoder
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Folder and file path a request resolves to
    pub fn resolve(&self, request: &LoadRequest) -> (PathBuf, PathBuf) {
        let directory = self.root.join(&request.base_directory);
        let file = directory.join(&request.asset_name);
        (directory, file)
    }

    /// Load `asset_name` from the `base_directory` folder under the data root
    pub async fn load(&self, base_directory: &str, asset_name: &str) -> LoadResult {
        self.load_request(&LoadRequest::new(base_directory, asset_name)).await
    }

    /// Load a clip described by `request`
    pub async fn load_request(&self, request: &LoadRequest) -> LoadResult {
        self.stats.lock().requested += 1;

        let result = self.try_load(request).await;
        match &result {
            Ok(_) => {
                let mut stats = self.stats.lock();
                stats.loaded += 1;
                stats.consecutive_failures = 0;
            }
            Err(e) => self.record_failure(request, e.clone()),
        }
        result
    }

    /// Like [`ClipLoader::load`], giving up after `timeout`.
    ///
    /// A decode already running keeps going in the background; its result is
    /// dropped.
    pub async fn load_with_timeout(&self, base_directory: &str, asset_name: &str, timeout: Duration) -> LoadResult {
        let request = LoadRequest::new(base_directory, asset_name);
        match tokio::time::timeout(timeout, self.load_request(&request)).await {
            Ok(result) => result,
            Err(_) => {
                let error = LoadError::new(
                    LoadErrorKind::Timeout,
                    format!("no result after {:?}", timeout),
                );
                self.record_failure(&request, error.clone());
                Err(error)
            }
        }
    }

    /// Get loading statistics
    pub fn stats(&self) -> LoaderStats {
        self.stats.lock().clone()
    }

    /// Most recent failure, if any
    pub fn last_error(&self) -> Option<LoadError> {
        self.last_error.lock().clone()
    }

    async fn try_load(&self, request: &LoadRequest) -> LoadResult {
        request.validate()?;
        let (directory, path) = self.resolve(request);

        if !is_dir(&directory).await {
            return Err(match tokio::fs::create_dir_all(&directory).await {
                Ok(()) => LoadError::new(
                    LoadErrorKind::MissingDirectory,
                    format!("{} did not exist; created it", directory.display()),
                ),
                Err(e) => LoadError::new(
                    LoadErrorKind::MissingDirectory,
                    format!("{} does not exist and could not be created: {}", directory.display(), e),
                ),
            });
        }

        if !is_file(&path).await {
            return Err(LoadError::new(
                LoadErrorKind::MissingFile,
                format!("no audio file at {}", path.display()),
            ));
        }

        let start = Instant::now();
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            LoadError::new(
                LoadErrorKind::DecodeFailed,
                format!("could not read {}: {}", path.display(), e),
            )
        })?;
        let size = bytes.len() as u64;

        let decoder = Arc::clone(&self.decoder);
        let format = self.format;
        let name = request.clip_name().to_string();
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&name, &bytes, format)).await;

        let clip = match decoded {
            Ok(Ok(clip)) => clip.into_handle(),
            Ok(Err(e)) => {
                return Err(LoadError::new(
                    LoadErrorKind::DecodeFailed,
                    format!("{}: {}", path.display(), e),
                ))
            }
            Err(e) => return Err(LoadError::new(LoadErrorKind::Unexpected, describe_join_error(e))),
        };

        self.stats.lock().bytes_read += size;
        log::debug!(
            "Loaded clip '{}' from {} ({} bytes, {:.2}s) in {:?}",
            clip.name(),
            path.display(),
            size,
            clip.length(),
            start.elapsed()
        );
        Ok(clip)
    }

    fn record_failure(&self, request: &LoadRequest, error: LoadError) {
        log::error!("Failed to load clip {}: {}", request, error);
        {
            let mut stats = self.stats.lock();
            stats.failed += 1;
            stats.consecutive_failures += 1;
        }
        *self.last_error.lock() = Some(error);
    }
}

impl fmt::Debug for ClipLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipLoader")
            .field("root", &self.root)
            .field("format", &self.format)
            .field("stats", &*self.stats.lock())
            .finish()
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map_or(false, |m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map_or(false, |m| m.is_file())
}

fn describe_join_error(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("decode task did not finish: {}", error);
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("decoder panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("decoder panicked: {}", message)
    } else {
        "decoder panicked".to_string()
    }
}
