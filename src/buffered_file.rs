//! Thread-safe random-access reads over one opened file.
//!
//! [`BufferedFile`] owns at most one OS handle. Every read is a seek followed
//! by a read, performed under one mutex so concurrent callers never
//! interleave. An optional file-system watch reports external modifications
//! through [`BufferedFile::get_and_reset_changed_flag`].
//!
//! # Example
//!
//! ```no_run
//! use bitscope::{BitscopeError, BufferedFile};
//!
//! let mut file = BufferedFile::new();
//! file.open("stats.csv")?;
//!
//! let mut buffer = Vec::new();
//! let read = file.read_bytes(&mut buffer, 0, 4096);
//! println!("read {read} bytes");
//! # Ok::<(), BitscopeError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs::{self, File, Metadata},
    io::{ErrorKind, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use chrono::{DateTime, Local};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::{configuration::SourceOptions, error::BitscopeError};

/// A cloneable handle that marks a [`BufferedFile`] as externally changed.
///
/// The built-in watcher uses one of these internally; callers with their own
/// notification source can obtain one through
/// [`BufferedFile::change_notifier`].
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    changed: Arc<AtomicBool>,
}

impl ChangeNotifier {
    /// Record that the file was modified.
    pub fn notify(&self) {
        self.changed.store(true, Ordering::Release);
    }

    fn take(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    fn reset(&self) {
        self.changed.store(false, Ordering::Release);
    }
}

/// Random-access reader over a single exclusively-owned file handle.
pub struct BufferedFile {
    path: Option<PathBuf>,
    handle: Mutex<Option<File>>,
    metadata: Option<Metadata>,
    changed: ChangeNotifier,
    watcher: Option<RecommendedWatcher>,
    watching: bool,
    options: SourceOptions,
}

impl Debug for BufferedFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BufferedFile")
            .field("path", &self.path)
            .field("is_open", &self.is_open())
            .field("watching", &self.watching)
            .finish_non_exhaustive()
    }
}

impl Default for BufferedFile {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedFile {
    /// Create a closed file with default [`SourceOptions`].
    pub fn new() -> Self {
        Self::with_options(SourceOptions::default())
    }

    /// Create a closed file with the given options.
    pub fn with_options(options: SourceOptions) -> Self {
        Self {
            path: None,
            handle: Mutex::new(None),
            metadata: None,
            changed: ChangeNotifier::default(),
            watcher: None,
            watching: false,
            options,
        }
    }

    /// Open `path` for reading, closing any previously open handle first.
    ///
    /// Resets the changed flag and (re)installs the file watch according to
    /// [`SourceOptions::watch_files`]. A failing watch is logged, not fatal.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::NotAFile`] if `path` is not a regular file and
    /// [`BitscopeError::FileOpen`] if the OS refuses to open it.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BitscopeError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|error| BitscopeError::FileOpen {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        if !metadata.is_file() {
            return Err(BitscopeError::NotAFile(path.to_path_buf()));
        }

        self.close();

        let file = File::open(path).map_err(|error| BitscopeError::FileOpen {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        log::debug!("Opened {} ({} bytes)", path.display(), metadata.len());

        *self.handle.lock() = Some(file);
        self.metadata = Some(metadata);
        self.path = Some(path.to_path_buf());

        if let Err(error) = self.update_watch_setting() {
            log::warn!("Could not watch {}: {error}", path.display());
        }
        self.changed.reset();
        Ok(())
    }

    /// Close the handle and drop any file watch. Does nothing when closed.
    pub fn close(&mut self) {
        if self.watching {
            if let (Some(watcher), Some(path)) = (self.watcher.as_mut(), self.path.as_ref()) {
                let _ = watcher.unwatch(path);
            }
            self.watching = false;
        }
        *self.handle.lock() = None;
        self.metadata = None;
        self.path = None;
    }

    /// Whether a handle is currently open.
    pub fn is_open(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// The path of the open file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// File size in bytes as recorded at open time.
    pub fn size(&self) -> Option<u64> {
        self.metadata.as_ref().map(Metadata::len)
    }

    /// The options this file was created with.
    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// Mutable access to the options. Call
    /// [`update_watch_setting`](Self::update_watch_setting) after changing
    /// [`SourceOptions::watch_files`].
    pub fn options_mut(&mut self) -> &mut SourceOptions {
        &mut self.options
    }

    /// Read up to `count` bytes starting at `start` into `buffer`.
    ///
    /// `buffer` is grown to at least `count` bytes. Returns the number of
    /// bytes actually read, which is smaller than `count` at end of file and
    /// `0` when the file is not open or the read fails.
    pub fn read_bytes(&self, buffer: &mut Vec<u8>, start: u64, count: usize) -> usize {
        if buffer.len() < count {
            buffer.resize(count, 0);
        }

        let mut guard = self.handle.lock();
        let Some(file) = guard.as_mut() else {
            return 0;
        };
        if let Err(error) = file.seek(SeekFrom::Start(start)) {
            log::warn!("Seek to {start} failed: {error}");
            return 0;
        }

        let mut filled = 0;
        while filled < count {
            match file.read(&mut buffer[filled..count]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    log::warn!("Read at {} failed: {error}", start + filled as u64);
                    break;
                }
            }
        }
        filled
    }

    /// Return whether an external modification was seen since the last call,
    /// then clear the flag.
    pub fn get_and_reset_changed_flag(&self) -> bool {
        self.changed.take()
    }

    /// A handle that external notification sources can use to flag changes.
    pub fn change_notifier(&self) -> ChangeNotifier {
        self.changed.clone()
    }

    /// Add or remove the file watch to match [`SourceOptions::watch_files`].
    ///
    /// Repeated calls with an unchanged setting are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::Watch`] if the platform watcher fails.
    pub fn update_watch_setting(&mut self) -> Result<(), BitscopeError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        if self.options.watch_files && !self.watching {
            if self.watcher.is_none() {
                self.watcher = Some(self.create_watcher()?);
            }
            if let Some(watcher) = self.watcher.as_mut() {
                watcher.watch(&path, RecursiveMode::NonRecursive)?;
                self.watching = true;
                log::debug!("Watching {}", path.display());
            }
        } else if !self.options.watch_files && self.watching {
            if let Some(watcher) = self.watcher.as_mut() {
                watcher.unwatch(&path)?;
            }
            self.watching = false;
            log::debug!("Stopped watching {}", path.display());
        }
        Ok(())
    }

    /// Whether a file-system watch is currently installed.
    pub fn is_watching(&self) -> bool {
        self.watching
    }

    /// Labelled file facts: path, creation time, modification time, size.
    ///
    /// Empty when no file is open.
    pub fn file_info(&self) -> Vec<(String, String)> {
        let (Some(path), Some(metadata)) = (self.path.as_ref(), self.metadata.as_ref()) else {
            return Vec::new();
        };

        let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        vec![
            ("File Path".to_string(), absolute.display().to_string()),
            (
                "Time Created".to_string(),
                format_time(metadata.created().ok()),
            ),
            (
                "Time Modified".to_string(),
                format_time(metadata.modified().ok()),
            ),
            ("Nr Bytes".to_string(), metadata.len().to_string()),
        ]
    }

    fn create_watcher(&self) -> Result<RecommendedWatcher, BitscopeError> {
        let notifier = self.changed.clone();
        let watcher = notify::recommended_watcher(
            move |result: Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    if matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) {
                        notifier.notify();
                    }
                }
                Err(error) => log::warn!("File watch error: {error}"),
            },
        )?;
        Ok(watcher)
    }
}

fn format_time(time: Option<SystemTime>) -> String {
    match time {
        Some(time) => DateTime::<Local>::from(time)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => String::new(),
    }
}
