//! An open statistics file with its background offset scan.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    mpsc::{self, Receiver, Sender},
};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::{
    buffered_file::BufferedFile,
    configuration::{ScanOptions, SourceOptions},
    error::BitscopeError,
    progress::{CancellationToken, OperationType, PercentTracker},
    statistics::{
        csv::{self, CsvScanner},
        data::{FrameTypeData, LoadedFrame},
        index::{LineOutcome, OffsetIndex, ScanState, scan_lines},
        types::{StatisticsHeader, StatisticsType},
        vtm_bms::{self, VtmBmsScanner},
    },
};

/// Text layouts a statistics file can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticsFormat {
    /// `;`-separated rows with a `%` header.
    Csv,
    /// `BlockStat:` lines with a `#` header.
    VtmBms,
}

impl StatisticsFormat {
    /// Pick a format from the extension of `path`, falling back to the
    /// first byte of the file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => return Some(StatisticsFormat::Csv),
            Some("vtmbmsstats" | "bmsstats" | "bms") => return Some(StatisticsFormat::VtmBms),
            _ => {}
        }

        let mut first = [0u8; 1];
        File::open(path).ok()?.read_exact(&mut first).ok()?;
        match first[0] {
            b'%' => Some(StatisticsFormat::Csv),
            b'#' | b'B' => Some(StatisticsFormat::VtmBms),
            _ => None,
        }
    }
}

impl Display for StatisticsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StatisticsFormat::Csv => f.write_str("CSV"),
            StatisticsFormat::VtmBms => f.write_str("VTM-BMS"),
        }
    }
}

/// Notifications sent from the background scan, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum StatisticsEvent {
    /// Data for a (frame, type) pair can now be loaded.
    TypeAvailable { frame: i32, type_id: i32 },
    /// Data for every type of `frame` can now be loaded.
    FrameAvailable { frame: i32 },
    /// Percentage of the file scanned so far.
    Progress(f64),
    /// The scan stopped.
    Finished(ScanState),
}

/// Snapshot of a statistics file's status.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsInfo {
    pub path: PathBuf,
    pub format: StatisticsFormat,
    pub state: ScanState,
    /// Percentage of the file scanned.
    pub progress: f64,
    /// First parse or structure error, if any.
    pub error: Option<String>,
    /// First frame found to hold a region outside the declared frame size.
    pub block_outside_frame: Option<i32>,
    pub max_frame: Option<i32>,
    pub frame_rate: Option<f64>,
    pub frame_size: Option<(u32, u32)>,
    pub sorted_by_frame: bool,
}

impl StatisticsInfo {
    /// Ordered (label, value) pairs for display.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let optional = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        vec![
            ("File".to_string(), self.path.display().to_string()),
            ("Format".to_string(), self.format.to_string()),
            ("State".to_string(), self.state.to_string()),
            ("Progress".to_string(), format!("{:.0}%", self.progress)),
            (
                "Frame size".to_string(),
                optional(self.frame_size.map(|(w, h)| format!("{w}x{h}"))),
            ),
            (
                "Frame rate".to_string(),
                optional(self.frame_rate.map(|rate| format!("{rate}"))),
            ),
            (
                "Max frame".to_string(),
                optional(self.max_frame.map(|frame| frame.to_string())),
            ),
            (
                "Sorted by frame".to_string(),
                self.sorted_by_frame.to_string(),
            ),
            (
                "Blocks outside frame".to_string(),
                optional(
                    self.block_outside_frame
                        .map(|frame| format!("first in frame {frame}")),
                ),
            ),
            ("Error".to_string(), optional(self.error.clone())),
        ]
    }
}

impl Display for StatisticsInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (label, value) in self.to_pairs() {
            writeln!(f, "{label}: {value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ScanStatus {
    state: ScanState,
    progress: f64,
    error: Option<String>,
    block_outside_frame: Option<i32>,
}

impl ScanStatus {
    fn set_error(&mut self, message: String) {
        self.error.get_or_insert(message);
    }
}

#[derive(Debug, Default)]
struct Shared {
    index: Mutex<OffsetIndex>,
    status: Mutex<ScanStatus>,
}

enum LineScanner {
    Csv(CsvScanner),
    VtmBms(VtmBmsScanner),
}

impl LineScanner {
    fn new(format: StatisticsFormat) -> Self {
        match format {
            StatisticsFormat::Csv => LineScanner::Csv(CsvScanner::new()),
            StatisticsFormat::VtmBms => LineScanner::VtmBms(VtmBmsScanner::new()),
        }
    }

    fn process_line(
        &mut self,
        offset: u64,
        line: &[u8],
        index: &Mutex<OffsetIndex>,
    ) -> Result<LineOutcome, BitscopeError> {
        match self {
            LineScanner::Csv(scanner) => scanner.process_line(offset, line, index),
            LineScanner::VtmBms(scanner) => scanner.process_line(offset, line, index),
        }
    }
}

/// Everything a scan thread needs.
struct ScanJob {
    path: PathBuf,
    format: StatisticsFormat,
    options: SourceOptions,
    scan: ScanOptions,
    token: CancellationToken,
    shared: Arc<Shared>,
    events: Sender<StatisticsEvent>,
}

impl ScanJob {
    fn run(self) {
        log::debug!("Scanning {} statistics in {}", self.format, self.path.display());

        // Its own handle, so foreground loads never wait on the scan.
        let mut file = BufferedFile::with_options(self.options.clone().with_watch_files(false));
        if let Err(error) = file.open(&self.path) {
            self.finish(ScanState::Errored, Some(error.to_string()));
            return;
        }

        let file_size = file.size().unwrap_or(0);
        let mut tracker = PercentTracker::new(
            self.scan.progress.clone(),
            OperationType::StatisticsIndexing,
            Some(file_size),
        );
        let mut scanner = LineScanner::new(self.format);

        let result = scan_lines(
            &file,
            self.options.read_chunk_size,
            || self.token.is_cancelled() || self.scan.is_cancelled(),
            |offset, line| {
                let outcome = scanner.process_line(offset, line, &self.shared.index)?;
                if let Some((frame, type_id)) = outcome.available {
                    let event = match type_id {
                        Some(type_id) => StatisticsEvent::TypeAvailable { frame, type_id },
                        None => StatisticsEvent::FrameAvailable { frame },
                    };
                    let _ = self.events.send(event);
                }
                if outcome.frame_changed && file_size > 0 {
                    let progress = offset as f64 * 100.0 / file_size as f64;
                    self.shared.status.lock().progress = progress;
                    if tracker.advance(progress as i32) {
                        let _ = self.events.send(StatisticsEvent::Progress(progress));
                    }
                }
                Ok(())
            },
        );

        match result {
            Ok(true) => {
                tracker.finish();
                self.shared.status.lock().progress = 100.0;
                let _ = self.events.send(StatisticsEvent::Progress(100.0));
                log::info!(
                    "Indexed {} frames of {}",
                    self.shared.index.lock().frame_count(),
                    self.path.display()
                );
                self.finish(ScanState::Completed, None);
            }
            Ok(false) => {
                log::debug!("Statistics scan of {} cancelled", self.path.display());
                self.finish(ScanState::Cancelled, None);
            }
            Err(error) => {
                log::warn!("Statistics scan of {} failed: {error}", self.path.display());
                self.finish(ScanState::Errored, Some(error.to_string()));
            }
        }
    }

    fn finish(&self, state: ScanState, error: Option<String>) {
        {
            let mut status = self.shared.status.lock();
            status.state = state;
            if let Some(message) = error {
                status.set_error(message);
            }
        }
        // The receiver may already be gone.
        let _ = self.events.send(StatisticsEvent::Finished(state));
    }
}

/// A statistics file: its header, a background frame/offset scan, and
/// on-demand loading of single frames.
///
/// Scan errors never escape as `Err`; they land in a sticky slot readable
/// through [`info`](Self::info).
///
/// # Example
///
/// ```no_run
/// use bitscope::{BitscopeError, StatisticsFile};
///
/// let mut stats = StatisticsFile::open("encoder_stats.csv")?;
/// stats.wait();
/// let info = stats.info();
/// println!("{} frames, state {}", info.max_frame.unwrap_or(-1) + 1, info.state);
/// for statistics_type in stats.types() {
///     let data = stats.load_statistic_data(0, statistics_type.id);
///     println!("{}: {} regions in frame 0", statistics_type.name, data.len());
/// }
/// # Ok::<(), BitscopeError>(())
/// ```
pub struct StatisticsFile {
    path: PathBuf,
    format: StatisticsFormat,
    options: SourceOptions,
    scan: ScanOptions,
    file: BufferedFile,
    header: StatisticsHeader,
    shared: Arc<Shared>,
    events: Receiver<StatisticsEvent>,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for StatisticsFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StatisticsFile")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl StatisticsFile {
    /// Open `path`, guessing its format, and start the background scan.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or its format is not recognised.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BitscopeError> {
        let path = path.as_ref();
        let format = StatisticsFormat::from_path(path).ok_or_else(|| {
            BitscopeError::StatisticsStructure(format!(
                "unrecognised statistics format: {}",
                path.display()
            ))
        })?;
        Self::open_with_options(path, format, SourceOptions::default(), ScanOptions::new())
    }

    /// Open `path` as `format` with explicit options.
    ///
    /// The header is read before this returns. A header error is recorded
    /// and the scan still runs.
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        format: StatisticsFormat,
        options: SourceOptions,
        scan: ScanOptions,
    ) -> Result<Self, BitscopeError> {
        let path = path.as_ref().to_path_buf();
        let mut file = BufferedFile::with_options(options.clone());
        file.open(&path)?;

        let (_, events) = mpsc::channel();
        let mut statistics = Self {
            path,
            format,
            options,
            scan,
            file,
            header: StatisticsHeader::new(),
            shared: Arc::new(Shared::default()),
            events,
            token: CancellationToken::new(),
            worker: None,
        };
        statistics.start();
        Ok(statistics)
    }

    /// Read the header and spawn a fresh scan.
    fn start(&mut self) {
        self.shared = Arc::new(Shared::default());
        self.header = StatisticsHeader::new();
        let header_result = match self.format {
            StatisticsFormat::Csv => csv::read_header(&self.file, &mut self.header),
            StatisticsFormat::VtmBms => vtm_bms::read_header(&self.file, &mut self.header),
        };
        if let Err(error) = header_result {
            log::warn!("Header of {} is malformed: {error}", self.path.display());
            self.shared.status.lock().set_error(error.to_string());
        }
        log::debug!(
            "{} declares {} statistic types",
            self.path.display(),
            self.header.types().len()
        );

        let (sender, receiver) = mpsc::channel();
        self.events = receiver;
        self.token = CancellationToken::new();
        self.shared.status.lock().state = ScanState::Scanning;

        let job = ScanJob {
            path: self.path.clone(),
            format: self.format,
            options: self.options.clone(),
            scan: self.scan.clone(),
            token: self.token.clone(),
            shared: Arc::clone(&self.shared),
            events: sender,
        };
        self.worker = Some(thread::spawn(move || job.run()));
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StatisticsFormat {
        self.format
    }

    pub fn header(&self) -> &StatisticsHeader {
        &self.header
    }

    /// Declared statistic types.
    pub fn types(&self) -> &[StatisticsType] {
        self.header.types()
    }

    pub fn state(&self) -> ScanState {
        self.shared.status.lock().state
    }

    /// Percentage of the file scanned so far.
    pub fn progress(&self) -> f64 {
        self.shared.status.lock().progress
    }

    /// The sticky error message, if anything went wrong.
    pub fn error(&self) -> Option<String> {
        self.shared.status.lock().error.clone()
    }

    /// A copy of the offsets recorded so far.
    pub fn offset_index(&self) -> OffsetIndex {
        self.shared.index.lock().clone()
    }

    /// Current status of the file and its scan.
    pub fn info(&self) -> StatisticsInfo {
        let (max_frame, sorted_by_frame) = {
            let index = self.shared.index.lock();
            (index.max_frame(), index.is_sorted_by_frame())
        };
        let status = self.shared.status.lock();
        StatisticsInfo {
            path: self.path.clone(),
            format: self.format,
            state: status.state,
            progress: status.progress,
            error: status.error.clone(),
            block_outside_frame: status.block_outside_frame,
            max_frame,
            frame_rate: self.header.frame_rate,
            frame_size: self.header.frame_size,
            sorted_by_frame,
        }
    }

    /// Path, timestamps, and size of the underlying file.
    pub fn file_info(&self) -> Vec<(String, String)> {
        self.file.file_info()
    }

    /// Drain the events sent since the last call.
    pub fn poll_events(&self) -> Vec<StatisticsEvent> {
        self.events.try_iter().collect()
    }

    /// Whether the file changed on disk since the last call.
    pub fn has_changed(&self) -> bool {
        self.file.get_and_reset_changed_flag()
    }

    /// Ask the scan to stop at its next buffer refill.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Block until the scan has stopped.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                let mut status = self.shared.status.lock();
                status.state = ScanState::Errored;
                status.set_error("statistics scan thread panicked".to_string());
            }
        }
    }

    /// Stop the running scan, reopen the file, and scan it from scratch.
    ///
    /// The cancellation token given at open only governs the first scan.
    /// Reloaded scans keep the progress callback and stop on
    /// [`cancel`](Self::cancel).
    ///
    /// # Errors
    ///
    /// Fails if the file can no longer be opened.
    pub fn reload(&mut self) -> Result<(), BitscopeError> {
        self.cancel();
        self.wait();
        self.file.open(&self.path)?;
        self.scan.cancellation = None;
        self.start();
        Ok(())
    }

    /// Parse the regions of `type_id` in `frame`.
    ///
    /// Returns empty data when the scan has not recorded the pair. Parse
    /// problems are recorded in the sticky error slot.
    pub fn load_statistic_data(&self, frame: i32, type_id: i32) -> FrameTypeData {
        let loaded = match self.format {
            StatisticsFormat::Csv => {
                let (start, sorted_by_frame) = {
                    let index = self.shared.index.lock();
                    if index.offset(frame, type_id).is_none() {
                        return FrameTypeData::new();
                    }
                    let start = if index.is_sorted_by_frame() {
                        index.frame_start(frame)
                    } else {
                        index.offset(frame, type_id)
                    };
                    (start, index.is_sorted_by_frame())
                };
                let Some(start) = start else {
                    return FrameTypeData::new();
                };
                csv::load_frame(
                    &self.file,
                    &self.header,
                    start,
                    sorted_by_frame,
                    frame,
                    type_id,
                )
            }
            StatisticsFormat::VtmBms => {
                let Some(start) = self.shared.index.lock().frame_start(frame) else {
                    return FrameTypeData::new();
                };
                vtm_bms::load_frame(&self.file, &self.header, start, frame, type_id)
            }
        };
        self.take_loaded(frame, type_id, loaded)
    }

    fn take_loaded(&self, frame: i32, type_id: i32, mut loaded: LoadedFrame) -> FrameTypeData {
        let mut status = self.shared.status.lock();
        if loaded.outside_frame && status.block_outside_frame.is_none() {
            log::warn!(
                "{}: frame {frame} has blocks outside the {:?} frame",
                self.path.display(),
                self.header.frame_size
            );
            status.block_outside_frame = Some(frame);
        }
        if let Some(message) = loaded.error {
            status.set_error(message);
        }
        loaded.data.remove(&type_id).unwrap_or_default()
    }
}

impl Drop for StatisticsFile {
    fn drop(&mut self) {
        self.cancel();
        self.wait();
    }
}
