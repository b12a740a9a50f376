//! Guessing raw-video properties from file and folder names.
//!
//! Raw sequences are commonly named like `Kimono_1920x1080_24_10b.yuv` or
//! stored in folders such as `720p50/`. [`FileNameFormat::from_path`] pulls
//! frame size, frame rate, bit depth, and a packed marker out of such names.
//!
//! # Example
//!
//! ```
//! use bitscope::FileNameFormat;
//!
//! let format = FileNameFormat::from_path("Kimono_1920x1080_24_10b.yuv");
//! assert_eq!(format.frame_size, Some((1920, 1080)));
//! assert_eq!(format.frame_rate, Some(24.0));
//! assert_eq!(format.bit_depth, Some(10));
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Size, rate, and sample format hints found in a name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileNameFormat {
    /// Frame width and height.
    pub frame_size: Option<(u32, u32)>,
    /// Frames per second.
    pub frame_rate: Option<f64>,
    /// Bits per sample.
    pub bit_depth: Option<u32>,
    /// Whether a `packed` marker was found.
    pub packed: bool,
}

const BIT_DEPTHS: [u32; 5] = [8, 9, 10, 12, 16];

// Most to least specific.
static SIZE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"([0-9]+)(?:x|X|\*)([0-9]+)_([0-9]+)(?:Hz)?_([0-9]+)b?[\._]",
        r"([0-9]+)(?:x|X|\*)([0-9]+)_([0-9]+)(?:Hz)?[\._]",
        r"([0-9]+)(?:x|X|\*)([0-9]+)[\._]",
    ])
});

static RESOLUTION_RATE_PATTERNS: LazyLock<Vec<(Regex, (u32, u32))>> = LazyLock::new(|| {
    compile(&[r"1080p([0-9]+)", r"720p([0-9]+)"])
        .into_iter()
        .zip([(1920, 1080), (1280, 720)])
        .collect()
});

static RATE_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile_case_insensitive(&[r"([0-9]+)fps", r"([0-9]+)HZ"]));

static BIT_DEPTH_PATTERNS: LazyLock<Vec<(u32, Regex)>> = LazyLock::new(|| {
    BIT_DEPTHS
        .iter()
        .filter_map(|&depth| {
            Regex::new(&format!(r"(?:_|\.|-){depth}b(?:_|\.|-)"))
                .ok()
                .map(|regex| (depth, regex))
        })
        .collect()
});

static PACKED_PATTERN: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"(?:_|\.|-)packed(?:_|\.|-)"]));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
}

fn compile_case_insensitive(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .ok()
        })
        .collect()
}

impl FileNameFormat {
    /// Inspect the file name of `path`, then the name of its parent folder.
    ///
    /// Values found in the file name take precedence.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let mut format = FileNameFormat::default();

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            return format;
        };
        let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let dir_name = absolute
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        for name in [file_name, dir_name] {
            format.inspect(name);
        }
        format
    }

    /// Apply the guessing rules to one name, filling only unknown fields.
    pub fn inspect(&mut self, name: &str) {
        if self.frame_size.is_none() {
            self.size_from_patterns(name);
        }
        if self.frame_size.is_none() {
            for (regex, size) in RESOLUTION_RATE_PATTERNS.iter() {
                if let Some(captures) = regex.captures(name) {
                    self.frame_size = Some(*size);
                    self.frame_rate = captures
                        .get(1)
                        .and_then(|rate| rate.as_str().parse::<f64>().ok());
                    break;
                }
            }
        }
        if self.frame_size.is_none() {
            self.frame_size = named_size(name);
        }

        if self.frame_size.is_none() {
            return;
        }

        if self.frame_rate.is_none() {
            self.frame_rate = RATE_PATTERNS.iter().find_map(|regex| {
                regex
                    .captures(name)
                    .and_then(|captures| captures.get(1))
                    .and_then(|rate| rate.as_str().parse::<f64>().ok())
            });
        }

        if self.bit_depth.is_none() {
            self.bit_depth = bit_depth_from_name(name);
        }

        if PACKED_PATTERN.iter().any(|regex| regex.is_match(name)) {
            self.packed = true;
        }
    }

    fn size_from_patterns(&mut self, name: &str) {
        for regex in SIZE_PATTERNS.iter() {
            let Some(captures) = regex.captures(name) else {
                continue;
            };
            let number = |index: usize| {
                captures
                    .get(index)
                    .and_then(|value| value.as_str().parse::<u32>().ok())
            };
            if let (Some(width), Some(height)) = (number(1), number(2)) {
                if width > 0 && height > 0 {
                    self.frame_size = Some((width, height));
                }
            }
            if let Some(rate) = number(3) {
                self.frame_rate = Some(f64::from(rate));
            }
            if let Some(depth) = number(4) {
                self.bit_depth = Some(depth);
            }
            break;
        }
    }
}

fn named_size(name: &str) -> Option<(u32, u32)> {
    let lower = name.to_lowercase();
    if lower.contains("_cif") {
        Some((352, 288))
    } else if lower.contains("_qcif") {
        Some((176, 144))
    } else if lower.contains("_4cif") {
        Some((704, 576))
    } else if name.contains("UHD") {
        Some((3840, 2160))
    } else if name.contains("HD") || name.contains("1080p") {
        Some((1920, 1080))
    } else if name.contains("720p") {
        Some((1280, 720))
    } else {
        None
    }
}

fn bit_depth_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    for (depth, regex) in BIT_DEPTH_PATTERNS.iter() {
        if lower.contains(&format!("{depth}bit")) || lower.contains(&format!("{depth}-bit")) {
            return Some(*depth);
        }
        if regex.is_match(name) {
            return Some(*depth);
        }
    }
    None
}

/// Resolve a file reference stored relative to another file.
///
/// Returns `absolute` if it exists. Otherwise joins `relative` to the
/// directory of `current` and returns the cleaned result if it names a
/// regular file. `None` when neither exists.
pub fn absolute_path_from_abs_and_rel(
    current: &Path,
    absolute: &Path,
    relative: &Path,
) -> Option<PathBuf> {
    if absolute.exists() {
        return Some(absolute.to_path_buf());
    }
    let base = current.parent().unwrap_or_else(|| Path::new(""));
    let combined = base.join(relative);
    if combined.is_file() {
        Some(clean_path(&combined))
    } else {
        None
    }
}

fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(cleaned.components().next_back(), Some(Component::Normal(_))) {
                    cleaned.pop();
                } else {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}
