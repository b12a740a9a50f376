//! Buffered file access and line reading.

use std::io::Write;

use bitscope::{BitscopeError, BufferedFile, LineReader, SourceOptions};

fn temp_file_with(content: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

fn unwatched() -> BufferedFile {
    BufferedFile::with_options(SourceOptions::new().with_watch_files(false))
}

// ── Opening ────────────────────────────────────────────────────────

#[test]
fn open_reports_size_and_path() {
    let temp = temp_file_with(b"0123456789");
    let mut file = unwatched();
    assert!(!file.is_open());

    file.open(temp.path()).expect("Failed to open");
    assert!(file.is_open());
    assert_eq!(file.size(), Some(10));
    assert_eq!(file.path(), Some(temp.path()));
}

#[test]
fn open_missing_file() {
    let mut file = unwatched();
    let result = file.open("this_file_does_not_exist.bin");
    assert!(matches!(result, Err(BitscopeError::FileOpen { .. })));
    assert!(!file.is_open());
}

#[test]
fn open_directory_is_not_a_file() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut file = unwatched();
    let result = file.open(directory.path());
    assert!(matches!(result, Err(BitscopeError::NotAFile(_))));
}

#[test]
fn close_forgets_the_file() {
    let temp = temp_file_with(b"abc");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();
    file.close();

    assert!(!file.is_open());
    assert_eq!(file.size(), None);
    assert!(file.file_info().is_empty());

    let mut buffer = Vec::new();
    assert_eq!(file.read_bytes(&mut buffer, 0, 3), 0);
}

// ── Reading ────────────────────────────────────────────────────────

#[test]
fn read_bytes_at_offset() {
    let temp = temp_file_with(b"0123456789");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();

    let mut buffer = Vec::new();
    let read = file.read_bytes(&mut buffer, 3, 4);
    assert_eq!(read, 4);
    assert_eq!(&buffer[..read], b"3456");
}

#[test]
fn read_bytes_short_at_end_of_file() {
    let temp = temp_file_with(b"0123456789");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();

    let mut buffer = Vec::new();
    let read = file.read_bytes(&mut buffer, 8, 16);
    assert_eq!(read, 2);
    assert_eq!(&buffer[..read], b"89");
    assert!(buffer.len() >= 16);

    assert_eq!(file.read_bytes(&mut buffer, 100, 4), 0);
}

#[test]
fn file_info_lists_four_facts() {
    let temp = temp_file_with(b"hello");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();

    let info = file.file_info();
    let labels: Vec<&str> = info.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(labels, ["File Path", "Time Created", "Time Modified", "Nr Bytes"]);
    assert_eq!(info[3].1, "5");
}

// ── Change tracking ────────────────────────────────────────────────

#[test]
fn changed_flag_is_reset_on_read() {
    let temp = temp_file_with(b"abc");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();
    assert!(!file.get_and_reset_changed_flag());

    file.change_notifier().notify();
    assert!(file.get_and_reset_changed_flag());
    assert!(!file.get_and_reset_changed_flag());
}

#[test]
fn reopen_clears_changed_flag() {
    let temp = temp_file_with(b"abc");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();
    file.change_notifier().notify();

    file.open(temp.path()).unwrap();
    assert!(!file.get_and_reset_changed_flag());
}

#[test]
fn watch_setting_follows_options() {
    let temp = temp_file_with(b"abc");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();
    assert!(!file.is_watching());

    // Turning a watch off that was never installed is a no-op.
    file.options_mut().watch_files = false;
    file.update_watch_setting().unwrap();
    assert!(!file.is_watching());
}

// ── LineReader ─────────────────────────────────────────────────────

#[test]
fn line_reader_reports_offsets() {
    let temp = temp_file_with(b"first\nsecond\r\n\nlast");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();

    let lines: Vec<(u64, String)> = LineReader::new(&file, 0).collect();
    assert_eq!(
        lines,
        vec![
            (0, "first".to_string()),
            (6, "second".to_string()),
            (14, String::new()),
            (15, "last".to_string()),
        ]
    );
}

#[test]
fn line_reader_starts_mid_file() {
    let temp = temp_file_with(b"aaa\nbbb\nccc\n");
    let mut file = unwatched();
    file.open(temp.path()).unwrap();

    let mut reader = LineReader::new(&file, 4);
    assert_eq!(reader.next_line(), Some((4, "bbb".to_string())));
    assert_eq!(reader.offset(), 8);
    assert_eq!(reader.next_line(), Some((8, "ccc".to_string())));
    assert_eq!(reader.next_line(), None);
}
