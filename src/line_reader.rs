//! Line-by-line reading through a [`BufferedFile`].

use crate::buffered_file::BufferedFile;

const LINE_READER_CHUNK_SIZE: usize = 64 * 1024;

/// Reads successive `\n`-terminated lines starting at a byte offset.
///
/// Each call to [`next_line`](LineReader::next_line) returns the byte offset
/// at which the line starts together with its text (without the line
/// terminator). Reads go through [`BufferedFile::read_bytes`], so a
/// `LineReader` can coexist with other readers of the same file.
pub struct LineReader<'a> {
    file: &'a BufferedFile,
    buffer: Vec<u8>,
    buffer_start: u64,
    buffer_len: usize,
    cursor: usize,
    at_end: bool,
}

impl<'a> LineReader<'a> {
    /// Start reading lines at `offset`.
    pub fn new(file: &'a BufferedFile, offset: u64) -> Self {
        Self {
            file,
            buffer: Vec::new(),
            buffer_start: offset,
            buffer_len: 0,
            cursor: 0,
            at_end: false,
        }
    }

    /// Byte offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.buffer_start + self.cursor as u64
    }

    /// Return the next line, or `None` at end of file.
    pub fn next_line(&mut self) -> Option<(u64, String)> {
        let line_start = self.offset();
        let mut line: Vec<u8> = Vec::new();

        loop {
            if self.cursor >= self.buffer_len {
                if self.at_end || !self.refill() {
                    if line.is_empty() {
                        return None;
                    }
                    break;
                }
            }

            let available = &self.buffer[self.cursor..self.buffer_len];
            match available.iter().position(|&byte| byte == b'\n') {
                Some(newline) => {
                    line.extend_from_slice(&available[..newline]);
                    self.cursor += newline + 1;
                    break;
                }
                None => {
                    line.extend_from_slice(available);
                    self.cursor = self.buffer_len;
                }
            }
        }

        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some((line_start, String::from_utf8_lossy(&line).into_owned()))
    }

    fn refill(&mut self) -> bool {
        self.buffer_start += self.buffer_len as u64;
        self.cursor = 0;
        self.buffer_len = self
            .file
            .read_bytes(&mut self.buffer, self.buffer_start, LINE_READER_CHUNK_SIZE);
        if self.buffer_len < LINE_READER_CHUNK_SIZE {
            self.at_end = true;
        }
        self.buffer_len > 0
    }
}

impl Iterator for LineReader<'_> {
    type Item = (u64, String);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
    }
}
