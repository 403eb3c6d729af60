//! Incremental, lossy file reading.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Streaming UTF-8 decoder that survives chunk boundaries.
///
/// Invalid byte sequences become U+FFFD; a sequence cut by the end of a
/// chunk is carried over to the next one.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
    replaced: usize,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, appending text to `out`.
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        let input = if self.pending.is_empty() {
            std::borrow::Cow::Borrowed(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            std::borrow::Cow::Owned(joined)
        };

        let mut bytes: &[u8] = &input;
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = bytes.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.replaced += 1;
                            bytes = &rest[len..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Flush a dangling partial sequence at end of input.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(char::REPLACEMENT_CHARACTER);
            self.replaced += 1;
        }
    }

    /// Number of replacement characters emitted so far.
    pub fn replaced(&self) -> usize {
        self.replaced
    }
}

/// Outcome of reading one file.
#[derive(Debug, Default)]
pub struct ReadReport {
    /// Bytes read from disk.
    pub bytes_read: u64,
    /// Invalid sequences replaced with U+FFFD.
    pub replaced: usize,
    /// Error that cut the read short, after partial content was emitted.
    pub error: Option<io::Error>,
}

/// Reads files in fixed-size chunks, reusing one buffer across files.
#[derive(Debug)]
pub struct ChunkReader {
    buffer: Vec<u8>,
    text: String,
}

impl ChunkReader {
    /// Create a reader with the given chunk size.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buffer: vec![0; chunk_size.max(1)],
            text: String::new(),
        }
    }

    /// Read at most `limit` bytes of `path`, handing decoded text to `emit`
    /// one chunk at a time.
    ///
    /// Fails only if the file cannot be opened; later errors are returned in
    /// the report.
    pub fn read(
        &mut self,
        path: &Path,
        limit: u64,
        mut emit: impl FnMut(&str),
    ) -> io::Result<ReadReport> {
        let mut file = File::open(path)?.take(limit);
        let mut decoder = Utf8ChunkDecoder::new();
        let mut report = ReadReport::default();

        loop {
            let read = match file.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    report.error = Some(err);
                    break;
                }
            };
            report.bytes_read += read as u64;

            self.text.clear();
            decoder.decode(&self.buffer[..read], &mut self.text);
            emit(&self.text);
        }

        self.text.clear();
        decoder.finish(&mut self.text);
        if !self.text.is_empty() {
            emit(&self.text);
        }
        self.text = String::new();

        report.replaced = decoder.replaced();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_in_chunks(bytes: &[u8], chunk: usize) -> (String, usize) {
        let mut decoder = Utf8ChunkDecoder::new();
        let mut out = String::new();
        for piece in bytes.chunks(chunk) {
            decoder.decode(piece, &mut out);
        }
        decoder.finish(&mut out);
        (out, decoder.replaced())
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let text = "héllo wörld ✓ 日本";
        for chunk in 1..6 {
            let (out, replaced) = decode_in_chunks(text.as_bytes(), chunk);
            assert_eq!(out, text, "chunk size {chunk}");
            assert_eq!(replaced, 0);
        }
    }

    #[test]
    fn test_invalid_bytes_become_placeholder() {
        let (out, replaced) = decode_in_chunks(b"ab\xffcd\xfe", 2);
        assert_eq!(out, "ab\u{FFFD}cd\u{FFFD}");
        assert_eq!(replaced, 2);
    }

    #[test]
    fn test_truncated_sequence_at_end() {
        let (out, replaced) = decode_in_chunks(&"é".as_bytes()[..1], 4);
        assert_eq!(out, "\u{FFFD}");
        assert_eq!(replaced, 1);
    }

    #[test]
    fn test_reader_streams_chunks() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "0123456789").unwrap();

        let mut reader = ChunkReader::new(4);
        let mut chunks = Vec::new();
        let report = reader
            .read(&path, u64::MAX, |text| chunks.push(text.to_string()))
            .unwrap();

        assert_eq!(chunks, vec!["0123", "4567", "89"]);
        assert_eq!(report.bytes_read, 10);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_reader_respects_limit() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("grown.txt");
        std::fs::write(&path, "0123456789").unwrap();

        let mut reader = ChunkReader::new(64);
        let mut content = String::new();
        let report = reader.read(&path, 5, |text| content.push_str(text)).unwrap();

        assert_eq!(content, "01234");
        assert_eq!(report.bytes_read, 5);
    }

    #[test]
    fn test_reader_missing_file() {
        let mut reader = ChunkReader::new(8);
        let err = reader
            .read(Path::new("/definitely/not/here.txt"), 10, |_| {})
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
