//! I/O utilities for CSV reading, writing, and encoding.
//!
//! All file I/O flows through this module:
//!
//! - **Encoding**: input decoding and output transcoding via `encoding_rs`,
//!   defaulting to UTF-8.
//! - **Reader/writer construction**: readers are flexible (ragged rows are
//!   padded downstream, not rejected) and both sides honour the sniffed
//!   delimiter and quote character.
//! - **Quoting**: output uses `QuoteStyle::Necessary` so cells that are not
//!   rewritten round-trip byte-identically.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::dialect::Dialect;

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Open a raw record reader: no header handling (the conversion pass treats
/// the first physical record itself) and no width enforcement.
pub fn open_csv_reader(path: &Path, dialect: &Dialect) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .double_quote(true)
        .flexible(true);
    Ok(builder.from_reader(BufReader::new(file)))
}

pub fn open_csv_writer(
    path: &Path,
    dialect: &Dialect,
    encoding: &'static Encoding,
) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = Box::new(BufWriter::new(
        File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
    ));
    let writer: Box<dyn Write> = if encoding == UTF_8 {
        base
    } else {
        Box::new(TranscodingWriter::new(base, encoding))
    };

    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .flexible(true);
    Ok(builder.from_writer(writer))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Buffers arbitrary byte chunks, draining maximal valid UTF-8 prefixes into
/// the target encoding. The csv writer flushes at field granularity, so a
/// chunk boundary can land inside a multi-byte character.
struct TranscodingWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    buffer: Vec<u8>,
}

impl<W: Write> TranscodingWriter<W> {
    fn new(inner: W, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            buffer: Vec::new(),
        }
    }

    fn drain(&mut self, finish: bool) -> io::Result<()> {
        loop {
            match std::str::from_utf8(&self.buffer) {
                Ok(text) => {
                    if !text.is_empty() {
                        let owned = text.to_owned();
                        self.encode_and_write(&owned)?;
                    }
                    self.buffer.clear();
                    return Ok(());
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    if valid_up_to > 0 {
                        let prefix =
                            String::from_utf8_lossy(&self.buffer[..valid_up_to]).into_owned();
                        self.encode_and_write(&prefix)?;
                        self.buffer.drain(..valid_up_to);
                        continue;
                    }
                    return match (err.error_len(), finish) {
                        (Some(_), _) => Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "Invalid UTF-8 sequence in output stream",
                        )),
                        (None, true) => Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "Incomplete UTF-8 sequence at end of output stream",
                        )),
                        (None, false) => Ok(()),
                    };
                }
            }
        }
    }

    fn encode_and_write(&mut self, text: &str) -> io::Result<()> {
        let (encoded, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to encode text using {}", self.encoding.name()),
            ));
        }
        self.inner.write_all(encoded.as_ref())
    }
}

impl<W: Write> Write for TranscodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.drain(false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain(true)?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;
    use std::fs;

    #[test]
    fn resolve_encoding_defaults_to_utf8() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(
            resolve_encoding(Some("windows-1252")).unwrap(),
            WINDOWS_1252
        );
        assert!(resolve_encoding(Some("no-such-encoding")).is_err());
    }

    #[test]
    fn writer_transcodes_to_the_requested_encoding() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.csv");
        {
            let mut writer =
                open_csv_writer(&path, &Dialect::default(), WINDOWS_1252).expect("writer");
            writer.write_record(["café", "1"]).expect("write record");
            writer.flush().expect("flush");
        }
        let bytes = fs::read(&path).expect("read output");
        assert!(bytes.contains(&0xE9), "expected windows-1252 e-acute byte");
    }

    #[test]
    fn necessary_quoting_leaves_plain_cells_unquoted() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.csv");
        {
            let mut writer = open_csv_writer(&path, &Dialect::default(), UTF_8).expect("writer");
            writer.write_record(["plain", "with,comma"]).expect("write");
            writer.flush().expect("flush");
        }
        let text = fs::read_to_string(&path).expect("read output");
        assert_eq!(text, "plain,\"with,comma\"\n");
    }
}
