//! CSV dialect sniffing: delimiter, quote character, and header presence.
//!
//! Works on a bounded byte prefix of the input. Delimiter candidates are
//! scored by per-line count uniformity outside quoted regions; the header
//! flag compares header-like against data-like signals between the first row
//! and the rows beneath it. Every failure mode falls back to
//! comma-delimited, double-quoted, header present.

use std::{fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;

use crate::infer;

/// Bytes of input examined when sniffing.
pub const SNIFF_SAMPLE_BYTES: usize = 64 * 1024;
const HEADER_DETECTION_SAMPLE_ROWS: usize = 6;
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    pub has_headers: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            delimiter: b',',
            quote: b'"',
            has_headers: true,
        }
    }
}

pub fn sniff_path(
    path: &Path,
    encoding: &'static Encoding,
    delimiter_override: Option<u8>,
) -> Result<Dialect> {
    let mut file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut sample = vec![0u8; SNIFF_SAMPLE_BYTES];
    let mut filled = 0usize;
    loop {
        let read = file
            .read(&mut sample[filled..])
            .with_context(|| format!("Reading sniff sample from {path:?}"))?;
        if read == 0 {
            break;
        }
        filled += read;
        if filled == sample.len() {
            break;
        }
    }
    sample.truncate(filled);
    Ok(detect(&sample, encoding, delimiter_override))
}

/// Sniff a dialect from a byte prefix. Infallible: anything unrecognizable
/// yields the comma/double-quote/header-present default.
pub fn detect(sample: &[u8], encoding: &'static Encoding, delimiter_override: Option<u8>) -> Dialect {
    let (text, _, _) = encoding.decode(sample);
    let truncated = sample.len() == SNIFF_SAMPLE_BYTES;
    let lines = sample_lines(&text, truncated);
    if lines.is_empty() {
        return Dialect {
            delimiter: delimiter_override.unwrap_or(b','),
            ..Dialect::default()
        };
    }
    let delimiter = delimiter_override
        .or_else(|| detect_delimiter(&lines))
        .unwrap_or(b',');
    let quote = detect_quote(&lines, delimiter);
    let has_headers = detect_headers(&text, delimiter, quote);
    Dialect {
        delimiter,
        quote,
        has_headers,
    }
}

fn sample_lines(text: &str, truncated: bool) -> Vec<&str> {
    let mut lines: Vec<&str> = text.lines().collect();
    // A truncated sample usually ends mid-record.
    if truncated && !text.ends_with('\n') && lines.len() > 1 {
        lines.pop();
    }
    lines.retain(|line| !line.trim().is_empty());
    lines
}

fn detect_delimiter(lines: &[&str]) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for candidate in CANDIDATE_DELIMITERS {
        let mut counts = lines.iter().map(|line| unquoted_count(line, candidate));
        let Some(first) = counts.next() else {
            continue;
        };
        if first == 0 || counts.any(|count| count != first) {
            continue;
        }
        if best.is_none_or(|(_, count)| first > count) {
            best = Some((candidate, first));
        }
    }
    best.map(|(delimiter, _)| delimiter)
}

fn unquoted_count(line: &str, delimiter: u8) -> usize {
    let mut count = 0usize;
    let mut in_quotes = false;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn detect_quote(lines: &[&str], delimiter: u8) -> u8 {
    let mut single = 0usize;
    let mut double = 0usize;
    for line in lines {
        for field in line.split(delimiter as char) {
            let field = field.trim();
            if field.len() < 2 {
                continue;
            }
            if field.starts_with('\'') && field.ends_with('\'') {
                single += 1;
            }
            if field.starts_with('"') && field.ends_with('"') {
                double += 1;
            }
        }
    }
    if single > double { b'\'' } else { b'"' }
}

fn detect_headers(text: &str, delimiter: u8, quote: u8) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .quote(quote)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records().take(HEADER_DETECTION_SAMPLE_ROWS) {
        let Ok(record) = record else { break };
        rows.push(record.iter().map(str::to_string).collect());
    }
    let Some((first, rest)) = rows.split_first() else {
        return true;
    };
    infer_has_header(first, rest)
}

fn value_is_data_like(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.parse::<f64>().is_ok() {
        return true;
    }
    if matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n"
    ) {
        return true;
    }
    infer::is_date_like(trimmed)
}

fn value_is_header_like(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && !value_is_data_like(trimmed)
        && trimmed.chars().any(|c| c.is_ascii_alphabetic())
}

fn infer_has_header(first_row: &[String], other_rows: &[Vec<String>]) -> bool {
    let header_like_first = first_row
        .iter()
        .filter(|value| value_is_header_like(value))
        .count();
    let data_like_first = first_row
        .iter()
        .filter(|value| value_is_data_like(value))
        .count();

    if data_like_first > header_like_first {
        return false;
    }
    if other_rows.is_empty() {
        return header_like_first > 0 && data_like_first == 0;
    }

    let mut header_signal = 0usize;
    let mut data_signal = 0usize;
    for column in 0..first_row.len() {
        let first_value = first_row
            .get(column)
            .map(String::as_str)
            .unwrap_or_default();
        let other_has_data = other_rows
            .iter()
            .any(|row| row.get(column).is_some_and(|value| value_is_data_like(value)));
        if value_is_header_like(first_value) && other_has_data {
            header_signal += 1;
        } else if value_is_data_like(first_value) && other_has_data {
            data_signal += 1;
        }
    }

    if header_signal != data_signal {
        return header_signal > data_signal;
    }
    header_like_first >= data_like_first
}
