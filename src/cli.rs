use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::dates::Order;

/// Inserted before the extension when no output path is given.
pub const OUTPUT_SUFFIX: &str = "_iso";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Detect date columns in delimited files and rewrite them as ISO-8601",
    long_about = None
)]
pub struct Cli {
    /// Input CSV/TSV file to scan and convert
    pub input: PathBuf,
    /// Output file (defaults to the input path with `_iso` before the extension)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Character encoding of the input and output files (defaults to utf-8)
    #[arg(long)]
    pub encoding: Option<String>,
    /// Number of rows to sample when detecting date columns
    #[arg(long = "sample-rows", default_value_t = 200)]
    pub sample_rows: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|'); sniffed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Never prompt; ambiguous columns fall back to --assume (or YMD)
    #[arg(long = "no-prompt")]
    pub no_prompt: bool,
    /// Date order to assume for ambiguous columns when prompting is disabled
    #[arg(long = "assume", value_enum)]
    pub assume: Option<OrderArg>,
    /// Force this date order for every detected date column, skipping inference
    #[arg(long = "force-order", value_enum)]
    pub force_order: Option<OrderArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OrderArg {
    #[value(name = "DMY", alias = "dmy")]
    Dmy,
    #[value(name = "MDY", alias = "mdy")]
    Mdy,
    #[value(name = "YMD", alias = "ymd")]
    Ymd,
}

impl From<OrderArg> for Order {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Dmy => Order::Dmy,
            OrderArg::Mdy => Order::Mdy,
            OrderArg::Ymd => Order::Ymd,
        }
    }
}

pub fn derive_output_path(input: &Path) -> PathBuf {
    match input.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            let stem = input
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default();
            input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.{ext}"))
        }
        None => {
            let name = input
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            input.with_file_name(format!("{name}{OUTPUT_SUFFIX}"))
        }
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_inserts_the_suffix_before_the_extension() {
        assert_eq!(
            derive_output_path(Path::new("/data/orders.csv")),
            PathBuf::from("/data/orders_iso.csv")
        );
        assert_eq!(
            derive_output_path(Path::new("report.tsv")),
            PathBuf::from("report_iso.tsv")
        );
    }

    #[test]
    fn output_path_appends_the_suffix_without_an_extension() {
        assert_eq!(
            derive_output_path(Path::new("/data/orders")),
            PathBuf::from("/data/orders_iso")
        );
    }

    #[test]
    fn delimiter_tokens_parse_to_bytes() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("comma").unwrap(), b',');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }
}
