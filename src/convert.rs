//! Orchestration: dialect sniff, sampling pass, column decisions, then the
//! streaming conversion pass over the full input.

use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::info;

use crate::{
    cli::Cli,
    dates,
    decide::{self, DecideOptions, DecisionMap},
    dialect::{self, Dialect},
    io_utils,
    prompt::OrderResolver,
};

/// Header names plus the bounded row prefix used for detection. Rows are
/// padded to a uniform width; headers are synthesized when the input carries
/// none.
struct TableSample {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

pub fn execute(args: &Cli, resolver: &mut dyn OrderResolver) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.encoding.as_deref())?;
    let dialect = dialect::sniff_path(&args.input, encoding, args.delimiter)?;
    info!(
        "Detected delimiter '{}' quote '{}' header={}",
        crate::printable_delimiter(dialect.delimiter),
        dialect.quote as char,
        dialect.has_headers
    );

    let Some(sample) = sample_table(&args.input, &dialect, encoding, args.sample_rows)? else {
        info!("Input appears empty; nothing to do");
        return Ok(());
    };

    let options = DecideOptions {
        force: args.force_order.map(Into::into),
        assume: args.assume.map(Into::into),
        interactive: !args.no_prompt,
    };
    let decisions = decide::decide_columns(&sample.headers, &sample.rows, &options, resolver)?;
    if decisions.is_empty() {
        info!("No date-like columns detected; copying input through unchanged");
    } else {
        for (index, decision) in &decisions {
            let name = &sample.headers[*index];
            match decision {
                Some(order) => info!("Column '{name}' -> {order}"),
                None => info!("Column '{name}' left unchanged"),
            }
        }
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| crate::cli::derive_output_path(&args.input));
    let (rows, converted) = convert_stream(&args.input, &output_path, &dialect, encoding, &decisions)?;
    info!(
        "Converted {} cell(s) across {} row(s) -> {}",
        converted,
        rows,
        output_path.display()
    );
    Ok(())
}

/// First pass: collect the header row and up to `cap` rows beneath it,
/// padded to the widest observed width. Returns `None` for an input with no
/// records at all.
fn sample_table(
    path: &Path,
    dialect: &Dialect,
    encoding: &'static Encoding,
    cap: usize,
) -> Result<Option<TableSample>> {
    let mut reader = io_utils::open_csv_reader(path, dialect)?;
    let mut record = csv::ByteRecord::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    while rows.len() <= cap
        && reader
            .read_byte_record(&mut record)
            .with_context(|| format!("Reading row {}", rows.len() + 1))?
    {
        rows.push(io_utils::decode_record(&record, encoding)?);
    }
    if rows.is_empty() {
        return Ok(None);
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        while row.len() < width {
            row.push(String::new());
        }
    }

    let (headers, rows) = if dialect.has_headers {
        let mut iter = rows.into_iter();
        let headers = iter.next().unwrap_or_default();
        (headers, iter.collect())
    } else {
        (generate_field_names(width), rows)
    };
    Ok(Some(TableSample { headers, rows }))
}

fn generate_field_names(count: usize) -> Vec<String> {
    (0..count).map(|idx| format!("field_{idx}")).collect()
}

/// Second pass: re-read the input from the beginning and stream it to the
/// output, rewriting decided cells whose values parse. The first record is
/// written through unchanged; short rows are right-padded to its width and
/// wide rows pass through with their extra cells intact.
fn convert_stream(
    input: &Path,
    output: &Path,
    dialect: &Dialect,
    encoding: &'static Encoding,
    decisions: &DecisionMap,
) -> Result<(usize, usize)> {
    let mut reader = io_utils::open_csv_reader(input, dialect)?;
    let mut writer = io_utils::open_csv_writer(output, dialect, encoding)?;

    let mut record = csv::ByteRecord::new();
    if !reader
        .read_byte_record(&mut record)
        .context("Reading first row")?
    {
        return Ok((0, 0));
    }
    let first_row = io_utils::decode_record(&record, encoding)?;
    let width = first_row.len();
    writer
        .write_record(first_row.iter())
        .context("Writing header row")?;

    let mut rows = 0usize;
    let mut converted = 0usize;
    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("Reading row {}", rows + 2))?
    {
        let mut row = io_utils::decode_record(&record, encoding)?;
        while row.len() < width {
            row.push(String::new());
        }
        for (&index, decision) in decisions {
            let Some(order) = decision else {
                continue;
            };
            let Some(cell) = row.get(index) else {
                continue;
            };
            let value = cell.trim();
            if value.is_empty() {
                continue;
            }
            let parsed = dates::parse_instant(value, Some(*order))
                .or_else(|_| dates::parse_instant(value, None));
            if let Ok(instant) = parsed {
                row[index] = instant.canonical_form();
                converted += 1;
            }
        }
        writer
            .write_record(row.iter())
            .with_context(|| format!("Writing row {}", rows + 2))?;
        rows += 1;
    }
    writer.flush().context("Flushing output writer")?;
    Ok((rows, converted))
}
