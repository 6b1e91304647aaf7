use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};

use crate::dates::Order;

/// Capability used by the decision engine to settle an ambiguous column.
///
/// The console implementation blocks on stdin; tests substitute deterministic
/// resolvers.
pub trait OrderResolver {
    /// Returns the chosen order, or `None` to leave the column unchanged.
    fn resolve(&mut self, column: &str, samples: &[String]) -> Result<Option<Order>>;
}

/// Blocking console prompt offering DMY/MDY/YMD/Skip, re-prompting until a
/// valid choice arrives.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl OrderResolver for ConsolePrompt {
    fn resolve(&mut self, column: &str, samples: &[String]) -> Result<Option<Order>> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();

        writeln!(out, "\nColumn '{column}' is ambiguous. Sample values:")?;
        for sample in samples {
            writeln!(out, "  - {sample}")?;
        }
        writeln!(out, "\nChoose date order for this column:")?;
        writeln!(out, "  1) DMY  (e.g., 31/12/2024)")?;
        writeln!(out, "  2) MDY  (e.g., 12/31/2024)")?;
        writeln!(out, "  3) YMD  (e.g., 2024-12-31)")?;
        writeln!(out, "  4) Skip (leave values unchanged)")?;

        loop {
            write!(out, "Enter 1/2/3/4: ")?;
            out.flush().context("Flushing prompt output")?;
            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .context("Reading date order choice")?;
            if read == 0 {
                bail!("Input closed before a date order was chosen for column '{column}'");
            }
            match line.trim() {
                "1" => return Ok(Some(Order::Dmy)),
                "2" => return Ok(Some(Order::Mdy)),
                "3" => return Ok(Some(Order::Ymd)),
                "4" => return Ok(None),
                _ => writeln!(out, "Invalid choice. Please enter 1, 2, 3, or 4.")?,
            }
        }
    }
}
