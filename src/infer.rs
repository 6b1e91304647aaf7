//! Date-column detection heuristics.
//!
//! This module owns the load-bearing logic of the tool:
//!
//! - **Date-likeness**: a purely lexical shape test ([`is_date_like`]) that
//!   accepts anything that *looks* like a date — `32/13/9999` passes even
//!   though no such day exists. Calendar validity belongs to the parsing
//!   backend in [`crate::dates`].
//! - **Tokenization**: [`numeric_tokens`] extracts the first three numeric
//!   components of a value for voting purposes only.
//! - **Order voting**: [`infer_order`] accumulates weighted votes across a
//!   column's samples to favour one of DMY/MDY/YMD, reporting ambiguity when
//!   no order wins strictly.
//! - **Column classification**: [`column_is_date`] applies the like-ratio and
//!   parse-success-ratio thresholds to decide whether a column is a date
//!   column at all.
//!
//! The threshold constants are part of the observable behaviour and are kept
//! as named values.

use std::sync::LazyLock;

use regex::Regex;

use crate::dates::{self, Order};

/// Minimum fraction of a column's non-empty samples that must look like dates.
pub const DATE_LIKE_RATIO: f64 = 0.6;
/// Minimum fraction of the date-like samples that one parsing strategy must
/// successfully parse.
pub const PARSE_SUCCESS_RATIO: f64 = 0.6;

/// Strategies tried by the column classifier, in order.
const CLASSIFIER_STRATEGIES: [Option<Order>; 4] =
    [None, Some(Order::Ymd), Some(Order::Dmy), Some(Order::Mdy)];

static DATE_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^
        (?:
            \d{1,4}[-/.\s]\d{1,2}[-/.\s]\d{1,4}
          | \d{1,2}[-/.\s][A-Za-z]{3,}[-/.\s]\d{2,4}
          | [A-Za-z]{3,}\s+\d{1,2},?\s+\d{2,4}
          | \d{4}-\d{1,2}-\d{1,2}
        )
        (?:
            [T\x20]
            \d{1,2}:\d{2}(?::\d{2})?(?:\.\d+)?
            (?:\s*(?:Z|[+-]\d{2}:?\d{2}))?
        )?
        $
    ",
    )
    .expect("date likeness pattern compiles")
});

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-/.\s]+").expect("separator pattern compiles"));

/// Lexical shape test: does this value resemble a date, optionally followed
/// by a time-of-day and zone suffix?
pub fn is_date_like(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && DATE_LIKE_RE.is_match(trimmed)
}

/// First three purely numeric components of the value, or `None` when fewer
/// exist. Alphabetic tokens such as month names are skipped, which also means
/// month-name dates contribute no vote.
pub fn numeric_tokens(value: &str) -> Option<(u64, u64, u64)> {
    let mut numbers = SEPARATORS.split(value.trim()).filter_map(|token| {
        if !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit()) {
            token.parse::<u64>().ok()
        } else {
            None
        }
    });
    let a = numbers.next()?;
    let b = numbers.next()?;
    let c = numbers.next()?;
    Some((a, b, c))
}

/// Weighted vote counts per component order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    dmy: u32,
    mdy: u32,
    ymd: u32,
}

impl VoteTally {
    pub fn add(&mut self, order: Order, weight: u32) {
        match order {
            Order::Dmy => self.dmy += weight,
            Order::Mdy => self.mdy += weight,
            Order::Ymd => self.ymd += weight,
        }
    }

    pub fn get(&self, order: Order) -> u32 {
        match order {
            Order::Dmy => self.dmy,
            Order::Mdy => self.mdy,
            Order::Ymd => self.ymd,
        }
    }

    /// The order with the strictly highest tally; `None` on a tie or when no
    /// votes were cast.
    pub fn winner(&self) -> Option<Order> {
        let mut ranked = Order::ALL.map(|order| (order, self.get(order)));
        ranked.sort_by(|left, right| right.1.cmp(&left.1));
        match ranked {
            [(best, top), (_, second), _] if top > 0 && top > second => Some(best),
            _ => None,
        }
    }
}

/// Aggregate order votes across a column's samples.
///
/// Per tokenizable sample `(a, b, c)`:
/// - `a > 31` can only be a year, so year-first wins outright (weight 2);
/// - otherwise a trailing year (`c > 31`) pivots on which of `a`/`b` can
///   still be a month: `a > 12` proves day-first, `b > 12` proves
///   month-first (weight 2 each), and when both fit the vote splits evenly;
/// - without a year pivot, `a > 12` and `b > 12` each cast a weight-1 vote;
/// - a four-digit leading component with plausible month/day trailing
///   components casts a weight-1 year-first vote.
pub fn infer_order<S: AsRef<str>>(samples: &[S]) -> (Option<Order>, VoteTally) {
    let mut tally = VoteTally::default();
    for sample in samples {
        let Some((a, b, c)) = numeric_tokens(sample.as_ref()) else {
            continue;
        };
        if a > 31 {
            tally.add(Order::Ymd, 2);
            continue;
        }
        if c > 31 {
            if a > 12 {
                tally.add(Order::Dmy, 2);
            } else if b > 12 {
                tally.add(Order::Mdy, 2);
            } else {
                tally.add(Order::Dmy, 1);
                tally.add(Order::Mdy, 1);
            }
            continue;
        }
        if a > 12 {
            tally.add(Order::Dmy, 1);
        }
        if b > 12 {
            tally.add(Order::Mdy, 1);
        }
        if (1000..=9999).contains(&a) && b <= 12 && c <= 31 {
            tally.add(Order::Ymd, 1);
        }
    }
    (tally.winner(), tally)
}

/// Decide whether a column's samples identify it as a date column.
///
/// Rejects outright when fewer than [`DATE_LIKE_RATIO`] of the samples pass
/// the lexical test; otherwise accepts if any single parsing strategy reaches
/// [`PARSE_SUCCESS_RATIO`] over the date-like subset. Acceptance does not fix
/// the order — that is the decision engine's job.
pub fn column_is_date<S: AsRef<str>>(samples: &[S]) -> bool {
    if samples.is_empty() {
        return false;
    }
    let like: Vec<&str> = samples
        .iter()
        .map(AsRef::as_ref)
        .filter(|sample| is_date_like(sample))
        .collect();
    if (like.len() as f64) / (samples.len() as f64) < DATE_LIKE_RATIO {
        return false;
    }
    CLASSIFIER_STRATEGIES.iter().any(|hint| {
        let parsed = like
            .iter()
            .filter(|sample| dates::parse_instant(sample, *hint).is_ok())
            .count();
        parsed as f64 / like.len() as f64 >= PARSE_SUCCESS_RATIO
    })
}
