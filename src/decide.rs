//! Per-column order decisions: forced order, voter winner, or the near-tie
//! fallback/interactive resolution policy.

use std::collections::BTreeMap;

use anyhow::Result;
use itertools::Itertools;
use log::debug;

use crate::{
    dates::{self, Order},
    infer,
    prompt::OrderResolver,
};

/// A runner-up within this fraction of the best hinted success count keeps
/// the column ambiguous.
pub const NEAR_TIE_RATIO: f64 = 0.9;
/// Order applied to ambiguous columns when prompting is disabled and no
/// assumed order was configured.
pub const DEFAULT_FALLBACK_ORDER: Order = Order::Ymd;
/// Maximum sample values shown to the interactive resolver.
pub const PROMPT_SAMPLE_LIMIT: usize = 10;

/// Column index → chosen order, or `None` for an explicit skip. Columns
/// absent from the map were not accepted as date columns.
pub type DecisionMap = BTreeMap<usize, Option<Order>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct DecideOptions {
    /// Bypass inference entirely and apply this order to every accepted
    /// column.
    pub force: Option<Order>,
    /// Order assumed on ambiguity when running non-interactively.
    pub assume: Option<Order>,
    /// Whether the resolver may be consulted.
    pub interactive: bool,
}

/// Compute the decision map for the sampled table. Each column is evaluated
/// independently of the others.
pub fn decide_columns(
    headers: &[String],
    rows: &[Vec<String>],
    options: &DecideOptions,
    resolver: &mut dyn OrderResolver,
) -> Result<DecisionMap> {
    let mut decisions = DecisionMap::new();
    for (index, name) in headers.iter().enumerate() {
        let samples = column_samples(rows, index);
        if samples.is_empty() || !infer::column_is_date(&samples) {
            continue;
        }
        if let Some(order) = options.force {
            decisions.insert(index, Some(order));
            continue;
        }
        let (winner, tally) = infer::infer_order(&samples);
        debug!("Column '{name}' vote tally: {tally:?}");
        let decision = match winner {
            Some(order) => Some(order),
            None => resolve_ambiguous(name, &samples, options, resolver)?,
        };
        decisions.insert(index, decision);
    }
    Ok(decisions)
}

fn column_samples(rows: &[Vec<String>], index: usize) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get(index))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Voting was inconclusive: rank the hinted strategies by how many date-like
/// samples they parse. A clear leader with at least one success wins; a
/// near-tie (which subsumes the all-zero case) falls back to the assumed
/// order or the interactive resolver.
fn resolve_ambiguous(
    name: &str,
    samples: &[String],
    options: &DecideOptions,
    resolver: &mut dyn OrderResolver,
) -> Result<Option<Order>> {
    let like: Vec<&String> = samples
        .iter()
        .filter(|sample| infer::is_date_like(sample))
        .collect();
    let ranked = Order::ALL
        .iter()
        .map(|&order| {
            let successes = like
                .iter()
                .filter(|sample| dates::parse_instant(sample, Some(order)).is_ok())
                .count();
            (order, successes)
        })
        .sorted_by(|left, right| right.1.cmp(&left.1))
        .collect_vec();
    debug!("Column '{name}' hinted successes: {ranked:?}");

    let (best_order, best) = ranked[0];
    let second = ranked[1].1;
    let near_tie = second as f64 >= NEAR_TIE_RATIO * best as f64;
    if !near_tie && best > 0 {
        return Ok(Some(best_order));
    }
    fallback(name, samples, options, resolver)
}

fn fallback(
    name: &str,
    samples: &[String],
    options: &DecideOptions,
    resolver: &mut dyn OrderResolver,
) -> Result<Option<Order>> {
    if !options.interactive {
        return Ok(Some(options.assume.unwrap_or(DEFAULT_FALLBACK_ORDER)));
    }
    let shown = &samples[..samples.len().min(PROMPT_SAMPLE_LIMIT)];
    resolver.resolve(name, shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubResolver {
        answer: Option<Order>,
        calls: Vec<(String, usize)>,
    }

    impl StubResolver {
        fn new(answer: Option<Order>) -> Self {
            StubResolver {
                answer,
                calls: Vec::new(),
            }
        }
    }

    impl OrderResolver for StubResolver {
        fn resolve(&mut self, column: &str, samples: &[String]) -> Result<Option<Order>> {
            self.calls.push((column.to_string(), samples.len()));
            Ok(self.answer)
        }
    }

    fn table(values: &[&str]) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = vec!["when".to_string()];
        let rows = values.iter().map(|v| vec![v.to_string()]).collect();
        (headers, rows)
    }

    #[test]
    fn forced_order_bypasses_inference() {
        let (headers, rows) = table(&["31/12/2024", "15/01/2024"]);
        let options = DecideOptions {
            force: Some(Order::Mdy),
            ..DecideOptions::default()
        };
        let mut resolver = StubResolver::new(None);
        let decisions = decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert_eq!(decisions.get(&0), Some(&Some(Order::Mdy)));
        assert!(resolver.calls.is_empty());
    }

    #[test]
    fn a_definite_vote_winner_is_assigned_directly() {
        let (headers, rows) = table(&["31/12/2024", "15/01/2024"]);
        let options = DecideOptions::default();
        let mut resolver = StubResolver::new(None);
        let decisions = decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert_eq!(decisions.get(&0), Some(&Some(Order::Dmy)));
        assert!(resolver.calls.is_empty());
    }

    #[test]
    fn ambiguous_column_falls_back_to_ymd_without_an_assumed_order() {
        let (headers, rows) = table(&["01/02/2024", "03/04/2024"]);
        let options = DecideOptions::default();
        let mut resolver = StubResolver::new(None);
        let decisions = decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert_eq!(decisions.get(&0), Some(&Some(Order::Ymd)));
        assert!(resolver.calls.is_empty());
    }

    #[test]
    fn ambiguous_column_uses_the_assumed_order_when_configured() {
        let (headers, rows) = table(&["01/02/2024", "03/04/2024"]);
        let options = DecideOptions {
            assume: Some(Order::Dmy),
            ..DecideOptions::default()
        };
        let mut resolver = StubResolver::new(None);
        let decisions = decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert_eq!(decisions.get(&0), Some(&Some(Order::Dmy)));
    }

    #[test]
    fn interactive_ambiguity_consults_the_resolver() {
        let (headers, rows) = table(&["01/02/2024", "03/04/2024"]);
        let options = DecideOptions {
            interactive: true,
            ..DecideOptions::default()
        };
        let mut resolver = StubResolver::new(Some(Order::Mdy));
        let decisions = decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert_eq!(decisions.get(&0), Some(&Some(Order::Mdy)));
        assert_eq!(resolver.calls.len(), 1);
        assert_eq!(resolver.calls[0].0, "when");
    }

    #[test]
    fn a_skip_answer_records_an_explicit_skip() {
        let (headers, rows) = table(&["01/02/2024", "03/04/2024"]);
        let options = DecideOptions {
            interactive: true,
            ..DecideOptions::default()
        };
        let mut resolver = StubResolver::new(None);
        let decisions = decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert_eq!(decisions.get(&0), Some(&None));
    }

    #[test]
    fn the_resolver_sees_at_most_ten_samples() {
        let values: Vec<String> = (1..=12).map(|day| format!("0{}/02/2024", day % 9 + 1)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let (headers, rows) = table(&refs);
        let options = DecideOptions {
            interactive: true,
            ..DecideOptions::default()
        };
        let mut resolver = StubResolver::new(Some(Order::Ymd));
        decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert_eq!(resolver.calls[0].1, PROMPT_SAMPLE_LIMIT);
    }

    #[test]
    fn non_date_columns_are_absent_from_the_map() {
        let (headers, rows) = table(&["widget", "gadget"]);
        let options = DecideOptions::default();
        let mut resolver = StubResolver::new(None);
        let decisions = decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn empty_columns_are_absent_from_the_map() {
        let headers = vec!["when".to_string()];
        let rows = vec![vec!["".to_string()], vec!["  ".to_string()]];
        let options = DecideOptions::default();
        let mut resolver = StubResolver::new(None);
        let decisions = decide_columns(&headers, &rows, &options, &mut resolver).unwrap();
        assert!(decisions.is_empty());
    }
}
