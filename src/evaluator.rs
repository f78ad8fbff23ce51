//! Client-side filter evaluation over in-memory record sets.

use crate::ast::{FilterNode, FilterOp};
use crate::config::GridConfig;
use crate::parser::parse_filter;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A grid record: an opaque mapping from field name to value.
///
/// The evaluator only relies on keyed field access, equality and substring
/// tests; record semantics stay with the caller.
pub type Record = Map<String, Value>;

/// One page of a simulated data-source load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    pub rows: Vec<Record>,
    /// Size of the filtered set before paging.
    pub total_count: usize,
}

/// Evaluates filter expressions against record sequences.
pub struct Evaluator {
    config: GridConfig,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            config: GridConfig::default(),
        }
    }

    pub fn with_config(config: GridConfig) -> Self {
        Self { config }
    }

    /// Evaluate an expression, returning the order-preserving subsequence of
    /// `records` that matches.
    pub fn evaluate(&self, records: &[Record], node: &FilterNode) -> Vec<Record> {
        match node {
            FilterNode::MatchAll => records.to_vec(),

            FilterNode::Leaf { field, op, value } => records
                .iter()
                .filter(|record| self.leaf_matches(record, field, *op, value))
                .cloned()
                .collect(),

            // AND applies the right filter to the left result
            FilterNode::And(left, right) => {
                let current = self.evaluate(records, left);
                self.evaluate(&current, right)
            }

            // OR evaluates both branches against the FULL record set, then
            // unions the results, de-duplicated by record key in
            // first-occurrence order
            FilterNode::Or(left, right) => {
                let left_rows = self.evaluate(records, left);
                let right_rows = self.evaluate(records, right);

                let mut seen = HashSet::new();
                let mut union = Vec::new();
                for record in left_rows.into_iter().chain(right_rows) {
                    if seen.insert(self.record_identity(&record)) {
                        union.push(record);
                    }
                }
                union
            }

            FilterNode::Not(inner) => {
                let matched: HashSet<String> = self
                    .evaluate(records, inner)
                    .iter()
                    .map(|record| self.record_identity(record))
                    .collect();

                records
                    .iter()
                    .filter(|record| !matched.contains(&self.record_identity(record)))
                    .cloned()
                    .collect()
            }
        }
    }

    /// Parse and evaluate a raw JSON expression.
    ///
    /// Malformed expressions are treated as "no match" rather than an error;
    /// the expression grammar is caller-controlled.
    pub fn evaluate_raw(&self, records: &[Record], raw: &Value) -> Vec<Record> {
        match parse_filter(raw) {
            Ok(node) => self.evaluate(records, &node),
            Err(_) => Vec::new(),
        }
    }

    /// Filter, then slice out one page. `total_count` reports the filtered
    /// set size before paging.
    pub fn load(
        &self,
        records: &[Record],
        node: &FilterNode,
        page_index: usize,
        page_size: usize,
    ) -> LoadResult {
        let filtered = self.evaluate(records, node);
        let total_count = filtered.len();
        let rows = page(&filtered, page_index, page_size);
        LoadResult { rows, total_count }
    }

    fn leaf_matches(&self, record: &Record, field: &str, op: FilterOp, value: &Value) -> bool {
        let Some(actual) = record.get(field) else {
            return false;
        };

        // Multi-valued attribute: an array of sub-objects carrying a tag key.
        // Equality matches when ANY element's tag equals the filter value;
        // no other operator is supported on these fields.
        if let Some(tag_key) = self.config.alias_tag(field) {
            if op != FilterOp::Eq {
                return false;
            }
            return actual
                .as_array()
                .is_some_and(|elements| elements.iter().any(|e| e.get(tag_key) == Some(value)));
        }

        match op {
            FilterOp::Eq => actual == value,
            FilterOp::Contains => match (actual.as_str(), value.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
        }
    }

    /// Record identity for de-duplication and negation: the key field's
    /// value, or the whole record when the key is absent.
    fn record_identity(&self, record: &Record) -> String {
        match record.get(&self.config.key_field) {
            Some(key) => key.to_string(),
            None => Value::Object(record.clone()).to_string(),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Slice one page out of a record sequence. Out-of-range pages are empty.
pub fn page(records: &[Record], page_index: usize, page_size: usize) -> Vec<Record> {
    let start = page_index.saturating_mul(page_size);
    if page_size == 0 || start >= records.len() {
        return Vec::new();
    }
    let end = (start + page_size).min(records.len());
    records[start..end].to_vec()
}
