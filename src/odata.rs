//! OData query-parameter building for the remote-delegation variant.
//!
//! The remote variant never evaluates filters locally: it renders the
//! expression into a `$filter` string and ships the whole parameter set to
//! the service, which owns filtering, sorting and paging.

use crate::ast::{FilterNode, FilterOp};
use serde_json::Value;

/// Render a filter expression as an OData `$filter` clause.
///
/// `MatchAll` renders to `None`: no filter means no `$filter` parameter at
/// all, not an always-true clause.
pub fn filter_to_odata(node: &FilterNode) -> Option<String> {
    match node {
        FilterNode::MatchAll => None,
        _ => Some(render(node)),
    }
}

fn render(node: &FilterNode) -> String {
    match node {
        FilterNode::MatchAll => "true".to_string(),
        FilterNode::Leaf { field, op, value } => match op {
            FilterOp::Eq => format!("{} eq {}", field, literal(value)),
            FilterOp::Contains => format!("contains({},{})", field, literal(value)),
        },
        FilterNode::Not(inner) => format!("not ({})", render(inner)),
        FilterNode::And(left, right) => format!("({}) and ({})", render(left), render(right)),
        FilterNode::Or(left, right) => format!("({}) or ({})", render(left), render(right)),
    }
}

/// OData literal rendering: strings in single quotes with `''` escaping,
/// numbers and booleans bare.
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// One page request: zero-based page index plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: usize,
    pub page_size: usize,
}

/// Build the query-parameter set a remote-operations grid sends.
///
/// The `$orderby` clause gets an ` asc` suffix unless it already ends with
/// ` desc`.
pub fn build_query_params(
    filter: Option<&FilterNode>,
    order_by: Option<&str>,
    page: Option<PageRequest>,
) -> Vec<(String, String)> {
    let mut params = Vec::new();

    if let Some(clause) = filter.and_then(filter_to_odata) {
        params.push(("$filter".to_string(), clause));
    }

    if let Some(order_by) = order_by {
        let clause = if order_by.ends_with(" desc") {
            order_by.to_string()
        } else {
            format!("{} asc", order_by)
        };
        params.push(("$orderby".to_string(), clause));
    }

    if let Some(page) = page {
        params.push(("$top".to_string(), page.page_size.to_string()));
        let skip = page.page_index * page.page_size;
        if skip > 0 {
            params.push(("$skip".to_string(), skip.to_string()));
        }
    }

    params.push(("$count".to_string(), "true".to_string()));
    params
}
