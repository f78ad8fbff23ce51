//! SQL compiler that converts filter expressions to SQL queries using sea-query.
//!
//! This is the service-side translation of a grid filter: the same expression
//! the client-side evaluator interprets is compiled into a `WHERE` clause for
//! a backing store. Multi-valued alias fields compile as plain columns — the
//! service schema keeps them as simple fields and the client re-shapes them
//! for display.

use crate::ast::{FilterNode, FilterOp};
use sea_query::{
    Asterisk, Expr, Iden, PostgresQueryBuilder, SelectStatement, SimpleExpr, Value as SqlValue,
};
use serde_json::Value;
use std::collections::HashMap;

/// Configuration for SQL rewrites
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Minimum number of same-field equality branches in an OR spine before
    /// collapsing to an IN clause
    pub min_or_values_for_in: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            min_or_values_for_in: 5,
        }
    }
}

/// Table identifier wrapper for sea-query
#[derive(Debug, Clone)]
pub struct TableIdent(pub String);

impl Iden for TableIdent {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Compiles filter expressions into SQL queries
pub struct SqlFilterCompiler {
    config: RewriteConfig,
    /// Maps entity names to table names for schema resolution
    table_mapping: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// A rewrite applied during compilation
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    OrToIn { field: String, value_count: usize },
}

/// Result of SQL compilation with rewrite information
#[derive(Debug)]
pub struct CompileResult {
    pub sql: String,
    pub rewrites: Vec<Rewrite>,
}

impl SqlFilterCompiler {
    pub fn new() -> Self {
        Self {
            config: RewriteConfig::default(),
            table_mapping: HashMap::new(),
        }
    }

    pub fn with_config(config: RewriteConfig) -> Self {
        Self {
            config,
            table_mapping: HashMap::new(),
        }
    }

    /// Set table mapping for entity names
    pub fn set_table_mapping(&mut self, mapping: HashMap<String, String>) {
        self.table_mapping = mapping;
    }

    /// Get the actual table name for an entity
    fn table_name(&self, entity: &str) -> String {
        self.table_mapping
            .get(entity)
            .cloned()
            .unwrap_or_else(|| entity.to_lowercase())
    }

    /// Compile a filter expression into a SELECT against the entity's table
    pub fn compile(&self, node: &FilterNode, entity: &str) -> Result<CompileResult, CompileError> {
        let (condition, rewrites) = self.compile_node(node)?;

        let mut select = SelectStatement::new();
        select.from(TableIdent(self.table_name(entity)));
        select.column(Asterisk);
        select.and_where(condition);

        Ok(CompileResult {
            sql: select.to_string(PostgresQueryBuilder),
            rewrites,
        })
    }

    fn compile_node(&self, node: &FilterNode) -> Result<(SimpleExpr, Vec<Rewrite>), CompileError> {
        let mut rewrites = Vec::new();

        let expr = match node {
            FilterNode::MatchAll => Expr::val(true).into(),

            FilterNode::Leaf { field, op, value } => self.compile_leaf(field, *op, value)?,

            FilterNode::Not(inner) => {
                let (inner_expr, mut inner_rewrites) = self.compile_node(inner)?;
                rewrites.append(&mut inner_rewrites);
                inner_expr.not()
            }

            FilterNode::And(left, right) => {
                let (left_expr, mut left_rewrites) = self.compile_node(left)?;
                let (right_expr, mut right_rewrites) = self.compile_node(right)?;
                rewrites.append(&mut left_rewrites);
                rewrites.append(&mut right_rewrites);
                left_expr.and(right_expr)
            }

            FilterNode::Or(left, right) => {
                // An OR spine of same-field equalities collapses to IN;
                // this is exactly the shape the grid emits for multi-value
                // column filters
                if let Some((in_expr, rewrite)) = self.try_rewrite_or_to_in(node)? {
                    rewrites.push(rewrite);
                    in_expr
                } else {
                    let (left_expr, mut left_rewrites) = self.compile_node(left)?;
                    let (right_expr, mut right_rewrites) = self.compile_node(right)?;
                    rewrites.append(&mut left_rewrites);
                    rewrites.append(&mut right_rewrites);
                    left_expr.or(right_expr)
                }
            }
        };

        Ok((expr, rewrites))
    }

    fn compile_leaf(
        &self,
        field: &str,
        op: FilterOp,
        value: &Value,
    ) -> Result<SimpleExpr, CompileError> {
        let col = Expr::col(ColumnName(field.to_string()));

        match op {
            FilterOp::Eq => {
                // Equality against the null literal becomes an IS NULL check
                if value.is_null() {
                    return Ok(col.is_null());
                }
                Ok(col.eq(self.literal_to_value(value)?))
            }
            FilterOp::Contains => {
                let needle = value.as_str().ok_or_else(|| {
                    CompileError::new(format!(
                        "contains requires a string literal, found {}",
                        value
                    ))
                })?;
                Ok(col.like(format!("%{}%", needle)))
            }
        }
    }

    /// Collapse an OR spine of same-field equalities into a single IN clause
    /// once it reaches the configured threshold
    fn try_rewrite_or_to_in(
        &self,
        node: &FilterNode,
    ) -> Result<Option<(SimpleExpr, Rewrite)>, CompileError> {
        let mut field: Option<&str> = None;
        let mut values: Vec<&Value> = Vec::new();

        if !collect_or_equalities(node, &mut field, &mut values) {
            return Ok(None);
        }

        let Some(field) = field else {
            return Ok(None);
        };

        if values.len() < self.config.min_or_values_for_in {
            return Ok(None);
        }

        let in_values = values
            .iter()
            .map(|v| self.literal_to_value(v))
            .collect::<Result<Vec<_>, _>>()?;

        let in_expr = Expr::col(ColumnName(field.to_string())).is_in(in_values);
        let rewrite = Rewrite::OrToIn {
            field: field.to_string(),
            value_count: values.len(),
        };

        Ok(Some((in_expr, rewrite)))
    }

    /// Convert a JSON literal to a sea-query value
    fn literal_to_value(&self, literal: &Value) -> Result<SqlValue, CompileError> {
        match literal {
            Value::String(s) => Ok(SqlValue::String(Some(Box::new(s.clone())))),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SqlValue::BigInt(Some(i)))
                } else if let Some(f) = n.as_f64() {
                    Ok(SqlValue::Double(Some(f)))
                } else {
                    Err(CompileError::new(format!("Unsupported number: {}", n)))
                }
            }
            Value::Bool(b) => Ok(SqlValue::Bool(Some(*b))),
            other => Err(CompileError::new(format!(
                "Unsupported literal in SQL filter: {}",
                other
            ))),
        }
    }
}

impl Default for SqlFilterCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk an OR spine collecting same-field equality values.
///
/// Returns false as soon as the pattern breaks: a different field, a
/// non-equality leaf, or any other node shape.
fn collect_or_equalities<'a>(
    node: &'a FilterNode,
    field: &mut Option<&'a str>,
    values: &mut Vec<&'a Value>,
) -> bool {
    match node {
        FilterNode::Or(left, right) => {
            collect_or_equalities(left, field, values) && collect_or_equalities(right, field, values)
        }
        FilterNode::Leaf {
            field: leaf_field,
            op: FilterOp::Eq,
            value,
        } => {
            if value.is_null() {
                return false;
            }
            match field {
                Some(seen) if *seen != leaf_field.as_str() => false,
                _ => {
                    *field = Some(leaf_field.as_str());
                    values.push(value);
                    true
                }
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use serde_json::json;

    fn create_test_compiler() -> SqlFilterCompiler {
        let mut compiler = SqlFilterCompiler::new();
        let mut mapping = HashMap::new();
        mapping.insert("Employee".to_string(), "employees".to_string());
        compiler.set_table_mapping(mapping);
        compiler
    }

    fn node(raw: serde_json::Value) -> FilterNode {
        parse_filter(&raw).unwrap()
    }

    #[test]
    fn test_simple_leaf_compilation() {
        let compiler = create_test_compiler();
        let result = compiler
            .compile(&node(json!(["City", "=", "Kent"])), "Employee")
            .unwrap();

        assert!(result.sql.contains("employees"));
        assert!(result.sql.contains("City"));
        assert!(result.sql.contains("Kent"));
        assert!(result.rewrites.is_empty());
    }

    #[test]
    fn test_contains_compiles_to_like() {
        let compiler = create_test_compiler();
        let result = compiler
            .compile(&node(json!(["LastName", "contains", "an"])), "Employee")
            .unwrap();

        assert!(result.sql.contains("LIKE"));
        assert!(result.sql.contains("%an%"));
    }

    #[test]
    fn test_contains_requires_string() {
        let compiler = create_test_compiler();
        let result = compiler.compile(&node(json!(["ID", "contains", 3])), "Employee");
        assert!(result.is_err());
    }

    #[test]
    fn test_negation_compiles_to_not() {
        let compiler = create_test_compiler();
        let result = compiler
            .compile(&node(json!(["!", ["ID", "=", 3]])), "Employee")
            .unwrap();

        assert!(result.sql.contains("NOT"));
    }

    #[test]
    fn test_eq_null_compiles_to_is_null() {
        let compiler = create_test_compiler();
        let result = compiler
            .compile(&node(json!(["Zipcode", "=", null])), "Employee")
            .unwrap();

        assert!(result.sql.contains("IS NULL"));
    }

    #[test]
    fn test_match_all_compiles_to_true() {
        let compiler = create_test_compiler();
        let result = compiler.compile(&FilterNode::MatchAll, "Employee").unwrap();

        assert!(result.sql.contains("TRUE"));
    }

    #[test]
    fn test_unmapped_entity_falls_back_to_lowercase() {
        let compiler = SqlFilterCompiler::new();
        let result = compiler
            .compile(&node(json!(["City", "=", "Kent"])), "Department")
            .unwrap();

        assert!(result.sql.contains("department"));
    }

    #[test]
    fn test_or_to_in_rewrite() {
        let compiler = SqlFilterCompiler::with_config(RewriteConfig {
            min_or_values_for_in: 2,
        });

        // The shape a multi-value column filter emits: an OR chain of
        // equalities on one field
        let raw = json!([
            ["FirstName", "=", "Nancy"],
            "or",
            ["FirstName", "=", "Andrew"],
            "or",
            ["FirstName", "=", "Janet"]
        ]);
        let result = compiler.compile(&node(raw), "Employee").unwrap();

        assert!(result.sql.contains("IN"));
        assert_eq!(result.rewrites.len(), 1);
        match &result.rewrites[0] {
            Rewrite::OrToIn { field, value_count } => {
                assert_eq!(field, "FirstName");
                assert_eq!(*value_count, 3);
            }
        }
    }

    #[test]
    fn test_sub_threshold_or_stays_or() {
        let compiler = create_test_compiler();

        let raw = json!([["City", "=", "Kent"], "or", ["City", "=", "Seattle"]]);
        let result = compiler.compile(&node(raw), "Employee").unwrap();

        assert!(result.sql.contains("OR"));
        assert!(result.rewrites.is_empty());
    }

    #[test]
    fn test_mixed_field_or_stays_or() {
        let compiler = SqlFilterCompiler::with_config(RewriteConfig {
            min_or_values_for_in: 2,
        });

        let raw = json!([
            ["City", "=", "Kent"],
            "or",
            ["City", "=", "Seattle"],
            "or",
            ["LastName", "=", "Fuller"]
        ]);
        let result = compiler.compile(&node(raw), "Employee").unwrap();

        assert!(result.rewrites.is_empty());
        assert!(result.sql.contains("OR"));
    }

    #[test]
    fn test_and_of_or_spines_rewrites_each_side() {
        let compiler = SqlFilterCompiler::with_config(RewriteConfig {
            min_or_values_for_in: 2,
        });

        let raw = json!([
            [["FirstName", "=", "Nancy"], "or", ["FirstName", "=", "Andrew"]],
            "and",
            ["City", "=", "Kent"]
        ]);
        let result = compiler.compile(&node(raw), "Employee").unwrap();

        assert_eq!(result.rewrites.len(), 1);
        assert!(result.sql.contains("IN"));
        assert!(result.sql.contains("City"));
    }
}
