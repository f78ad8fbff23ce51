//! 过滤表达式的语法分析器
//!
//! 原始表达式是 UI 侧传来的嵌套 JSON 数组, serde_json 已经完成了词法层,
//! 这里只负责把 `Value` 形状一次性构造成 `FilterNode` 树
//!
//! ## 解析流程图
//!
//! ```text
//! parse_filter()
//!   ├─ null → MatchAll (无过滤, 匹配所有记录)
//!   └─ 数组 → parse_node()
//!        ├─ ["!", inner]          → 负向节点 (2元素, 首元素为字面量 "!")
//!        │                           └─ 递归解析 inner
//!        ├─ [field, op, value]    → 叶子三元组 (首元素为标量字段名)
//!        │                           ├─ op 只支持 "=" 和 "contains"
//!        │                           └─ value 必须是基础类型
//!        └─ [node, tok, node, …]  → 组合序列 (首元素本身是数组)
//!             └─ 从左到右折叠:
//!                  ├─ "and" token → And(累积结果, 下一节点)
//!                  ├─ "or"  token → Or(累积结果, 下一节点)
//!                  └─ 相邻节点之间没有 token → 隐式 And
//!                     (DevExtreme 的 selectionFilter 就是这种形状)
//! ```
//!
//! ## 叶子与组合的歧义消除
//!
//! 长度为 3 的数组既可能是叶子也可能是组合, 判据只有一个：
//! 首元素是标量 (字段名) 则为叶子, 首元素本身是数组则为组合序列
//!
//! ## 解析示例
//!
//! ```text
//! // 叶子
//! ["City", "=", "Kent"]
//!
//! // 组合, 每个组合 token 消耗两个数组槽位
//! [["City", "=", "Kent"], "or", ["City", "=", "Seattle"]]
//!
//! // 负向选择 (全选后取消了两行)
//! [["!", ["ID", "=", 3]], ["!", ["ID", "=", 7]]]
//! ```

use crate::ast::{FilterNode, FilterOp};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// 出错位置, JSON Pointer 风格, 例如 "/2/1"
    pub path: Option<String>,
}

impl ParseError {
    fn new(message: String) -> Self {
        Self {
            message,
            path: None,
        }
    }

    fn at_path(message: String, path: &str) -> Self {
        Self {
            message,
            path: Some(path.to_string()),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (at {})", self.message, path),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ParseError {}

/// 解析入口：原始 JSON 表达式 → `FilterNode`
///
/// `null` 表示无过滤, 其余必须是数组形状
pub fn parse_filter(raw: &Value) -> Result<FilterNode, ParseError> {
    match raw {
        Value::Null => Ok(FilterNode::MatchAll),
        Value::Array(_) => parse_node(raw, ""),
        other => Err(ParseError::new(format!(
            "Expected filter array or null, found {}",
            type_name(other)
        ))),
    }
}

fn parse_node(value: &Value, path: &str) -> Result<FilterNode, ParseError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Ok(FilterNode::MatchAll),
        other => {
            return Err(ParseError::at_path(
                format!("Expected filter node array, found {}", type_name(other)),
                path,
            ));
        }
    };

    if items.is_empty() {
        return Err(ParseError::at_path(
            "Empty filter expression".to_string(),
            path,
        ));
    }

    // 负向节点：2元素且首元素为字面量 "!"
    if items.len() == 2 && items[0].as_str() == Some("!") {
        let inner = parse_node(&items[1], &child_path(path, 1))?;
        return Ok(FilterNode::not(inner));
    }

    // 首元素是标量 → 叶子三元组, 首元素是数组 → 组合序列
    if items[0].is_array() {
        parse_sequence(items, path)
    } else {
        parse_leaf(items, path)
    }
}

/// 解析叶子三元组 `[field, op, value]`
fn parse_leaf(items: &[Value], path: &str) -> Result<FilterNode, ParseError> {
    if items.len() != 3 {
        return Err(ParseError::at_path(
            format!("Leaf filter must have 3 elements, found {}", items.len()),
            path,
        ));
    }

    let field = items[0].as_str().ok_or_else(|| {
        ParseError::at_path(
            "Leaf field name must be a string".to_string(),
            &child_path(path, 0),
        )
    })?;

    let op_token = items[1].as_str().ok_or_else(|| {
        ParseError::at_path(
            "Leaf operator must be a string".to_string(),
            &child_path(path, 1),
        )
    })?;

    let op = FilterOp::from_token(op_token).ok_or_else(|| {
        ParseError::at_path(
            format!("Unsupported operator: {:?}", op_token),
            &child_path(path, 1),
        )
    })?;

    let value = &items[2];
    if value.is_array() || value.is_object() {
        return Err(ParseError::at_path(
            "Leaf value must be a primitive".to_string(),
            &child_path(path, 2),
        ));
    }

    Ok(FilterNode::leaf(field, op, value.clone()))
}

/// 从左到右折叠组合序列
///
/// 每个 "and"/"or" token 消耗两个槽位 (token 本身 + 右操作数),
/// 相邻的两个节点之间没有 token 时按隐式 And 处理
fn parse_sequence(items: &[Value], path: &str) -> Result<FilterNode, ParseError> {
    let mut acc = parse_node(&items[0], &child_path(path, 0))?;
    let mut index = 1;

    while index < items.len() {
        match combinator_token(&items[index]) {
            Some(token) => {
                let operand = items.get(index + 1).ok_or_else(|| {
                    ParseError::at_path(
                        format!("Combinator {:?} is missing its right operand", token),
                        &child_path(path, index),
                    )
                })?;
                let right = parse_node(operand, &child_path(path, index + 1))?;
                acc = combine(token, acc, right);
                index += 2;
            }
            None => {
                // 隐式 And
                let right = parse_node(&items[index], &child_path(path, index))?;
                acc = FilterNode::and(acc, right);
                index += 1;
            }
        }
    }

    Ok(acc)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    And,
    Or,
}

fn combinator_token(value: &Value) -> Option<Combinator> {
    match value.as_str() {
        Some(s) if s.eq_ignore_ascii_case("and") => Some(Combinator::And),
        Some(s) if s.eq_ignore_ascii_case("or") => Some(Combinator::Or),
        _ => None,
    }
}

fn combine(token: Combinator, left: FilterNode, right: FilterNode) -> FilterNode {
    match token {
        Combinator::And => FilterNode::and(left, right),
        Combinator::Or => FilterNode::or(left, right),
    }
}

fn child_path(path: &str, index: usize) -> String {
    format!("{}/{}", path, index)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
