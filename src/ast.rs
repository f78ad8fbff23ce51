use serde_json::Value;

/// 过滤表达式树的节点
///
/// 原始文法是嵌套数组 (例如：`["City", "=", "Kent"]`, `["!", inner]`,
/// `[left, "or", right]`), 在语言边界处由 parser 一次性构造成带标签的树,
/// 之后的求值不再嗅探数组形状
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// 空过滤 (原始文法中的 null), 匹配所有记录
    MatchAll,
    /// 基础比较, 这是表达式的叶子节点, 例如：`["City", "=", "Kent"]`
    Leaf {
        field: String,
        op: FilterOp,
        value: Value,
    },
    /// 逻辑非运算, 原始文法中的 `["!", inner]`
    Not(Box<FilterNode>),
    /// 逻辑与运算 (AND)
    And(Box<FilterNode>, Box<FilterNode>),
    /// 逻辑或运算 (OR)
    Or(Box<FilterNode>, Box<FilterNode>),
}

/// 叶子节点支持的比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,       // "="
    Contains, // "contains"
}

impl FilterOp {
    /// 从原始文法的运算符 token 解析
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(FilterOp::Eq),
            "contains" => Some(FilterOp::Contains),
            _ => None,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Contains => "contains",
        }
    }
}

impl FilterNode {
    pub fn leaf(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        FilterNode::Leaf {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn not(inner: FilterNode) -> Self {
        FilterNode::Not(Box::new(inner))
    }

    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Or(Box::new(left), Box::new(right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_op_tokens() {
        assert_eq!(FilterOp::from_token("="), Some(FilterOp::Eq));
        assert_eq!(FilterOp::from_token("contains"), Some(FilterOp::Contains));
        assert_eq!(FilterOp::from_token("<>"), None);
        assert_eq!(FilterOp::Eq.as_token(), "=");
        assert_eq!(FilterOp::Contains.as_token(), "contains");
    }

    #[test]
    fn test_builders() {
        let node = FilterNode::and(
            FilterNode::leaf("City", FilterOp::Eq, json!("Kent")),
            FilterNode::not(FilterNode::leaf("ID", FilterOp::Eq, json!(3))),
        );

        if let FilterNode::And(left, right) = node {
            assert_eq!(
                *left,
                FilterNode::Leaf {
                    field: "City".to_string(),
                    op: FilterOp::Eq,
                    value: json!("Kent"),
                }
            );
            assert!(matches!(*right, FilterNode::Not(_)));
        } else {
            panic!("Expected AND node");
        }
    }
}
