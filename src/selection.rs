//! 选中状态的对账逻辑
//!
//! 网格在"全选后取消若干行"时不再上报明确的键列表, 而是上报一个带负向
//! 节点的 selectionFilter; 这里根据过滤形状和总行数推导选中计数, 不枚举行

use crate::ast::FilterNode;
use serde_json::Value;

/// 一次选中状态的快照
///
/// 每次选中变化或表头全选交互时同步重算, 从不持久化
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    pub selected_count: usize,
    /// 负向或全选场景下为空 (计数由推导得出, 不枚举键)
    pub selected_keys: Vec<Value>,
    pub total_count: usize,
}

impl SelectionState {
    fn counted(selected_count: usize, total_count: usize) -> Self {
        Self {
            selected_count,
            selected_keys: Vec::new(),
            total_count,
        }
    }
}

/// 表头全选复选框的一次性手势消息
///
/// 作为显式消息值随调用传入并被消费, 不存在可变槽位"读后忘清"的问题
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectAllGesture {
    pub is_select_all: bool,
}

/// 根据选中过滤和总行数推导选中状态, 规则按优先级排列
pub fn reconcile(
    gesture: Option<SelectAllGesture>,
    selection_filter: Option<&FilterNode>,
    reported_keys: &[Value],
    total_count: usize,
) -> SelectionState {
    // 规则 1：表头手势优先于一切
    if let Some(gesture) = gesture {
        let selected_count = if gesture.is_select_all { total_count } else { 0 };
        return SelectionState::counted(selected_count, total_count);
    }

    // 规则 2：没有选中过滤 → 没有选中
    let filter = match selection_filter {
        None | Some(FilterNode::MatchAll) => {
            return SelectionState::counted(0, total_count);
        }
        Some(filter) => filter,
    };

    // 规则 3：含负向节点 → "全选除了 k 行"
    let negations = top_level_negations(filter);
    if negations > 0 {
        return SelectionState::counted(total_count.saturating_sub(negations), total_count);
    }

    // 规则 4：正向选中, 直接采用上报的键列表
    SelectionState {
        selected_count: reported_keys.len(),
        selected_keys: reported_keys.to_vec(),
        total_count,
    }
}

/// 统计顶层组合脊上的负向节点数
///
/// 每个负向节点近似对应一个被取消选中的行; 该近似只在每个负向子过滤
/// 恰好按键锁定一行时成立, 这里不做校验
fn top_level_negations(node: &FilterNode) -> usize {
    match node {
        FilterNode::Not(_) => 1,
        FilterNode::And(left, right) | FilterNode::Or(left, right) => {
            top_level_negations(left) + top_level_negations(right)
        }
        FilterNode::MatchAll | FilterNode::Leaf { .. } => 0,
    }
}

/// 拥有最近一次选中状态的跟踪器
///
/// 状态只在单个事件回调线程上被写入, 这里是它唯一的所有者
pub struct SelectionTracker {
    last: SelectionState,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self {
            last: SelectionState::counted(0, 0),
        }
    }

    /// 处理一次选中变化事件, 返回重算后的状态
    pub fn on_selection_changed(
        &mut self,
        gesture: Option<SelectAllGesture>,
        selection_filter: Option<&FilterNode>,
        reported_keys: &[Value],
        total_count: usize,
    ) -> &SelectionState {
        self.last = reconcile(gesture, selection_filter, reported_keys, total_count);
        &self.last
    }

    pub fn last(&self) -> &SelectionState {
        &self.last
    }
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use serde_json::json;

    #[test]
    fn test_no_filter_means_no_selection() {
        let state = reconcile(None, None, &[], 42);
        assert_eq!(state.selected_count, 0);
        assert!(state.selected_keys.is_empty());
        assert_eq!(state.total_count, 42);
    }

    #[test]
    fn test_select_all_gesture() {
        let gesture = Some(SelectAllGesture {
            is_select_all: true,
        });
        let state = reconcile(gesture, None, &[], 830);
        assert_eq!(state.selected_count, 830);
        assert!(state.selected_keys.is_empty());
    }

    #[test]
    fn test_deselect_all_gesture_overrides_filter() {
        let filter = parse_filter(&json!(["City", "=", "Kent"])).unwrap();
        let gesture = Some(SelectAllGesture {
            is_select_all: false,
        });

        let state = reconcile(gesture, Some(&filter), &[json!(1), json!(2)], 10);
        assert_eq!(state.selected_count, 0);
        assert!(state.selected_keys.is_empty());
    }

    #[test]
    fn test_negation_filter_counts_all_except_k() {
        let filter = parse_filter(&json!([
            ["!", ["ID", "=", 3]],
            ["!", ["ID", "=", 7]]
        ]))
        .unwrap();

        let state = reconcile(None, Some(&filter), &[], 10);
        assert_eq!(state.selected_count, 8);
        assert!(state.selected_keys.is_empty());
    }

    #[test]
    fn test_single_top_level_negation() {
        let filter = parse_filter(&json!(["!", ["ID", "=", 3]])).unwrap();
        let state = reconcile(None, Some(&filter), &[], 10);
        assert_eq!(state.selected_count, 9);
    }

    #[test]
    fn test_negation_count_never_underflows() {
        let filter = parse_filter(&json!([
            ["!", ["ID", "=", 1]],
            ["!", ["ID", "=", 2]],
            ["!", ["ID", "=", 3]]
        ]))
        .unwrap();

        let state = reconcile(None, Some(&filter), &[], 2);
        assert_eq!(state.selected_count, 0);
    }

    #[test]
    fn test_positive_selection_uses_reported_keys() {
        let filter = parse_filter(&json!([
            ["ID", "=", 2],
            "or",
            ["ID", "=", 5]
        ]))
        .unwrap();
        let keys = vec![json!(2), json!(5)];

        let state = reconcile(None, Some(&filter), &keys, 10);
        assert_eq!(state.selected_count, 2);
        assert_eq!(state.selected_keys, keys);
    }

    #[test]
    fn test_match_all_filter_behaves_like_no_filter() {
        let filter = parse_filter(&json!(null)).unwrap();
        let state = reconcile(None, Some(&filter), &[json!(1)], 10);
        assert_eq!(state.selected_count, 0);
        assert!(state.selected_keys.is_empty());
    }

    #[test]
    fn test_tracker_owns_last_state() {
        let mut tracker = SelectionTracker::new();
        assert_eq!(tracker.last().selected_count, 0);

        let gesture = Some(SelectAllGesture {
            is_select_all: true,
        });
        tracker.on_selection_changed(gesture, None, &[], 830);
        assert_eq!(tracker.last().selected_count, 830);

        // 手势是显式消息, 下一次事件没有手势就不再生效
        let filter = parse_filter(&json!([["!", ["ID", "=", 9]]])).unwrap();
        tracker.on_selection_changed(None, Some(&filter), &[], 830);
        assert_eq!(tracker.last().selected_count, 829);

        tracker.on_selection_changed(None, None, &[], 830);
        assert_eq!(tracker.last().selected_count, 0);
    }
}
