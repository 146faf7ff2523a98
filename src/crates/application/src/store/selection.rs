use std::collections::HashSet;
use std::hash::Hash;

/// 点击时按下的修饰键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickModifier {
    /// 单选
    #[default]
    None,
    /// Cmd/Ctrl：切换单项
    Toggle,
    /// Shift：从锚点到当前项的连续区间
    Range,
}

/// 列表多选状态
///
/// 区间选择依据的是调用方传入的可见顺序（排序、过滤之后的顺序），
/// 不在可见列表里的项会在下一次操作时被清出选择。
#[derive(Debug, Clone)]
pub struct SelectionController<Id> {
    selected: HashSet<Id>,
    anchor: Option<Id>,
}

impl<Id> Default for SelectionController<Id> {
    fn default() -> Self {
        Self {
            selected: HashSet::new(),
            anchor: None,
        }
    }
}

impl<Id: Clone + Eq + Hash> SelectionController<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn click(&mut self, id: &Id, modifier: ClickModifier, visible: &[Id]) {
        self.prune(visible);
        let Some(target) = visible.iter().position(|v| v == id) else {
            return;
        };
        match modifier {
            ClickModifier::None => self.select_only(id),
            ClickModifier::Toggle => {
                // 取消选中时锚点不动
                if !self.selected.remove(id) {
                    self.selected.insert(id.clone());
                    self.anchor = Some(id.clone());
                }
            }
            ClickModifier::Range => {
                let anchor = self
                    .anchor
                    .as_ref()
                    .and_then(|a| visible.iter().position(|v| v == a));
                match anchor {
                    Some(start) => {
                        let (lo, hi) = if start <= target {
                            (start, target)
                        } else {
                            (target, start)
                        };
                        self.selected = visible[lo..=hi].iter().cloned().collect();
                    }
                    None => self.select_only(id),
                }
            }
        }
    }

    pub fn select_all(&mut self, visible: &[Id]) {
        self.selected = visible.iter().cloned().collect();
        if !self.anchor.as_ref().is_some_and(|a| visible.contains(a)) {
            self.anchor = visible.first().cloned();
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    pub fn is_selected(&self, id: &Id) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn anchor(&self) -> Option<&Id> {
        self.anchor.as_ref()
    }

    /// 按可见顺序返回已选中的项
    pub fn selected_in_order(&self, visible: &[Id]) -> Vec<Id> {
        visible
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    fn select_only(&mut self, id: &Id) {
        self.selected.clear();
        self.selected.insert(id.clone());
        self.anchor = Some(id.clone());
    }

    fn prune(&mut self, visible: &[Id]) {
        let visible: HashSet<&Id> = visible.iter().collect();
        self.selected.retain(|id| visible.contains(id));
        if self.anchor.as_ref().is_some_and(|a| !visible.contains(a)) {
            self.anchor = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<u32> {
        vec![1, 2, 3, 4, 5, 6]
    }

    #[test]
    fn test_plain_click_selects_only_one() {
        let mut sel = SelectionController::new();
        sel.click(&2, ClickModifier::None, &rows());
        sel.click(&4, ClickModifier::None, &rows());
        assert_eq!(sel.selected_in_order(&rows()), vec![4]);
        assert_eq!(sel.anchor(), Some(&4));
    }

    #[test]
    fn test_shift_click_selects_backwards_range() {
        let mut sel = SelectionController::new();
        sel.click(&5, ClickModifier::None, &rows());
        sel.click(&2, ClickModifier::Range, &rows());
        assert_eq!(sel.selected_in_order(&rows()), vec![2, 3, 4, 5]);
        assert_eq!(sel.anchor(), Some(&5));
    }

    #[test]
    fn test_range_follows_visible_order() {
        let visible = vec![6, 1, 5, 2, 4, 3];
        let mut sel = SelectionController::new();
        sel.click(&1, ClickModifier::None, &visible);
        sel.click(&2, ClickModifier::Range, &visible);
        assert_eq!(sel.selected_in_order(&visible), vec![1, 5, 2]);
    }

    #[test]
    fn test_toggle_adds_and_removes() {
        let mut sel = SelectionController::new();
        sel.click(&1, ClickModifier::Toggle, &rows());
        sel.click(&3, ClickModifier::Toggle, &rows());
        assert_eq!(sel.len(), 2);
        sel.click(&1, ClickModifier::Toggle, &rows());
        assert!(!sel.is_selected(&1));
        assert!(sel.is_selected(&3));
    }

    #[test]
    fn test_shift_click_after_toggle_anchor() {
        let mut sel = SelectionController::new();
        sel.click(&5, ClickModifier::Toggle, &rows());
        sel.click(&2, ClickModifier::Range, &rows());
        assert_eq!(sel.selected_in_order(&rows()), vec![2, 3, 4, 5]);

        let mut sel = SelectionController::new();
        sel.click(&2, ClickModifier::Toggle, &rows());
        sel.click(&5, ClickModifier::Range, &rows());
        assert_eq!(sel.selected_in_order(&rows()), vec![2, 3, 4, 5]);
        assert_eq!(sel.anchor(), Some(&2));
    }

    #[test]
    fn test_toggle_off_keeps_anchor() {
        let mut sel = SelectionController::new();
        sel.click(&2, ClickModifier::Toggle, &rows());
        sel.click(&5, ClickModifier::Toggle, &rows());
        sel.click(&2, ClickModifier::Toggle, &rows());
        assert_eq!(sel.anchor(), Some(&5));

        sel.click(&4, ClickModifier::Range, &rows());
        assert_eq!(sel.selected_in_order(&rows()), vec![4, 5]);
    }

    #[test]
    fn test_range_without_anchor_behaves_like_click() {
        let mut sel = SelectionController::new();
        sel.click(&3, ClickModifier::Range, &rows());
        assert_eq!(sel.selected_in_order(&rows()), vec![3]);
    }

    #[test]
    fn test_hidden_rows_drop_out_of_selection() {
        let mut sel = SelectionController::new();
        sel.select_all(&rows());
        let filtered = vec![2, 4, 6];
        sel.click(&4, ClickModifier::Toggle, &filtered);
        assert_eq!(sel.selected_in_order(&rows()), vec![2, 6]);
    }

    #[test]
    fn test_click_on_hidden_row_is_ignored() {
        let mut sel = SelectionController::new();
        sel.click(&2, ClickModifier::None, &rows());
        sel.click(&9, ClickModifier::None, &rows());
        assert_eq!(sel.selected_in_order(&rows()), vec![2]);
    }

    #[test]
    fn test_clear() {
        let mut sel = SelectionController::new();
        sel.select_all(&rows());
        sel.clear();
        assert!(sel.is_empty());
        assert_eq!(sel.anchor(), None);
    }
}
