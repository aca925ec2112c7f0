//! Items with a selection index kept in step with a ratatui `TableState`

use ratatui::widgets::TableState;

#[derive(Debug, Clone)]
pub struct SelectableList<T> {
    items: Vec<T>,
    selected: usize,
    table_state: TableState,
}

impl<T> Default for SelectableList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            table_state: TableState::default(),
        }
    }
}

impl<T> SelectableList<T> {
    /// Select the first item
    pub fn from_items(items: Vec<T>) -> Self {
        let mut list = Self::default();
        list.set_items(items);
        list
    }

    /// Replace all items, clamping the selection to the new length
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        if self.items.is_empty() {
            self.selected = 0;
            self.table_state.select(None);
        } else {
            self.selected = self.selected.min(self.items.len() - 1);
            self.table_state.select(Some(self.selected));
        }
    }

    /// Next item, wrapping at the end
    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.select((self.selected + 1) % self.items.len());
    }

    /// Previous item, wrapping at the start
    pub fn select_prev(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let prev = self.selected.checked_sub(1).unwrap_or(self.items.len() - 1);
        self.select(prev);
    }

    /// Clamped to the valid range
    pub fn select(&mut self, index: usize) {
        if self.items.is_empty() {
            return;
        }
        self.selected = index.min(self.items.len() - 1);
        self.table_state.select(Some(self.selected));
    }

    /// Select the first item matching `predicate`. Returns true if found.
    pub fn select_where(&mut self, predicate: impl Fn(&T) -> bool) -> bool {
        match self.items.iter().position(predicate) {
            Some(idx) => {
                self.select(idx);
                true
            }
            None => false,
        }
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// For `render_stateful_widget`
    pub fn table_state_mut(&mut self) -> &mut TableState {
        &mut self.table_state
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// First item matching `predicate`, for in-place updates
    pub fn find_mut(&mut self, predicate: impl Fn(&T) -> bool) -> Option<&mut T> {
        self.items.iter_mut().find(|item| predicate(item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}
