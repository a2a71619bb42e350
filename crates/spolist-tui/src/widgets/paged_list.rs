//! Fixed-size pages with a selection cursor.
//!
//! Unlike a scrolling list, the visible window only ever moves a whole page at
//! a time, and the row is always relative to the current page. Users select by
//! the absolute 1-based number printed next to each row.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no item numbered {requested} (1-{total})")]
pub struct OutOfRange {
    pub requested: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct PagedList<T> {
    items: Vec<T>,
    page_size: usize,
    page: usize,
    row: usize,
}

impl<T> PagedList<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page_size: page_size.max(1),
            page: 0,
            row: 0,
        }
    }

    pub fn with_items(page_size: usize, items: Vec<T>) -> Self {
        let mut list = Self::new(page_size);
        list.set_items(items);
        list
    }

    /// Replace the item set; page and row go back to 0.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.page = 0;
        self.row = 0;
    }

    /// Returns `true` if the page changed. Never wraps.
    pub fn next_page(&mut self) -> bool {
        if self.page + 1 >= self.page_count() {
            return false;
        }
        self.page += 1;
        self.row = 0;
        true
    }

    /// Returns `true` if the page changed. Never wraps.
    pub fn prev_page(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        self.row = 0;
        true
    }

    /// Move the cursor by `delta` rows, clamped to the current page.
    /// Returns `true` if the row changed.
    pub fn move_selection(&mut self, delta: isize) -> bool {
        let rows = self.rows_on_page();
        if rows == 0 {
            return false;
        }
        let target = (self.row as isize + delta).clamp(0, rows as isize - 1) as usize;
        let changed = target != self.row;
        self.row = target;
        changed
    }

    /// Select the item numbered `number` (1-based, across all pages). On error
    /// nothing changes.
    pub fn jump_to(&mut self, number: usize) -> Result<&T, OutOfRange> {
        if number == 0 || number > self.items.len() {
            return Err(OutOfRange {
                requested: number,
                total: self.items.len(),
            });
        }
        let index = number - 1;
        self.page = index / self.page_size;
        self.row = index % self.page_size;
        Ok(&self.items[index])
    }

    pub fn selected_index(&self) -> Option<usize> {
        let index = self.page * self.page_size + self.row;
        (index < self.items.len()).then_some(index)
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.selected_index().and_then(|i| self.items.get(i))
    }

    /// `(absolute_index, item)` pairs on the current page.
    pub fn page_items(&self) -> Vec<(usize, &T)> {
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        if start >= end {
            return Vec::new();
        }
        self.items[start..end]
            .iter()
            .enumerate()
            .map(|(i, item)| (start + i, item))
            .collect()
    }

    pub fn rows_on_page(&self) -> usize {
        let start = self.page * self.page_size;
        self.items.len().saturating_sub(start).min(self.page_size)
    }

    /// Number of pages; 0 for an empty list.
    pub fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}
