//! Vertex selection set

use std::collections::BTreeSet;

/// Ordered set of selected vertex indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexSelection {
    indices: BTreeSet<usize>,
}

impl VertexSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Add (`selected == true`) or remove `index`.
    pub fn select(&mut self, index: usize, selected: bool) {
        if selected {
            self.indices.insert(index);
        } else {
            self.indices.remove(&index);
        }
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Selected indices, ascending
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// The selected index when exactly one is selected
    pub fn single(&self) -> Option<usize> {
        match self.indices.len() {
            1 => self.indices.first().copied(),
            _ => None,
        }
    }
}

impl FromIterator<usize> for VertexSelection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_single() {
        let mut selection = VertexSelection::new();
        assert_eq!(selection.single(), None);
        selection.select(4, true);
        assert_eq!(selection.single(), Some(4));
        selection.select(1, true);
        assert_eq!(selection.single(), None);
        assert_eq!(selection.to_vec(), vec![1, 4]);
        selection.select(4, false);
        assert!(selection.is_selected(1));
        assert!(!selection.is_selected(4));
    }
}
