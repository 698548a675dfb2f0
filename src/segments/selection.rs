use std::collections::VecDeque;

/// Segments picked for a join. Never holds more than two; a third pick
/// pushes out the oldest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSelection {
    ids: VecDeque<String>,
}

impl EditSelection {
    pub const CAPACITY: usize = 2;

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    /// Oldest first.
    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    pub fn first(&self) -> Option<&str> {
        self.ids.front().map(String::as_str)
    }

    pub fn select(&mut self, id: &str) {
        if self.contains(id) {
            return;
        }
        self.ids.push_back(id.to_string());
        while self.ids.len() > Self::CAPACITY {
            self.ids.pop_front();
        }
    }

    pub fn deselect(&mut self, id: &str) {
        self.ids.retain(|selected| selected != id);
    }

    pub fn toggle(&mut self, id: &str) {
        if self.contains(id) {
            self.deselect(id);
        } else {
            self.select(id);
        }
    }

    /// The two ids to join, oldest first, when exactly two are selected.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (self.ids.len(), self.ids.front(), self.ids.back()) {
            (2, Some(a), Some(b)) => Some((a.as_str(), b.as_str())),
            _ => None,
        }
    }

    pub fn retain_known(&mut self, known: impl Fn(&str) -> bool) {
        self.ids.retain(|id| known(id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::EditSelection;

    #[test]
    fn third_pick_evicts_the_first() {
        let mut selection = EditSelection::default();
        selection.select("a");
        selection.select("b");
        selection.select("c");
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.ids(), vec!["b".to_string(), "c".to_string()]);
        assert!(!selection.contains("a"));
    }

    #[test]
    fn reselecting_does_not_duplicate() {
        let mut selection = EditSelection::default();
        selection.select("a");
        selection.select("a");
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.pair(), None);
    }

    #[test]
    fn toggle_removes_a_selected_id() {
        let mut selection = EditSelection::default();
        selection.toggle("a");
        selection.toggle("b");
        assert_eq!(selection.pair(), Some(("a", "b")));
        selection.toggle("a");
        assert_eq!(selection.ids(), vec!["b".to_string()]);
    }

    #[test]
    fn retain_known_drops_vanished_ids() {
        let mut selection = EditSelection::default();
        selection.select("1");
        selection.select("2");
        selection.retain_known(|id| id == "2");
        assert_eq!(selection.first(), Some("2"));
        assert_eq!(selection.len(), 1);
    }
}
