use std::collections::BTreeMap;

use super::tag::Tag;

/// Tag to resolved asset URL, one entry per tag present in the document.
///
/// Entries are keyed in ascending tag order. `display_order` additionally
/// remembers the order in which tags were first seen so a UI can keep rows
/// stable while the document is edited.
#[derive(Debug, Clone, Default)]
pub struct AssignmentMap {
    entries: BTreeMap<Tag, Option<String>>,
    first_seen: Vec<Tag>,
}

impl AssignmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the map so its key set equals `tags` exactly, carrying over
    /// resolutions for surviving tags. Returns the tags that were pruned.
    pub fn reconcile(&mut self, tags: &[Tag]) -> Vec<Tag> {
        let mut next: BTreeMap<Tag, Option<String>> = BTreeMap::new();
        for tag in tags {
            let carried = self.entries.get(tag).cloned().flatten();
            next.insert(tag.clone(), carried);
        }
        let pruned: Vec<Tag> = self
            .entries
            .keys()
            .filter(|t| !next.contains_key(*t))
            .cloned()
            .collect();

        self.first_seen.retain(|t| next.contains_key(t));
        for tag in next.keys() {
            if !self.first_seen.contains(tag) {
                self.first_seen.push(tag.clone());
            }
        }
        self.entries = next;
        pruned
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn get(&self, tag: &Tag) -> Option<&str> {
        self.entries.get(tag).and_then(|v| v.as_deref())
    }

    pub fn is_resolved(&self, tag: &Tag) -> bool {
        self.get(tag).is_some()
    }

    /// Sets the resolution for a tag already in the map and hands back the
    /// value it replaced. Unknown tags are left alone.
    pub fn resolve(&mut self, tag: &Tag, url: String) -> Option<String> {
        match self.entries.get_mut(tag) {
            Some(slot) => slot.replace(url),
            None => None,
        }
    }

    /// Swaps the values of two tags in one step. Both must be present and
    /// distinct; returns whether the exchange happened.
    pub fn exchange(&mut self, a: &Tag, b: &Tag) -> bool {
        if a == b || !self.entries.contains_key(a) || !self.entries.contains_key(b) {
            return false;
        }
        let va = self.entries.get_mut(a).and_then(Option::take);
        let vb = self
            .entries
            .get_mut(b)
            .and_then(|slot| std::mem::replace(slot, va));
        if let Some(slot) = self.entries.get_mut(a) {
            *slot = vb;
        }
        true
    }

    /// Unresolved tags in ascending order.
    pub fn unresolved(&self) -> Vec<Tag> {
        self.entries
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.values().filter(|v| v.is_none()).count()
    }

    pub fn can_commit(&self) -> bool {
        !self.entries.is_empty() && self.entries.values().all(|v| v.is_some())
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.entries.keys()
    }

    pub fn display_order(&self) -> &[Tag] {
        &self.first_seen
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, Option<&str>)> {
        self.entries.iter().map(|(t, v)| (t, v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.first_seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(labels: &[&str]) -> Vec<Tag> {
        labels.iter().map(|l| Tag::from_label(l)).collect()
    }

    #[test]
    fn reconcile_matches_key_set_exactly() {
        let mut map = AssignmentMap::new();
        map.reconcile(&tags(&["1", "2"]));
        map.resolve(&Tag::from_label("1"), "https://cdn/a.png".into());

        let pruned = map.reconcile(&tags(&["1", "3"]));
        assert_eq!(pruned, tags(&["2"]));
        let keys: Vec<Tag> = map.tags().cloned().collect();
        assert_eq!(keys, tags(&["1", "3"]));
        assert_eq!(map.get(&Tag::from_label("1")), Some("https://cdn/a.png"));
        assert_eq!(map.get(&Tag::from_label("3")), None);
    }

    #[test]
    fn reconcile_with_same_tags_keeps_resolutions() {
        let mut map = AssignmentMap::new();
        let set = tags(&["1", "2"]);
        map.reconcile(&set);
        map.resolve(&set[1], "u2".into());
        map.reconcile(&set);
        assert_eq!(map.get(&set[1]), Some("u2"));
        assert_eq!(map.pending_count(), 1);
    }

    #[test]
    fn pruned_tag_comes_back_unresolved() {
        let mut map = AssignmentMap::new();
        let three = Tag::from_label("3");
        map.reconcile(&[three.clone()]);
        map.resolve(&three, "u3".into());
        map.reconcile(&[]);
        assert!(!map.contains(&three));
        map.reconcile(&[three.clone()]);
        assert!(map.contains(&three));
        assert!(!map.is_resolved(&three));
    }

    #[test]
    fn exchange_swaps_values() {
        let mut map = AssignmentMap::new();
        let set = tags(&["1", "2", "3"]);
        map.reconcile(&set);
        map.resolve(&set[0], "a".into());
        map.resolve(&set[1], "b".into());

        assert!(map.exchange(&set[0], &set[1]));
        assert_eq!(map.get(&set[0]), Some("b"));
        assert_eq!(map.get(&set[1]), Some("a"));

        // exchanging with an unresolved slot moves the value across
        assert!(map.exchange(&set[0], &set[2]));
        assert_eq!(map.get(&set[0]), None);
        assert_eq!(map.get(&set[2]), Some("b"));

        assert!(!map.exchange(&set[1], &set[1]));
        assert!(!map.exchange(&set[1], &Tag::from_label("9")));
    }

    #[test]
    fn can_commit_requires_every_tag_resolved() {
        let mut map = AssignmentMap::new();
        assert!(!map.can_commit());
        let set = tags(&["1"]);
        map.reconcile(&set);
        assert!(!map.can_commit());
        map.resolve(&set[0], "u".into());
        assert!(map.can_commit());
        map.reconcile(&tags(&["1", "2"]));
        assert!(!map.can_commit());
    }

    #[test]
    fn display_order_follows_first_sighting() {
        let mut map = AssignmentMap::new();
        map.reconcile(&tags(&["b"]));
        map.reconcile(&tags(&["a", "b"]));
        assert_eq!(map.display_order(), tags(&["b", "a"]).as_slice());
        map.reconcile(&tags(&["a"]));
        assert_eq!(map.display_order(), tags(&["a"]).as_slice());
    }
}
