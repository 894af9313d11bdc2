use crate::{
    common::LockExt,
    item::{ClipEntry, Item, ItemId},
    model::ListModel,
    rank::RankedSearch,
};
use std::sync::{Arc, Mutex};

/// Clipboard history browser
///
/// Owns the full entry set and a [ListModel] holding the currently shown
/// subset. Searching re-populates the model with ranked matches, the
/// rendered markup replacing each entry's text; resetting restores the
/// unfiltered history. Hidden entries never reach the model.
pub struct Browser {
    entries: Mutex<Vec<ClipEntry>>,
    search: RankedSearch,
    pattern: Mutex<Option<String>>,
    model: Arc<ListModel<ClipEntry>>,
}

impl Browser {
    pub fn new(search: RankedSearch) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            search,
            pattern: Mutex::new(None),
            model: Arc::new(ListModel::with_validator(Arc::new(
                |entry: &ClipEntry| !entry.hidden,
            ))),
        }
    }

    /// Model consumed by the list view
    pub fn model(&self) -> Arc<ListModel<ClipEntry>> {
        self.model.clone()
    }

    pub fn pattern(&self) -> Option<String> {
        self.pattern.with(|pattern| pattern.clone())
    }

    /// Replace the full history, the active pattern (if any) is re-applied
    pub fn set_entries(&self, entries: Vec<ClipEntry>) {
        self.entries.with_mut(|slot| *slot = entries);
        self.apply();
    }

    /// Add one entry at the end of the history
    pub fn append(&self, entry: ClipEntry) {
        let filtered = self.pattern.with(|pattern| pattern.is_some());
        self.entries.with_mut(|entries| entries.push(entry.clone()));
        if filtered {
            // the new entry competes with the current ranking
            self.apply();
        } else {
            self.model.append(entry);
        }
    }

    /// Drop one entry from the history and from the model
    pub fn remove(&self, id: ItemId) -> bool {
        let removed = self.entries.with_mut(|entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            entries.len() != before
        });
        if let Some(index) = self
            .model
            .items()
            .iter()
            .position(|entry| entry.id == id)
        {
            self.model.delete(index);
        }
        removed
    }

    /// Filter the history by `pattern`
    ///
    /// A blank or whitespace-only pattern is a no-op and leaves the shown
    /// subset untouched, it does not reset the browser. Returns whether the
    /// pattern was applied.
    pub fn search(&self, pattern: &str) -> bool {
        if pattern.trim().is_empty() {
            return false;
        }
        self.pattern
            .with_mut(|slot| *slot = Some(pattern.to_string()));
        self.apply();
        true
    }

    /// Clear the active pattern and show the full history again
    pub fn reset(&self) {
        self.pattern.with_mut(|slot| *slot = None);
        self.apply();
    }

    fn apply(&self) {
        let pattern = self.pattern.with(|pattern| pattern.clone());
        let entries = self.entries.with(|entries| entries.clone());
        match pattern {
            None => self.model.set_items(entries),
            Some(pattern) => {
                let ranked =
                    self.search
                        .filter(&pattern, entries, |entry: &ClipEntry| entry.searchable());
                tracing::debug!(pattern, hits = ranked.len(), "history filtered");
                self.model.set_items(ranked.into_iter().map(|ranked| ClipEntry {
                    text: ranked.rendered,
                    ..ranked.item
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        matcher::{FuzzyMatcher, MatcherOptions},
        rank::RankOptions,
    };

    fn browser() -> Browser {
        let matcher = FuzzyMatcher::new(MatcherOptions {
            pre: "<m>".to_string(),
            post: "</m>".to_string(),
            ..MatcherOptions::default()
        });
        Browser::new(RankedSearch::new(matcher, RankOptions::default()))
    }

    fn shown(browser: &Browser) -> Vec<String> {
        browser
            .model()
            .items()
            .into_iter()
            .map(|entry| entry.text)
            .collect()
    }

    #[test]
    fn test_search_ranks_and_renders() {
        let browser = browser();
        browser.set_entries(vec![
            ClipEntry::new(0, "cargo build"),
            ClipEntry::new(1, "xyz"),
            ClipEntry::new(2, "cb"),
        ]);

        assert!(browser.search("cb"));
        assert_eq!(
            shown(&browser),
            ["<m>c</m><m>b</m>", "<m>c</m>argo <m>b</m>uild"]
        );
        assert_eq!(browser.pattern().as_deref(), Some("cb"));
    }

    #[test]
    fn test_blank_pattern_is_a_no_op() {
        let browser = browser();
        browser.set_entries(vec![ClipEntry::new(0, "alpha"), ClipEntry::new(1, "beta")]);
        assert!(browser.search("al"));
        let before = shown(&browser);

        assert!(!browser.search(""));
        assert!(!browser.search("   \t"));
        assert_eq!(shown(&browser), before);
        assert_eq!(browser.pattern().as_deref(), Some("al"));
    }

    #[test]
    fn test_reset_restores_full_history() {
        let browser = browser();
        browser.set_entries(vec![ClipEntry::new(0, "alpha"), ClipEntry::new(1, "beta")]);
        browser.search("be");
        assert_eq!(shown(&browser), ["<m>b</m><m>e</m>ta"]);

        browser.reset();
        assert_eq!(shown(&browser), ["alpha", "beta"]);
        assert_eq!(browser.pattern(), None);
    }

    #[test]
    fn test_hidden_entries_never_shown() {
        let browser = browser();
        browser.set_entries(vec![
            ClipEntry::new(0, "public"),
            ClipEntry::new(1, "password").hidden(true),
        ]);
        assert_eq!(shown(&browser), ["public"]);

        browser.search("p");
        assert_eq!(shown(&browser), ["<m>p</m>ublic"]);
    }

    #[test]
    fn test_append_respects_active_filter() {
        let browser = browser();
        browser.set_entries(vec![ClipEntry::new(0, "alpha")]);
        browser.append(ClipEntry::new(1, "beta"));
        assert_eq!(shown(&browser), ["alpha", "beta"]);

        browser.search("a");
        browser.append(ClipEntry::new(2, "gamma"));
        // characters before the first match carry no penalty, all three
        // score 1.0 and history order breaks the tie
        assert_eq!(
            shown(&browser),
            ["<m>a</m>lpha", "bet<m>a</m>", "g<m>a</m>mma"]
        );
    }

    #[test]
    fn test_remove_by_identity() {
        let browser = browser();
        browser.set_entries(vec![ClipEntry::new(0, "alpha"), ClipEntry::new(1, "beta")]);
        assert!(browser.remove(ItemId(0)));
        assert_eq!(shown(&browser), ["beta"]);
        assert!(!browser.remove(ItemId(42)));

        browser.reset();
        assert_eq!(shown(&browser), ["beta"]);
    }
}
