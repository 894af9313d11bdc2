use crate::matcher::{FuzzyMatcher, Score};
use std::borrow::Cow;

/// Single scored candidate produced by [RankedSearch::filter]
#[derive(Debug, Clone)]
pub struct RankedEntry<T> {
    /// Projected string with matched characters wrapped in markers
    pub rendered: String,
    pub score: Score,
    /// Position of the candidate in the input sequence before sorting,
    /// used only to break score ties
    pub original_index: usize,
    pub item: T,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RankOptions {
    /// Maximum number of entries kept after sorting, `0` keeps everything
    pub max_results: usize,
}

/// Ranked search over a candidate set
///
/// Each candidate is projected to a searchable string, scored by the fuzzy
/// matcher, and the hits are sorted best-first. Ordering is fully
/// deterministic: ties are broken by the candidate's original index rather
/// than by sort stability.
#[derive(Debug, Clone, Default)]
pub struct RankedSearch {
    matcher: FuzzyMatcher,
    options: RankOptions,
}

impl RankedSearch {
    pub fn new(matcher: FuzzyMatcher, options: RankOptions) -> Self {
        Self { matcher, options }
    }

    pub fn matcher(&self) -> &FuzzyMatcher {
        &self.matcher
    }

    /// Score all candidates and return hits sorted by descending score
    pub fn filter<T, F>(
        &self,
        pattern: &str,
        items: impl IntoIterator<Item = T>,
        project: F,
    ) -> Vec<RankedEntry<T>>
    where
        F: for<'a> Fn(&'a T) -> Cow<'a, str>,
    {
        let mut entries: Vec<_> = items
            .into_iter()
            .enumerate()
            .filter_map(|(original_index, item)| {
                let result = {
                    let projected = project(&item);
                    self.matcher.match_pattern(pattern, projected.as_ref())
                }?;
                Some(RankedEntry {
                    rendered: result.rendered,
                    score: result.score,
                    original_index,
                    item,
                })
            })
            .collect();
        entries.sort_unstable_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .expect("NaN score")
                .then_with(|| a.original_index.cmp(&b.original_index))
        });
        if self.options.max_results > 0 {
            entries.truncate(self.options.max_results);
        }
        entries
    }

    /// Same as [filter](Self::filter) but delivers the final ordered vector
    /// through exactly one invocation of `notify`
    pub fn filter_with<T, F, N>(
        &self,
        pattern: &str,
        items: impl IntoIterator<Item = T>,
        project: F,
        notify: N,
    ) where
        F: for<'a> Fn(&'a T) -> Cow<'a, str>,
        N: FnOnce(Vec<RankedEntry<T>>),
    {
        notify(self.filter(pattern, items, project))
    }
}
