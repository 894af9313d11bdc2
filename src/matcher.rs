use std::fmt::{self, Debug};

pub type Score = f64;

const SCORE_MATCH: Score = 1.0;
const SCORE_MATCH_COMPOUND: Score = 2.0;
const SCORE_GAP_DECAY: Score = -0.1;

/// Matcher configuration
///
/// `pre`/`post` wrap every matched character in the rendered output,
/// `max_distance` bounds how many characters a single gap may span before
/// the scan gives up on the candidate.
#[derive(Debug, Clone)]
pub struct MatcherOptions {
    pub pre: String,
    pub post: String,
    pub case_sensitive: bool,
    pub max_distance: usize,
    pub escape_markup: bool,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            pre: String::new(),
            post: String::new(),
            case_sensitive: false,
            max_distance: 30,
            escape_markup: false,
        }
    }
}

/// Result of matching one pattern against one string
#[derive(Clone, PartialEq)]
pub struct MatchResult {
    /// Original string with every matched character wrapped in the
    /// configured markers
    pub rendered: String,
    /// Signed score, higher is better, rounded to two decimals
    pub score: Score,
}

impl Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatchResult({:?}, {})", self.rendered, self.score)
    }
}

/// Fuzzy matcher
///
/// Scans the string once, left to right, consuming the pattern as a greedy
/// subsequence (first placement wins, no backtracking). Consecutive matches
/// compound the running score super-linearly, gaps accumulate a decaying
/// penalty proportional to their length. This is deliberately not an
/// optimal-alignment scorer.
#[derive(Debug, Clone, Default)]
pub struct FuzzyMatcher {
    options: MatcherOptions,
}

impl FuzzyMatcher {
    pub fn new(options: MatcherOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    /// Match `pattern` against `string`
    ///
    /// Returns `None` unless the whole pattern was consumed. Comparison uses
    /// case-normalized characters unless configured otherwise, the rendered
    /// output always preserves original casing.
    pub fn match_pattern(&self, pattern: &str, string: &str) -> Option<MatchResult> {
        let pattern: Vec<char> = if self.options.case_sensitive {
            pattern.chars().collect()
        } else {
            pattern.chars().map(char_normalize).collect()
        };
        let chars: Vec<char> = string.chars().collect();

        let mut pattern_idx = 0;
        let mut total_score: Score = 0.0;
        let mut curr_score: Score = 0.0;
        let mut curr_distance = 0usize;
        let mut rendered = String::with_capacity(string.len());

        for (index, c) in chars.iter().copied().enumerate() {
            if pattern_idx > 0
                && pattern_idx < pattern.len()
                && curr_distance >= self.options.max_distance
            {
                // gap exceeded the configured bound with pattern characters
                // still unconsumed, this candidate can not match anymore
                return None;
            }
            let c_cmp = if self.options.case_sensitive {
                c
            } else {
                char_normalize(c)
            };
            if pattern_idx < pattern.len() && c_cmp == pattern[pattern_idx] {
                rendered.push_str(&self.options.pre);
                self.push_char(&mut rendered, c);
                rendered.push_str(&self.options.post);
                pattern_idx += 1;
                curr_score = SCORE_MATCH + SCORE_MATCH_COMPOUND * curr_score;
                curr_distance = 0;
            } else {
                if pattern_idx > 0 {
                    curr_distance += 1;
                    curr_score = SCORE_GAP_DECAY * curr_distance as Score;
                }
                self.push_char(&mut rendered, c);
            }
            total_score += curr_score;
            if pattern_idx == pattern.len() {
                // pattern fully consumed, rest of the string is appended as is
                for rest in chars[index + 1..].iter().copied() {
                    self.push_char(&mut rendered, rest);
                }
                break;
            }
        }

        (pattern_idx == pattern.len()).then(|| MatchResult {
            rendered,
            score: score_round(total_score),
        })
    }

    fn push_char(&self, out: &mut String, c: char) {
        if !self.options.escape_markup {
            out.push(c);
            return;
        }
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

fn char_normalize(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn score_round(score: Score) -> Score {
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(pre: &str, post: &str) -> FuzzyMatcher {
        FuzzyMatcher::new(MatcherOptions {
            pre: pre.to_string(),
            post: post.to_string(),
            ..MatcherOptions::default()
        })
    }

    #[test]
    fn test_subsequence_rendering_preserves_string() {
        let matcher = matcher("<m>", "</m>");
        for (pattern, string) in [
            ("ab", "axb"),
            ("clip", "clipboard history"),
            ("chy", "Clipboard HistorY"),
            ("", "anything at all"),
            ("π", "a π in a haystack"),
        ] {
            let result = matcher
                .match_pattern(pattern, string)
                .unwrap_or_else(|| panic!("{:?} should match {:?}", pattern, string));
            let stripped = result.rendered.replace("<m>", "").replace("</m>", "");
            assert_eq!(stripped, string);
        }
    }

    #[test]
    fn test_score_model() {
        let matcher = matcher("<m>", "</m>");
        let result = matcher.match_pattern("ab", "axb").unwrap();
        assert_eq!(result.rendered, "<m>a</m>x<m>b</m>");
        // 1.0 ('a') - 0.1 (gap 'x') + 0.8 ('b' after gap)
        assert_eq!(result.score, 1.70);

        // consecutive run compounds: 1, then 1 + 2*1 = 3
        let result = matcher.match_pattern("ab", "ab").unwrap();
        assert_eq!(result.score, 4.0);

        // longer gap decays linearly
        let result = matcher.match_pattern("ab", "axxb").unwrap();
        // 1.0 - 0.1 - 0.2 + (1 + 2 * -0.2)
        assert_eq!(result.score, 1.30);
    }

    #[test]
    fn test_no_match() {
        let matcher = matcher("<m>", "</m>");
        assert_eq!(matcher.match_pattern("xyz", "abc"), None);
        assert_eq!(matcher.match_pattern("ba", "ab"), None);
        assert_eq!(matcher.match_pattern("a", ""), None);
    }

    #[test]
    fn test_case_normalization() {
        let insensitive = matcher("[", "]");
        let result = insensitive.match_pattern("AbC", "xaYbzc").unwrap();
        assert_eq!(result.rendered, "x[a]Y[b]z[c]");

        let sensitive = FuzzyMatcher::new(MatcherOptions {
            case_sensitive: true,
            ..MatcherOptions::default()
        });
        assert!(sensitive.match_pattern("A", "a").is_none());
        assert!(sensitive.match_pattern("A", "A").is_some());
    }

    #[test]
    fn test_max_distance_gives_up() {
        let matcher = FuzzyMatcher::new(MatcherOptions {
            max_distance: 3,
            ..MatcherOptions::default()
        });
        // gap of three separates 'a' from 'b'
        assert_eq!(matcher.match_pattern("ab", "a123b"), None);
        // gap of two still fits
        assert!(matcher.match_pattern("ab", "a12b").is_some());
        // distance only counts once matching has started
        assert!(matcher.match_pattern("ab", "0000000ab").is_some());
    }

    #[test]
    fn test_markup_escape() {
        let matcher = FuzzyMatcher::new(MatcherOptions {
            pre: "<b>".to_string(),
            post: "</b>".to_string(),
            escape_markup: true,
            ..MatcherOptions::default()
        });
        let result = matcher.match_pattern("ab", "a<b").unwrap();
        assert_eq!(result.rendered, "<b>a</b>&lt;<b>b</b>");
        let result = matcher.match_pattern("", "x&y").unwrap();
        assert_eq!(result.rendered, "x&amp;y");
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let matcher = matcher("<m>", "</m>");
        let result = matcher.match_pattern("", "no highlight").unwrap();
        assert_eq!(result.rendered, "no highlight");
        assert_eq!(result.score, 0.0);
    }
}
