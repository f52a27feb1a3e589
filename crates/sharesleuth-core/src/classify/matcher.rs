/// Keyword scoring against a single item name.
///
/// A keyword scores a boundary match (2) when its words occur as
/// consecutive name tokens, otherwise a substring match (1) when it occurs
/// inside the spaced or separator-free form of the name. Multi-word
/// keywords earn one extra point per additional word.
use crate::model::keywords::{normalize_phrase, Keyword, KeywordMap};

const BOUNDARY_SCORE: u64 = 2;
const SUBSTRING_SCORE: u64 = 1;

/// A lowercased, tokenized name.
#[derive(Debug, Clone)]
pub struct NameTokens {
    tokens: Vec<String>,
    spaced: String,
    compact: String,
}

impl NameTokens {
    pub fn new(name: &str) -> Self {
        let spaced = normalize_phrase(name);
        let tokens: Vec<String> = spaced
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect();
        let compact = tokens.concat();
        Self {
            tokens,
            spaced,
            compact,
        }
    }

    fn has_consecutive(&self, words: &[String]) -> bool {
        self.tokens.windows(words.len()).any(|w| w == words)
    }
}

struct Pattern<'a> {
    keyword: &'a Keyword,
    compact: String,
}

impl Pattern<'_> {
    fn score(&self, name: &NameTokens) -> u64 {
        let base = if name.has_consecutive(&self.keyword.words) {
            BOUNDARY_SCORE
        } else if name.spaced.contains(self.keyword.phrase.as_str())
            || name.compact.contains(self.compact.as_str())
        {
            SUBSTRING_SCORE
        } else {
            return 0;
        };
        base + (self.keyword.words.len() as u64 - 1)
    }
}

/// One department's raw score for a name, with the keywords that hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentMatch<'a> {
    /// Index into [`KeywordMap::departments`].
    pub department: usize,
    pub score: u64,
    pub keywords: Vec<&'a str>,
}

/// Keyword map compiled for repeated scoring.
pub struct Matcher<'a> {
    departments: Vec<Vec<Pattern<'a>>>,
}

impl<'a> Matcher<'a> {
    pub fn new(map: &'a KeywordMap) -> Self {
        let departments = map
            .departments()
            .iter()
            .map(|dept| {
                dept.keywords
                    .iter()
                    .map(|keyword| Pattern {
                        keyword,
                        compact: keyword.words.concat(),
                    })
                    .collect()
            })
            .collect();
        Self { departments }
    }

    /// Departments with a positive raw score for `name`, in map order.
    /// Each keyword counts at most once.
    pub fn score(&self, name: &NameTokens) -> Vec<DepartmentMatch<'a>> {
        self.departments
            .iter()
            .enumerate()
            .filter_map(|(department, patterns)| {
                let mut score = 0;
                let mut keywords = Vec::new();
                for pattern in patterns {
                    let s = pattern.score(name);
                    if s > 0 {
                        score += s;
                        keywords.push(pattern.keyword.phrase.as_str());
                    }
                }
                (score > 0).then_some(DepartmentMatch {
                    department,
                    score,
                    keywords,
                })
            })
            .collect()
    }
}
